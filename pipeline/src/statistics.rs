// Copyright 2022 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tree-shaped statistics recorder: `enter`/`leave` nest a named scope, `record` attaches a
/// value to the currently open scope, `snapshot` yields a lossless, nested representation.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Statistics {
    root: Node,
    /// Indices of currently open scopes, from the root down to the innermost.
    #[serde(skip)]
    path: Vec<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Node {
    name: String,
    values: serde_json::Map<String, Value>,
    children: Vec<Node>,
}

impl Statistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn current_mut(&mut self) -> &mut Node {
        let mut node = &mut self.root;
        for &index in &self.path {
            node = &mut node.children[index];
        }
        node
    }

    /// Opens a new named scope nested under the current one.
    pub fn enter(&mut self, name: &str) {
        let child = Node {
            name: name.to_owned(),
            ..Node::default()
        };
        let current = self.current_mut();
        current.children.push(child);
        let index = current.children.len() - 1;
        self.path.push(index);
    }

    /// Closes the innermost open scope.
    pub fn leave(&mut self) {
        self.path.pop();
    }

    /// Attaches a value to the currently open scope, overwriting any prior value for `key`.
    pub fn record(&mut self, key: &str, value: impl Into<Value>) {
        self.current_mut()
            .values
            .insert(key.to_owned(), value.into());
    }

    /// A lossless, nested snapshot of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        fn to_value(node: &Node) -> Value {
            let mut map = node.values.clone();
            map.insert("name".to_owned(), Value::String(node.name.clone()));
            if !node.children.is_empty() {
                map.insert(
                    "children".to_owned(),
                    Value::Array(node.children.iter().map(to_value).collect()),
                );
            }
            Value::Object(map)
        }
        to_value(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_on_root_scope() {
        let mut statistics = Statistics::new();
        statistics.record("count", 3);
        assert_eq!(statistics.snapshot()["count"], 3);
    }

    #[test]
    fn test_nested_scopes_are_lossless() {
        let mut statistics = Statistics::new();
        statistics.enter("embed-attribute");
        statistics.record("embedded", 1);
        statistics.leave();
        statistics.enter("interactive-feedback-loop");
        statistics.record("rounds", 2);
        statistics.leave();

        let snapshot = statistics.snapshot();
        let children = snapshot["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["embedded"], 1);
        assert_eq!(children[1]["rounds"], 2);
    }
}
