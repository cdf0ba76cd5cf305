// Copyright 2023 Xayn AG
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

//! The typed key/value side-data attached to every [`crate::document::Document`],
//! [`crate::document::Nugget`] and [`crate::attribute::Attribute`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wannadb_embedding::NormalizedEmbedding;

use crate::id::NuggetId;

/// Recognized signal identifiers, see module docs for their semantics.
pub mod ids {
    /// Human-readable seed text of an attribute, used for the initial embedding.
    pub const LABEL: &str = "label";
    /// Embedding of a nugget's surface text or an attribute's label.
    pub const TEXT_EMBEDDING: &str = "text-embedding";
    /// Embedding of a nugget's surrounding window.
    pub const CONTEXT_EMBEDDING: &str = "context-embedding";
    /// Embedding of a nugget's semantic label (e.g. its NER type).
    pub const LABEL_EMBEDDING: &str = "label-embedding";
    /// Most recently computed effective distance for the attribute currently being matched.
    pub const CACHED_DISTANCE: &str = "cached-distance";
    /// Which extractor produced a nugget.
    pub const PROVENANCE: &str = "provenance";
}

/// Whether a signal must survive serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transience {
    Transient,
    Persistent,
}

/// Classifies a known signal identifier; unrecognized identifiers default to persistent so that
/// forward-compatible, unknown signals are not silently dropped.
#[must_use]
pub(crate) fn transience(signal_id: &str) -> Transience {
    match signal_id {
        ids::CACHED_DISTANCE => Transience::Transient,
        _ => Transience::Persistent,
    }
}

/// A typed signal value.
///
/// Known kinds cover everything the matching engine needs natively; an extractor or a future
/// version of this engine may attach a `kind` this engine doesn't recognize, which is preserved
/// verbatim as [`SignalValue::Unknown`] rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SignalValue {
    Float(f32),
    Int(i64),
    Vector(NormalizedEmbedding),
    Bytes(Vec<u8>),
    String(String),
    NuggetRef(NuggetId),
    /// An unrecognized `kind`, preserved byte-for-byte.
    Unknown {
        kind: String,
        bytes: Vec<u8>,
    },
}

impl SignalValue {
    #[must_use]
    pub fn as_vector(&self) -> Option<&NormalizedEmbedding> {
        match self {
            Self::Vector(embedding) => Some(embedding),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

/// A typed key/value map of signals attached to one entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signals(BTreeMap<String, SignalValue>);

impl Signals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signal_id: &str) -> Option<&SignalValue> {
        self.0.get(signal_id)
    }

    pub fn set(&mut self, signal_id: impl Into<String>, value: SignalValue) {
        self.0.insert(signal_id.into(), value);
    }

    pub fn remove(&mut self, signal_id: &str) -> Option<SignalValue> {
        self.0.remove(signal_id)
    }

    #[must_use]
    pub fn contains(&self, signal_id: &str) -> bool {
        self.0.contains_key(signal_id)
    }

    /// Drops every transient signal, keeping only what must survive serialization.
    pub fn retain_persistent(&mut self) {
        self.0
            .retain(|signal_id, _| transience(signal_id) == Transience::Persistent);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SignalValue)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_persistent_drops_cached_distance() {
        let mut signals = Signals::new();
        signals.set(ids::CACHED_DISTANCE, SignalValue::Float(0.1));
        signals.set(ids::LABEL, SignalValue::String("ceo".into()));

        signals.retain_persistent();

        assert!(!signals.contains(ids::CACHED_DISTANCE));
        assert!(signals.contains(ids::LABEL));
    }

    #[test]
    fn test_unknown_signal_roundtrips_as_opaque_bytes() {
        let mut signals = Signals::new();
        signals.set(
            "future-signal",
            SignalValue::Unknown {
                kind: "future-kind".into(),
                bytes: vec![1, 2, 3],
            },
        );

        signals.retain_persistent();
        assert!(signals.contains("future-signal"));
    }
}
