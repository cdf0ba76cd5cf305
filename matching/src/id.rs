// Copyright 2021 Xayn AG
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

use derive_more::{AsRef, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier of a [`crate::document::Nugget`].
///
/// Nuggets reference their owning document by index (see [`crate::document::DocumentIndex`]),
/// not by an owning pointer, so a stable id is needed wherever a nugget must be named without
/// borrowing the `DocumentBase`, e.g. in `currently-highest-ranked` and `confirmed-match`.
#[derive(
    Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize, From, AsRef,
)]
pub struct NuggetId(Uuid);

impl NuggetId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use wannadb_test_utils::uuid::mock_uuid;

    use super::*;

    impl NuggetId {
        pub(crate) const fn mocked(sub_id: usize) -> Self {
            Self(mock_uuid(sub_id))
        }
    }
}
