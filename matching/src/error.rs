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

use displaydoc::Display;
use thiserror::Error as ThisError;

/// Structured errors of the matching engine.
///
/// Per-document errors during ranking isolate to that document (its cell is marked errored and
/// the round continues); errors touching shared resources or invariants abort the pipeline.
#[derive(Debug, Display, ThisError)]
pub enum Error {
    /// stage {stage} requires signal `{signal_id}` on {entity}, which is absent
    MissingSignal {
        entity: String,
        signal_id: &'static str,
        stage: &'static str,
    },
    /// the embedding provider failed: {cause}
    EmbeddingFailure { cause: String },
    /// the user cancelled the interactive feedback loop
    UserCancelled,
    /// resource `{resource_id}` is not available
    ResourceUnavailable { resource_id: &'static str },
    /// invariant violated: {invariant}
    ConsistencyViolation { invariant: &'static str },
    /// persistence codec failed: {cause}
    PersistenceError { cause: String },
}

impl From<wannadb_embedding::ResourceError> for Error {
    fn from(error: wannadb_embedding::ResourceError) -> Self {
        match error {
            wannadb_embedding::ResourceError::Unavailable(resource_id) => {
                Self::ResourceUnavailable { resource_id }
            }
        }
    }
}
