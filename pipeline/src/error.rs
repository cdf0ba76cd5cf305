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

use crate::stage::EntityKind;

/// Structured errors of the pipeline driver.
#[derive(Debug, Display, ThisError)]
pub enum Error {
    /// stage `{stage}` requires signal `{signal_id}` on {entity:?} `{entity_name}`, which is absent
    MissingSignal {
        entity: EntityKind,
        entity_name: String,
        signal_id: &'static str,
        stage: &'static str,
    },
    /// a matching-engine operation failed: {0}
    Matching(#[from] wannadb_matching::Error),
    /// the user cancelled the interactive feedback loop
    UserCancelled,
}
