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

use wannadb_matching::{Answer, Request};

/// Blocks the driver until the user answers a [`Request`].
///
/// A cancel token is checked at the start of each round and on callback return; `is_cancelled`
/// lets the driver honor a cancellation raised between rounds without discarding an
/// already-returned answer.
pub trait InteractionCallback {
    fn ask(&mut self, request: Request) -> Answer;

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Fire-and-forget progress notification; must never block the driver.
pub trait StatusCallback {
    fn emit(&self, stage: &'static str, progress_fraction: f32, message: &str);
}

/// A [`StatusCallback`] that discards every notification.
pub struct NullStatus;

impl StatusCallback for NullStatus {
    fn emit(&self, _stage: &'static str, _progress_fraction: f32, _message: &str) {}
}
