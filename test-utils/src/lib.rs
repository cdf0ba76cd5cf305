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

//! Test utilities shared across the workspace: approximate-equality assertions, mock UUIDs,
//! and a panic-on-error helper for tests that use `?`.

#![forbid(unsafe_code)]

mod approx_eq;
pub mod error;
pub mod uuid;

pub use crate::approx_eq::ApproxEqIter;
pub use float_cmp::approx_eq;
