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

//! The interactive matching engine: ranks candidate text nuggets against a user-defined
//! attribute and turns a small amount of user feedback into a progressively tightening
//! distance threshold.

#![forbid(unsafe_op_in_unsafe_fn)]
#![deny(
    clippy::pedantic,
    noop_method_call,
    rust_2018_idioms,
    unsafe_code,
    unused_qualifications
)]
#![warn(unreachable_pub, rustdoc::missing_crate_level_docs)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

mod attribute;
mod base;
mod cell;
mod distance;
mod document;
mod error;
mod feedback;
mod id;
mod signal;
mod threshold;
mod utils;

pub use crate::{
    attribute::{Attribute, ConfirmedMatch},
    base::DocumentBase,
    cell::decide_cell,
    distance::{compute_and_cache, effective_distance, label_embedding, Embedder},
    document::{Document, DocumentIndex, Nugget},
    error::Error,
    feedback::{Answer, FeedbackDriver, Phase, Request},
    id::NuggetId,
    signal::{ids, SignalValue, Signals, Transience},
    threshold::{adapt, ThresholdConfig},
};
