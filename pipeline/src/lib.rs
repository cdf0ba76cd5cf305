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

#![forbid(unsafe_code)]
#![deny(
    clippy::pedantic,
    noop_method_call,
    rust_2018_idioms,
    unused_qualifications
)]
#![warn(unreachable_pub, rustdoc::missing_crate_level_docs)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

//! Orchestrates the matching-engine stages (embed, rank, interactive feedback, finalize) over a
//! [`wannadb_matching::DocumentBase`], checking each stage's signal preconditions before it runs
//! and recording a statistics tree for the whole run.

mod builder;
mod callback;
mod config;
mod driver;
mod error;
mod logging;
mod stage;
mod statistics;

pub use crate::{
    builder::Builder,
    callback::{InteractionCallback, NullStatus, StatusCallback},
    config::{load_config, PipelineConfig},
    driver::Pipeline,
    error::Error,
    logging::{initialize as initialize_logging, Config as LoggingConfig},
    stage::{
        ComputeInitialDistances, EmbedAttribute, EntityKind, FinalizeCells,
        InteractiveFeedbackLoop, SignalRequirement, Stage,
    },
    statistics::Statistics,
};
