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

//! Embedding vector types, cosine distance, and process-wide custody of the heavyweight
//! objects (embedding model, tokenizer, stopwords) that back them.
//!
//! Computing an embedding from raw text is an external collaborator (a sentence-transformer
//! served out of process); this crate only owns the vector representation and its lifecycle.

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

mod embedding;
mod resource;

pub use crate::{
    embedding::{
        Embedding, InvalidEmbedding, NormalizedEmbedding, COSINE_DISTANCE_RANGE,
        COSINE_SIMILARITY_RANGE, MAXIMUM_COSINE_SIMILARITY, MINIMUM_COSINE_SIMILARITY,
    },
    resource::{Resource, ResourceError, ResourceHandle, ResourceManager, StopWords},
};
