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

use wannadb_matching::{
    decide_cell, ids, Answer, ConfirmedMatch, DocumentBase, Embedder, FeedbackDriver, Phase,
    ThresholdConfig,
};

use crate::{
    callback::{InteractionCallback, StatusCallback},
    error::Error,
    statistics::Statistics,
};

/// Which kind of entity a [`SignalRequirement`] is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Attribute,
    Document,
    Nugget,
}

/// One signal a stage needs present before it may run.
#[derive(Debug, Clone, Copy)]
pub struct SignalRequirement {
    pub entity: EntityKind,
    pub signal_id: &'static str,
}

/// One step of the matching pipeline.
///
/// Variants include embedder, ranker, feedback driver, and finalizer.
pub trait Stage {
    fn name(&self) -> &'static str;

    fn required_signals(&self) -> &'static [SignalRequirement];

    fn produced_signals(&self) -> &'static [SignalRequirement];

    /// # Errors
    /// Fails on an embedding failure, a missing signal (should not happen: the driver checks
    /// preconditions before calling this), or user cancellation.
    #[allow(clippy::too_many_arguments)] // each parameter is a distinct collaborator, not a group to bundle
    fn run(
        &self,
        base: &mut DocumentBase,
        attribute_index: usize,
        embedder: &dyn Embedder,
        interaction: &mut dyn InteractionCallback,
        status: &dyn StatusCallback,
        statistics: &mut Statistics,
        threshold_config: &ThresholdConfig,
    ) -> Result<(), Error>;
}

/// Produces (and memoizes) the attribute's label embedding.
pub struct EmbedAttribute;

impl Stage for EmbedAttribute {
    fn name(&self) -> &'static str {
        "embed-attribute"
    }

    fn required_signals(&self) -> &'static [SignalRequirement] {
        &[]
    }

    fn produced_signals(&self) -> &'static [SignalRequirement] {
        &[SignalRequirement {
            entity: EntityKind::Attribute,
            signal_id: ids::TEXT_EMBEDDING,
        }]
    }

    fn run(
        &self,
        base: &mut DocumentBase,
        attribute_index: usize,
        embedder: &dyn Embedder,
        _interaction: &mut dyn InteractionCallback,
        status: &dyn StatusCallback,
        statistics: &mut Statistics,
        _threshold_config: &ThresholdConfig,
    ) -> Result<(), Error> {
        status.emit(self.name(), 0., "embedding attribute label");
        let attribute = base
            .attribute_mut(attribute_index)
            .expect("attribute_index must be valid");
        wannadb_matching::label_embedding(attribute, &EmbedderRef(embedder))?;
        statistics.record("embedded", 1);
        Ok(())
    }
}

/// Ranks every document's nuggets against the attribute with the default threshold, with no
/// feedback consumed yet.
pub struct ComputeInitialDistances;

impl Stage for ComputeInitialDistances {
    fn name(&self) -> &'static str {
        "compute-initial-distances"
    }

    fn required_signals(&self) -> &'static [SignalRequirement] {
        &[
            SignalRequirement {
                entity: EntityKind::Attribute,
                signal_id: ids::TEXT_EMBEDDING,
            },
            SignalRequirement {
                entity: EntityKind::Nugget,
                signal_id: ids::TEXT_EMBEDDING,
            },
        ]
    }

    fn produced_signals(&self) -> &'static [SignalRequirement] {
        &[SignalRequirement {
            entity: EntityKind::Nugget,
            signal_id: ids::CACHED_DISTANCE,
        }]
    }

    fn run(
        &self,
        base: &mut DocumentBase,
        attribute_index: usize,
        embedder: &dyn Embedder,
        _interaction: &mut dyn InteractionCallback,
        status: &dyn StatusCallback,
        statistics: &mut Statistics,
        threshold_config: &ThresholdConfig,
    ) -> Result<(), Error> {
        let threshold = threshold_config.default_threshold();
        let count = base.documents().len();
        for document in 0..count {
            #[allow(clippy::cast_precision_loss)] // progress fraction, document counts are tiny
            let progress = document as f32 / count.max(1) as f32;
            status.emit(self.name(), progress, "ranking");
            decide_cell(
                base,
                attribute_index,
                &EmbedderRef(embedder),
                document,
                threshold,
            )?;
        }
        statistics.record("documents-ranked", i64::try_from(count).unwrap_or(i64::MAX));
        Ok(())
    }
}

/// Runs the interactive feedback loop to completion: proposes the best unconfirmed candidate,
/// asks the user, integrates the answer, adapts the threshold, and repeats.
pub struct InteractiveFeedbackLoop;

impl Stage for InteractiveFeedbackLoop {
    fn name(&self) -> &'static str {
        "interactive-feedback-loop"
    }

    fn required_signals(&self) -> &'static [SignalRequirement] {
        &[SignalRequirement {
            entity: EntityKind::Nugget,
            signal_id: ids::CACHED_DISTANCE,
        }]
    }

    fn produced_signals(&self) -> &'static [SignalRequirement] {
        &[]
    }

    fn run(
        &self,
        base: &mut DocumentBase,
        attribute_index: usize,
        embedder: &dyn Embedder,
        interaction: &mut dyn InteractionCallback,
        status: &dyn StatusCallback,
        statistics: &mut Statistics,
        threshold_config: &ThresholdConfig,
    ) -> Result<(), Error> {
        let mut driver = FeedbackDriver::new(attribute_index, threshold_config.clone());
        let mut rounds = 0i64;
        loop {
            if interaction.is_cancelled() {
                statistics.record("cancelled", 1);
                return Err(Error::UserCancelled);
            }
            driver.rank(base, &EmbedderRef(embedder))?;
            let Some(request) = driver.propose(base) else {
                break;
            };
            status.emit(self.name(), 0.5, "awaiting user feedback");
            let answer = interaction.ask(request);
            let is_stop = matches!(answer, Answer::Stop);
            driver.answer(base, &EmbedderRef(embedder), answer)?;
            rounds += 1;
            if is_stop || driver.phase() == Phase::Done {
                break;
            }
        }
        statistics.record("rounds", rounds);
        statistics.record("final-threshold", format!("{:.3}", driver.threshold()));
        Ok(())
    }
}

/// Records final per-document cell outcomes; performs no further mutation.
pub struct FinalizeCells;

impl Stage for FinalizeCells {
    fn name(&self) -> &'static str {
        "finalize-cells"
    }

    fn required_signals(&self) -> &'static [SignalRequirement] {
        &[]
    }

    fn produced_signals(&self) -> &'static [SignalRequirement] {
        &[]
    }

    fn run(
        &self,
        base: &mut DocumentBase,
        attribute_index: usize,
        _embedder: &dyn Embedder,
        _interaction: &mut dyn InteractionCallback,
        status: &dyn StatusCallback,
        statistics: &mut Statistics,
        _threshold_config: &ThresholdConfig,
    ) -> Result<(), Error> {
        status.emit(self.name(), 1., "finalizing");
        let attribute = &base.attributes()[attribute_index];
        let filled = (0..base.documents().len())
            .filter(|&document| {
                matches!(
                    attribute.confirmed_match(document),
                    Some(ConfirmedMatch::Nugget(_))
                )
            })
            .count();
        statistics.record("filled-cells", i64::try_from(filled).unwrap_or(i64::MAX));
        Ok(())
    }
}

/// Fixed backoff before the single retry of a failed embedder call.
const EMBEDDING_RETRY_BACKOFF: std::time::Duration = std::time::Duration::from_millis(50);

/// Adapts a `&dyn Embedder` to the concrete [`Embedder`] trait required by generic matching-crate
/// functions, retrying a failed call once with a fixed backoff before surfacing it as
/// [`wannadb_matching::Error::EmbeddingFailure`].
struct EmbedderRef<'a>(&'a dyn Embedder);

impl Embedder for EmbedderRef<'_> {
    fn embed(
        &self,
        text: &str,
    ) -> Result<wannadb_embedding::NormalizedEmbedding, wannadb_matching::Error> {
        if let Ok(embedding) = self.0.embed(text) {
            return Ok(embedding);
        }
        std::thread::sleep(EMBEDDING_RETRY_BACKOFF);
        self.0
            .embed(text)
            .map_err(|cause| wannadb_matching::Error::EmbeddingFailure {
                cause: cause.to_string(),
            })
    }
}
