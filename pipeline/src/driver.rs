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

use tracing::instrument;
use wannadb_matching::{DocumentBase, Embedder, ThresholdConfig};

use crate::{
    callback::{InteractionCallback, StatusCallback},
    error::Error,
    stage::{EntityKind, SignalRequirement, Stage},
    statistics::Statistics,
};

/// Executes an ordered sequence of stages over one attribute of a document base.
///
/// Stages run in registration order; matching across attributes is sequential too (see crate
/// docs), because confirmed matches on one attribute can introduce custom nuggets available to
/// subsequent attributes.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    threshold_config: ThresholdConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(stages: Vec<Box<dyn Stage>>, threshold_config: ThresholdConfig) -> Self {
        Self {
            stages,
            threshold_config,
        }
    }

    /// The names of the configured stages, in run order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs every stage for `attribute_index` against `base`, in order.
    ///
    /// Before each stage runs, every signal it requires is verified present on the relevant
    /// entities; a missing signal aborts the pipeline without mutating `base` any further.
    ///
    /// # Errors
    /// Fails with [`Error::MissingSignal`] on an unmet precondition, or propagates whatever the
    /// failing stage returned.
    #[instrument(skip_all)]
    pub fn run(
        &self,
        base: &mut DocumentBase,
        attribute_index: usize,
        embedder: &dyn Embedder,
        interaction: &mut dyn InteractionCallback,
        status: &dyn StatusCallback,
    ) -> Result<Statistics, Error> {
        let mut statistics = Statistics::new();
        let total = self.stages.len().max(1);
        for (index, stage) in self.stages.iter().enumerate() {
            check_preconditions(base, attribute_index, stage.as_ref())?;
            #[allow(clippy::cast_precision_loss)] // progress fraction, stage counts are tiny
            let progress = index as f32 / total as f32;
            status.emit(stage.name(), progress, "starting");
            statistics.enter(stage.name());
            stage.run(
                base,
                attribute_index,
                embedder,
                interaction,
                status,
                &mut statistics,
                &self.threshold_config,
            )?;
            statistics.leave();
        }
        Ok(statistics)
    }
}

fn check_preconditions(
    base: &DocumentBase,
    attribute_index: usize,
    stage: &dyn Stage,
) -> Result<(), Error> {
    for requirement in stage.required_signals() {
        match requirement.entity {
            EntityKind::Attribute => {
                let attribute = &base.attributes()[attribute_index];
                if !attribute.signals().contains(requirement.signal_id) {
                    return Err(missing_signal(
                        requirement,
                        attribute.name().to_owned(),
                        stage.name(),
                    ));
                }
            }
            EntityKind::Document => {
                for document in base.documents() {
                    if !document.signals().contains(requirement.signal_id) {
                        return Err(missing_signal(
                            requirement,
                            document.name().to_owned(),
                            stage.name(),
                        ));
                    }
                }
            }
            EntityKind::Nugget => {
                for document in base.documents() {
                    for nugget in document.nuggets() {
                        if !nugget.signals().contains(requirement.signal_id) {
                            return Err(missing_signal(
                                requirement,
                                format!("{:?}", nugget.id()),
                                stage.name(),
                            ));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn missing_signal(
    requirement: &SignalRequirement,
    entity_name: String,
    stage: &'static str,
) -> Error {
    Error::MissingSignal {
        entity: requirement.entity,
        entity_name,
        signal_id: requirement.signal_id,
        stage,
    }
}
