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

use wannadb_matching::ThresholdConfig;

use crate::{
    driver::Pipeline,
    stage::{
        ComputeInitialDistances, EmbedAttribute, FinalizeCells, InteractiveFeedbackLoop, Stage,
    },
};

/// Builds a [`Pipeline`] from its stages.
#[must_use]
pub struct Builder {
    threshold_config: ThresholdConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl Default for Builder {
    /// Starts from the standard embed / rank / ask / finalize stage sequence.
    fn default() -> Self {
        Self {
            threshold_config: ThresholdConfig::default(),
            stages: vec![
                Box::new(EmbedAttribute),
                Box::new(ComputeInitialDistances),
                Box::new(InteractiveFeedbackLoop),
                Box::new(FinalizeCells),
            ],
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the [`ThresholdConfig`] to use.
    pub fn with_threshold_config(mut self, config: ThresholdConfig) -> Self {
        self.threshold_config = config;
        self
    }

    /// Replaces the stage sequence.
    pub fn with_stages(mut self, stages: Vec<Box<dyn Stage>>) -> Self {
        self.stages = stages;
        self
    }

    /// Returns the [`ThresholdConfig`] the built pipeline's stages will fall back to when no
    /// feedback has yet narrowed the threshold.
    pub fn threshold_config(&self) -> &ThresholdConfig {
        &self.threshold_config
    }

    /// Creates a [`Pipeline`].
    pub fn build(self) -> Pipeline {
        Pipeline::new(self.stages, self.threshold_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builder_has_the_standard_stage_sequence() {
        let pipeline = Builder::new().build();
        assert_eq!(
            pipeline.stage_names(),
            [
                "embed-attribute",
                "compute-initial-distances",
                "interactive-feedback-loop",
                "finalize-cells",
            ]
        );
    }
}
