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

use std::path::Path;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use wannadb_matching::ThresholdConfig;

use crate::logging;

/// Top-level configuration for a pipeline run.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub threshold: ThresholdConfig,
    pub logging: logging::Config,
}

/// Loads a configuration, layering (lowest to highest priority) built-in defaults, an optional
/// `config.toml`, and programmatic overrides.
///
/// # Errors
/// Fails if the config file contains invalid TOML or the merged configuration does not
/// deserialize into `C`.
pub fn load_config<C, U>(config_file: Option<&Path>, update_with: U) -> Result<C, figment::Error>
where
    C: DeserializeOwned,
    U: Serialize,
{
    let mut figment = Figment::new().join(Serialized::defaults(update_with));

    let file = config_file.unwrap_or_else(|| Path::new("config.toml"));
    if file.exists() {
        figment = figment.join(Toml::file(file));
    }

    figment.extract()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_without_a_file() {
        let config: PipelineConfig = load_config(
            Some(Path::new("/nonexistent.toml")),
            PipelineConfig::default(),
        )
        .expect("defaults alone must deserialize");
        assert_eq!(config.threshold, ThresholdConfig::default());
    }
}
