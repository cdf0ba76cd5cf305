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

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use wannadb_embedding::COSINE_DISTANCE_RANGE;

use crate::utils::nan_safe_f32_cmp_asc;

/// Configuration of the threshold adaptor.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[must_use]
pub struct ThresholdConfig {
    #[serde(default = "default_threshold")]
    default: f32,
}

fn default_threshold() -> f32 {
    0.35
}

// the f32 field is never NaN by construction
impl Eq for ThresholdConfig {}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            default: default_threshold(),
        }
    }
}

/// Errors of the threshold adaptor configuration.
#[derive(Copy, Clone, Debug, Display, ThisError)]
pub enum Error {
    /// invalid default threshold, expected a value within the cosine distance range
    Default,
}

impl ThresholdConfig {
    /// The threshold used while confirmed positives or confirmed negatives are empty.
    pub fn default_threshold(&self) -> f32 {
        self.default
    }

    /// Sets the default threshold.
    ///
    /// # Errors
    /// Fails if the value is outside of [`COSINE_DISTANCE_RANGE`].
    pub fn with_default_threshold(mut self, default: f32) -> Result<Self, Error> {
        if COSINE_DISTANCE_RANGE.contains(&default) {
            self.default = default;
            Ok(self)
        } else {
            Err(Error::Default)
        }
    }
}

/// Recomputes the admissible distance threshold from the confirmed-positive and
/// confirmed-negative effective distances accumulated so far.
///
/// If either set is empty, the configured default applies. If the two sets are separable (every
/// positive distance is below every negative distance), picks the midpoint between
/// `max(positives)` and `min(negatives)`. Otherwise the sets overlap, and picks the value on the
/// sorted union of both distance sets that maximizes
/// `|{p in positives : p <= tau}| - |{n in negatives : n <= tau}|`, breaking ties toward the
/// smaller tau (this spec's fixed choice among several reasonable "max margin" formulas, see
/// design notes).
#[must_use]
pub fn adapt(positives: &[f32], negatives: &[f32], config: &ThresholdConfig) -> f32 {
    if positives.is_empty() || negatives.is_empty() {
        return config.default_threshold();
    }

    let max_positive = positives.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min_negative = negatives.iter().copied().fold(f32::INFINITY, f32::min);
    if max_positive < min_negative {
        return (max_positive + min_negative) / 2.0;
    }

    let mut candidates: Vec<f32> = positives.iter().chain(negatives).copied().collect();
    candidates.sort_by(|&a, &b| nan_safe_f32_cmp_asc(a, b));

    let mut best_tau = candidates[0];
    let mut best_score = i64::MIN;
    for &tau in &candidates {
        let positive_count =
            i64::try_from(positives.iter().filter(|&&p| p <= tau).count()).unwrap_or(i64::MAX);
        let negative_count =
            i64::try_from(negatives.iter().filter(|&&n| n <= tau).count()).unwrap_or(i64::MAX);
        let score = positive_count - negative_count;
        if score > best_score {
            best_score = score;
            best_tau = tau;
        }
    }
    best_tau
}

#[cfg(test)]
mod tests {
    use wannadb_test_utils::assert_approx_eq;

    use super::*;

    #[test]
    fn test_adapt_defaults_when_either_set_empty() {
        let config = ThresholdConfig::default();
        assert_approx_eq!(f32, adapt(&[], &[], &config), 0.35);
        assert_approx_eq!(f32, adapt(&[0.1], &[], &config), 0.35);
        assert_approx_eq!(f32, adapt(&[], &[0.9], &config), 0.35);
    }

    #[test]
    fn test_adapt_picks_midpoint_when_separable() {
        let config = ThresholdConfig::default();
        // max(d_P) = 0.3 < min(d_N) = 0.6: the sets are separable, so tau is their midpoint.
        let tau = adapt(&[0.1, 0.3], &[0.6, 0.8], &config);
        assert_approx_eq!(f32, tau, 0.45);
    }

    #[test]
    fn test_adapt_searches_sorted_union_when_overlapping() {
        let config = ThresholdConfig::default();
        // max(d_P) = 0.5 >= min(d_N) = 0.2: the sets overlap, so the max-margin search applies.
        let tau = adapt(&[0.1, 0.5], &[0.2, 0.8], &config);
        assert_approx_eq!(f32, tau, 0.1);
    }

    #[test]
    fn test_adapt_breaks_ties_towards_smaller_tau() {
        let config = ThresholdConfig::default();
        let tau = adapt(&[0.5], &[0.5], &config);
        assert_approx_eq!(f32, tau, 0.5);
    }

    #[test]
    fn test_with_default_threshold_rejects_out_of_range() {
        assert!(ThresholdConfig::default()
            .with_default_threshold(3.0)
            .is_err());
        assert!(ThresholdConfig::default()
            .with_default_threshold(0.5)
            .is_ok());
    }
}
