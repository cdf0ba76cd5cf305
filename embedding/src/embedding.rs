// Copyright 2023 Xayn AG
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

use std::ops::{Add, Mul, RangeInclusive};

use derive_more::{Deref, From};
use displaydoc::Display;
use ndarray::Array1;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use wannadb_test_utils::ApproxEqIter;

/// A 1-dimensional sequence embedding.
///
/// The serde is identical to a `Vec<f32>`.
#[derive(Clone, Debug, Deref, From, Default)]
pub struct Embedding(Array1<f32>);

impl Add for Embedding {
    type Output = Embedding;

    fn add(mut self, rhs: Self) -> Self::Output {
        self.0 += &rhs.0;
        self
    }
}

impl<'a> ApproxEqIter<'a, f32> for Embedding {
    fn indexed_iter_logical_order(
        &'a self,
        index_prefix: Vec<usize>,
    ) -> Box<dyn 'a + Iterator<Item = (Vec<usize>, f32)>> {
        (**self).indexed_iter_logical_order(index_prefix)
    }
}

/// A normalized embedding.
#[derive(Clone, Debug, Deref, Deserialize, Serialize)]
#[serde(transparent)]
pub struct NormalizedEmbedding(Embedding);

#[derive(Clone, Debug, Display, Error, Serialize)]
/// Values don't represent a valid embedding.
pub struct InvalidEmbedding;

impl Embedding {
    pub fn normalize(mut self) -> Result<NormalizedEmbedding, InvalidEmbedding> {
        let norm = self.dot(&*self).sqrt();
        if !norm.is_finite() {
            return Err(InvalidEmbedding);
        }

        if norm > 0. {
            self.0 /= norm;
        } else {
            self.0 = Array1::zeros(self.len());
        }

        Ok(NormalizedEmbedding(self))
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vec: Vec<f32>) -> Self {
        Array1::from_vec(vec).into()
    }
}

impl<const N: usize> From<[f32; N]> for Embedding {
    fn from(array: [f32; N]) -> Self {
        Vec::from(array).into()
    }
}

impl Serialize for Embedding {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(&self.0)
    }
}

impl<'de> Deserialize<'de> for Embedding {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<f32>::deserialize(deserializer).map(Self::from)
    }
}

/// See [`cosine_distance`] for details.
pub const MAXIMUM_COSINE_SIMILARITY: f32 = 1.0;

/// See [`cosine_distance`] for details.
pub const MINIMUM_COSINE_SIMILARITY: f32 = -1.0;

/// See [`cosine_distance`] for details.
pub const COSINE_SIMILARITY_RANGE: RangeInclusive<f32> =
    MINIMUM_COSINE_SIMILARITY..=MAXIMUM_COSINE_SIMILARITY;

/// See [`cosine_distance`] for details.
pub const COSINE_DISTANCE_RANGE: RangeInclusive<f32> = 0.0..=2.0;

impl NormalizedEmbedding {
    /// The value is bounded in `[-1, 1]`.
    pub fn dot_product(&self, other: &Self) -> f32 {
        self.dot(&other.0 .0).clamp(-1., 1.)
    }

    /// The cosine distance `1 - cos_sim(self, other)`, clamped to `[0, 2]`.
    ///
    /// The zero vector is always "similar" to all other vectors, thus will yield a distance of 0.
    pub fn cosine_distance(&self, other: &Self) -> f32 {
        if self.is_zero() || other.is_zero() {
            return 0.;
        }
        (1. - self.dot_product(other)).clamp(0., 2.)
    }

    fn is_zero(&self) -> bool {
        self.dot(&self.0 .0) == 0.
    }
}

impl TryFrom<Vec<f32>> for NormalizedEmbedding {
    type Error = InvalidEmbedding;

    fn try_from(vec: Vec<f32>) -> Result<Self, Self::Error> {
        Embedding::from(vec).normalize()
    }
}

impl<const N: usize> TryFrom<[f32; N]> for NormalizedEmbedding {
    type Error = InvalidEmbedding;

    fn try_from(array: [f32; N]) -> Result<Self, Self::Error> {
        Embedding::from(array).normalize()
    }
}

impl Mul<f32> for &NormalizedEmbedding {
    type Output = Embedding;

    fn mul(self, rhs: f32) -> Self::Output {
        (&self.0 .0 * rhs).into()
    }
}

impl<'a> ApproxEqIter<'a, f32> for NormalizedEmbedding {
    fn indexed_iter_logical_order(
        &'a self,
        index_prefix: Vec<usize>,
    ) -> Box<dyn 'a + Iterator<Item = (Vec<usize>, f32)>> {
        (**self).indexed_iter_logical_order(index_prefix)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::SQRT_2;

    use wannadb_test_utils::assert_approx_eq;

    use super::*;

    #[test]
    fn test_normalize() {
        assert!(Embedding::from([f32::NAN]).normalize().is_err());
        assert!(Embedding::from([f32::INFINITY]).normalize().is_err());
        assert!(Embedding::from([f32::NEG_INFINITY]).normalize().is_err());

        let embedding = Embedding::from([0., 0., 0.]);
        assert_approx_eq!(f32, embedding.clone().normalize().unwrap(), embedding);

        let embedding = Embedding::from([0., 1., 2., 3., SQRT_2])
            .normalize()
            .unwrap();
        assert_approx_eq!(f32, embedding, [0., 0.25, 0.5, 0.75, SQRT_2.powi(-3)]);

        let embedding = Embedding::from([-1., 1., -1., 1.]).normalize().unwrap();
        assert_approx_eq!(f32, embedding, [-0.5, 0.5, -0.5, 0.5]);
    }

    #[test]
    fn test_cosine_distance_identical() {
        let embedding: NormalizedEmbedding = [1., 2., 3.].try_into().unwrap();
        assert_approx_eq!(
            f32,
            embedding.cosine_distance(&embedding),
            0.,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        let a: NormalizedEmbedding = [1., 2., 3.].try_into().unwrap();
        let b = Embedding::from([0., 0., 0.]).normalize().unwrap();
        assert_approx_eq!(f32, a.cosine_distance(&b), 0., epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_distance_orthogonal() {
        let a: NormalizedEmbedding = [1., 0.].try_into().unwrap();
        let b: NormalizedEmbedding = [0., 1.].try_into().unwrap();
        assert_approx_eq!(f32, a.cosine_distance(&b), 1.);
    }

    #[test]
    fn test_cosine_distance_opposite() {
        let a: NormalizedEmbedding = [1., 0.].try_into().unwrap();
        let b: NormalizedEmbedding = [-1., 0.].try_into().unwrap();
        assert_approx_eq!(f32, a.cosine_distance(&b), 2.);
    }
}
