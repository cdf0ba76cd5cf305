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

use wannadb_embedding::NormalizedEmbedding;

use crate::{
    attribute::Attribute,
    base::DocumentBase,
    document::{DocumentIndex, Nugget},
    error::Error,
    signal::{ids, SignalValue},
};

/// An on-demand embedder for text that has no cached embedding yet: an attribute's label on
/// first use, or a freshly synthesized custom-span nugget.
///
/// Stands in for the external embedding provider (see crate docs).
pub trait Embedder {
    /// # Errors
    /// Fails if the embedder itself fails; callers surface this as [`Error::EmbeddingFailure`].
    fn embed(&self, text: &str) -> Result<NormalizedEmbedding, Error>;
}

/// The effective distance between a nugget and an attribute, given the attribute's label
/// embedding and the text embeddings of its confirmed positives.
///
/// `cos_d(u, v) = 1 - cosine_similarity(u, v)`, clamped to `[0, 2]`.
#[must_use]
pub fn effective_distance(
    nugget_embedding: &NormalizedEmbedding,
    label_embedding: &NormalizedEmbedding,
    confirmed_positive_embeddings: &[NormalizedEmbedding],
) -> f32 {
    let d_label = nugget_embedding.cosine_distance(label_embedding);
    confirmed_positive_embeddings
        .iter()
        .map(|positive| nugget_embedding.cosine_distance(positive))
        .fold(None, |min, d| Some(min.map_or(d, |min: f32| min.min(d))))
        .map_or(d_label, |d_confirmed| d_label.min(d_confirmed))
}

/// Returns the attribute's label embedding, computing and memoizing it on first use.
///
/// The label text is the attribute's `label` signal, falling back to its name.
///
/// # Errors
/// Fails with [`Error::EmbeddingFailure`] if the embedder fails, or [`Error::MissingSignal`] if
/// the attribute's label is empty (see design notes: an empty label is a configuration error,
/// not silently skipped).
pub fn label_embedding(
    attribute: &mut Attribute,
    embedder: &impl Embedder,
) -> Result<NormalizedEmbedding, Error> {
    if let Some(SignalValue::Vector(embedding)) = attribute.signals().get(ids::TEXT_EMBEDDING) {
        return Ok(embedding.clone());
    }

    let label = match attribute.signals().get(ids::LABEL) {
        Some(SignalValue::String(label)) => label.clone(),
        _ => attribute.name().to_owned(),
    };
    if label.is_empty() {
        return Err(Error::MissingSignal {
            entity: format!("attribute `{}`", attribute.name()),
            signal_id: ids::LABEL,
            stage: "label embedding",
        });
    }

    let embedding = embedder.embed(&label)?;
    attribute
        .signals_mut()
        .set(ids::TEXT_EMBEDDING, SignalValue::Vector(embedding.clone()));
    Ok(embedding)
}

fn nugget_text_embedding(
    nugget: &Nugget,
    stage: &'static str,
) -> Result<NormalizedEmbedding, Error> {
    match nugget.signals().get(ids::TEXT_EMBEDDING) {
        Some(SignalValue::Vector(embedding)) => Ok(embedding.clone()),
        _ => Err(Error::MissingSignal {
            entity: format!("nugget {:?}", nugget.id()),
            signal_id: ids::TEXT_EMBEDDING,
            stage,
        }),
    }
}

/// Computes and caches the effective distance of one nugget against an attribute.
///
/// Reads the confirmed-positive set's text embeddings from the owning documents and the
/// attribute's memoized label embedding, writes the result as `cached-distance` on the nugget.
///
/// # Errors
/// Fails if any required text embedding is missing, see [`nugget_text_embedding`].
///
/// # Panics
/// Panics if `attribute_index` does not index an existing attribute in `base`.
pub fn compute_and_cache(
    base: &mut DocumentBase,
    attribute_index: usize,
    embedder: &impl Embedder,
    document: DocumentIndex,
    nugget_position: usize,
) -> Result<f32, Error> {
    let label_embedding = {
        let attribute = base
            .attribute_mut(attribute_index)
            .expect("attribute_index must be valid");
        label_embedding(attribute, embedder)?
    };

    let confirmed_positive_ids = base.attributes()[attribute_index]
        .confirmed_positives()
        .to_vec();
    let mut confirmed_positive_embeddings = Vec::with_capacity(confirmed_positive_ids.len());
    for id in confirmed_positive_ids {
        let (_, nugget) = base.find_nugget(id).ok_or(Error::ConsistencyViolation {
            invariant: "every confirmed positive must reference an existing nugget",
        })?;
        confirmed_positive_embeddings.push(nugget_text_embedding(nugget, "distance")?);
    }

    let document_ref = base.document(document).ok_or(Error::ConsistencyViolation {
        invariant: "distance computation must reference an existing document",
    })?;
    let nugget = &document_ref.nuggets()[nugget_position];
    let nugget_embedding = nugget_text_embedding(nugget, "distance")?;

    let distance = effective_distance(
        &nugget_embedding,
        &label_embedding,
        &confirmed_positive_embeddings,
    );

    base.document_mut(document)
        .expect("checked above")
        .nuggets_mut()[nugget_position]
        .signals_mut()
        .set(ids::CACHED_DISTANCE, SignalValue::Float(distance));

    Ok(distance)
}
