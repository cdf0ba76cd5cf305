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

use crate::{
    base::DocumentBase,
    distance::{compute_and_cache, Embedder},
    document::DocumentIndex,
    error::Error,
    utils::nan_safe_f32_cmp_asc,
};

/// Picks at most one nugget per `(attribute, document)`: the nugget minimizing the effective
/// distance, provided that minimum does not exceed `threshold`.
///
/// Writes the outcome as `currently-highest-ranked` on the attribute. A document without
/// nuggets, or one whose confirmed matches already settle it, yields an empty cell.
///
/// # Errors
/// Fails if any nugget is missing its text embedding, see [`compute_and_cache`].
///
/// # Panics
/// Panics if `document` stops indexing an existing document between the initial existence
/// check and its later uses in this function, which cannot happen under single-threaded use.
pub fn decide_cell(
    base: &mut DocumentBase,
    attribute_index: usize,
    embedder: &impl Embedder,
    document: DocumentIndex,
    threshold: f32,
) -> Result<(), Error> {
    if base.attributes()[attribute_index].is_settled(document) {
        base.attributes_mut()[attribute_index].set_currently_highest_ranked(document, None);
        return Ok(());
    }

    let nugget_count = base
        .document(document)
        .ok_or(Error::ConsistencyViolation {
            invariant: "cell decision must reference an existing document",
        })?
        .nuggets()
        .len();

    let mut candidates = Vec::with_capacity(nugget_count);
    for position in 0..nugget_count {
        let nugget_id = base.document(document).expect("checked above").nuggets()[position].id();
        if base.attributes()[attribute_index].is_confirmed_negative(document, nugget_id) {
            continue;
        }
        let distance = compute_and_cache(base, attribute_index, embedder, document, position)?;
        candidates.push((position, distance));
    }

    candidates.sort_by(|(a_pos, a_d), (b_pos, b_d)| {
        let document_ref = base.document(document).expect("checked above");
        nan_safe_f32_cmp_asc(*a_d, *b_d).then_with(|| {
            document_ref.nuggets()[*a_pos]
                .start()
                .cmp(&document_ref.nuggets()[*b_pos].start())
        })
    });

    let proposal = candidates
        .first()
        .filter(|(_, distance)| *distance <= threshold)
        .map(|(position, _)| {
            base.document(document).expect("checked above").nuggets()[*position].id()
        });

    base.attributes_mut()[attribute_index].set_currently_highest_ranked(document, proposal);
    Ok(())
}

#[cfg(test)]
mod tests {
    use wannadb_embedding::NormalizedEmbedding;

    use super::*;
    use crate::{
        attribute::Attribute,
        document::{Document, Nugget},
        signal::{ids, SignalValue},
    };

    struct StubEmbedder;

    impl Embedder for StubEmbedder {
        fn embed(&self, _text: &str) -> Result<NormalizedEmbedding, Error> {
            Ok([1., 0., 0.].try_into().unwrap())
        }
    }

    fn embed(v: [f32; 3]) -> SignalValue {
        SignalValue::Vector(v.try_into().unwrap())
    }

    fn base_with_document() -> DocumentBase {
        let mut base = DocumentBase::new();
        base.add_attribute(Attribute::new("ceo")).unwrap();
        let mut document = Document::new("doc", "Alice Bob Tim Cook");
        let mut alice = Nugget::new(0, 0, 5, document.text().len()).unwrap();
        alice
            .signals_mut()
            .set(ids::TEXT_EMBEDDING, embed([0., 1., 0.]));
        let mut tim = Nugget::new(0, 10, 18, document.text().len()).unwrap();
        tim.signals_mut()
            .set(ids::TEXT_EMBEDDING, embed([1., 0., 0.]));
        document.push_nugget(alice).unwrap();
        document.push_nugget(tim).unwrap();
        base.add_document(document).unwrap();
        base
    }

    #[test]
    fn test_decide_cell_picks_closest_within_threshold() {
        let mut base = base_with_document();
        decide_cell(&mut base, 0, &StubEmbedder, 0, 0.35).unwrap();
        let proposal = base.attributes()[0].currently_highest_ranked(0).unwrap();
        assert_eq!(proposal, Some(base.documents()[0].nuggets()[1].id()));
    }

    #[test]
    fn test_decide_cell_empty_above_threshold() {
        let mut base = base_with_document();
        decide_cell(&mut base, 0, &StubEmbedder, 0, -0.1).unwrap();
        let proposal = base.attributes()[0].currently_highest_ranked(0).unwrap();
        assert_eq!(proposal, None);
    }

    #[test]
    fn test_decide_cell_empty_document() {
        let mut base = DocumentBase::new();
        base.add_attribute(Attribute::new("ceo")).unwrap();
        base.add_document(Document::new("doc", "no nuggets here"))
            .unwrap();
        decide_cell(&mut base, 0, &StubEmbedder, 0, 0.35).unwrap();
        assert_eq!(
            base.attributes()[0].currently_highest_ranked(0).unwrap(),
            None
        );
    }

    #[test]
    fn test_decide_cell_skips_settled_document() {
        let mut base = base_with_document();
        base.attributes_mut()[0].set_no_match(0);
        decide_cell(&mut base, 0, &StubEmbedder, 0, 0.35).unwrap();
        assert_eq!(
            base.attributes()[0].currently_highest_ranked(0).unwrap(),
            None
        );
    }
}
