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

use tracing::instrument;

use crate::{
    base::DocumentBase,
    cell::decide_cell,
    distance::{compute_and_cache, Embedder},
    document::DocumentIndex,
    error::Error,
    id::NuggetId,
    signal::{ids, SignalValue},
    threshold::{adapt, ThresholdConfig},
    utils::nan_safe_f32_cmp_asc,
};

/// How many of the next-best candidates accompany a [`Request::ConfirmProposal`] as a shortlist,
/// for the user to pick from instead of confirming or rejecting the top proposal outright.
const SHORTLIST_SIZE: usize = 2;

/// The feedback round's state, named after the phases in the crate's design notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Ranked,
    Asking,
    Updated,
    Done,
}

/// One interaction request emitted by the driver while `Phase::Asking`.
#[derive(Debug, Clone)]
pub enum Request {
    ConfirmProposal {
        document: DocumentIndex,
        nugget: NuggetId,
        current_distance: f32,
    },
    /// Several within-threshold nuggets of `document` are close enough in effective distance
    /// that the best one alone is not a confident pick; `candidates` is ordered best-first and
    /// `Answer::Confirm`/`Answer::Reject` act on its first element, same as [`Self::ConfirmProposal`].
    ChooseFromShortlist {
        document: DocumentIndex,
        candidates: Vec<NuggetId>,
    },
    /// `document` has no nugget within threshold; invites a user-picked custom span instead.
    PickSpan { document: DocumentIndex },
}

/// The user's response to a [`Request`].
#[derive(Debug, Clone, Copy)]
pub enum Answer {
    Confirm,
    Reject,
    CustomSpan { start: usize, end: usize },
    NoMatch,
    Stop,
}

/// Drives one attribute's interactive matching: ranks documents, asks the user about the best
/// unconfirmed proposal, integrates the answer, and adapts the threshold, round after round.
pub struct FeedbackDriver {
    attribute_index: usize,
    threshold_config: ThresholdConfig,
    threshold: f32,
    phase: Phase,
    /// The pending request's document and, if it named a specific nugget, that nugget.
    /// `PickSpan` leaves this `None`, since it proposes no nugget for `Answer::Confirm`/
    /// `Answer::Reject` to act on.
    asking: Option<(DocumentIndex, Option<NuggetId>)>,
}

impl FeedbackDriver {
    #[must_use]
    pub fn new(attribute_index: usize, threshold_config: ThresholdConfig) -> Self {
        let threshold = threshold_config.default_threshold();
        Self {
            attribute_index,
            threshold_config,
            threshold,
            phase: Phase::Init,
            asking: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Recomputes every unsettled document's proposal under the current threshold.
    ///
    /// Transitions `Init`/`Updated` -> `Ranked`.
    ///
    /// # Errors
    /// Fails if a nugget is missing its text embedding, see [`decide_cell`].
    #[instrument(skip_all)]
    pub fn rank(&mut self, base: &mut DocumentBase, embedder: &impl Embedder) -> Result<(), Error> {
        let unsettled: Vec<DocumentIndex> = (0..base.documents().len())
            .filter(|&document| !base.attributes()[self.attribute_index].is_settled(document))
            .collect();
        for document in unsettled {
            decide_cell(
                base,
                self.attribute_index,
                embedder,
                document,
                self.threshold,
            )?;
        }
        self.phase = Phase::Ranked;
        Ok(())
    }

    /// Selects the best unconfirmed proposal and emits an interaction request for it.
    ///
    /// Documents with a qualifying nugget are preferred, lowest effective distance first; among
    /// those, a document whose within-threshold nuggets are close enough to be a genuine choice
    /// gets a [`Request::ChooseFromShortlist`] instead of a plain [`Request::ConfirmProposal`].
    /// Only once no document has any qualifying nugget does a document ranked empty get a
    /// [`Request::PickSpan`], inviting a user-picked custom span.
    ///
    /// Transitions `Ranked` -> `Asking`, or -> `Done` if no unconfirmed document has anything to
    /// ask about.
    ///
    /// # Panics
    /// Panics if a `currently-highest-ranked` nugget id does not resolve to a nugget in `base`.
    pub fn propose(&mut self, base: &DocumentBase) -> Option<Request> {
        debug_assert_eq!(self.phase, Phase::Ranked);

        let attribute = &base.attributes()[self.attribute_index];
        let mut candidates: Vec<(DocumentIndex, NuggetId, f32)> = Vec::new();
        let mut empty_documents: Vec<DocumentIndex> = Vec::new();
        for document in 0..base.documents().len() {
            if attribute.is_settled(document) {
                continue;
            }
            match attribute.currently_highest_ranked(document) {
                Some(Some(nugget_id)) => {
                    let (_, nugget) = base.find_nugget(nugget_id).expect("proposal must exist");
                    if let Some(SignalValue::Float(distance)) =
                        nugget.signals().get(ids::CACHED_DISTANCE)
                    {
                        candidates.push((document, nugget_id, *distance));
                    }
                }
                Some(None) => empty_documents.push(document),
                None => {}
            }
        }

        candidates.sort_by(|(_, _, a), (_, _, b)| nan_safe_f32_cmp_asc(*a, *b));

        if let Some(&(document, nugget, distance)) = candidates.first() {
            self.phase = Phase::Asking;
            let shortlist =
                shortlist_candidates(base, self.attribute_index, document, self.threshold);
            if shortlist.len() >= 2 {
                self.asking = Some((document, Some(shortlist[0])));
                Some(Request::ChooseFromShortlist {
                    document,
                    candidates: shortlist,
                })
            } else {
                self.asking = Some((document, Some(nugget)));
                Some(Request::ConfirmProposal {
                    document,
                    nugget,
                    current_distance: distance,
                })
            }
        } else if let Some(&document) = empty_documents.first() {
            self.asking = Some((document, None));
            self.phase = Phase::Asking;
            Some(Request::PickSpan { document })
        } else {
            self.phase = Phase::Done;
            None
        }
    }

    /// Integrates the user's answer to the pending request and recomputes the threshold.
    ///
    /// Transitions `Asking` -> `Updated`, except for [`Answer::Stop`] which transitions to
    /// `Done` directly. A cancellation arriving while no request is pending is a no-op.
    ///
    /// # Errors
    /// Fails if embedding a custom span fails, or if re-ranking fails, see [`decide_cell`].
    ///
    /// # Panics
    /// Panics if a custom span answer's nugget cannot be found immediately after insertion.
    #[instrument(skip_all)]
    pub fn answer(
        &mut self,
        base: &mut DocumentBase,
        embedder: &impl Embedder,
        answer: Answer,
    ) -> Result<(), Error> {
        let Some((document, nugget)) = self.asking.take() else {
            return Ok(());
        };

        match answer {
            Answer::Confirm => {
                if let Some(nugget) = nugget {
                    base.attributes_mut()[self.attribute_index].confirm(document, nugget);
                    self.refresh_confirmed_distance(base, embedder, document, nugget)?;
                }
            }
            Answer::Reject => {
                if let Some(nugget) = nugget {
                    base.attributes_mut()[self.attribute_index].reject(document, nugget);
                    decide_cell(
                        base,
                        self.attribute_index,
                        embedder,
                        document,
                        self.threshold,
                    )?;
                }
            }
            Answer::CustomSpan { start, end } => {
                let custom = base
                    .document_mut(document)
                    .ok_or(Error::ConsistencyViolation {
                        invariant: "custom span must reference an existing document",
                    })?
                    .add_custom_span(document, start, end)?;
                let text = base
                    .document(document)
                    .expect("checked above")
                    .nuggets()
                    .iter()
                    .find(|n| n.id() == custom)
                    .expect("just inserted")
                    .surface_text(base.document(document).expect("checked above").text())
                    .to_owned();
                let embedding = embedder.embed(&text)?;
                base.document_mut(document)
                    .expect("checked above")
                    .nuggets_mut()
                    .iter_mut()
                    .find(|n| n.id() == custom)
                    .expect("just inserted")
                    .signals_mut()
                    .set(ids::TEXT_EMBEDDING, SignalValue::Vector(embedding));
                base.attributes_mut()[self.attribute_index].confirm(document, custom);
                self.refresh_confirmed_distance(base, embedder, document, custom)?;
            }
            Answer::NoMatch => {
                base.attributes_mut()[self.attribute_index].set_no_match(document);
            }
            Answer::Stop => {
                self.phase = Phase::Done;
                return Ok(());
            }
        }

        self.recompute_threshold(base);
        self.phase = Phase::Updated;
        Ok(())
    }

    /// Recomputes `nugget`'s cached effective distance against the now-enlarged confirmed-positive
    /// set, right after it was itself added to that set: its distance to itself is 0, so leaving
    /// the pre-confirm `cached-distance` in place would feed a stale `d_P` into [`Self::recompute_threshold`].
    fn refresh_confirmed_distance(
        &self,
        base: &mut DocumentBase,
        embedder: &impl Embedder,
        document: DocumentIndex,
        nugget: NuggetId,
    ) -> Result<(), Error> {
        let position = base
            .document(document)
            .and_then(|doc| doc.nuggets().iter().position(|n| n.id() == nugget))
            .ok_or(Error::ConsistencyViolation {
                invariant: "a just-confirmed nugget must exist in its document",
            })?;
        compute_and_cache(base, self.attribute_index, embedder, document, position)?;
        Ok(())
    }

    /// Recomputes the threshold from every confirmed positive's and negative's effective
    /// distance against the attribute's current label embedding.
    fn recompute_threshold(&mut self, base: &DocumentBase) {
        let attribute = &base.attributes()[self.attribute_index];
        let positives = attribute
            .confirmed_positives()
            .iter()
            .filter_map(|&id| base.find_nugget(id))
            .filter_map(
                |(_, nugget)| match nugget.signals().get(ids::CACHED_DISTANCE) {
                    Some(SignalValue::Float(distance)) => Some(*distance),
                    _ => None,
                },
            )
            .collect::<Vec<_>>();
        let negatives = attribute
            .confirmed_negatives()
            .filter_map(|(_, id)| base.find_nugget(id))
            .filter_map(
                |(_, nugget)| match nugget.signals().get(ids::CACHED_DISTANCE) {
                    Some(SignalValue::Float(distance)) => Some(*distance),
                    _ => None,
                },
            )
            .collect::<Vec<_>>();
        self.threshold = adapt(&positives, &negatives, &self.threshold_config);
    }
}

/// The within-threshold, non-rejected nuggets of `document`, best-first, capped at
/// [`SHORTLIST_SIZE`].
fn shortlist_candidates(
    base: &DocumentBase,
    attribute_index: usize,
    document: DocumentIndex,
    threshold: f32,
) -> Vec<NuggetId> {
    let attribute = &base.attributes()[attribute_index];
    let Some(doc) = base.document(document) else {
        return Vec::new();
    };
    let mut candidates: Vec<(NuggetId, f32)> = doc
        .nuggets()
        .iter()
        .filter(|nugget| !attribute.is_confirmed_negative(document, nugget.id()))
        .filter_map(|nugget| match nugget.signals().get(ids::CACHED_DISTANCE) {
            Some(SignalValue::Float(distance)) if *distance <= threshold => {
                Some((nugget.id(), *distance))
            }
            _ => None,
        })
        .collect();
    candidates.sort_by(|(_, a), (_, b)| nan_safe_f32_cmp_asc(*a, *b));
    candidates
        .into_iter()
        .take(SHORTLIST_SIZE)
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use wannadb_embedding::NormalizedEmbedding;
    use wannadb_test_utils::assert_approx_eq;

    use super::*;
    use crate::{
        attribute::{Attribute, ConfirmedMatch},
        document::{Document, Nugget},
    };

    struct StubEmbedder;

    impl Embedder for StubEmbedder {
        fn embed(&self, text: &str) -> Result<NormalizedEmbedding, Error> {
            Ok(match text {
                "ceo" => [1., 0., 0.],
                "Tim Cook" => [0.966_236, 0.257_663, 0.],
                _ => [0., 1., 0.],
            }
            .try_into()
            .unwrap())
        }
    }

    fn scenario_base() -> DocumentBase {
        let mut base = DocumentBase::new();
        base.add_attribute(Attribute::new("ceo")).unwrap();

        // cos_d("ceo" = [1, 0, 0], ·) stub distances: Alice=0.9, Bob=0.85, Tim Cook=0.2
        let nuggets = [
            (
                "doc0",
                "Alice is here",
                0usize,
                5usize,
                [0.1, 0.994_987, 0.],
            ),
            ("doc1", "Bob too", 0, 3, [0.15, 0.988_686, 0.]),
            ("doc2", "Tim Cook leads", 0, 8, [0.8, 0., 0.6]),
        ];
        for (name, text, start, end, embedding) in nuggets {
            let mut document = Document::new(name, text);
            let mut nugget = Nugget::new(0, start, end, document.text().len()).unwrap();
            nugget.signals_mut().set(
                ids::TEXT_EMBEDDING,
                SignalValue::Vector(embedding.try_into().unwrap()),
            );
            document.push_nugget(nugget).unwrap();
            base.add_document(document).unwrap();
        }
        base
    }

    #[test]
    fn test_cold_label_match_only_tim_cook_enters() {
        let mut base = scenario_base();
        let mut driver = FeedbackDriver::new(0, ThresholdConfig::default());
        driver.rank(&mut base, &StubEmbedder).unwrap();

        let attribute = &base.attributes()[0];
        assert_eq!(attribute.currently_highest_ranked(0).unwrap(), None);
        assert_eq!(attribute.currently_highest_ranked(1).unwrap(), None);
        assert!(attribute.currently_highest_ranked(2).unwrap().is_some());
    }

    #[test]
    fn test_single_confirm_tightens_and_settles() {
        let mut base = scenario_base();
        let mut driver = FeedbackDriver::new(0, ThresholdConfig::default());
        driver.rank(&mut base, &StubEmbedder).unwrap();
        let request = driver.propose(&base).unwrap();
        let Request::ConfirmProposal { document, .. } = request else {
            panic!("expected a confirm proposal")
        };
        assert_eq!(document, 2);

        driver
            .answer(&mut base, &StubEmbedder, Answer::Confirm)
            .unwrap();
        assert_eq!(
            base.attributes()[0].confirmed_match(2),
            Some(ConfirmedMatch::Nugget(
                base.documents()[2].nuggets()[0].id()
            ))
        );
        assert_approx_eq!(f32, driver.threshold(), 0.35);

        driver.rank(&mut base, &StubEmbedder).unwrap();
        assert_eq!(
            base.attributes()[0].currently_highest_ranked(0).unwrap(),
            None
        );
        assert_eq!(
            base.attributes()[0].currently_highest_ranked(1).unwrap(),
            None
        );
    }

    #[test]
    fn test_reject_removes_document_from_future_proposals() {
        let mut base = scenario_base();
        let mut driver = FeedbackDriver::new(0, ThresholdConfig::default());
        driver.rank(&mut base, &StubEmbedder).unwrap();
        let bob_nugget = base.documents()[1].nuggets()[0].id();

        driver.asking = Some((1, Some(bob_nugget)));
        driver.phase = Phase::Asking;
        driver
            .answer(&mut base, &StubEmbedder, Answer::Reject)
            .unwrap();

        assert!(base.attributes()[0].is_confirmed_negative(1, bob_nugget));
        assert_eq!(
            base.attributes()[0].currently_highest_ranked(1).unwrap(),
            None
        );
    }

    #[test]
    fn test_stop_transitions_to_done() {
        let mut base = scenario_base();
        let mut driver = FeedbackDriver::new(0, ThresholdConfig::default());
        driver.rank(&mut base, &StubEmbedder).unwrap();
        driver.propose(&base);
        driver
            .answer(&mut base, &StubEmbedder, Answer::Stop)
            .unwrap();
        assert_eq!(driver.phase(), Phase::Done);
    }

    #[test]
    fn test_done_when_no_unconfirmed_candidate_remains() {
        let mut base = scenario_base();
        let mut driver = FeedbackDriver::new(0, ThresholdConfig::default());
        for document in 0..3 {
            base.attributes_mut()[0].set_no_match(document);
        }
        driver.rank(&mut base, &StubEmbedder).unwrap();
        assert!(driver.propose(&base).is_none());
        assert_eq!(driver.phase(), Phase::Done);
    }

    #[test]
    fn test_confirm_refreshes_stale_distance_before_recomputing_threshold() {
        let mut base = scenario_base();
        let mut driver = FeedbackDriver::new(0, ThresholdConfig::default());
        driver.rank(&mut base, &StubEmbedder).unwrap();

        let bob_nugget = base.documents()[1].nuggets()[0].id();
        let bob_distance = match base
            .find_nugget(bob_nugget)
            .unwrap()
            .1
            .signals()
            .get(ids::CACHED_DISTANCE)
        {
            Some(SignalValue::Float(distance)) => *distance,
            _ => panic!("expected bob's distance to be cached by the initial rank"),
        };

        driver.asking = Some((1, Some(bob_nugget)));
        driver.phase = Phase::Asking;
        driver
            .answer(&mut base, &StubEmbedder, Answer::Reject)
            .unwrap();

        driver.rank(&mut base, &StubEmbedder).unwrap();
        let request = driver.propose(&base).unwrap();
        let Request::ConfirmProposal { document, .. } = request else {
            panic!("expected a confirm proposal")
        };
        assert_eq!(document, 2);

        driver
            .answer(&mut base, &StubEmbedder, Answer::Confirm)
            .unwrap();

        let tim_cook_nugget = base.documents()[2].nuggets()[0].id();
        let refreshed_distance = match base
            .find_nugget(tim_cook_nugget)
            .unwrap()
            .1
            .signals()
            .get(ids::CACHED_DISTANCE)
        {
            Some(SignalValue::Float(distance)) => *distance,
            _ => panic!("expected a refreshed cached distance"),
        };
        // a confirmed positive's distance to itself is 0, not its stale pre-confirm value.
        assert_approx_eq!(f32, refreshed_distance, 0.0, epsilon = 1e-6);
        assert_approx_eq!(f32, driver.threshold(), bob_distance / 2.0);
    }

    #[test]
    fn test_propose_emits_shortlist_when_top_candidates_are_close() {
        let mut base = DocumentBase::new();
        base.add_attribute(Attribute::new("ceo")).unwrap();
        let mut document = Document::new("doc0", "Tim Cook and Satya Nadella");
        let mut tim = Nugget::new(0, 0, 8, document.text().len()).unwrap();
        tim.signals_mut().set(
            ids::TEXT_EMBEDDING,
            SignalValue::Vector([0.99, 0.141, 0.].try_into().unwrap()),
        );
        let mut satya = Nugget::new(0, 13, 26, document.text().len()).unwrap();
        satya.signals_mut().set(
            ids::TEXT_EMBEDDING,
            SignalValue::Vector([0.98, 0.199, 0.].try_into().unwrap()),
        );
        document.push_nugget(tim).unwrap();
        document.push_nugget(satya).unwrap();
        base.add_document(document).unwrap();

        let mut driver = FeedbackDriver::new(0, ThresholdConfig::default());
        driver.rank(&mut base, &StubEmbedder).unwrap();
        let request = driver.propose(&base).unwrap();
        let Request::ChooseFromShortlist {
            document,
            candidates,
        } = request
        else {
            panic!("expected a shortlist request")
        };
        assert_eq!(document, 0);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_propose_emits_pick_span_once_no_nugget_candidate_remains() {
        let mut base = DocumentBase::new();
        base.add_attribute(Attribute::new("ceo")).unwrap();
        let document = Document::new("doc0", "no mention of a ceo here");
        base.add_document(document).unwrap();

        let mut driver = FeedbackDriver::new(0, ThresholdConfig::default());
        driver.rank(&mut base, &StubEmbedder).unwrap();
        let request = driver.propose(&base).unwrap();
        let Request::PickSpan { document } = request else {
            panic!("expected a pick-span request")
        };
        assert_eq!(document, 0);
    }
}
