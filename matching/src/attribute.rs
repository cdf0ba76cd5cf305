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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{document::DocumentIndex, id::NuggetId, signal::Signals};

/// The user-confirmed value of one `(attribute, document)` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmedMatch {
    /// The user confirmed (or custom-spanned) this nugget as the cell value.
    Nugget(NuggetId),
    /// The user explicitly declared that this document has no match for the attribute.
    NoMatch,
}

/// A target column. Represents one table attribute plus everything learned about it from
/// user feedback during matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    signals: Signals,
    /// Nuggets the user confirmed as positive examples for this attribute, across all documents.
    confirmed_positives: Vec<NuggetId>,
    /// Nuggets the user rejected, keyed by the document they were rejected in: a rejection
    /// forbids the nugget only within its own document (see design notes).
    confirmed_negatives: BTreeMap<DocumentIndex, Vec<NuggetId>>,
    /// The per-document confirmed cell value, once the user has answered for that document.
    confirmed_matches: BTreeMap<DocumentIndex, ConfirmedMatch>,
    /// The per-document current best proposal, `None` if no nugget is within threshold.
    currently_highest_ranked: BTreeMap<DocumentIndex, Option<NuggetId>>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signals: Signals::new(),
            confirmed_positives: Vec::new(),
            confirmed_negatives: BTreeMap::new(),
            confirmed_matches: BTreeMap::new(),
            currently_highest_ranked: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut Signals {
        &mut self.signals
    }

    pub fn confirmed_positives(&self) -> &[NuggetId] {
        &self.confirmed_positives
    }

    #[must_use]
    pub fn is_confirmed_negative(&self, document: DocumentIndex, nugget: NuggetId) -> bool {
        self.confirmed_negatives
            .get(&document)
            .is_some_and(|rejected| rejected.contains(&nugget))
    }

    /// Every rejected nugget across all documents, paired with the document it was rejected in.
    pub fn confirmed_negatives(&self) -> impl Iterator<Item = (DocumentIndex, NuggetId)> + '_ {
        self.confirmed_negatives
            .iter()
            .flat_map(|(&document, nuggets)| nuggets.iter().map(move |&nugget| (document, nugget)))
    }

    #[must_use]
    pub fn confirmed_match(&self, document: DocumentIndex) -> Option<ConfirmedMatch> {
        self.confirmed_matches.get(&document).copied()
    }

    #[must_use]
    pub fn currently_highest_ranked(&self, document: DocumentIndex) -> Option<Option<NuggetId>> {
        self.currently_highest_ranked.get(&document).copied()
    }

    pub fn set_currently_highest_ranked(
        &mut self,
        document: DocumentIndex,
        nugget: Option<NuggetId>,
    ) {
        self.currently_highest_ranked.insert(document, nugget);
    }

    /// Drops `currently-highest-ranked`, the one attribute-level signal that must not survive
    /// serialization (see [`crate::signal::Transience`]).
    pub fn clear_transient(&mut self) {
        self.currently_highest_ranked.clear();
        self.signals.retain_persistent();
    }

    /// Confirms `nugget` as the cell value for `document` and records it as a positive example.
    pub fn confirm(&mut self, document: DocumentIndex, nugget: NuggetId) {
        self.confirmed_positives.push(nugget);
        self.confirmed_matches
            .insert(document, ConfirmedMatch::Nugget(nugget));
    }

    /// Rejects `nugget` as a candidate within `document`; it is never proposed again there.
    pub fn reject(&mut self, document: DocumentIndex, nugget: NuggetId) {
        self.confirmed_negatives
            .entry(document)
            .or_default()
            .push(nugget);
    }

    /// Records that `document` has no match for this attribute.
    pub fn set_no_match(&mut self, document: DocumentIndex) {
        self.confirmed_matches
            .insert(document, ConfirmedMatch::NoMatch);
    }

    #[must_use]
    pub fn is_settled(&self, document: DocumentIndex) -> bool {
        self.confirmed_matches.contains_key(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_records_positive_and_match() {
        let mut attribute = Attribute::new("ceo");
        let nugget = NuggetId::mocked(0);
        attribute.confirm(2, nugget);
        assert_eq!(attribute.confirmed_positives(), &[nugget]);
        assert_eq!(
            attribute.confirmed_match(2),
            Some(ConfirmedMatch::Nugget(nugget))
        );
    }

    #[test]
    fn test_reject_scoped_to_document() {
        let mut attribute = Attribute::new("ceo");
        let nugget = NuggetId::mocked(1);
        attribute.reject(0, nugget);
        assert!(attribute.is_confirmed_negative(0, nugget));
        assert!(!attribute.is_confirmed_negative(1, nugget));
    }

    #[test]
    fn test_no_match_settles_document() {
        let mut attribute = Attribute::new("ceo");
        assert!(!attribute.is_settled(3));
        attribute.set_no_match(3);
        assert!(attribute.is_settled(3));
        assert_eq!(attribute.confirmed_match(3), Some(ConfirmedMatch::NoMatch));
    }
}
