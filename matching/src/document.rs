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

use serde::{Deserialize, Serialize};

use crate::{error::Error, id::NuggetId, signal::Signals};

/// A document's position in its owning [`crate::base::DocumentBase`].
///
/// A [`Nugget`] refers back to its document by this index rather than by an owning pointer, so
/// that nuggets can be named (e.g. in `currently-highest-ranked`) without borrowing the base.
pub type DocumentIndex = usize;

/// A candidate text span within a document, treated as a candidate cell value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nugget {
    id: NuggetId,
    document: DocumentIndex,
    start: usize,
    end: usize,
    signals: Signals,
}

impl Nugget {
    /// Creates a nugget spanning `[start, end)` of `document`.
    ///
    /// # Errors
    /// Fails if the span is empty or reaches outside of the document's text.
    pub fn new(
        document: DocumentIndex,
        start: usize,
        end: usize,
        document_text_len: usize,
    ) -> Result<Self, Error> {
        if start < end && end <= document_text_len {
            Ok(Self {
                id: NuggetId::new(),
                document,
                start,
                end,
                signals: Signals::new(),
            })
        } else {
            Err(Error::ConsistencyViolation {
                invariant: "nugget span must satisfy 0 <= start < end <= document text length",
            })
        }
    }

    pub fn id(&self) -> NuggetId {
        self.id
    }

    pub fn document(&self) -> DocumentIndex {
        self.document
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// The surface text of this nugget, sliced from `document_text`.
    ///
    /// # Panics
    /// Panics if `document_text` is not the text of this nugget's owning document.
    #[must_use]
    pub fn surface_text<'a>(&self, document_text: &'a str) -> &'a str {
        &document_text[self.start..self.end]
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut Signals {
        &mut self.signals
    }

    /// Two nuggets are duplicates if they name the same `(document, start, end)`.
    #[must_use]
    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        self.document == other.document && self.start == other.start && self.end == other.end
    }
}

/// An immutable text document owning an ordered sequence of candidate nuggets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    name: String,
    text: String,
    nuggets: Vec<Nugget>,
    signals: Signals,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            nuggets: Vec::new(),
            signals: Signals::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn nuggets(&self) -> &[Nugget] {
        &self.nuggets
    }

    pub fn nuggets_mut(&mut self) -> &mut [Nugget] {
        &mut self.nuggets
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut Signals {
        &mut self.signals
    }

    /// Appends a nugget, skipping it if it duplicates one already owned by this document.
    ///
    /// # Errors
    /// Fails if the nugget's span reaches outside of this document's text.
    pub fn push_nugget(&mut self, nugget: Nugget) -> Result<(), Error> {
        if nugget.end > self.text.len() {
            return Err(Error::ConsistencyViolation {
                invariant: "nugget span must satisfy 0 <= start < end <= document text length",
            });
        }
        if !self
            .nuggets
            .iter()
            .any(|existing| existing.is_duplicate_of(&nugget))
        {
            self.nuggets.push(nugget);
        }
        Ok(())
    }

    /// Synthesizes and inserts a nugget for a user-picked custom span.
    ///
    /// # Errors
    /// Fails if the span is invalid, see [`Nugget::new`].
    pub fn add_custom_span(
        &mut self,
        index: DocumentIndex,
        start: usize,
        end: usize,
    ) -> Result<NuggetId, Error> {
        let nugget = Nugget::new(index, start, end, self.text.len())?;
        let id = nugget.id();
        self.push_nugget(nugget)?;
        Ok(id)
    }
}
