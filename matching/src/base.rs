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

use crate::{
    attribute::Attribute,
    document::{Document, DocumentIndex},
    error::Error,
};

/// The unit of storage: an ordered list of attributes and an ordered list of documents.
///
/// One matching engine acts on one base at a time (see crate docs).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentBase {
    attributes: Vec<Attribute>,
    documents: Vec<Document>,
}

impl DocumentBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut [Attribute] {
        &mut self.attributes
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut [Document] {
        &mut self.documents
    }

    pub fn document(&self, index: DocumentIndex) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn document_mut(&mut self, index: DocumentIndex) -> Option<&mut Document> {
        self.documents.get_mut(index)
    }

    #[must_use]
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|attribute| attribute.name() == name)
    }

    pub fn attribute_mut(&mut self, index: usize) -> Option<&mut Attribute> {
        self.attributes.get_mut(index)
    }

    /// Locates a nugget by id, together with the index of its owning document.
    #[must_use]
    pub fn find_nugget(
        &self,
        id: crate::id::NuggetId,
    ) -> Option<(DocumentIndex, &crate::document::Nugget)> {
        self.documents
            .iter()
            .enumerate()
            .find_map(|(index, document)| {
                document
                    .nuggets()
                    .iter()
                    .find(|nugget| nugget.id() == id)
                    .map(|nugget| (index, nugget))
            })
    }

    /// Registers a new attribute.
    ///
    /// # Errors
    /// Fails if an attribute with the same name already exists.
    pub fn add_attribute(&mut self, attribute: Attribute) -> Result<usize, Error> {
        if self.attribute_index(attribute.name()).is_some() {
            return Err(Error::ConsistencyViolation {
                invariant: "attribute names must be unique within a document base",
            });
        }
        self.attributes.push(attribute);
        Ok(self.attributes.len() - 1)
    }

    /// Registers a new document, returning its [`DocumentIndex`].
    ///
    /// # Errors
    /// Fails if a document with the same name already exists.
    pub fn add_document(&mut self, document: Document) -> Result<DocumentIndex, Error> {
        if self
            .documents
            .iter()
            .any(|existing| existing.name() == document.name())
        {
            return Err(Error::ConsistencyViolation {
                invariant: "document names must be unique within a document base",
            });
        }
        self.documents.push(document);
        Ok(self.documents.len() - 1)
    }

    /// Verifies every structural invariant: unique names, and every nugget's span within its
    /// owning document's text and pointing back at the document that owns it.
    ///
    /// This is the single consistency pass a freshly loaded or concurrently extracted base must
    /// pass before the first matching stage runs.
    ///
    /// # Errors
    /// Fails with [`Error::ConsistencyViolation`] on the first violation found.
    pub fn check_consistency(&self) -> Result<(), Error> {
        let mut names = std::collections::HashSet::new();
        for attribute in &self.attributes {
            if !names.insert(attribute.name()) {
                return Err(Error::ConsistencyViolation {
                    invariant: "attribute names must be unique within a document base",
                });
            }
        }

        let mut names = std::collections::HashSet::new();
        for (index, document) in self.documents.iter().enumerate() {
            if !names.insert(document.name()) {
                return Err(Error::ConsistencyViolation {
                    invariant: "document names must be unique within a document base",
                });
            }
            for nugget in document.nuggets() {
                if nugget.document() != index {
                    return Err(Error::ConsistencyViolation {
                        invariant: "every nugget must belong to the document that owns it",
                    });
                }
                if !(nugget.start() < nugget.end() && nugget.end() <= document.text().len()) {
                    return Err(Error::ConsistencyViolation {
                        invariant:
                            "nugget span must satisfy 0 <= start < end <= document text length",
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Nugget;

    #[test]
    fn test_add_document_rejects_duplicate_name() {
        let mut base = DocumentBase::new();
        base.add_document(Document::new("doc", "text")).unwrap();
        assert!(base.add_document(Document::new("doc", "other")).is_err());
    }

    #[test]
    fn test_add_attribute_rejects_duplicate_name() {
        let mut base = DocumentBase::new();
        base.add_attribute(Attribute::new("ceo")).unwrap();
        assert!(base.add_attribute(Attribute::new("ceo")).is_err());
    }

    #[test]
    fn test_check_consistency_detects_misattributed_nugget() {
        let mut base = DocumentBase::new();
        base.add_document(Document::new("doc0", "Tim Cook"))
            .unwrap();
        base.add_document(Document::new("doc1", "Satya Nadella"))
            .unwrap();
        base.documents_mut()[0]
            .push_nugget(Nugget::new(1, 0, 3, 8).unwrap())
            .unwrap();
        assert!(base.check_consistency().is_err());
    }

    #[test]
    fn test_check_consistency_passes_for_well_formed_base() {
        let mut base = DocumentBase::new();
        base.add_document(Document::new("doc0", "Tim Cook"))
            .unwrap();
        base.documents_mut()[0]
            .push_nugget(Nugget::new(0, 0, 3, 8).unwrap())
            .unwrap();
        base.add_attribute(Attribute::new("ceo")).unwrap();
        base.check_consistency().unwrap();
    }
}
