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

//! Deterministic binary (de)serialization of a [`DocumentBase`] and its persistent signals.
//!
//! Transient signals (`cached-distance`, `currently-highest-ranked`) are dropped before encoding
//! and never reappear on decode; unknown signal kinds round-trip verbatim as opaque bytes.

#![forbid(unsafe_code)]
#![deny(clippy::pedantic, rust_2018_idioms)]
#![allow(clippy::missing_errors_doc)]

use displaydoc::Display;
use thiserror::Error as ThisError;
use wannadb_matching::DocumentBase;

/// The first byte of every encoded document, identifying the codec revision.
const FORMAT_VERSION: u8 = 1;

/// Errors of the persistence codec.
#[derive(Debug, Display, ThisError)]
pub enum Error {
    /// the encoded document is empty
    Empty,
    /// unsupported format version {found}, expected {expected}
    UnsupportedVersion { found: u8, expected: u8 },
    /// persistence codec failed: {cause}
    Codec { cause: String },
}

/// Encodes a document base to a version-prefixed binary blob, dropping every transient signal.
///
/// # Errors
/// Fails if the binary codec itself fails, which should not happen for well-formed input.
pub fn encode(base: &DocumentBase) -> Result<Vec<u8>, Error> {
    let mut persisted = base.clone();
    for document in persisted.documents_mut() {
        document.signals_mut().retain_persistent();
        for nugget in document.nuggets_mut() {
            nugget.signals_mut().retain_persistent();
        }
    }
    for attribute in persisted.attributes_mut() {
        attribute.clear_transient();
    }

    let size = bincode::serialized_size(&persisted).map_err(|cause| Error::Codec {
        cause: cause.to_string(),
    })? + 1;
    #[allow(clippy::cast_possible_truncation)]
    let mut encoded = Vec::with_capacity(size as usize);
    encoded.push(FORMAT_VERSION);
    bincode::serialize_into(&mut encoded, &persisted).map_err(|cause| Error::Codec {
        cause: cause.to_string(),
    })?;
    Ok(encoded)
}

/// Decodes a document base previously produced by [`encode`].
///
/// # Errors
/// Fails if the blob is empty, carries an unsupported format version, or the codec fails.
pub fn decode(bytes: &[u8]) -> Result<DocumentBase, Error> {
    match bytes.split_first() {
        None => Err(Error::Empty),
        Some((&FORMAT_VERSION, rest)) => bincode::deserialize(rest).map_err(|cause| Error::Codec {
            cause: cause.to_string(),
        }),
        Some((&version, _)) => Err(Error::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        }),
    }
}

#[cfg(test)]
mod tests {
    use wannadb_embedding::NormalizedEmbedding;
    use wannadb_matching::{ids, Attribute, Document, DocumentIndex, Nugget, SignalValue};

    use super::*;

    fn nugget_with_signals(index: DocumentIndex, start: usize, end: usize) -> Nugget {
        let mut nugget = Nugget::new(index, start, end, end.max(20)).unwrap();
        let embedding: NormalizedEmbedding = [0.1, 0.2, 0.3].try_into().unwrap();
        nugget
            .signals_mut()
            .set(ids::TEXT_EMBEDDING, SignalValue::Vector(embedding));
        nugget
            .signals_mut()
            .set(ids::CACHED_DISTANCE, SignalValue::Float(0.42));
        nugget
    }

    fn build_base() -> DocumentBase {
        let mut base = DocumentBase::new();
        let mut ceo = Attribute::new("ceo");
        ceo.signals_mut()
            .set(ids::LABEL, SignalValue::String("ceo".into()));
        let founder = Attribute::new("founder");
        base.add_attribute(ceo).unwrap();
        base.add_attribute(founder).unwrap();

        for i in 0..4 {
            let mut document = Document::new(format!("doc{i}"), "Tim Cook is CEO of Apple Inc");
            for j in 0..5 {
                let start = j * 2;
                document
                    .push_nugget(nugget_with_signals(i, start, start + 1))
                    .unwrap();
            }
            let index = base.add_document(document).unwrap();
            if i % 2 == 0 {
                let nugget_id = base.documents()[index].nuggets()[0].id();
                base.attributes_mut()[0].confirm(index, nugget_id);
                base.attributes_mut()[0].set_currently_highest_ranked(index, Some(nugget_id));
            } else {
                base.attributes_mut()[1].set_no_match(index);
            }
        }
        base
    }

    #[test]
    fn test_round_trip_is_deterministic_and_idempotent() {
        let base = build_base();
        let encoded = encode(&base).unwrap();
        let decoded = decode(&encoded).unwrap();
        let re_encoded = encode(&decoded).unwrap();
        assert_eq!(encoded, re_encoded);
    }

    #[test]
    fn test_persistent_signals_survive_transient_signals_dropped() {
        let base = build_base();
        let decoded = decode(&encode(&base).unwrap()).unwrap();

        assert_eq!(decoded.attributes().len(), 2);
        assert_eq!(decoded.documents().len(), 4);
        assert!(matches!(
            decoded.attributes()[0].signals().get(ids::LABEL),
            Some(SignalValue::String(label)) if label == "ceo"
        ));
        assert_eq!(
            decoded.attributes()[0].confirmed_match(0),
            base.attributes()[0].confirmed_match(0)
        );
        assert_eq!(
            decoded.attributes()[1].confirmed_match(1),
            base.attributes()[1].confirmed_match(1)
        );

        // currently-highest-ranked is transient and must not survive.
        assert_eq!(decoded.attributes()[0].currently_highest_ranked(0), None);

        // cached-distance is transient; text-embedding is persistent.
        for document in decoded.documents() {
            for nugget in document.nuggets() {
                assert!(nugget.signals().get(ids::CACHED_DISTANCE).is_none());
                assert!(nugget.signals().get(ids::TEXT_EMBEDDING).is_some());
            }
        }
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        assert!(matches!(decode(&[]), Err(Error::Empty)));
    }

    #[test]
    fn test_decode_rejects_unsupported_version() {
        assert!(matches!(
            decode(&[7]),
            Err(Error::UnsupportedVersion { found: 7, .. })
        ));
    }
}
