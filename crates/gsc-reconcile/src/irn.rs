//! IH IRN <-> stored identifier codec.
//!
//! The stored form must stay decodable across releases: identifiers written
//! by earlier runs live in the registry indefinitely.

use gsc_schemas::{Identifier, IdentifierType};

pub const IRN_PREFIX: &str = "gbif:ih:irn:";

pub fn encode(irn: &str) -> String {
    format!("{IRN_PREFIX}{irn}")
}

/// Recover the IRN from a stored identifier value. Anything without the
/// prefix, or with nothing after it, decodes to `None`.
pub fn decode(value: &str) -> Option<&str> {
    value.strip_prefix(IRN_PREFIX).filter(|irn| !irn.is_empty())
}

/// An `IH_IRN` identifier for `irn`.
pub fn identifier(irn: &str) -> Identifier {
    Identifier::new(IdentifierType::IhIrn, encode(irn))
}

/// Decoded IRNs of all `IH_IRN` identifiers, deduplicated, in order.
pub fn ih_irns(identifiers: &[Identifier]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for irn in identifiers
        .iter()
        .filter(|i| i.identifier_type == IdentifierType::IhIrn)
        .filter_map(|i| decode(&i.identifier))
    {
        if !out.iter().any(|seen| seen == irn) {
            out.push(irn.to_string());
        }
    }
    out
}

/// Normalize a raw IRN from an external record. Blank means absent.
pub(crate) fn source_irn(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}
