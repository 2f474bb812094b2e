use std::fmt;

use gsc_schemas::EntityKind;
use uuid::Uuid;

/// A merge or conversion request that cannot be honoured. Nothing is mutated when one of
/// these is returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeError {
    MissingPerformer,
    SameEntity(Uuid),
    NotFound { kind: EntityKind, key: Uuid },
    Deleted(Uuid),
    AlreadyReplaced { key: Uuid, replaced_by: Uuid },
    /// Both carry an IH IRN; IH sync would keep recreating one of them.
    BothIhLinked { to_replace: Uuid, replacement: Uuid },
    BothIDigBio { to_replace: Uuid, replacement: Uuid },
    AlreadyConverted { key: Uuid, collection: Uuid },
    /// iDigBio institutions are kept as institutions.
    IDigBioConversion(Uuid),
    /// A new parent institution was requested without a name.
    MissingParentName,
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPerformer => write!(f, "merge requires the user performing it"),
            Self::SameEntity(key) => {
                write!(f, "cannot merge {key} into itself")
            }
            Self::NotFound { kind, key } => write!(f, "{kind:?} {key} not found"),
            Self::Deleted(key) => write!(f, "entity {key} is deleted"),
            Self::AlreadyReplaced { key, replaced_by } => {
                write!(f, "entity {key} was already replaced by {replaced_by}")
            }
            Self::BothIhLinked {
                to_replace,
                replacement,
            } => write!(
                f,
                "both {to_replace} and {replacement} carry an IH IRN identifier"
            ),
            Self::BothIDigBio {
                to_replace,
                replacement,
            } => write!(f, "both {to_replace} and {replacement} are iDigBio records"),
            Self::AlreadyConverted { key, collection } => {
                write!(f, "institution {key} was already converted to collection {collection}")
            }
            Self::IDigBioConversion(key) => {
                write!(f, "institution {key} is an iDigBio record and cannot be converted")
            }
            Self::MissingParentName => {
                write!(f, "a new parent institution needs a name")
            }
        }
    }
}

impl std::error::Error for MergeError {}
