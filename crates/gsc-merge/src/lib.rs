//! gsc-merge
//!
//! Duplicate consolidation for registry institutions and collections.
//!
//! A merge folds entity A ("to replace") into entity B ("replacement"):
//! sub-resources move to B, references to A are repointed to B, and A is
//! marked deleted and replaced by B. Every change is staged on copies and
//! committed together, so a failed merge leaves the registry untouched.
//!
//! An institution can also be converted into a collection of another
//! institution, existing or created on the spot. The same staging rule
//! applies.

mod conversion;
mod error;
mod merge;
mod registry;
mod shared;

pub use conversion::{CollectionParent, ConversionReport};
pub use error::MergeError;
pub use merge::MergeReport;
pub use registry::Registry;
pub use shared::SharedRegistry;
