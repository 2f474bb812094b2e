//! gsc-schemas
//!
//! Shared data model for the GrSciColl registry sync:
//! - External records as published by IndexHerbariorum (IH)
//! - Internal registry entities (institutions, collections) and persons
//! - Typed identifiers, machine tags, occurrence mappings and addresses
//! - Canonical country values
//!
//! Plain data only. No IO, no matching logic.

mod country;
mod external;
mod registry;

pub use country::{Country, InvalidCountryCode};
pub use external::*;
pub use registry::*;
