//! gsc-reconcile
//!
//! IndexHerbariorum -> GrSciColl reconciliation.
//!
//! - IRNs are matched through hash indexes; a shared IRN is a conflict,
//!   never a guess
//! - An internal record edited after the IH record is never overwritten
//! - IH records without a usable `dateModified` are never applied
//! - Staff fall back to one-to-one name matching
//!
//! Deterministic, pure logic. No IO, no persistence.

pub mod country;
pub mod freshness;
pub mod irn;

mod convert;
mod engine;
mod index;
mod snapshot;
mod staff;
mod types;

pub use convert::EntityConverter;
pub use country::{CountryResolver, CountryTableError};
pub use engine::{DiffEngine, DiffError};
pub use index::{EntityIndex, IrnIndex, Slot};
pub use snapshot::{ExternalSnapshot, RegistrySnapshot, SnapshotError, StaffSource};
pub use staff::StaffDiffFinder;
pub use types::*;
