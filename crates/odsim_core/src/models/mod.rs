//! Data models shared across the crate.
//!
//! - `RunParameters`: everything the parameter source supplies for a run
//! - `CatalogRecord`: the root catalog entity owned by the lifecycle

mod catalog_record;
mod params;

pub use catalog_record::CatalogRecord;
pub use params::RunParameters;
