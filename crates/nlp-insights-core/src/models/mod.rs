//! FHIR domain models for insight discovery.

mod datatypes;
mod resources;

pub use datatypes::*;
pub use resources::*;
