//! Domain models for opioid rotation.

mod conversion;
mod opioid;

pub use conversion::*;
pub use opioid::*;
