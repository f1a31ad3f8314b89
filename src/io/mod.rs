//! Input/output helpers.
//!
//! - matched-catalog bundle read/write (`ingest`)
//! - colorterm library loading (`ingest`)

pub mod ingest;

pub use ingest::*;
