//! Input helpers.
//!
//! - CSV / workbook ingest + validation (`ingest`)

pub mod ingest;

pub use ingest::*;
