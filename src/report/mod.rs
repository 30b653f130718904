//! Reporting utilities: terminal tables and machine-readable output.

pub mod format;
pub mod json;

pub use format::*;
pub use json::*;
