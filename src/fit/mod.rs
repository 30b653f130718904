//! Regression fitting.
//!
//! Responsibilities:
//!
//! - fit an OLS model against a frozen `EncodedSchema` (`regression`)
//! - optional seeded train/evaluation split and out-of-sample metrics (`holdout`)

pub mod holdout;
pub mod regression;

pub use holdout::*;
pub use regression::*;
