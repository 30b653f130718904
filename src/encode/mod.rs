//! One-hot encoding of the categorical predictors.
//!
//! Encoding is a two-phase protocol:
//!
//! 1. `EncodedSchema::build` freezes the column set from training data
//! 2. `EncodedSchema::encode` projects any record (training or query) onto it
//!
//! Keeping the phases apart means a query can never grow or reorder the
//! feature space the model was fit on.

pub mod schema;

pub use schema::*;
