//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observed rows (`PriceRecord`) and the borrowed predictor view (`Features`)
//! - requests and per-region results (`PredictionRequest`, `PredictionResult`)
//! - configuration enums (`PredictMode`, `OutputFormat`) and `RunConfig`

pub mod types;

pub use types::*;
