//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - held in-memory for the whole session
//! - borrowed by the encoder, estimators and aggregator without copying
//! - serialized for `--format json` output

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

/// One observed price for a region, calendar month and fuel type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub region: String,
    pub year: i32,
    /// Calendar month, 1–12.
    pub month: u32,
    pub fuel_type: String,
    /// Price per unit (non-negative).
    pub price: f64,
}

impl PriceRecord {
    pub fn features(&self) -> Features<'_> {
        Features {
            region: &self.region,
            fuel_type: &self.fuel_type,
            year: self.year,
            month: self.month,
        }
    }

    /// First day of the record's month (the time axis for charts).
    pub fn date(&self) -> Option<NaiveDate> {
        month_start(self.year, self.month)
    }
}

/// Borrowed predictor values shared by training rows and prediction queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features<'a> {
    pub region: &'a str,
    pub fuel_type: &'a str,
    pub year: i32,
    pub month: u32,
}

impl<'a> Features<'a> {
    /// The value of `field`, borrowed from the underlying record or query.
    pub fn categorical(&self, field: CategoricalField) -> &'a str {
        match field {
            CategoricalField::Region => self.region,
            CategoricalField::FuelType => self.fuel_type,
        }
    }

    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Year => f64::from(self.year),
            NumericField::Month => f64::from(self.month),
        }
    }
}

/// Numeric predictors, in encoded column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Year,
    Month,
}

impl NumericField {
    pub const ALL: [NumericField; 2] = [NumericField::Year, NumericField::Month];

    pub fn column_name(self) -> &'static str {
        match self {
            NumericField::Year => "year",
            NumericField::Month => "month",
        }
    }
}

/// Categorical predictors, in encoded column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    Region,
    FuelType,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 2] = [CategoricalField::Region, CategoricalField::FuelType];

    pub fn column_name(self) -> &'static str {
        match self {
            CategoricalField::Region => "region",
            CategoricalField::FuelType => "fuel_type",
        }
    }
}

/// A single point to estimate: one region at one month for one fuel type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuery {
    pub region: String,
    pub year: i32,
    pub month: u32,
    pub fuel_type: String,
}

impl PriceQuery {
    pub fn features(&self) -> Features<'_> {
        Features {
            region: &self.region,
            fuel_type: &self.fuel_type,
            year: self.year,
            month: self.month,
        }
    }

    pub fn label(&self) -> String {
        format!(
            "{} / {} / {:04}-{:02}",
            self.region, self.fuel_type, self.year, self.month
        )
    }
}

/// A user request: one or more regions sharing the same month and fuel type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub regions: Vec<String>,
    pub year: i32,
    pub month: u32,
    pub fuel_type: String,
}

impl PredictionRequest {
    /// Split the request into one query per region (request order preserved).
    pub fn queries(&self) -> Vec<PriceQuery> {
        self.regions
            .iter()
            .map(|region| PriceQuery {
                region: region.clone(),
                year: self.year,
                month: self.month,
                fuel_type: self.fuel_type.clone(),
            })
            .collect()
    }
}

/// Per-region outcome of a prediction request.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    pub region: String,
    pub outcome: Result<f64, crate::error::AppError>,
}

impl PredictionResult {
    pub fn estimate(&self) -> Option<f64> {
        self.outcome.as_ref().ok().copied()
    }
}

/// One point of a historical series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// How a price is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PredictMode {
    /// Multiple linear regression over the one-hot encoded predictors.
    Regression,
    /// Mean of the observed prices for the exact region/month/fuel combination.
    Lookup,
}

impl PredictMode {
    pub fn display_name(self) -> &'static str {
        match self {
            PredictMode::Regression => "regression",
            PredictMode::Lookup => "historical lookup",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            PredictMode::Regression => PredictMode::Lookup,
            PredictMode::Lookup => PredictMode::Regression,
        }
    }
}

/// Output format for command-line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Summary stats about the rows kept after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub n_records: usize,
    pub first_month: NaiveDate,
    pub last_month: NaiveDate,
    pub price_min: f64,
    pub price_max: f64,
    pub price_mean: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_path: PathBuf,
    pub mode: PredictMode,
    /// Fraction of rows held out for evaluation (0 disables the split).
    pub holdout: f64,
    /// Seed for the holdout shuffle.
    pub seed: u64,
    /// Treat a rank-deficient design matrix as fatal.
    pub strict: bool,
}

/// First day of the given month, if the pair forms a valid calendar month.
pub fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}
