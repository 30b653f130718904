//! Price estimation strategies.
//!
//! Two interchangeable ways to answer "what does fuel X cost in region R in
//! month M?":
//!
//! - `RegressionEstimator`: encode the query against the frozen schema and
//!   evaluate the fitted OLS model (works for unobserved combinations)
//! - `LookupEstimator`: average the observed prices for that exact combination
//!
//! Both borrow the session's immutable data, so building one is free.

use tracing::{debug, warn};

use crate::aggregate::lookup_mean;
use crate::domain::{PredictMode, PredictionRequest, PredictionResult, PriceQuery, PriceRecord};
use crate::encode::EncodedSchema;
use crate::error::AppError;
use crate::fit::FittedModel;

pub trait PriceEstimator {
    fn mode(&self) -> PredictMode;

    /// Estimate a single price.
    fn estimate(&self, query: &PriceQuery) -> Result<f64, AppError>;
}

pub struct RegressionEstimator<'a> {
    schema: &'a EncodedSchema,
    model: &'a FittedModel,
}

impl<'a> RegressionEstimator<'a> {
    pub fn new(schema: &'a EncodedSchema, model: &'a FittedModel) -> Self {
        Self { schema, model }
    }
}

impl PriceEstimator for RegressionEstimator<'_> {
    fn mode(&self) -> PredictMode {
        PredictMode::Regression
    }

    fn estimate(&self, query: &PriceQuery) -> Result<f64, AppError> {
        let row = self.schema.encode(query.features());
        debug!(
            query = %query.label(),
            active = ?self.schema.decode(&row),
            "encoded query"
        );
        if !row.unseen.is_empty() {
            warn!(
                query = %query.label(),
                unseen = ?row.unseen,
                "query uses categories absent from the training data; they count as the reference level"
            );
        }
        self.model.predict(&row)
    }
}

pub struct LookupEstimator<'a> {
    records: &'a [PriceRecord],
}

impl<'a> LookupEstimator<'a> {
    pub fn new(records: &'a [PriceRecord]) -> Self {
        Self { records }
    }
}

impl PriceEstimator for LookupEstimator<'_> {
    fn mode(&self) -> PredictMode {
        PredictMode::Lookup
    }

    fn estimate(&self, query: &PriceQuery) -> Result<f64, AppError> {
        lookup_mean(self.records, query)
    }
}

/// Estimate every region in `request`.
///
/// Each region gets its own outcome: a failure for one region is recorded in
/// its result and does not stop the others.
pub fn predict_batch(estimator: &dyn PriceEstimator, request: &PredictionRequest) -> Vec<PredictionResult> {
    request
        .queries()
        .into_iter()
        .map(|query| {
            let outcome = estimator.estimate(&query);
            if let Err(err) = &outcome {
                warn!(region = %query.region, mode = ?estimator.mode(), "{err}");
            }
            PredictionResult {
                region: query.region,
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fit::fit;

    fn record(region: &str, year: i32, month: u32, fuel: &str, price: f64) -> PriceRecord {
        PriceRecord {
            region: region.to_string(),
            year,
            month,
            fuel_type: fuel.to_string(),
            price,
        }
    }

    fn sample() -> Vec<PriceRecord> {
        vec![
            record("CDMX", 2023, 1, "Regular", 22.5),
            record("CDMX", 2023, 2, "Regular", 23.0),
            record("Jalisco", 2023, 1, "Regular", 21.8),
        ]
    }

    fn request(regions: &[&str], month: u32) -> PredictionRequest {
        PredictionRequest {
            regions: regions.iter().map(|r| r.to_string()).collect(),
            year: 2023,
            month,
            fuel_type: "Regular".to_string(),
        }
    }

    #[test]
    fn lookup_batch_isolates_missing_regions() {
        let data = sample();
        let estimator = LookupEstimator::new(&data);
        let results = predict_batch(&estimator, &request(&["Oaxaca", "CDMX"], 1));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].region, "Oaxaca");
        assert_eq!(
            results[0].outcome.as_ref().unwrap_err().kind(),
            ErrorKind::NoMatchingData
        );
        assert_eq!(results[1].estimate(), Some(22.5));
    }

    #[test]
    fn regression_batch_estimates_unobserved_combinations() {
        let data = sample();
        let schema = EncodedSchema::from_records(&data).unwrap();
        let model = fit(&data, &schema).unwrap();
        let estimator = RegressionEstimator::new(&schema, &model);

        let results = predict_batch(&estimator, &request(&["Jalisco", "CDMX"], 2));
        let jalisco = results[0].estimate().unwrap();
        let cdmx = results[1].estimate().unwrap();
        assert!((jalisco - 22.3).abs() < 1e-9);
        assert!((cdmx - 23.0).abs() < 1e-9);
    }

    #[test]
    fn modes_are_reported() {
        let data = sample();
        assert_eq!(LookupEstimator::new(&data).mode(), PredictMode::Lookup);
    }
}
