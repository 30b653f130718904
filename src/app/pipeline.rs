//! Shared session setup used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> schema -> (split) -> fit -> evaluate
//!
//! The result is an immutable `Session` built once per process. Every user
//! interaction borrows it, so the spreadsheet is read and the model fit exactly
//! once no matter how many predictions are made.

use tracing::{info, warn};

use crate::aggregate::Categories;
use crate::domain::{PredictMode, PredictionRequest, PredictionResult, RunConfig};
use crate::encode::EncodedSchema;
use crate::error::AppError;
use crate::estimate::{LookupEstimator, PriceEstimator, RegressionEstimator, predict_batch};
use crate::fit::{EvalMetrics, FittedModel, evaluate, fit, train_test_split};
use crate::io::ingest::{Dataset, load};

/// All long-lived state of a run.
#[derive(Debug, Clone)]
pub struct Session {
    pub dataset: Dataset,
    pub categories: Categories,
    pub schema: EncodedSchema,
    pub model: FittedModel,
    /// Held-out metrics when a holdout fraction was configured.
    pub evaluation: Option<EvalMetrics>,
    /// Non-fatal problems found while building the session (rank deficiency).
    pub warnings: Vec<AppError>,
}

impl Session {
    /// Load the configured data file and fit the model.
    ///
    /// A `DataUnavailable` failure returns before any fitting is attempted.
    pub fn build(config: &RunConfig) -> Result<Self, AppError> {
        let dataset = load(&config.data_path)?;
        Self::from_dataset(dataset, config)
    }

    /// Build a session from an already loaded dataset.
    pub fn from_dataset(dataset: Dataset, config: &RunConfig) -> Result<Self, AppError> {
        if dataset.is_empty() {
            return Err(AppError::data_unavailable("No price records available."));
        }

        // The schema always comes from the full dataset, so held-out rows
        // with rare categories still have their columns.
        let schema = EncodedSchema::from_records(&dataset.records)?;

        let (model, evaluation) = if config.holdout > 0.0 {
            let split = train_test_split(&dataset.records, config.holdout, config.seed)?;
            let model = fit(&split.train, &schema)?;
            let metrics = evaluate(&model, &schema, &split.test)?;
            info!(
                train = split.train.len(),
                test = metrics.n,
                rmse = metrics.rmse,
                mae = metrics.mae,
                "holdout evaluation"
            );
            (model, Some(metrics))
        } else {
            (fit(&dataset.records, &schema)?, None)
        };

        let mut warnings = Vec::new();
        if let Some(warning) = model.rank_warning() {
            if config.strict {
                return Err(warning);
            }
            warn!("{warning}");
            warnings.push(warning);
        }

        let categories = Categories::from_records(&dataset.records);

        Ok(Self {
            dataset,
            categories,
            schema,
            model,
            evaluation,
            warnings,
        })
    }

    /// The estimator for `mode`, borrowing this session.
    pub fn estimator(&self, mode: PredictMode) -> Box<dyn PriceEstimator + '_> {
        match mode {
            PredictMode::Regression => Box::new(RegressionEstimator::new(&self.schema, &self.model)),
            PredictMode::Lookup => Box::new(LookupEstimator::new(&self.dataset.records)),
        }
    }

    pub fn predict(&self, mode: PredictMode, request: &PredictionRequest) -> Vec<PredictionResult> {
        predict_batch(self.estimator(mode).as_ref(), request)
    }
}
