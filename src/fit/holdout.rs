//! Train/evaluation split for sanity-checking fit quality.
//!
//! The split is a seeded shuffle, so the same seed always holds out the same
//! rows. Held-out rows are only used for error reporting; the schema is still
//! built from the full dataset.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::domain::PriceRecord;
use crate::encode::EncodedSchema;
use crate::error::AppError;
use crate::fit::regression::FittedModel;

/// Rows for fitting and rows held out for evaluation.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<PriceRecord>,
    pub test: Vec<PriceRecord>,
}

/// Out-of-sample error of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalMetrics {
    pub n: usize,
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: Option<f64>,
}

/// Shuffle and split `records`, holding out `ceil(n * test_fraction)` rows.
pub fn train_test_split(
    records: &[PriceRecord],
    test_fraction: f64,
    seed: u64,
) -> Result<Split, AppError> {
    if !(test_fraction.is_finite() && test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(AppError::usage(format!(
            "Holdout fraction must be between 0 and 1 (exclusive), got {test_fraction}."
        )));
    }

    let n = records.len();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(AppError::usage(format!(
            "Too few rows ({n}) to hold out {:.0}% for evaluation.",
            test_fraction * 100.0
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let mut test_idx = test_idx.to_vec();
    let mut train_idx = train_idx.to_vec();
    // Keep file order inside each partition.
    test_idx.sort_unstable();
    train_idx.sort_unstable();

    Ok(Split {
        train: train_idx.iter().map(|&i| records[i].clone()).collect(),
        test: test_idx.iter().map(|&i| records[i].clone()).collect(),
    })
}

/// Score `model` on `records` (typically the held-out partition).
pub fn evaluate(
    model: &FittedModel,
    schema: &EncodedSchema,
    records: &[PriceRecord],
) -> Result<EvalMetrics, AppError> {
    if records.is_empty() {
        return Err(AppError::usage("No rows to evaluate."));
    }

    let n = records.len() as f64;
    let mean = records.iter().map(|r| r.price).sum::<f64>() / n;

    let mut sse = 0.0;
    let mut sae = 0.0;
    let mut sst = 0.0;
    for r in records {
        let y_hat = model.predict(&schema.encode(r.features()))?;
        let resid = r.price - y_hat;
        sse += resid * resid;
        sae += resid.abs();
        sst += (r.price - mean).powi(2);
    }

    Ok(EvalMetrics {
        n: records.len(),
        rmse: (sse / n).sqrt(),
        mae: sae / n,
        r_squared: (sst > 0.0).then(|| 1.0 - sse / sst),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::regression::fit;

    fn records(n: usize) -> Vec<PriceRecord> {
        (0..n)
            .map(|i| PriceRecord {
                region: if i % 2 == 0 { "A" } else { "B" }.to_string(),
                year: 2020 + (i / 12) as i32,
                month: (i % 12) as u32 + 1,
                fuel_type: "Regular".to_string(),
                price: 20.0 + i as f64 * 0.1,
            })
            .collect()
    }

    #[test]
    fn split_sizes_follow_ceiling_rule() {
        let data = records(11);
        let split = train_test_split(&data, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn split_is_deterministic_and_disjoint() {
        let data = records(20);
        let a = train_test_split(&data, 0.25, 7).unwrap();
        let b = train_test_split(&data, 0.25, 7).unwrap();
        assert_eq!(a.test, b.test);

        let mut all: Vec<f64> = a.train.iter().chain(&a.test).map(|r| r.price).collect();
        all.sort_by(|x, y| x.partial_cmp(y).unwrap());
        let mut expected: Vec<f64> = data.iter().map(|r| r.price).collect();
        expected.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_eq!(all, expected);
    }

    #[test]
    fn invalid_fractions_are_rejected() {
        let data = records(10);
        assert!(train_test_split(&data, 0.0, 1).is_err());
        assert!(train_test_split(&data, 1.0, 1).is_err());
        assert!(train_test_split(&records(1), 0.5, 1).is_err());
    }

    #[test]
    fn evaluation_of_exact_model_has_zero_error() {
        let data = records(24);
        let schema = EncodedSchema::from_records(&data).unwrap();
        let split = train_test_split(&data, 0.2, 42).unwrap();
        let model = fit(&split.train, &schema).unwrap();
        let metrics = evaluate(&model, &schema, &split.test).unwrap();
        assert_eq!(metrics.n, split.test.len());
        assert!(metrics.rmse < 1e-8, "rmse={}", metrics.rmse);
        assert!(metrics.mae <= metrics.rmse + 1e-12);
    }
}
