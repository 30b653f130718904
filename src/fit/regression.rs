//! Ordinary least squares fit of price on the encoded feature matrix.
//!
//! Given:
//! - an `n × p` design matrix `X` produced by an `EncodedSchema`
//! - observed prices `y`
//!
//! we center every column and the target, solve the centered system by SVD,
//! and recover the intercept as `mean(y) - mean(X) · β`. Centering keeps the
//! intercept out of the minimum-norm solution (so it is not shrunk when the
//! matrix is rank deficient) and removes the large `year` offset before the
//! decomposition.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::PriceRecord;
use crate::encode::{EncodedRow, EncodedSchema};
use crate::error::AppError;
use crate::math::solve_least_squares;

/// Conditioning and in-sample quality of a fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitDiagnostics {
    pub n_rows: usize,
    pub n_columns: usize,
    /// Numerical rank of the centered design matrix.
    pub rank: usize,
    /// Singular values at or below this count as zero.
    pub rank_tolerance: f64,
    pub max_singular_value: f64,
    pub min_singular_value: f64,
    pub rmse: f64,
    /// `None` when the target has zero variance.
    pub r_squared: Option<f64>,
}

/// Intercept + coefficients aligned 1:1 with the schema columns.
#[derive(Debug, Clone, Serialize)]
pub struct FittedModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub column_names: Vec<String>,
    pub diagnostics: FitDiagnostics,
    #[serde(skip)]
    fingerprint: u64,
}

impl FittedModel {
    /// `intercept + coefficients · row`.
    ///
    /// Rejects rows that were encoded against a different schema: their
    /// columns would line up with the wrong coefficients.
    pub fn predict(&self, row: &EncodedRow) -> Result<f64, AppError> {
        if row.fingerprint != self.fingerprint || row.values.len() != self.coefficients.len() {
            return Err(AppError::schema_mismatch(format!(
                "Encoded row ({} columns) does not match the fitted schema ({} columns).",
                row.values.len(),
                self.coefficients.len()
            )));
        }

        let dot: f64 = self
            .coefficients
            .iter()
            .zip(&row.values)
            .map(|(b, x)| b * x)
            .sum();
        Ok(self.intercept + dot)
    }

    pub fn is_rank_deficient(&self) -> bool {
        self.diagnostics.rank < self.diagnostics.n_columns
    }

    /// The rank-deficiency warning, if the design matrix was degenerate.
    pub fn rank_warning(&self) -> Option<AppError> {
        if !self.is_rank_deficient() {
            return None;
        }
        let d = &self.diagnostics;
        Some(AppError::unfittable(format!(
            "Design matrix is rank deficient (rank {} of {} columns, {} rows): \
             some coefficients are not identifiable and were set by a minimum-norm solve.",
            d.rank, d.n_columns, d.n_rows
        )))
    }
}

/// Fit the model on `records` using a previously built schema.
pub fn fit(records: &[PriceRecord], schema: &EncodedSchema) -> Result<FittedModel, AppError> {
    let x = schema.encode_matrix(records);
    let y = DVector::from_iterator(records.len(), records.iter().map(|r| r.price));
    fit_matrix(&x, &y, schema)
}

/// Fit the model on an already encoded design matrix.
pub fn fit_matrix(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    schema: &EncodedSchema,
) -> Result<FittedModel, AppError> {
    let (n, p) = x.shape();
    if n == 0 {
        return Err(AppError::unfittable("No rows to fit."));
    }
    if p != schema.len() {
        return Err(AppError::schema_mismatch(format!(
            "Design matrix has {p} columns but the schema has {}.",
            schema.len()
        )));
    }
    if y.len() != n {
        return Err(AppError::unfittable(format!(
            "Target length {} does not match {n} rows.",
            y.len()
        )));
    }

    let col_means: Vec<f64> = (0..p).map(|j| x.column(j).mean()).collect();
    let y_mean = y.mean();
    let xc = DMatrix::from_fn(n, p, |i, j| x[(i, j)] - col_means[j]);
    let yc = y.map(|v| v - y_mean);

    let solution = solve_least_squares(&xc, &yc)
        .ok_or_else(|| AppError::unfittable("Least squares solve produced non-finite coefficients."))?;

    let coefficients: Vec<f64> = solution.beta.iter().copied().collect();
    let intercept = y_mean
        - col_means
            .iter()
            .zip(&coefficients)
            .map(|(m, b)| m * b)
            .sum::<f64>();
    if !intercept.is_finite() {
        return Err(AppError::unfittable("Fitted intercept is not finite."));
    }

    let fitted = x * &solution.beta;
    let mut sse = 0.0;
    let mut sst = 0.0;
    for i in 0..n {
        let r = y[i] - (intercept + fitted[i]);
        sse += r * r;
        sst += yc[i] * yc[i];
    }

    let diagnostics = FitDiagnostics {
        n_rows: n,
        n_columns: p,
        rank: solution.rank,
        rank_tolerance: solution.tolerance,
        max_singular_value: solution.singular_values.first().copied().unwrap_or(0.0),
        min_singular_value: solution.singular_values.last().copied().unwrap_or(0.0),
        rmse: (sse / n as f64).sqrt(),
        r_squared: (sst > 0.0).then(|| 1.0 - sse / sst),
    };

    debug!(
        rows = n,
        columns = p,
        rank = diagnostics.rank,
        rmse = diagnostics.rmse,
        "fitted regression"
    );
    if !solution.is_full_rank() {
        warn!(rank = diagnostics.rank, columns = p, "design matrix is rank deficient");
    }

    Ok(FittedModel {
        intercept,
        coefficients,
        column_names: schema.column_names(),
        diagnostics,
        fingerprint: schema.fingerprint(),
    })
}
