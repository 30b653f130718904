//! JSON reports for `--format json`.

use serde::Serialize;

use crate::domain::{PredictMode, PredictionRequest, PredictionResult, TrendPoint};
use crate::error::AppError;
use crate::fit::{EvalMetrics, FitDiagnostics};

#[derive(Debug, Clone, Serialize)]
pub struct PredictionEntry {
    pub region: String,
    pub estimate: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport<'a> {
    pub mode: PredictMode,
    pub year: i32,
    pub month: u32,
    pub fuel_type: &'a str,
    pub results: Vec<PredictionEntry>,
    /// Only present for regression estimates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<&'a FitDiagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<&'a EvalMetrics>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport<'a> {
    pub region: &'a str,
    pub fuel_type: &'a str,
    pub history: &'a [TrendPoint],
    pub national_average: &'a [TrendPoint],
}

impl<'a> PredictionReport<'a> {
    pub fn new(
        request: &'a PredictionRequest,
        mode: PredictMode,
        results: &[PredictionResult],
        warnings: &[AppError],
    ) -> Self {
        Self {
            mode,
            year: request.year,
            month: request.month,
            fuel_type: &request.fuel_type,
            results: results
                .iter()
                .map(|r| PredictionEntry {
                    region: r.region.clone(),
                    estimate: r.estimate(),
                    error: r.outcome.as_ref().err().map(|e| e.message().to_string()),
                })
                .collect(),
            diagnostics: None,
            evaluation: None,
            warnings: warnings.iter().map(|w| w.message().to_string()).collect(),
        }
    }

    pub fn with_model(mut self, diagnostics: &'a FitDiagnostics, evaluation: Option<&'a EvalMetrics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self.evaluation = evaluation;
        self
    }
}

/// Pretty-printed JSON for any report.
pub fn to_json<T: Serialize>(report: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(report)
        .map_err(|e| AppError::io(format!("Failed to serialize report: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_report_keeps_failures_per_region() {
        let request = PredictionRequest {
            regions: vec!["CDMX".to_string(), "Oaxaca".to_string()],
            year: 2023,
            month: 1,
            fuel_type: "Regular".to_string(),
        };
        let results = vec![
            PredictionResult {
                region: "CDMX".to_string(),
                outcome: Ok(22.5),
            },
            PredictionResult {
                region: "Oaxaca".to_string(),
                outcome: Err(AppError::no_matching_data("No historical prices for Oaxaca.")),
            },
        ];

        let report = PredictionReport::new(&request, PredictMode::Lookup, &results, &[]);
        let value: serde_json::Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();

        assert_eq!(value["mode"], "lookup");
        assert_eq!(value["results"][0]["estimate"], 22.5);
        assert!(value["results"][1]["estimate"].is_null());
        assert_eq!(value["results"][1]["error"], "No historical prices for Oaxaca.");
        assert!(value.get("diagnostics").is_none());
    }
}
