//! Formatted terminal output: prediction tables, trend tables and summaries.
//!
//! We keep formatting code in one place so:
//! - the encoding/fitting code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::aggregate::Categories;
use crate::app::pipeline::Session;
use crate::domain::{PredictMode, PredictionRequest, PredictionResult, TrendPoint};
use crate::io::ingest::Dataset;

/// Format the per-region estimates of a request.
pub fn format_predictions(
    request: &PredictionRequest,
    mode: PredictMode,
    results: &[PredictionResult],
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Estimated {} prices for {:04}-{:02} ({})\n",
        request.fuel_type,
        request.year,
        request.month,
        mode.display_name()
    ));
    out.push_str(&format!("{:<24} {:>12}", "region", "price").trim_end().to_string());
    out.push('\n');
    out.push_str(&format!("{:-<24} {:-<12}", "", ""));
    out.push('\n');

    for r in results {
        let value = match &r.outcome {
            Ok(price) => format!("{price:>12.2}"),
            Err(_) => format!("{:>12}", "no data"),
        };
        out.push_str(format!("{:<24} {value}", truncate(&r.region, 24)).trim_end());
        out.push('\n');
    }

    let failures: Vec<&PredictionResult> = results.iter().filter(|r| r.outcome.is_err()).collect();
    if !failures.is_empty() {
        out.push('\n');
        for r in failures {
            if let Err(err) = &r.outcome {
                out.push_str(&format!("warning: {err}\n"));
            }
        }
    }

    out
}

/// Format a time series as a two-column table.
pub fn format_trend(title: &str, points: &[TrendPoint]) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    if points.is_empty() {
        out.push_str("  (no data)\n");
        return out;
    }

    out.push_str(&format!("{:<10} {:>10}\n", "month", "price"));
    out.push_str(&format!("{:-<10} {:-<10}\n", "", ""));
    for p in points {
        out.push_str(&format!("{:<10} {:>10.2}\n", p.date.format("%Y-%m").to_string(), p.price));
    }
    out
}

/// Format what was loaded: row counts, date span, price range, category domains.
pub fn format_dataset_summary(dataset: &Dataset, categories: &Categories) -> String {
    let s = &dataset.stats;
    let mut out = String::new();

    out.push_str("=== fuel - price data ===\n");
    out.push_str(&format!("Source: {}\n", dataset.source.display()));
    out.push_str(&format!(
        "Rows: read={} | used={} | dropped={}\n",
        dataset.rows_read,
        dataset.records.len(),
        dataset.row_errors.len()
    ));
    out.push_str(&format!(
        "Months: {} .. {}\n",
        s.first_month.format("%Y-%m"),
        s.last_month.format("%Y-%m")
    ));
    out.push_str(&format!(
        "Price: min={:.2} | mean={:.2} | max={:.2}\n",
        s.price_min, s.price_mean, s.price_max
    ));
    out.push_str(&format!(
        "Regions ({}): {}\n",
        categories.regions.len(),
        categories.regions.join(", ")
    ));
    out.push_str(&format!(
        "Fuel types ({}): {}\n",
        categories.fuel_types.len(),
        categories.fuel_types.join(", ")
    ));

    // A handful of row errors is enough to spot a systematic problem.
    for e in dataset.row_errors.iter().take(5) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if dataset.row_errors.len() > 5 {
        out.push_str(&format!("  ... {} more\n", dataset.row_errors.len() - 5));
    }

    out
}

/// Format the fitted model: diagnostics, coefficient table and warnings.
pub fn format_model_summary(session: &Session) -> String {
    let model = &session.model;
    let d = &model.diagnostics;
    let mut out = String::new();

    out.push_str("\nRegression model:\n");
    out.push_str(&format!(
        "- rows={} columns={} rank={} | rmse={:.4} | r2={}\n",
        d.n_rows,
        d.n_columns,
        d.rank,
        d.rmse,
        fmt_opt(d.r_squared)
    ));
    out.push_str(&format!(
        "- singular values: max={:.4e} min={:.4e} | rank tolerance={:.4e}\n",
        d.max_singular_value, d.min_singular_value, d.rank_tolerance
    ));
    let references: Vec<String> = session
        .schema
        .references()
        .iter()
        .map(|(field, value)| format!("{}={value}", field.column_name()))
        .collect();
    out.push_str(&format!("- reference levels: {}\n", references.join(", ")));

    out.push_str(&format!("{:<32} {:>14}\n", "column", "coefficient"));
    out.push_str(&format!("{:-<32} {:-<14}\n", "", ""));
    out.push_str(&format!("{:<32} {:>14.6}\n", "(intercept)", model.intercept));
    for (name, beta) in model.column_names.iter().zip(&model.coefficients) {
        out.push_str(&format!("{:<32} {beta:>14.6}\n", truncate(name, 32)));
    }

    if let Some(m) = &session.evaluation {
        out.push_str(&format!(
            "\nHoldout ({} rows): rmse={:.4} | mae={:.4} | r2={}\n",
            m.n,
            m.rmse,
            m.mae,
            fmt_opt(m.r_squared)
        ));
    }

    for w in &session.warnings {
        out.push_str(&format!("warning: {w}\n"));
    }

    out
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.4}")).unwrap_or_else(|| "n/a".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::month_start;
    use crate::error::AppError;

    #[test]
    fn prediction_table_marks_missing_regions() {
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

        let txt = format_predictions(&request, PredictMode::Lookup, &results);
        let expected = concat!(
            "Estimated Regular prices for 2023-01 (historical lookup)\n",
            "region                          price\n",
            "------------------------ ------------\n",
            "CDMX                            22.50\n",
            "Oaxaca                        no data\n",
            "\n",
            "warning: No historical prices for Oaxaca.\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn trend_table_lists_months() {
        let points = vec![
            TrendPoint {
                date: month_start(2023, 1).unwrap(),
                price: 22.5,
            },
            TrendPoint {
                date: month_start(2023, 2).unwrap(),
                price: 23.0,
            },
        ];
        let txt = format_trend("CDMX - Regular", &points);
        assert!(txt.starts_with("CDMX - Regular\n"));
        assert!(txt.contains("2023-01         22.50\n"));
        assert!(txt.contains("2023-02         23.00\n"));
        assert!(format_trend("x", &[]).contains("(no data)"));
    }

    #[test]
    fn model_summary_reports_conditioning() {
        use std::path::PathBuf;

        use crate::domain::{PriceRecord, RunConfig};

        let records = [("CDMX", 1, 22.5), ("CDMX", 2, 23.0), ("Jalisco", 1, 21.8)]
            .iter()
            .map(|&(region, month, price)| PriceRecord {
                region: region.to_string(),
                year: 2023,
                month,
                fuel_type: "Regular".to_string(),
                price,
            })
            .collect();
        let config = RunConfig {
            data_path: PathBuf::new(),
            mode: PredictMode::Regression,
            holdout: 0.0,
            seed: 42,
            strict: false,
        };
        let session = Session::from_dataset(Dataset::from_records(records).unwrap(), &config).unwrap();
        assert!(session.model.diagnostics.rank_tolerance > 0.0);

        let txt = format_model_summary(&session);
        assert!(txt.contains("rank=2"));
        assert!(txt.contains("rank tolerance="));
        assert!(txt.contains("- reference levels: region=CDMX, fuel_type=Regular\n"));
        assert!(txt.contains("region_Jalisco"));
        assert!(txt.contains("warning: Design matrix is rank deficient"));
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
