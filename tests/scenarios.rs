//! End-to-end runs over small price files written to a temp directory.

use std::io::Write;
use std::path::PathBuf;

use fuel_prices::app::pipeline::Session;
use fuel_prices::domain::{PredictMode, PredictionRequest, RunConfig};
use fuel_prices::error::ErrorKind;

fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn config(path: PathBuf, mode: PredictMode) -> RunConfig {
    RunConfig {
        data_path: path,
        mode,
        holdout: 0.0,
        seed: 42,
        strict: false,
    }
}

fn request(regions: &[&str], year: i32, month: u32) -> PredictionRequest {
    PredictionRequest {
        regions: regions.iter().map(|r| r.to_string()).collect(),
        year,
        month,
        fuel_type: "Regular".to_string(),
    }
}

const THREE_ROWS: &str = "estado,anio,mes,tipo_combustible,precio\n\
CDMX,2023,1,Regular,22.5\n\
CDMX,2023,2,Regular,23.0\n\
Jalisco,2023,1,Regular,21.8\n";

#[test]
fn lookup_returns_exact_observed_price() {
    let file = write_csv(THREE_ROWS);
    let session = Session::build(&config(file.path().to_path_buf(), PredictMode::Lookup)).unwrap();

    let results = session.predict(PredictMode::Lookup, &request(&["CDMX"], 2023, 1));
    assert_eq!(results[0].estimate(), Some(22.5));
}

#[test]
fn unknown_region_fails_alone() {
    let file = write_csv(THREE_ROWS);
    let session = Session::build(&config(file.path().to_path_buf(), PredictMode::Lookup)).unwrap();

    let results = session.predict(PredictMode::Lookup, &request(&["Oaxaca", "CDMX", "Jalisco"], 2023, 1));
    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].outcome.as_ref().unwrap_err().kind(),
        ErrorKind::NoMatchingData
    );
    assert_eq!(results[1].estimate(), Some(22.5));
    assert_eq!(results[2].estimate(), Some(21.8));
}

#[test]
fn regression_estimates_unobserved_region_month() {
    let file = write_csv(THREE_ROWS);
    let session =
        Session::build(&config(file.path().to_path_buf(), PredictMode::Regression)).unwrap();

    // Three rows cannot pin down an intercept plus three columns.
    assert_eq!(session.warnings.len(), 1);
    assert_eq!(session.warnings[0].kind(), ErrorKind::UnfittableModel);

    let results = session.predict(PredictMode::Regression, &request(&["Jalisco", "CDMX"], 2023, 2));
    let jalisco = results[0].estimate().unwrap();
    let cdmx = results[1].estimate().unwrap();
    assert!((jalisco - 22.3).abs() < 1e-9, "jalisco={jalisco}");
    assert!((cdmx - 23.0).abs() < 1e-9, "cdmx={cdmx}");
}

#[test]
fn strict_mode_rejects_rank_deficient_fit() {
    let file = write_csv(THREE_ROWS);
    let mut cfg = config(file.path().to_path_buf(), PredictMode::Regression);
    cfg.strict = true;
    let err = Session::build(&cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnfittableModel);
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn header_only_file_is_data_unavailable() {
    let file = write_csv("estado,anio,mes,tipo_combustible,precio\n");
    let err = Session::build(&config(file.path().to_path_buf(), PredictMode::Regression)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn rows_that_are_all_invalid_are_data_unavailable() {
    let file = write_csv(
        "region,year,month,fuel_type,price\n\
         CDMX,2023,13,Regular,22.5\n\
         ,2023,1,Regular,22.5\n\
         CDMX,2023,1,Regular,\n",
    );
    let err = Session::build(&config(file.path().to_path_buf(), PredictMode::Lookup)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataUnavailable);
}

#[test]
fn missing_file_is_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = Session::build(&config(dir.path().join("precios.csv"), PredictMode::Lookup)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataUnavailable);
}

#[test]
fn bad_rows_are_dropped_and_the_rest_is_used() {
    let file = write_csv(
        "region,year,month,fuel_type,price\n\
         CDMX,2023,1,Regular,22.5\n\
         CDMX,2023,2,Regular,not-a-price\n\
         Jalisco,2023,1,Regular,21.8\n",
    );
    let session = Session::build(&config(file.path().to_path_buf(), PredictMode::Lookup)).unwrap();
    assert_eq!(session.dataset.len(), 2);
    assert_eq!(session.dataset.row_errors.len(), 1);
    assert_eq!(session.dataset.row_errors[0].line, 3);
}

#[test]
fn holdout_run_is_reproducible() {
    let mut csv = String::from("region,year,month,fuel_type,price\n");
    for (i, region) in ["CDMX", "Jalisco", "Puebla"].iter().enumerate() {
        for year in [2022, 2023] {
            for month in 1..=12u32 {
                let price = 20.0 + i as f64 * 0.7 + f64::from(year - 2022) * 1.5 + f64::from(month) * 0.05;
                csv.push_str(&format!("{region},{year},{month},Regular,{price}\n"));
            }
        }
    }
    let file = write_csv(&csv);
    let mut cfg = config(file.path().to_path_buf(), PredictMode::Regression);
    cfg.holdout = 0.2;

    let a = Session::build(&cfg).unwrap();
    let b = Session::build(&cfg).unwrap();
    let (ma, mb) = (a.evaluation.unwrap(), b.evaluation.unwrap());
    assert_eq!(ma.n, 15);
    assert_eq!(ma, mb);
    assert!(ma.rmse < 1e-8, "rmse={}", ma.rmse);
}
