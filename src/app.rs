//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and the optional `.env` file
//! - sets up logging
//! - resolves the data file (flag, `FUEL_DATA`, or the picker)
//! - builds the session and prints reports/plots

use std::path::PathBuf;

use chrono::Datelike;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DataArgs, HistoryArgs, PredictArgs, SummaryArgs, TuiArgs};
use crate::domain::{OutputFormat, PredictMode, PredictionRequest, RunConfig};
use crate::error::AppError;

pub mod pipeline;

use pipeline::Session;

/// Entry point for the `fuel` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is the normal case.
    dotenvy::dotenv().ok();

    // We want `fuel` and `fuel -d precios.xlsx` to behave like `fuel tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Predict(args) => handle_predict(args),
        Command::History(args) => handle_history(args),
        Command::Summary(args) => handle_summary(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    init_logging(args.data.verbose, false);
    let config = run_config_from_args(&args.data, args.mode)?;
    let session = Session::build(&config)?;

    let request = prediction_request(&session, &args)?;
    let results = session.predict(args.mode, &request);

    match args.format {
        OutputFormat::Table => {
            println!(
                "{}",
                crate::report::format_predictions(&request, args.mode, &results)
            );
            let plotted_region = request.regions.first().filter(|_| args.plot);
            if let Some(region) = plotted_region {
                println!(
                    "{}",
                    history_plot(&session, region, &request.fuel_type, args.plot_size.width, args.plot_size.height)
                );
            }
        }
        OutputFormat::Json => {
            let mut report =
                crate::report::PredictionReport::new(&request, args.mode, &results, &session.warnings);
            if args.mode == PredictMode::Regression {
                report = report.with_model(&session.model.diagnostics, session.evaluation.as_ref());
            }
            println!("{}", crate::report::to_json(&report)?);
        }
    }

    if results.iter().all(|r| r.outcome.is_err()) {
        return Err(AppError::no_matching_data(
            "No estimate could be produced for any requested region.",
        ));
    }
    Ok(())
}

fn handle_history(args: HistoryArgs) -> Result<(), AppError> {
    init_logging(args.data.verbose, false);
    let config = run_config_from_args(&args.data, PredictMode::Lookup)?;
    let session = Session::build(&config)?;

    let region = pick_category(args.region, &session.categories.regions, "region")?;
    let fuel = pick_category(args.fuel, &session.categories.fuel_types, "fuel type")?;

    let history = crate::aggregate::trend_series(&session.dataset.records, &region, &fuel);
    let national = crate::aggregate::national_monthly_average(&session.dataset.records, &fuel);

    match args.format {
        OutputFormat::Table => {
            println!("{}", crate::report::format_trend(&format!("{region} - {fuel}"), &history));
            println!(
                "{}",
                crate::report::format_trend(&format!("National average - {fuel}"), &national)
            );
            if !args.no_plot {
                println!(
                    "{}",
                    history_plot(&session, &region, &fuel, args.plot_size.width, args.plot_size.height)
                );
            }
        }
        OutputFormat::Json => {
            let report = crate::report::TrendReport {
                region: &region,
                fuel_type: &fuel,
                history: &history,
                national_average: &national,
            };
            println!("{}", crate::report::to_json(&report)?);
        }
    }

    if history.is_empty() {
        return Err(AppError::no_matching_data(format!(
            "No historical prices for {region} / {fuel}."
        )));
    }
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    init_logging(args.data.verbose, false);
    let config = run_config_from_args(&args.data, PredictMode::Regression)?;
    let session = Session::build(&config)?;

    println!(
        "{}",
        crate::report::format_dataset_summary(&session.dataset, &session.categories)
    );
    println!("{}", crate::report::format_model_summary(&session));
    Ok(())
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    // Log lines would tear the alternate screen, so the TUI stays silent unless asked.
    init_logging(args.data.verbose, true);
    let config = run_config_from_args(&args.data, args.mode)?;
    let session = Session::build(&config)?;
    crate::tui::run(&session, config.mode)
}

pub fn run_config_from_args(args: &DataArgs, mode: PredictMode) -> Result<RunConfig, AppError> {
    if !(args.holdout.is_finite() && (0.0..1.0).contains(&args.holdout)) {
        return Err(AppError::usage(format!(
            "--holdout must be in [0, 1), got {}.",
            args.holdout
        )));
    }

    Ok(RunConfig {
        data_path: resolve_data_path(args.data.clone())?,
        mode,
        holdout: args.holdout,
        seed: args.seed,
        strict: args.strict,
    })
}

fn resolve_data_path(path: Option<PathBuf>) -> Result<PathBuf, AppError> {
    match path {
        Some(path) => Ok(path),
        None => crate::cli::picker::prompt_for_data_path(),
    }
}

/// Fill in defaults from the data for everything the user left out.
fn prediction_request(session: &Session, args: &PredictArgs) -> Result<PredictionRequest, AppError> {
    let regions = if args.regions.is_empty() {
        vec![pick_category(None, &session.categories.regions, "region")?]
    } else {
        args.regions.clone()
    };
    let last = session.dataset.stats.last_month;
    let request = PredictionRequest {
        regions,
        year: args.year.unwrap_or_else(|| last.year()),
        month: args.month.unwrap_or_else(|| last.month()),
        fuel_type: pick_category(args.fuel.clone(), &session.categories.fuel_types, "fuel type")?,
    };
    debug!(?request, "prediction request");
    Ok(request)
}

fn pick_category(value: Option<String>, domain: &[String], what: &str) -> Result<String, AppError> {
    match value {
        Some(v) => Ok(v),
        None => domain
            .first()
            .cloned()
            .ok_or_else(|| AppError::data_unavailable(format!("The data has no {what} values."))),
    }
}

fn history_plot(session: &Session, region: &str, fuel: &str, width: usize, height: usize) -> String {
    let history = crate::aggregate::trend_series(&session.dataset.records, region, fuel);
    let national = crate::aggregate::national_monthly_average(&session.dataset.records, fuel);
    let label = format!("{region} - {fuel}");
    let series = [
        crate::plot::Series {
            label: &label,
            marker: 'o',
            line: '-',
            points: &history,
        },
        crate::plot::Series {
            label: "national average",
            marker: '+',
            line: '.',
            points: &national,
        },
    ];
    crate::plot::render_trend_plot(&series, width, height)
}

/// Route `tracing` output to stderr so stdout stays clean for reports and JSON.
///
/// `-v` raises the default level (warn -> info -> debug); `RUST_LOG` wins when set.
fn init_logging(verbose: u8, quiet: bool) {
    let default = match (verbose, quiet) {
        (0, true) => "off",
        (0, false) => "warn",
        (1, _) => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // `try_init` so a second call (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Rewrite argv so `fuel` defaults to `fuel tui`.
///
/// Rules:
/// - `fuel`                      -> `fuel tui`
/// - `fuel -d precios.xlsx ...`  -> `fuel tui -d precios.xlsx ...`
/// - `fuel --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "predict" | "history" | "summary" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}
