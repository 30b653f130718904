//! Command-line parsing for the fuel price estimator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the encoding/fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{OutputFormat, PredictMode};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fuel", version, about = "Regional fuel price estimator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate prices for one or more regions in a given month.
    Predict(PredictArgs),
    /// Show the price history of one region next to the national average.
    History(HistoryArgs),
    /// Describe the loaded data and the fitted model.
    Summary(SummaryArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same session pipeline as the other commands, but renders
    /// the form and results in a terminal UI using Ratatui.
    Tui(TuiArgs),
}

/// Options shared by every command.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Price spreadsheet (.csv, .xlsx, .xls, .ods). Prompts when omitted.
    #[arg(short = 'd', long = "data", env = "FUEL_DATA", value_name = "PATH")]
    pub data: Option<PathBuf>,

    /// Fraction of rows held out to report out-of-sample error (0 disables).
    #[arg(long, default_value_t = 0.0)]
    pub holdout: f64,

    /// Seed for the holdout shuffle.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fail instead of warning when the design matrix is rank deficient.
    #[arg(long)]
    pub strict: bool,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Options for plotting to the terminal.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Region to estimate (repeatable). Defaults to the first region in the data.
    #[arg(short = 'r', long = "region", value_name = "REGION")]
    pub regions: Vec<String>,

    /// Year of the estimate. Defaults to the latest year in the data.
    #[arg(long)]
    pub year: Option<i32>,

    /// Month of the estimate (1-12). Defaults to the latest month in the data.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    /// Fuel type. Defaults to the first fuel type in the data.
    #[arg(short = 'f', long = "fuel")]
    pub fuel: Option<String>,

    /// How prices are estimated.
    #[arg(long, value_enum, default_value_t = PredictMode::Regression)]
    pub mode: PredictMode,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Also plot the history of the first region (table output only).
    #[arg(long)]
    pub plot: bool,

    #[command(flatten)]
    pub plot_size: PlotArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Region to chart. Defaults to the first region in the data.
    #[arg(short = 'r', long)]
    pub region: Option<String>,

    /// Fuel type. Defaults to the first fuel type in the data.
    #[arg(short = 'f', long = "fuel")]
    pub fuel: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Skip the ASCII plot drawn under the trend tables.
    #[arg(long)]
    pub no_plot: bool,

    #[command(flatten)]
    pub plot_size: PlotArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Initial estimation mode (toggle with `m` in the TUI).
    #[arg(long, value_enum, default_value_t = PredictMode::Regression)]
    pub mode: PredictMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_accepts_repeated_regions() {
        let cli = Cli::parse_from([
            "fuel", "predict", "-d", "precios.xlsx", "-r", "CDMX", "-r", "Jalisco", "--year", "2023",
            "--month", "2", "--fuel", "Regular", "--mode", "lookup",
        ]);
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.regions, vec!["CDMX", "Jalisco"]);
        assert_eq!(args.month, Some(2));
        assert_eq!(args.mode, PredictMode::Lookup);
        assert_eq!(args.data.data, Some(PathBuf::from("precios.xlsx")));
        assert_eq!(args.data.seed, 42);
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        let res = Cli::try_parse_from(["fuel", "predict", "-d", "x.csv", "--month", "13"]);
        assert!(res.is_err());
    }

    #[test]
    fn history_plot_is_on_unless_disabled() {
        let cli = Cli::parse_from(["fuel", "history", "-d", "x.csv"]);
        let Command::History(args) = cli.command else {
            panic!("expected history");
        };
        assert!(!args.no_plot);

        let cli = Cli::parse_from(["fuel", "history", "-d", "x.csv", "--no-plot"]);
        let Command::History(args) = cli.command else {
            panic!("expected history");
        };
        assert!(args.no_plot);

        assert!(Cli::try_parse_from(["fuel", "history", "-d", "x.csv", "--plot"]).is_err());
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::parse_from(["fuel", "summary", "-d", "x.csv", "-vv"]);
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.data.verbose, 2);
    }
}
