//! `fuel-prices` library crate.
//!
//! The binary (`fuel`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the encoder, fitter and aggregations can be reused by other front-ends
//! - code stays easy to navigate as the project grows

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod domain;
pub mod encode;
pub mod error;
pub mod estimate;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod tui;
