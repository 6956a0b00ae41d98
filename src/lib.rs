//! Command line front end for the socket-based wave function collapse solver.
//!
//! Loads a catalog, resolves settings, drives a run on a worker thread and
//! writes the grid, the change log and the run summary.

pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod setup;

pub use config::{AppConfig, CliArgs};
pub use error::AppError;
