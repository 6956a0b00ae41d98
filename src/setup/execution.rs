//! Handles the core execution logic: load, solve, export.

use crate::{
    config::AppConfig,
    error::AppError,
    output,
    progress::{progress_callback, ConsoleProgressReporter, ProgressReporter, SharedReporter},
};
use log::{debug, info, warn};
use std::sync::{atomic::AtomicBool, Arc, Mutex};
use wfc_core::{RunSummary, WfcConfig, WfcError, WfcOutcome};
use wfc_rules::{loader::load_from_file, ModuleCatalog};

/// Builds the solver configuration from application settings.
pub fn build_wfc_config(
    config: &AppConfig,
    shutdown_signal: Arc<AtomicBool>,
    reporter: Option<SharedReporter>,
) -> Result<WfcConfig, AppError> {
    let mut builder = WfcConfig::builder()
        .selection_policy(config.selection_policy()?)
        .cell_selection(config.tie_break)
        .boundary(config.boundary_seeding())
        .change_log_detail(config.change_log_detail)
        .shutdown_signal(shutdown_signal);

    for seed_cell in config.seed_cells()? {
        builder = builder.seed_cell(seed_cell);
    }
    if let Some(seed) = config.seed {
        builder = builder.seed(seed);
    }
    if let Some(max) = config.max_iterations {
        builder = builder.max_iterations(max);
    }
    if let Some(reporter) = reporter {
        builder = builder.progress_callback(progress_callback(reporter));
    }
    Ok(builder.build())
}

/// Loads the catalog, runs the solver on a blocking worker and writes the
/// requested outputs.
///
/// A contradicted run is still a finished run: its grid and summary are
/// written and `Ok` is returned.
pub async fn run_standard_mode(
    config: &AppConfig,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<RunSummary, AppError> {
    let catalog_path = config
        .catalog
        .clone()
        .ok_or_else(|| AppError::Config("no catalog given".into()))?;

    info!("Loading catalog from: {:?}", catalog_path);
    let catalog = load_from_file(&catalog_path)?;
    info!(
        "Catalog loaded: {} base tiles, {} modules, {:?} topology",
        catalog.base_tiles().len(),
        catalog.len(),
        catalog.topology()
    );

    let reporter = config
        .progress_interval()?
        .map(|interval| Arc::new(Mutex::new(ConsoleProgressReporter::new(interval))) as SharedReporter);
    let wfc_config = build_wfc_config(config, shutdown_signal, reporter.clone())?;
    debug!("Solver configuration: {:?}", wfc_config);

    let dimensions = config.dimensions();
    info!(
        "Running solver on a {}x{}x{} grid",
        dimensions.width, dimensions.height, dimensions.depth
    );

    let catalog = Arc::new(catalog);
    let worker_catalog = Arc::clone(&catalog);
    let result = tokio::task::spawn_blocking(move || {
        wfc_core::run(&worker_catalog, dimensions, &wfc_config)
    })
    .await?;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(error) => {
            if let Some(reporter) = &reporter {
                report_failure(reporter, &error);
            }
            return Err(error.into());
        }
    };
    if let Some(reporter) = &reporter {
        if let Ok(mut guard) = reporter.lock() {
            guard.finish(&outcome.summary)?;
        }
    }

    write_outputs(config, &catalog, &outcome)?;
    Ok(outcome.summary)
}

// The solver error is what the caller sees; a reporter failing on top of it is only logged.
fn report_failure(reporter: &SharedReporter, error: &WfcError) {
    match reporter.lock() {
        Ok(mut guard) => {
            if let Err(e) = guard.fail(error) {
                warn!("Progress reporter failed: {e}");
            }
        }
        Err(_) => warn!("Progress reporter lock poisoned; run failure not reported"),
    }
}

/// Writes the grid and the optional change log and summary exports.
pub fn write_outputs(config: &AppConfig, catalog: &ModuleCatalog, outcome: &WfcOutcome) -> Result<(), AppError> {
    output::save_grid_to_file(&outcome.grid, catalog, &config.output)?;
    if let Some(path) = &config.change_log_csv {
        output::write_change_log_csv(&outcome.change_log, catalog, path)?;
    }
    if let Some(path) = &config.summary_json {
        output::write_summary_json(&outcome.summary, path)?;
    }
    Ok(())
}
