use anyhow::Result;
use clap::Parser;
use socket_forge::{config::CliArgs, logging, output, setup::execution, AppConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();
    let config = AppConfig::load(&cli)?;

    logging::init_logger(&config);
    log::info!("socket-forge starting");
    log::debug!("Loaded config: {:?}", config);

    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal = Arc::clone(&shutdown_signal);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Ctrl+C received, stopping after the current iteration");
            signal.store(true, Ordering::Relaxed);
        }
    });

    let summary = execution::run_standard_mode(&config, shutdown_signal).await?;
    output::print_summary(&summary);

    log::info!("socket-forge finished");
    Ok(())
}
