use thiserror::Error;
use wfc_core::WfcError;
use wfc_rules::LoadError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Settings Error: {0}")]
    Settings(#[from] figment::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog Error: {0}")]
    Catalog(#[from] LoadError),

    #[error("WFC Core Error: {0}")]
    WfcCore(#[from] WfcError),

    #[error("Solver task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
