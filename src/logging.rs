//! Logging setup for the application.

use crate::config::AppConfig;
use env_logger::{Builder, Env};

/// Initializes the global logger.
///
/// `RUST_LOG` wins when set; otherwise `config.log_level` is the default
/// filter. Progress reports are logged at `info` under
/// `socket_forge::progress`, so `RUST_LOG=socket_forge::progress=warn`
/// silences them while keeping everything else.
pub fn init_logger(config: &AppConfig) {
    let default_level = config.log_level.to_level_filter().to_string().to_lowercase();
    let env = Env::default().default_filter_or(default_level);

    let mut builder = Builder::from_env(env);
    builder.format_timestamp_millis();

    // A second init (e.g. from tests) keeps the first logger.
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
        return;
    }

    log::debug!("Logger initialized with default level {:?}", config.log_level);
}
