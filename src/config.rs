//! Command line and file configuration.
//!
//! Settings are layered with figment: built-in defaults, then an optional
//! TOML file (`--config`), then `SOCKET_FORGE_*` environment variables, then
//! flags given on the command line.

use crate::error::AppError;
use clap::{Parser, ValueEnum};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use wfc_core::{
    BoundarySeeding, ChangeLogDetail, GridDimensions, SeedCell, SelectionPolicy, SelectionStrategy,
    UsageScope,
};

/// Prefix for environment overrides, e.g. `SOCKET_FORGE_WIDTH=12`.
pub const ENV_PREFIX: &str = "SOCKET_FORGE_";

/// Module selection policy names accepted on the command line.
#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Least placed module first.
    #[default]
    LowestUsage,
    /// Repeat self-attracting modules up to a streak cap.
    Override,
    /// Uniform random pick.
    Uniform,
    /// Favour one module with a fixed probability.
    Preferred,
}

/// Whether the outer shell of the grid is pre-restricted.
#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryKind {
    /// No pre-restriction.
    #[default]
    None,
    /// Restrict every cell on an outer face to the boundary modules.
    Shell,
}

/// Default log level when `RUST_LOG` is not set.
#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The matching `log` filter.
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

/// Command line flags. Every setting is optional here so that only flags the
/// user actually passed override the lower layers.
#[derive(Parser, Serialize, Debug, Default)]
#[command(author, version, about = "Socket-based wave function collapse solver", long_about = None)]
pub struct CliArgs {
    /// Optional TOML file with settings.
    #[arg(long, value_name = "FILE")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Catalog file (RON or JSON) with the tile definitions.
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    /// Width of the output grid.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,

    /// Height of the output grid.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<usize>,

    /// Depth of the output grid (must be 1 for planar catalogs).
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,

    /// Seed for the random number generator; time-derived when absent.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Module selection policy.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyKind>,

    /// Counter balanced by the lowest-usage policy.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_scope: Option<UsageScope>,

    /// Longest run of one module the override policy may produce.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_consecutive_overrides: Option<u32>,

    /// Module favoured by the preferred policy.
    #[arg(long, value_name = "MODULE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_module: Option<String>,

    /// Probability of picking the preferred module when it is possible.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_probability: Option<f64>,

    /// Tie-break between equally constrained cells.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tie_break: Option<SelectionStrategy>,

    /// Boundary seeding mode.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary: Option<BoundaryKind>,

    /// Modules allowed on the boundary shell (comma separated).
    #[arg(long, value_delimiter = ',', value_name = "MODULES")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub boundary_modules: Vec<String>,

    /// Pre-restricted cell, `x,y,z=module[|module...]`. May be repeated.
    #[arg(long = "seed-cell", value_name = "CELL")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seed_cells: Vec<String>,

    /// Abort after this many iterations.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u64>,

    /// How much the change log records.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_log_detail: Option<ChangeLogDetail>,

    /// Path to save the generated grid.
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Optional CSV export of the change log.
    #[arg(long, value_name = "CSV_FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_log_csv: Option<PathBuf>,

    /// Optional JSON export of the run summary.
    #[arg(long, value_name = "JSON_FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_json: Option<PathBuf>,

    /// Report progress updates every specified interval (e.g., "1s", "500ms").
    #[arg(long, value_name = "DURATION")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_progress_interval: Option<String>,

    /// Default log level when RUST_LOG is not set.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

/// Fully resolved settings.
///
/// Each field carries the flag of the same name in [`CliArgs`] after the
/// defaults, the TOML file and the environment have been merged under it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog file; required before a run starts.
    pub catalog: Option<PathBuf>,
    /// Grid width in cells.
    pub width: usize,
    /// Grid height in cells.
    pub height: usize,
    /// Grid depth in cells; 1 for planar catalogs.
    pub depth: usize,
    /// RNG seed; time-derived when absent.
    pub seed: Option<u64>,
    pub policy: PolicyKind,
    /// Counter used by the lowest-usage policy.
    pub usage_scope: UsageScope,
    /// Streak cap for the override policy.
    pub max_consecutive_overrides: u32,
    /// Module name for the preferred policy.
    pub preferred_module: Option<String>,
    /// Chance of taking the preferred module, in `0..=1`.
    pub preferred_probability: f64,
    /// Tie-break between cells of equal entropy.
    pub tie_break: SelectionStrategy,
    pub boundary: BoundaryKind,
    /// Module names allowed on the shell when `boundary` is `shell`.
    pub boundary_modules: Vec<String>,
    /// Unparsed `x,y,z=module[|module...]` entries.
    pub seed_cells: Vec<String>,
    /// Iteration limit; unlimited when absent.
    pub max_iterations: Option<u64>,
    pub change_log_detail: ChangeLogDetail,
    /// Text grid output path.
    pub output: PathBuf,
    /// CSV change log export path.
    pub change_log_csv: Option<PathBuf>,
    /// JSON summary export path.
    pub summary_json: Option<PathBuf>,
    /// Humantime interval such as `"500ms"`; no progress reports when absent.
    pub report_progress_interval: Option<String>,
    /// Default log level when `RUST_LOG` is not set.
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            width: 10,
            height: 10,
            depth: 1,
            seed: None,
            policy: PolicyKind::default(),
            usage_scope: UsageScope::default(),
            max_consecutive_overrides: 5,
            preferred_module: None,
            preferred_probability: 0.66,
            tie_break: SelectionStrategy::default(),
            boundary: BoundaryKind::default(),
            boundary_modules: Vec::new(),
            seed_cells: Vec::new(),
            max_iterations: None,
            change_log_detail: ChangeLogDetail::default(),
            output: PathBuf::from("output.txt"),
            change_log_csv: None,
            summary_json: None,
            report_progress_interval: None,
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    /// Builds the figment for the given flags: defaults, TOML file,
    /// environment, then the flags themselves.
    pub fn figment(cli: &CliArgs) -> Result<Figment, AppError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = &cli.config {
            if !path.is_file() {
                return Err(AppError::Config(format!(
                    "configuration file {} does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(cli)))
    }

    /// Resolves and validates the settings for the given flags.
    pub fn load(cli: &CliArgs) -> Result<Self, AppError> {
        let config: Self = Self::figment(cli)?.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks what can be checked without the catalog.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.catalog.is_none() {
            return Err(AppError::Config(
                "no catalog given (use --catalog or set `catalog` in the config file)".into(),
            ));
        }
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(AppError::Config(format!(
                "grid extents must be positive, got {}x{}x{}",
                self.width, self.height, self.depth
            )));
        }
        if self.policy == PolicyKind::Preferred && self.preferred_module.is_none() {
            return Err(AppError::Config(
                "the preferred policy needs --preferred-module".into(),
            ));
        }
        if self.boundary == BoundaryKind::Shell && self.boundary_modules.is_empty() {
            return Err(AppError::Config(
                "shell boundary seeding needs --boundary-modules".into(),
            ));
        }
        self.progress_interval()?;
        self.seed_cells()?;
        Ok(())
    }

    /// Grid size as solver dimensions.
    pub fn dimensions(&self) -> GridDimensions {
        GridDimensions::new(self.width, self.height, self.depth)
    }

    /// The solver policy for `policy` and its parameters.
    ///
    /// # Errors
    ///
    /// `AppError::Config` when the preferred policy has no module set.
    pub fn selection_policy(&self) -> Result<SelectionPolicy, AppError> {
        Ok(match self.policy {
            PolicyKind::LowestUsage => SelectionPolicy::LowestUsage {
                scope: self.usage_scope,
            },
            PolicyKind::Override => SelectionPolicy::Override {
                max_consecutive: self.max_consecutive_overrides,
            },
            PolicyKind::Uniform => SelectionPolicy::Uniform,
            PolicyKind::Preferred => SelectionPolicy::Preferred {
                module: self
                    .preferred_module
                    .clone()
                    .ok_or_else(|| AppError::Config("no preferred module set".into()))?,
                probability: self.preferred_probability,
            },
        })
    }

    /// The solver boundary mode for `boundary`.
    pub fn boundary_seeding(&self) -> BoundarySeeding {
        match self.boundary {
            BoundaryKind::None => BoundarySeeding::None,
            BoundaryKind::Shell => BoundarySeeding::Shell {
                modules: self.boundary_modules.clone(),
            },
        }
    }

    /// Parses every seed cell entry.
    pub fn seed_cells(&self) -> Result<Vec<SeedCell>, AppError> {
        self.seed_cells.iter().map(|text| parse_seed_cell(text)).collect()
    }

    /// Parses the progress interval, if one is set.
    pub fn progress_interval(&self) -> Result<Option<Duration>, AppError> {
        self.report_progress_interval
            .as_deref()
            .map(|text| {
                humantime::parse_duration(text).map_err(|e| {
                    AppError::Config(format!("invalid progress interval '{text}': {e}"))
                })
            })
            .transpose()
    }
}

/// Parses `x,y,z=module[|module...]`.
pub fn parse_seed_cell(text: &str) -> Result<SeedCell, AppError> {
    let invalid = || AppError::Config(format!("invalid seed cell '{text}', expected x,y,z=module[|module]"));
    let (coords, modules) = text.split_once('=').ok_or_else(invalid)?;
    let parts: Vec<usize> = coords
        .split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;
    let [x, y, z] = parts[..] else {
        return Err(invalid());
    };
    let modules: Vec<&str> = modules
        .split('|')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    if modules.is_empty() {
        return Err(invalid());
    }
    Ok(SeedCell::new((x, y, z), modules))
}
