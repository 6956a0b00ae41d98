//! Solver side of the wave function collapse engine.
//!
//! Holds the possibility grid, the queue-based propagation engine, the cell
//! and module selection heuristics, and the driver that ties them together.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use wfc_rules::CatalogError;

/// Boundary shell and seed cell restrictions.
pub mod boundary;
/// Ordered log of grid mutations.
pub mod changelog;
/// Cell selection by minimum domain size.
pub mod entropy;
/// Generic 3D grid structures and the possibility grid.
pub mod grid;
/// Constraint propagation logic and traits.
pub mod propagator;
/// The driver loop.
pub mod runner;
/// Module selection policies.
pub mod selection;

pub use crate::boundary::{BoundarySeeding, SeedCell};
pub use crate::changelog::{ChangeEvent, ChangeKind, ChangeLog, ChangeLogDetail};
pub use crate::entropy::{CpuEntropyCalculator, EntropyCalculator, SelectionStrategy};
pub use crate::grid::{Coords, EntropyGrid, Grid, GridDimensions, GridError, PossibilityGrid};
pub use crate::propagator::{
    ConstraintPropagator, CpuConstraintPropagator, DomainUpdate, PropagationError, PropagationOutcome,
};
pub use crate::runner::{
    run, ProgressCallback, RunSummary, Solver, SolverState, WfcConfig, WfcConfigBuilder, WfcOutcome,
};
pub use crate::selection::{ModuleSelector, PlacementCounts, Selection, SelectionPolicy, UsageScope};

/// Errors that can occur while setting up or driving a solve.
///
/// Contradictions are not errors; they end a run in
/// [`SolverState::Contradicted`].
#[derive(Error, Debug)]
pub enum WfcError {
    /// Invalid run configuration (dimensions, seeds, policy parameters).
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A grid access failed; indicates an internal invariant violation.
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),
    /// An error occurred during the constraint propagation phase.
    #[error("Propagation error: {0}")]
    Propagation(#[from] PropagationError),
    /// A module name could not be resolved against the catalog.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    /// Run was interrupted by the external shutdown signal (e.g., Ctrl+C).
    #[error("Run interrupted by signal")]
    Interrupted,
    /// The configured maximum number of iterations was reached.
    #[error("Maximum iterations ({0}) reached")]
    MaxIterationsReached(u64),
    /// An unexpected internal error occurred.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Information about the current state of a run, passed to progress callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgressInfo {
    /// Number of decided cells.
    pub collapsed_cells: usize,
    /// The total number of cells in the grid.
    pub total_cells: usize,
    /// Number of cells with an empty domain.
    pub contradicted_cells: usize,
    /// Time elapsed since the run started.
    pub elapsed_time: Duration,
    /// The number of iterations completed so far.
    pub iterations: u64,
}
