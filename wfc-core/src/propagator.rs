//! Constraint propagation logic and traits.

use crate::grid::{Coords, GridError, PossibilityGrid};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;
use wfc_rules::ModuleCatalog;

pub mod cpu;

pub use cpu::CpuConstraintPropagator;

/// Errors that can occur during the constraint propagation phase.
///
/// Contradictions are *not* errors: they are reported through
/// [`PropagationOutcome::contradictions`] and the run carries on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropagationError {
    /// A grid access failed.
    #[error("Grid access failed during propagation: {0}")]
    Grid(#[from] GridError),
    /// The grid's domains were sized for a different catalog.
    #[error("Grid holds {grid} modules per cell but the catalog has {catalog}")]
    CatalogMismatch {
        /// Domain length in the grid.
        grid: usize,
        /// Catalog size.
        catalog: usize,
    },
    /// An internal error within the propagation logic.
    #[error("Internal propagation error: {0}")]
    InternalError(String),
}

/// A single domain narrowing applied during propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DomainUpdate {
    /// The narrowed cell.
    pub coords: Coords,
    /// The cell whose domain caused the narrowing.
    pub source: Coords,
    /// Domain size after the narrowing.
    pub remaining: usize,
}

/// What a propagation pass did to the grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PropagationOutcome {
    /// Every narrowing in application order.
    pub updates: Vec<DomainUpdate>,
    /// Cells whose domain became empty during this pass.
    pub contradictions: Vec<Coords>,
    /// Number of domain narrowings applied (`updates.len()`).
    pub steps: usize,
}

impl PropagationOutcome {
    /// Whether any cell became empty.
    pub fn has_contradiction(&self) -> bool {
        !self.contradictions.is_empty()
    }

    /// Folds another pass into this one.
    pub fn merge(&mut self, other: Self) {
        self.steps += other.steps;
        self.updates.extend(other.updates);
        self.contradictions.extend(other.contradictions);
    }
}

/// Trait defining the interface for a constraint propagation algorithm.
///
/// Implementors update the `PossibilityGrid` after some cells were narrowed
/// (a collapse, a boundary seed) so that every undecided neighbour only keeps
/// modules supported by the link graph.
pub trait ConstraintPropagator: Send + Sync + Debug {
    /// Propagates constraints starting from a list of initially updated cells.
    ///
    /// # Arguments
    ///
    /// * `grid` - The possibility grid to update in place.
    /// * `updated_coords` - Cells whose domains were just changed.
    /// * `catalog` - The module catalog providing the link graph.
    ///
    /// # Returns
    ///
    /// * `Ok(PropagationOutcome)` describing every narrowing, including any
    ///   contradictions reached.
    /// * `Err(PropagationError)` only for internal failures.
    fn propagate(
        &mut self,
        grid: &mut PossibilityGrid,
        updated_coords: Vec<Coords>,
        catalog: &ModuleCatalog,
    ) -> Result<PropagationOutcome, PropagationError>;
}
