use crate::grid::{Coords, EntropyGrid, PossibilityGrid};
use rand::rngs::StdRng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod cpu;

pub use cpu::CpuEntropyCalculator;

/// How to break ties between cells sharing the minimum domain size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SelectionStrategy {
    /// Uniform random choice among all minimum cells. Different seeds give
    /// different layouts from the same catalog.
    #[default]
    RandomLowest,
    /// The first minimum cell in storage order (x fastest, then y, then z).
    FirstMinimum,
}

/// Picks the next cell to collapse.
///
/// "Entropy" here is the domain size: lower means more constrained.
/// Decided and contradicted cells are never candidates.
pub trait EntropyCalculator: Send + Sync + std::fmt::Debug {
    /// Computes the domain size of every cell.
    #[must_use]
    fn calculate_entropy(&self, grid: &PossibilityGrid) -> EntropyGrid;

    /// Returns the undecided cell (size ≥ 2) with the smallest domain, or
    /// `None` when no undecided cell remains.
    fn select_lowest_entropy_cell(&self, entropy_grid: &EntropyGrid, rng: &mut StdRng) -> Option<Coords>;

    /// Convenience wrapper running both steps.
    fn find_next_cell(&self, grid: &PossibilityGrid, rng: &mut StdRng) -> Option<Coords> {
        let entropy = self.calculate_entropy(grid);
        self.select_lowest_entropy_cell(&entropy, rng)
    }
}
