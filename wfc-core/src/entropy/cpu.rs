use crate::entropy::{EntropyCalculator, SelectionStrategy};
use crate::grid::{Coords, EntropyGrid, PossibilityGrid};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;

/// CPU implementation of the [`EntropyCalculator`] trait.
#[derive(Debug, Clone, Default)]
pub struct CpuEntropyCalculator {
    strategy: SelectionStrategy,
}

impl CpuEntropyCalculator {
    pub fn new(strategy: SelectionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }
}

impl EntropyCalculator for CpuEntropyCalculator {
    fn calculate_entropy(&self, grid: &PossibilityGrid) -> EntropyGrid {
        let cells = grid.cells();
        let mut entropy_grid = EntropyGrid::new(cells.width, cells.height, cells.depth);

        entropy_grid
            .data
            .par_iter_mut()
            .zip(cells.data.par_iter())
            .for_each(|(entropy_cell, possibilities)| {
                *entropy_cell = possibilities.count_ones();
            });

        entropy_grid
    }

    fn select_lowest_entropy_cell(&self, entropy_grid: &EntropyGrid, rng: &mut StdRng) -> Option<Coords> {
        // Single pass: track the minimum size seen and every index achieving it.
        let mut min_size = usize::MAX;
        let mut lowest: Vec<usize> = Vec::new();
        for (index, &size) in entropy_grid.data.iter().enumerate() {
            if size < 2 {
                continue;
            }
            if size < min_size {
                min_size = size;
                lowest.clear();
            }
            if size == min_size {
                lowest.push(index);
            }
        }

        let chosen = match self.strategy {
            SelectionStrategy::FirstMinimum => lowest.first().copied(),
            SelectionStrategy::RandomLowest => lowest.choose(rng).copied(),
        }?;
        Some(entropy_grid.coords_of(chosen))
    }
}
