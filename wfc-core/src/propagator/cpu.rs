use crate::{
    grid::{Coords, GridError, PossibilityGrid},
    propagator::{ConstraintPropagator, DomainUpdate, PropagationError, PropagationOutcome},
};
use bitvec::prelude::*;
use log::{trace, warn};
use std::collections::VecDeque;
use wfc_rules::{ModuleCatalog, ModuleId};

/// Queue-based CPU propagator.
///
/// Cells are processed in FIFO order; a cell already waiting in the queue is
/// not enqueued twice. The pass ends when the queue is empty, which is
/// guaranteed because every enqueue follows a strict domain shrink.
///
/// Undecided neighbours are narrowed to what the source supports. Decided
/// neighbours are only checked: one whose module the source cannot support is
/// emptied and reported as a contradiction. Because every cell is processed
/// after it becomes decided, no two adjacent decided cells are left
/// incompatible once the queue drains.
#[derive(Debug, Clone, Default)]
pub struct CpuConstraintPropagator;

impl CpuConstraintPropagator {
    pub fn new() -> Self {
        Self
    }

    /// Union of `links(m, direction)` over every `m` in `source`, written into `reachable`.
    fn reachable_from(
        source: &BitSlice,
        direction: usize,
        catalog: &ModuleCatalog,
        reachable: &mut BitVec,
    ) -> Result<(), PropagationError> {
        reachable.fill(false);
        for module in source.iter_ones() {
            let links = catalog.links(ModuleId(module), direction).ok_or_else(|| {
                PropagationError::InternalError(format!(
                    "No links for module {module} towards direction {direction}"
                ))
            })?;
            for allowed in links.iter_ones() {
                reachable.set(allowed, true);
            }
        }
        Ok(())
    }
}

impl ConstraintPropagator for CpuConstraintPropagator {
    fn propagate(
        &mut self,
        grid: &mut PossibilityGrid,
        updated_coords: Vec<Coords>,
        catalog: &ModuleCatalog,
    ) -> Result<PropagationOutcome, PropagationError> {
        if grid.num_modules() != catalog.len() {
            return Err(PropagationError::CatalogMismatch {
                grid: grid.num_modules(),
                catalog: catalog.len(),
            });
        }
        let topology = catalog.topology();
        let mut outcome = PropagationOutcome::default();

        let mut queue: VecDeque<Coords> = VecDeque::with_capacity(updated_coords.len());
        let mut queued = bitvec![0; grid.cell_count()];
        for coords in updated_coords {
            let idx = grid
                .index_of(coords)
                .ok_or(GridError::OutOfBounds(coords.0, coords.1, coords.2))?;
            if !queued[idx] {
                queued.set(idx, true);
                queue.push_back(coords);
            }
        }

        let mut reachable = bitvec![0; catalog.len()];
        while let Some(cell) = queue.pop_front() {
            let idx = grid
                .index_of(cell)
                .ok_or(GridError::OutOfBounds(cell.0, cell.1, cell.2))?;
            queued.set(idx, false);

            let source = grid
                .domain_at(cell)
                .ok_or(GridError::OutOfBounds(cell.0, cell.1, cell.2))?
                .to_bitvec();
            // An empty cell supports nothing; using it would spread the contradiction.
            if source.not_any() {
                continue;
            }

            for direction in topology.directions() {
                let Some(neighbor) = grid.neighbor(cell, direction, topology) else {
                    continue;
                };
                if grid.domain_len(neighbor).unwrap_or(0) == 0 {
                    continue;
                }

                Self::reachable_from(&source, direction, catalog, &mut reachable)?;
                // Decided neighbours go through the same restriction: a supported one
                // is untouched, an unsupported one is emptied.
                if !grid.restrict(neighbor, &reachable)? {
                    continue;
                }

                let remaining = grid.domain_len(neighbor).unwrap_or(0);
                outcome.steps += 1;
                outcome.updates.push(DomainUpdate {
                    coords: neighbor,
                    source: cell,
                    remaining,
                });
                trace!("{cell:?} -> {neighbor:?}: {remaining} modules left");

                if remaining == 0 {
                    warn!("Contradiction at {neighbor:?} (narrowed from {cell:?})");
                    outcome.contradictions.push(neighbor);
                    continue;
                }
                let n_idx = grid
                    .index_of(neighbor)
                    .ok_or(GridError::OutOfBounds(neighbor.0, neighbor.1, neighbor.2))?;
                if !queued[n_idx] {
                    queued.set(n_idx, true);
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridDimensions;
    use wfc_rules::{sockets, TileDefinition, Topology};

    // Two modules that only fit next to themselves horizontally.
    fn stripes() -> ModuleCatalog {
        let defs = vec![
            TileDefinition::new("red", vec![sockets([9]), sockets([1]), sockets([9]), sockets([1])]),
            TileDefinition::new("blue", vec![sockets([9]), sockets([2]), sockets([9]), sockets([2])]),
        ];
        ModuleCatalog::build(Topology::Planar, &defs).unwrap()
    }

    #[test]
    fn collapse_propagates_along_a_row() {
        let catalog = stripes();
        let mut grid = PossibilityGrid::new(GridDimensions::planar(4, 2), catalog.len());
        let mut propagator = CpuConstraintPropagator::new();

        grid.collapse((0, 0, 0), ModuleId(0)).unwrap();
        let outcome = propagator
            .propagate(&mut grid, vec![(0, 0, 0)], &catalog)
            .unwrap();

        for x in 0..4 {
            assert_eq!(grid.decided_module((x, 0, 0)), Some(ModuleId(0)));
        }
        // The second row is not constrained vertically.
        assert_eq!(grid.domain_len((0, 1, 0)), Some(2));
        assert_eq!(outcome.steps, 3);
        assert!(!outcome.has_contradiction());
        assert_eq!(outcome.updates[0].source, (0, 0, 0));
    }

    #[test]
    fn contradiction_is_reported_not_raised() {
        // No face of either module matches any other face.
        let defs = vec![
            TileDefinition::new("a", vec![sockets([1]), sockets([2]), sockets([3]), sockets([4])]),
            TileDefinition::new("b", vec![sockets([5]), sockets([6]), sockets([7]), sockets([8])]),
        ];
        let catalog = ModuleCatalog::build(Topology::Planar, &defs).unwrap();
        let mut grid = PossibilityGrid::new(GridDimensions::planar(2, 1), catalog.len());
        let mut propagator = CpuConstraintPropagator::new();

        grid.collapse((0, 0, 0), ModuleId(0)).unwrap();
        let outcome = propagator
            .propagate(&mut grid, vec![(0, 0, 0)], &catalog)
            .unwrap();

        assert_eq!(outcome.contradictions, vec![(1, 0, 0)]);
        assert_eq!(outcome.steps, 1);
        assert!(grid.is_contradiction((1, 0, 0)));
        assert_eq!(grid.decided_module((0, 0, 0)), Some(ModuleId(0)));
        assert_eq!(grid.contradicted_cells(), vec![(1, 0, 0)]);
    }

    #[test]
    fn compatible_decided_neighbours_are_left_alone() {
        let catalog = stripes();
        let mut grid = PossibilityGrid::new(GridDimensions::planar(2, 1), catalog.len());
        grid.collapse((0, 0, 0), ModuleId(0)).unwrap();
        grid.collapse((1, 0, 0), ModuleId(0)).unwrap();
        let outcome = CpuConstraintPropagator::new()
            .propagate(&mut grid, vec![(0, 0, 0), (1, 0, 0)], &catalog)
            .unwrap();
        assert_eq!(outcome.steps, 0);
        assert_eq!(grid.decided_module((1, 0, 0)), Some(ModuleId(0)));
    }

    #[test]
    fn incompatible_decided_neighbours_contradict() {
        let catalog = stripes();
        let mut grid = PossibilityGrid::new(GridDimensions::planar(2, 1), catalog.len());
        grid.collapse((0, 0, 0), ModuleId(0)).unwrap();
        grid.collapse((1, 0, 0), ModuleId(1)).unwrap();
        let outcome = CpuConstraintPropagator::new()
            .propagate(&mut grid, vec![(0, 0, 0)], &catalog)
            .unwrap();
        assert_eq!(outcome.steps, 1);
        assert_eq!(outcome.contradictions, vec![(1, 0, 0)]);
        assert_eq!(grid.decided_module((0, 0, 0)), Some(ModuleId(0)));
        assert!(grid.is_contradiction((1, 0, 0)));
    }

    // s sits bottom-left. It forces a above and p to its right; a then forces q
    // into the top-right corner, which p cannot support from below.
    fn forced_corner() -> ModuleCatalog {
        // up, right, down, left; sockets 10.. match nothing.
        let defs = vec![
            TileDefinition::new("s", vec![sockets([1]), sockets([2]), sockets([10]), sockets([11])]),
            TileDefinition::new("a", vec![sockets([12]), sockets([3]), sockets([1]), sockets([13])]),
            TileDefinition::new("p", vec![sockets([4]), sockets([14]), sockets([15]), sockets([2])]),
            TileDefinition::new("q", vec![sockets([16]), sockets([17]), sockets([5]), sockets([3])]),
        ];
        ModuleCatalog::build(Topology::Planar, &defs).unwrap()
    }

    #[test]
    fn cells_forced_along_different_paths_are_checked_against_each_other() {
        let catalog = forced_corner();
        let mut grid = PossibilityGrid::new(GridDimensions::planar(2, 2), catalog.len());
        let s = catalog.id_of("s_0").unwrap();
        grid.collapse((0, 0, 0), s).unwrap();
        let outcome = CpuConstraintPropagator::new()
            .propagate(&mut grid, vec![(0, 0, 0)], &catalog)
            .unwrap();

        assert_eq!(grid.decided_module((0, 1, 0)), catalog.id_of("a_0"));
        assert_eq!(grid.decided_module((1, 0, 0)), catalog.id_of("p_0"));
        assert_eq!(outcome.contradictions, vec![(1, 1, 0)]);
        assert_eq!(grid.contradicted_cells(), vec![(1, 1, 0)]);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let catalog = stripes();
        let mut grid = PossibilityGrid::new(GridDimensions::planar(3, 3), catalog.len());
        let mut propagator = CpuConstraintPropagator::new();

        grid.collapse((1, 1, 0), ModuleId(1)).unwrap();
        propagator
            .propagate(&mut grid, vec![(1, 1, 0)], &catalog)
            .unwrap();
        let snapshot = grid.clone();
        let again = propagator
            .propagate(&mut grid, vec![(1, 1, 0)], &catalog)
            .unwrap();
        assert_eq!(again.steps, 0);
        assert_eq!(grid, snapshot);
    }

    #[test]
    fn catalog_mismatch_is_an_error() {
        let catalog = stripes();
        let mut grid = PossibilityGrid::new(GridDimensions::planar(2, 2), 5);
        let err = CpuConstraintPropagator::new()
            .propagate(&mut grid, vec![(0, 0, 0)], &catalog)
            .unwrap_err();
        assert_eq!(err, PropagationError::CatalogMismatch { grid: 5, catalog: 2 });
    }

    #[test]
    fn out_of_range_start_is_an_error() {
        let catalog = stripes();
        let mut grid = PossibilityGrid::new(GridDimensions::planar(2, 2), catalog.len());
        let err = CpuConstraintPropagator::new()
            .propagate(&mut grid, vec![(5, 0, 0)], &catalog)
            .unwrap_err();
        assert_eq!(err, PropagationError::Grid(GridError::OutOfBounds(5, 0, 0)));
    }
}
