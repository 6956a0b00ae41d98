use crate::{
    boundary::{resolve_seeds, BoundarySeeding, SeedCell},
    changelog::{ChangeKind, ChangeLog, ChangeLogDetail},
    entropy::{CpuEntropyCalculator, EntropyCalculator, SelectionStrategy},
    grid::{Coords, GridDimensions, GridError, PossibilityGrid},
    propagator::{ConstraintPropagator, CpuConstraintPropagator, PropagationOutcome},
    selection::{ModuleSelector, PlacementCounts, SelectionPolicy},
    ProgressInfo, WfcError,
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use wfc_rules::{ModuleCatalog, ModuleId, Topology};

/// Alias for the complex progress callback function type.
pub type ProgressCallback = Box<dyn Fn(ProgressInfo) -> Result<(), WfcError> + Send + Sync>;

/// Configuration options for a solver run.
pub struct WfcConfig {
    /// Picks the module for a chosen cell.
    pub selection_policy: SelectionPolicy,
    /// Tie-break between cells of equal lowest entropy.
    pub cell_selection: SelectionStrategy,
    /// Modules forced onto the outer shell before the first iteration.
    pub boundary: BoundarySeeding,
    /// Per-cell restrictions applied after the boundary.
    pub seed_cells: Vec<SeedCell>,
    /// Whether narrowing events are kept in the change log.
    pub change_log_detail: ChangeLogDetail,
    /// Called once per iteration with a progress snapshot.
    pub progress_callback: Option<ProgressCallback>,
    /// Checked before every iteration; setting it aborts the run.
    pub shutdown_signal: Arc<AtomicBool>,
    /// Aborts with `WfcError::MaxIterationsReached` when exceeded.
    pub max_iterations: Option<u64>,
    /// RNG seed. `None` derives one from the clock.
    pub seed: Option<u64>,
}

impl WfcConfig {
    /// Creates a new builder for `WfcConfig`.
    pub fn builder() -> WfcConfigBuilder {
        WfcConfigBuilder::default()
    }
}

impl Default for WfcConfig {
    fn default() -> Self {
        Self {
            selection_policy: SelectionPolicy::default(),
            cell_selection: SelectionStrategy::default(),
            boundary: BoundarySeeding::None,
            seed_cells: Vec::new(),
            change_log_detail: ChangeLogDetail::default(),
            progress_callback: None,
            shutdown_signal: Arc::new(AtomicBool::new(false)),
            max_iterations: None,
            seed: None,
        }
    }
}

impl std::fmt::Debug for WfcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WfcConfig")
            .field("selection_policy", &self.selection_policy)
            .field("cell_selection", &self.cell_selection)
            .field("boundary", &self.boundary)
            .field("seed_cells", &self.seed_cells)
            .field("change_log_detail", &self.change_log_detail)
            .field("progress_callback", &self.progress_callback.is_some())
            .field("max_iterations", &self.max_iterations)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

/// Builder for `WfcConfig`.
#[derive(Default)]
pub struct WfcConfigBuilder {
    config: WfcConfig,
    shutdown_signal: Option<Arc<AtomicBool>>,
}

impl WfcConfigBuilder {
    /// Sets the module selection policy.
    pub fn selection_policy(mut self, policy: SelectionPolicy) -> Self {
        self.config.selection_policy = policy;
        self
    }

    /// Sets the tie-break between equally constrained cells.
    pub fn cell_selection(mut self, strategy: SelectionStrategy) -> Self {
        self.config.cell_selection = strategy;
        self
    }

    /// Sets the boundary seeding mode.
    pub fn boundary(mut self, boundary: BoundarySeeding) -> Self {
        self.config.boundary = boundary;
        self
    }

    /// Adds a seed cell. Later seeds for the same cell narrow further.
    pub fn seed_cell(mut self, seed: SeedCell) -> Self {
        self.config.seed_cells.push(seed);
        self
    }

    /// Sets how much of the propagation the change log keeps.
    pub fn change_log_detail(mut self, detail: ChangeLogDetail) -> Self {
        self.config.change_log_detail = detail;
        self
    }

    /// Sets the progress callback function.
    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Provides an external shutdown signal.
    /// If not provided, a default signal (initially false) will be created.
    pub fn shutdown_signal(mut self, signal: Arc<AtomicBool>) -> Self {
        self.shutdown_signal = Some(signal);
        self
    }

    /// Sets the maximum number of iterations.
    pub fn max_iterations(mut self, max: u64) -> Self {
        self.config.max_iterations = Some(max);
        self
    }

    /// Sets the seed for the random number generator.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Builds the `WfcConfig` instance.
    pub fn build(self) -> WfcConfig {
        let mut config = self.config;
        if let Some(signal) = self.shutdown_signal {
            config.shutdown_signal = signal;
        }
        config
    }
}

/// Where a solver run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SolverState {
    /// Some cell still holds several modules.
    Running,
    /// Every cell holds exactly one module.
    Solved,
    /// At least one cell ended with an empty domain.
    Contradicted,
}

/// Statistics reported at the end of a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Seed the RNG was created from; rerunning with it reproduces the run.
    pub seed: u64,
    /// `Solved` or `Contradicted` once the run has finished.
    pub state: SolverState,
    /// Number of cells collapsed by the selection loop.
    pub iterations: u64,
    /// Cells in the grid.
    pub total_cells: usize,
    /// Cells holding exactly one module.
    pub decided_cells: usize,
    /// Times the override policy rejected its first pick.
    pub overrides: u64,
    /// Cells whose domain ended empty, in grid order.
    pub contradicted_cells: Vec<Coords>,
    /// Strict domain shrinks applied by propagation.
    pub propagation_steps: usize,
    /// Modules in the catalog, after rotation expansion.
    pub module_count: usize,
    /// Socket types the catalog spans, highest socket value + 1.
    pub socket_type_count: usize,
    /// `(base tile name, placements)` in catalog order.
    pub base_tile_counts: Vec<(String, u64)>,
    /// `(module name, placements)` in catalog order.
    pub module_counts: Vec<(String, u64)>,
    /// Wall-clock time since the solver was created.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Share of cells that ended contradicted.
    pub fn contradiction_fraction(&self) -> f64 {
        if self.total_cells == 0 {
            0.0
        } else {
            self.contradicted_cells.len() as f64 / self.total_cells as f64
        }
    }
}

/// Everything a finished run hands to the presentation layer.
#[derive(Debug, Clone)]
pub struct WfcOutcome {
    pub grid: PossibilityGrid,
    pub change_log: ChangeLog,
    pub summary: RunSummary,
}

/// Incremental solver over a single grid.
///
/// Owns the grid, the placement counters, the change log and the RNG. The
/// catalog is only read.
pub struct Solver<'a> {
    catalog: &'a ModuleCatalog,
    config: &'a WfcConfig,
    grid: PossibilityGrid,
    propagator: Box<dyn ConstraintPropagator>,
    entropy: Box<dyn EntropyCalculator>,
    selector: Box<dyn ModuleSelector>,
    counts: PlacementCounts,
    change_log: ChangeLog,
    rng: StdRng,
    seed: u64,
    iterations: u64,
    overrides: u64,
    propagation_steps: usize,
    state: SolverState,
    started: Instant,
}

impl<'a> Solver<'a> {
    /// Allocates the grid, applies boundary seeding and seed cells, and
    /// propagates from every seeded cell.
    ///
    /// # Errors
    ///
    /// * `WfcError::Configuration` for zero-sized grids, a planar catalog on a
    ///   grid with `depth != 1`, or invalid seeds.
    /// * `WfcError::Catalog` for unknown module names in seeds or policies.
    pub fn new(
        catalog: &'a ModuleCatalog,
        dimensions: GridDimensions,
        config: &'a WfcConfig,
    ) -> Result<Self, WfcError> {
        validate_dimensions(catalog.topology(), dimensions)?;
        let selector = config.selection_policy.build(catalog)?;
        let seed = config.seed.unwrap_or_else(time_seed);
        info!(
            "Solver: {}x{}x{} grid, {} modules, seed {}",
            dimensions.width,
            dimensions.height,
            dimensions.depth,
            catalog.len(),
            seed
        );

        let mut solver = Self {
            catalog,
            config,
            grid: PossibilityGrid::new(dimensions, catalog.len()),
            propagator: Box::new(CpuConstraintPropagator::new()),
            entropy: Box::new(CpuEntropyCalculator::new(config.cell_selection)),
            selector,
            counts: PlacementCounts::for_catalog(catalog),
            change_log: ChangeLog::new(config.change_log_detail),
            rng: StdRng::seed_from_u64(seed),
            seed,
            iterations: 0,
            overrides: 0,
            propagation_steps: 0,
            state: SolverState::Running,
            started: Instant::now(),
        };
        solver.apply_seeds(dimensions)?;
        Ok(solver)
    }

    fn apply_seeds(&mut self, dimensions: GridDimensions) -> Result<(), WfcError> {
        let seeds = resolve_seeds(&self.config.boundary, &self.config.seed_cells, dimensions, self.catalog)?;
        if seeds.is_empty() {
            return Ok(());
        }
        let mut changed = Vec::new();
        for (coords, allowed) in seeds {
            if self.grid.restrict(coords, &allowed)? {
                let remaining = self.grid.domain_len(coords).unwrap_or(0);
                self.change_log
                    .record(0, coords, None, ChangeKind::Seeded { remaining });
                if remaining == 0 {
                    warn!("Seeding left {coords:?} without any module");
                    self.change_log.record(0, coords, None, ChangeKind::Contradiction);
                }
                changed.push(coords);
            }
        }
        debug!("Seeded {} cells, propagating", changed.len());
        let outcome = self.propagator.propagate(&mut self.grid, changed, self.catalog)?;
        self.record_outcome(&outcome);
        Ok(())
    }

    pub fn grid(&self) -> &PossibilityGrid {
        &self.grid
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        self.catalog
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn change_log(&self) -> &ChangeLog {
        &self.change_log
    }

    pub fn counts(&self) -> &PlacementCounts {
        &self.counts
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Collapses `coords` to `module` by hand and propagates.
    ///
    /// The placement is counted and logged like a driver assignment, but does
    /// not feed the selection policy's history.
    ///
    /// # Errors
    ///
    /// * `WfcError::Grid` if the cell is out of range or `module` is no longer
    ///   possible there.
    /// * `WfcError::Propagation` on an internal propagation failure.
    pub fn collapse_cell(&mut self, coords: Coords, module: ModuleId) -> Result<PropagationOutcome, WfcError> {
        let candidates = self
            .grid
            .domain_len(coords)
            .ok_or(GridError::OutOfBounds(coords.0, coords.1, coords.2))?;
        self.iterations += 1;
        self.assign(coords, module, candidates, false)
    }

    fn assign(
        &mut self,
        coords: Coords,
        module: ModuleId,
        candidates: usize,
        override_taken: bool,
    ) -> Result<PropagationOutcome, WfcError> {
        self.grid.collapse(coords, module)?;
        self.counts.record(module, self.catalog);
        if override_taken {
            self.overrides += 1;
        }
        self.change_log.record(
            self.iterations,
            coords,
            None,
            ChangeKind::Assigned {
                module,
                candidates,
                override_taken,
            },
        );

        let outcome = self
            .propagator
            .propagate(&mut self.grid, vec![coords], self.catalog)?;
        self.record_outcome(&outcome);
        Ok(outcome)
    }

    fn record_outcome(&mut self, outcome: &PropagationOutcome) {
        self.propagation_steps += outcome.steps;
        for update in &outcome.updates {
            let kind = match update.remaining {
                0 => ChangeKind::Contradiction,
                1 => match self.grid.decided_module(update.coords) {
                    Some(module) => ChangeKind::Forced { module },
                    None => ChangeKind::Narrowed { remaining: 1 },
                },
                remaining => ChangeKind::Narrowed { remaining },
            };
            self.change_log
                .record(self.iterations, update.coords, Some(update.source), kind);
        }
    }

    /// One driver iteration: pick a cell, pick a module, collapse, propagate.
    ///
    /// Returns the state after the iteration; a finished run keeps returning
    /// its final state.
    ///
    /// # Errors
    ///
    /// Only internal failures (grid access, propagation) are errors;
    /// contradictions are reflected in the returned state.
    pub fn step(&mut self) -> Result<SolverState, WfcError> {
        if self.state != SolverState::Running {
            return Ok(self.state);
        }

        let Some(cell) = self.entropy.find_next_cell(&self.grid, &mut self.rng) else {
            self.state = self.final_state();
            return Ok(self.state);
        };

        self.iterations += 1;
        let domain = self
            .grid
            .domain_at(cell)
            .ok_or(GridError::OutOfBounds(cell.0, cell.1, cell.2))?
            .to_bitvec();
        let candidates = domain.count_ones();
        let selection = self
            .selector
            .select(&domain, self.catalog, &self.counts, &mut self.rng)
            .ok_or_else(|| WfcError::InternalError(format!("No module to select at {cell:?}")))?;
        debug!(
            "Iter {}: {:?} -> module {} ({} candidates{})",
            self.iterations,
            cell,
            selection.module.0,
            candidates,
            if selection.override_taken { ", override" } else { "" }
        );

        self.assign(cell, selection.module, candidates, selection.override_taken)?;
        Ok(self.state)
    }

    fn final_state(&self) -> SolverState {
        if self.grid.contradicted_cells().is_empty() {
            SolverState::Solved
        } else {
            SolverState::Contradicted
        }
    }

    fn progress(&self) -> ProgressInfo {
        ProgressInfo {
            collapsed_cells: self.grid.count_decided(),
            total_cells: self.grid.cell_count(),
            contradicted_cells: self.grid.contradicted_cells().len(),
            elapsed_time: self.started.elapsed(),
            iterations: self.iterations,
        }
    }

    /// Steps until the run is solved or contradicted.
    ///
    /// # Errors
    ///
    /// * `WfcError::Interrupted` once the shutdown signal is set.
    /// * `WfcError::MaxIterationsReached` when the iteration limit is hit.
    /// * Errors from the progress callback or from [`Solver::step`].
    pub fn run_to_end(&mut self) -> Result<SolverState, WfcError> {
        while self.state == SolverState::Running {
            if self.config.shutdown_signal.load(Ordering::Relaxed) {
                warn!("Shutdown signal received, stopping solver run prematurely.");
                return Err(WfcError::Interrupted);
            }
            if let Some(max) = self.config.max_iterations {
                if self.iterations >= max {
                    warn!("Maximum iterations ({max}) reached.");
                    return Err(WfcError::MaxIterationsReached(max));
                }
            }
            self.step()?;
            if let Some(callback) = &self.config.progress_callback {
                callback(self.progress())?;
            }
        }
        Ok(self.state)
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            seed: self.seed,
            state: self.state,
            iterations: self.iterations,
            total_cells: self.grid.cell_count(),
            decided_cells: self.grid.count_decided(),
            overrides: self.overrides,
            contradicted_cells: self.grid.contradicted_cells(),
            propagation_steps: self.propagation_steps,
            module_count: self.catalog.len(),
            socket_type_count: self.catalog.socket_type_count(),
            base_tile_counts: self
                .catalog
                .base_tiles()
                .iter()
                .zip(self.counts.per_base())
                .map(|(base, &count)| (base.name.clone(), count))
                .collect(),
            module_counts: self
                .catalog
                .modules()
                .iter()
                .zip(self.counts.per_module())
                .map(|(module, &count)| (module.name().to_owned(), count))
                .collect(),
            elapsed: self.started.elapsed(),
        }
    }

    /// Consumes the solver, returning the grid, the change log and the summary.
    pub fn into_outcome(self) -> WfcOutcome {
        let summary = self.summary();
        WfcOutcome {
            grid: self.grid,
            change_log: self.change_log,
            summary,
        }
    }
}

fn validate_dimensions(topology: Topology, dimensions: GridDimensions) -> Result<(), WfcError> {
    if dimensions.cell_count() == 0 {
        return Err(WfcError::Configuration(format!(
            "grid dimensions must be positive, got {}x{}x{}",
            dimensions.width, dimensions.height, dimensions.depth
        )));
    }
    if topology == Topology::Planar && dimensions.depth != 1 {
        return Err(WfcError::Configuration(format!(
            "planar catalogs need depth 1, got {}",
            dimensions.depth
        )));
    }
    Ok(())
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}

/// Runs a solve from scratch until it is solved or contradicted.
///
/// # Arguments
///
/// * `catalog` - The module catalog with its compatibility graph.
/// * `dimensions` - Grid extents; planar catalogs require `depth == 1`.
/// * `config` - Policies, seeding, RNG seed, limits and callbacks.
///
/// # Returns
///
/// * `Ok(WfcOutcome)` when the run finished, whether solved or contradicted;
///   check `summary.state`.
/// * `Err(WfcError)` for configuration problems, interruption, the iteration
///   limit, or internal failures.
pub fn run(
    catalog: &ModuleCatalog,
    dimensions: GridDimensions,
    config: &WfcConfig,
) -> Result<WfcOutcome, WfcError> {
    let mut solver = Solver::new(catalog, dimensions, config)?;
    let state = solver.run_to_end()?;
    let outcome = solver.into_outcome();
    match state {
        SolverState::Solved => info!(
            "Solved {} cells in {} iterations ({} overrides, {:?})",
            outcome.summary.total_cells,
            outcome.summary.iterations,
            outcome.summary.overrides,
            outcome.summary.elapsed
        ),
        _ => warn!(
            "Finished with {} contradicted cells ({:.1}%)",
            outcome.summary.contradicted_cells.len(),
            outcome.summary.contradiction_fraction() * 100.0
        ),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfc_rules::{sockets, TileDefinition};

    fn checker() -> ModuleCatalog {
        // Black only touches white horizontally and vertically, and vice versa.
        let defs = vec![
            TileDefinition::new("black", vec![sockets([1]), sockets([3]), sockets([2]), sockets([4])]),
            TileDefinition::new("white", vec![sockets([2]), sockets([4]), sockets([1]), sockets([3])]),
        ];
        ModuleCatalog::build(Topology::Planar, &defs).unwrap()
    }

    fn free() -> ModuleCatalog {
        let defs = vec![
            TileDefinition::new("a", vec![sockets([0]); 4]),
            TileDefinition::new("b", vec![sockets([0]); 4]),
        ];
        ModuleCatalog::build(Topology::Planar, &defs).unwrap()
    }

    #[test]
    fn builder_keeps_external_shutdown_signal() {
        let signal = Arc::new(AtomicBool::new(true));
        let config = WfcConfig::builder()
            .shutdown_signal(signal.clone())
            .seed(4)
            .max_iterations(10)
            .build();
        assert!(Arc::ptr_eq(&config.shutdown_signal, &signal));
        assert_eq!(config.seed, Some(4));
        assert_eq!(config.max_iterations, Some(10));
    }

    #[test]
    fn shutdown_interrupts_before_the_first_step() {
        let catalog = checker();
        let config = WfcConfig::builder()
            .shutdown_signal(Arc::new(AtomicBool::new(true)))
            .seed(1)
            .build();
        let err = run(&catalog, GridDimensions::planar(3, 3), &config).unwrap_err();
        assert!(matches!(err, WfcError::Interrupted));
    }

    #[test]
    fn iteration_limit_is_enforced() {
        let catalog = free();
        let config = WfcConfig::builder().seed(1).max_iterations(2).build();
        let err = run(&catalog, GridDimensions::planar(4, 4), &config).unwrap_err();
        assert!(matches!(err, WfcError::MaxIterationsReached(2)));
    }

    #[test]
    fn planar_catalog_rejects_depth() {
        let catalog = checker();
        let config = WfcConfig::default();
        assert!(matches!(
            Solver::new(&catalog, GridDimensions::new(2, 2, 2), &config),
            Err(WfcError::Configuration(_))
        ));
        assert!(matches!(
            Solver::new(&catalog, GridDimensions::planar(0, 2), &config),
            Err(WfcError::Configuration(_))
        ));
    }

    #[test]
    fn manual_collapse_is_counted_and_logged() {
        let catalog = checker();
        let config = WfcConfig::builder().seed(2).build();
        let mut solver = Solver::new(&catalog, GridDimensions::planar(2, 1), &config).unwrap();
        solver.collapse_cell((0, 0, 0), ModuleId(0)).unwrap();
        assert_eq!(solver.counts().module_count(ModuleId(0)), 1);
        assert_eq!(solver.change_log().assignments().count(), 1);
        // Black only accepts white next to it.
        assert_eq!(solver.grid().decided_module((1, 0, 0)), Some(ModuleId(1)));
        assert!(matches!(
            solver.collapse_cell((1, 0, 0), ModuleId(0)),
            Err(WfcError::Grid(GridError::ModuleNotPossible { .. }))
        ));
    }

    #[test]
    fn progress_callback_sees_every_iteration() {
        use std::sync::atomic::AtomicUsize;
        let catalog = checker();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = WfcConfig::builder()
            .seed(8)
            .progress_callback(Box::new(move |info: ProgressInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                assert!(info.collapsed_cells <= info.total_cells);
                Ok(())
            }))
            .build();
        let outcome = run(&catalog, GridDimensions::planar(3, 3), &config).unwrap();
        assert_eq!(outcome.summary.state, SolverState::Solved);
        // One call per step, including the final step that detects completion.
        assert_eq!(calls.load(Ordering::Relaxed) as u64, outcome.summary.iterations + 1);
    }
}
