//! Module selection policies: which module a chosen cell collapses to.

use crate::WfcError;
use bitvec::prelude::*;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use wfc_rules::{BaseTileId, ModuleCatalog, ModuleId};

/// Which counter the lowest-usage policy balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum UsageScope {
    /// Per oriented module.
    #[default]
    Module,
    /// Per base tile, summed over its orientations.
    BaseTile,
}

/// Run-time choice of module selection policy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "kebab-case"))]
pub enum SelectionPolicy {
    /// Uniform among the least-placed candidates.
    LowestUsage { scope: UsageScope },
    /// Repeat the previous module while allowed, else uniform.
    Override { max_consecutive: u32 },
    /// Uniform among the domain, ignoring history.
    Uniform,
    /// Pick `module` with the given probability when possible, else uniform.
    Preferred { module: String, probability: f64 },
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::LowestUsage {
            scope: UsageScope::Module,
        }
    }
}

impl SelectionPolicy {
    /// Instantiates the selector for this policy against `catalog`.
    ///
    /// # Errors
    ///
    /// * `WfcError::Catalog` if a preferred module name is unknown.
    /// * `WfcError::Configuration` if a probability is outside `0..=1`.
    pub fn build(&self, catalog: &ModuleCatalog) -> Result<Box<dyn ModuleSelector>, WfcError> {
        let selector: Box<dyn ModuleSelector> = match self {
            Self::LowestUsage { scope } => Box::new(LowestUsageSelector { scope: *scope }),
            Self::Override { max_consecutive } => Box::new(OverrideSelector::new(*max_consecutive)),
            Self::Uniform => Box::new(UniformSelector),
            Self::Preferred { module, probability } => {
                if !(0.0..=1.0).contains(probability) {
                    return Err(WfcError::Configuration(format!(
                        "preferred probability {probability} is outside 0..=1"
                    )));
                }
                let id = catalog
                    .id_of(module)
                    .ok_or_else(|| wfc_rules::CatalogError::UnknownModule(module.clone()))?;
                Box::new(PreferredSelector {
                    module: id,
                    probability: *probability,
                })
            }
        };
        debug!("Module selection policy: {}", selector.name());
        Ok(selector)
    }
}

/// Placement counters, per module and per base tile.
///
/// Owned by a solver run; policies only read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementCounts {
    per_module: Vec<u64>,
    per_base: Vec<u64>,
}

impl PlacementCounts {
    /// Zeroed counters sized for `catalog`.
    pub fn for_catalog(catalog: &ModuleCatalog) -> Self {
        Self {
            per_module: vec![0; catalog.len()],
            per_base: vec![0; catalog.base_tiles().len()],
        }
    }

    /// Counts one placement of `module`.
    pub fn record(&mut self, module: ModuleId, catalog: &ModuleCatalog) {
        if let Some(count) = self.per_module.get_mut(module.0) {
            *count += 1;
        }
        if let Some(base) = catalog.module(module).map(wfc_rules::Module::base) {
            if let Some(count) = self.per_base.get_mut(base.0) {
                *count += 1;
            }
        }
    }

    /// Placements of one module; 0 for unknown ids.
    pub fn module_count(&self, module: ModuleId) -> u64 {
        self.per_module.get(module.0).copied().unwrap_or(0)
    }

    /// Placements of any orientation of one base tile.
    pub fn base_count(&self, base: BaseTileId) -> u64 {
        self.per_base.get(base.0).copied().unwrap_or(0)
    }

    /// Counts indexed by module id.
    pub fn per_module(&self) -> &[u64] {
        &self.per_module
    }

    /// Counts indexed by base tile id.
    pub fn per_base(&self) -> &[u64] {
        &self.per_base
    }
}

/// The chosen module plus whether it came from the override path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Module to assign to the chosen cell.
    pub module: ModuleId,
    /// Set when the override policy repeated its last module.
    pub override_taken: bool,
}

impl Selection {
    fn plain(module: ModuleId) -> Self {
        Self {
            module,
            override_taken: false,
        }
    }
}

/// Chooses a module from a non-empty domain.
///
/// Selectors may keep their own history (the override streak); placement
/// counts are passed in by the run.
pub trait ModuleSelector: Send + Debug {
    /// Returns `None` only for an empty domain.
    fn select(
        &mut self,
        domain: &BitSlice,
        catalog: &ModuleCatalog,
        counts: &PlacementCounts,
        rng: &mut StdRng,
    ) -> Option<Selection>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

fn uniform(domain: &BitSlice, rng: &mut StdRng) -> Option<ModuleId> {
    let candidates: Vec<usize> = domain.iter_ones().collect();
    candidates.choose(rng).copied().map(ModuleId)
}

/// Picks uniformly among the possible modules.
#[derive(Debug, Clone, Copy)]
pub struct UniformSelector;

impl ModuleSelector for UniformSelector {
    fn select(
        &mut self,
        domain: &BitSlice,
        _catalog: &ModuleCatalog,
        _counts: &PlacementCounts,
        rng: &mut StdRng,
    ) -> Option<Selection> {
        uniform(domain, rng).map(Selection::plain)
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}

/// Picks the least placed possible module, counted per module or per base
/// tile. Ties are broken uniformly.
#[derive(Debug, Clone, Copy)]
pub struct LowestUsageSelector {
    scope: UsageScope,
}

impl LowestUsageSelector {
    fn usage(&self, module: ModuleId, catalog: &ModuleCatalog, counts: &PlacementCounts) -> u64 {
        match self.scope {
            UsageScope::Module => counts.module_count(module),
            UsageScope::BaseTile => catalog
                .module(module)
                .map_or(0, |m| counts.base_count(m.base())),
        }
    }
}

impl ModuleSelector for LowestUsageSelector {
    fn select(
        &mut self,
        domain: &BitSlice,
        catalog: &ModuleCatalog,
        counts: &PlacementCounts,
        rng: &mut StdRng,
    ) -> Option<Selection> {
        let mut least = u64::MAX;
        let mut candidates = Vec::new();
        for index in domain.iter_ones() {
            let usage = self.usage(ModuleId(index), catalog, counts);
            if usage < least {
                least = usage;
                candidates.clear();
            }
            if usage == least {
                candidates.push(index);
            }
        }
        candidates.choose(rng).copied().map(|i| Selection::plain(ModuleId(i)))
    }

    fn name(&self) -> &'static str {
        match self.scope {
            UsageScope::Module => "lowest-usage",
            UsageScope::BaseTile => "lowest-usage (base tile)",
        }
    }
}

/// Self-attraction: keeps repeating the last module while it stays possible.
///
/// `streak` counts consecutive assignments of `last`, the first one included.
/// Once it reaches `max_consecutive` (at least 1) the module is left out of the
/// next pick, so no module is placed more often than that in a row unless it
/// is the only option.
#[derive(Debug, Clone)]
pub struct OverrideSelector {
    max_consecutive: u32,
    last: Option<ModuleId>,
    streak: u32,
}

impl OverrideSelector {
    /// A selector with no history. A `max_consecutive` of 0 behaves like 1.
    pub fn new(max_consecutive: u32) -> Self {
        Self {
            max_consecutive,
            last: None,
            streak: 0,
        }
    }
}

impl ModuleSelector for OverrideSelector {
    fn select(
        &mut self,
        domain: &BitSlice,
        catalog: &ModuleCatalog,
        _counts: &PlacementCounts,
        rng: &mut StdRng,
    ) -> Option<Selection> {
        let cap = self.max_consecutive.max(1);
        let mut exhausted = None;
        if let Some(last) = self.last {
            let possible = domain.get(last.0).map_or(false, |bit| *bit);
            let attracts = catalog.module(last).map_or(false, wfc_rules::Module::self_attraction);
            if possible && self.streak >= cap {
                exhausted = Some(last.0);
            } else if possible && attracts {
                self.streak += 1;
                return Some(Selection {
                    module: last,
                    override_taken: true,
                });
            }
        }

        // Streak used up: leave the repeated module out unless it is the only option.
        let mut candidates: Vec<usize> = domain.iter_ones().filter(|&i| Some(i) != exhausted).collect();
        if candidates.is_empty() {
            candidates = domain.iter_ones().collect();
        }
        let chosen = ModuleId(*candidates.choose(rng)?);
        self.streak = if self.last == Some(chosen) { self.streak + 1 } else { 1 };
        self.last = Some(chosen);
        Some(Selection::plain(chosen))
    }

    fn name(&self) -> &'static str {
        "override"
    }
}

/// Takes one preferred module with a fixed probability whenever it is still
/// possible, and falls back to a uniform pick otherwise.
#[derive(Debug, Clone, Copy)]
pub struct PreferredSelector {
    module: ModuleId,
    probability: f64,
}

impl ModuleSelector for PreferredSelector {
    fn select(
        &mut self,
        domain: &BitSlice,
        _catalog: &ModuleCatalog,
        _counts: &PlacementCounts,
        rng: &mut StdRng,
    ) -> Option<Selection> {
        let possible = domain.get(self.module.0).map_or(false, |bit| *bit);
        if possible && rng.gen_bool(self.probability) {
            return Some(Selection::plain(self.module));
        }
        uniform(domain, rng).map(Selection::plain)
    }

    fn name(&self) -> &'static str {
        "preferred"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use wfc_rules::{sockets, TileDefinition, Topology};

    fn catalog() -> ModuleCatalog {
        let defs = vec![
            TileDefinition::new("grass", vec![sockets([0]); 4]),
            TileDefinition::new("road", vec![sockets([0]); 4]).with_orientations(["0", "90"]),
            TileDefinition::new("rock", vec![sockets([0]); 4]).with_self_attraction(false),
        ];
        ModuleCatalog::build(Topology::Planar, &defs).unwrap()
    }

    #[test]
    fn lowest_usage_prefers_unplaced_modules() {
        let catalog = catalog();
        let mut counts = PlacementCounts::for_catalog(&catalog);
        counts.record(ModuleId(0), &catalog);
        counts.record(ModuleId(1), &catalog);
        counts.record(ModuleId(3), &catalog);
        let mut selector = SelectionPolicy::default().build(&catalog).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..16 {
            let pick = selector
                .select(&catalog.all_modules(), &catalog, &counts, &mut rng)
                .unwrap();
            assert_eq!(pick.module, ModuleId(2));
        }
    }

    #[test]
    fn lowest_usage_by_base_tile_sums_orientations() {
        let catalog = catalog();
        let mut counts = PlacementCounts::for_catalog(&catalog);
        // road_0 placed once: both road orientations now count as used.
        counts.record(ModuleId(1), &catalog);
        counts.record(ModuleId(0), &catalog);
        assert_eq!(counts.base_count(BaseTileId(1)), 1);
        let mut selector = SelectionPolicy::LowestUsage {
            scope: UsageScope::BaseTile,
        }
        .build(&catalog)
        .unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let domain = bitvec![1, 0, 1, 1];
        let pick = selector.select(&domain, &catalog, &counts, &mut rng).unwrap();
        assert_eq!(pick.module, ModuleId(3));
    }

    #[test]
    fn override_streak_is_capped() {
        let catalog = catalog();
        let counts = PlacementCounts::for_catalog(&catalog);
        let mut selector = OverrideSelector::new(3);
        let mut rng = StdRng::seed_from_u64(11);
        let domain = catalog.all_modules();

        let mut run = 1;
        let mut previous = selector.select(&domain, &catalog, &counts, &mut rng).unwrap().module;
        for _ in 0..200 {
            let pick = selector.select(&domain, &catalog, &counts, &mut rng).unwrap();
            if pick.module == previous {
                run += 1;
            } else {
                run = 1;
            }
            assert!(run <= 3, "{run} consecutive placements of {previous:?}");
            previous = pick.module;
        }
    }

    #[test]
    fn override_repeats_while_possible() {
        let catalog = catalog();
        let counts = PlacementCounts::for_catalog(&catalog);
        let mut selector = OverrideSelector::new(5);
        let mut rng = StdRng::seed_from_u64(0);
        let grass_only = bitvec![1, 0, 0, 0];
        let first = selector.select(&grass_only, &catalog, &counts, &mut rng).unwrap();
        assert!(!first.override_taken);
        let second = selector
            .select(&catalog.all_modules(), &catalog, &counts, &mut rng)
            .unwrap();
        assert_eq!(second.module, ModuleId(0));
        assert!(second.override_taken);
    }

    #[test]
    fn override_ignores_modules_without_self_attraction() {
        let catalog = catalog();
        let counts = PlacementCounts::for_catalog(&catalog);
        let mut selector = OverrideSelector::new(5);
        let mut rng = StdRng::seed_from_u64(0);
        let rock_only = bitvec![0, 0, 0, 1];
        selector.select(&rock_only, &catalog, &counts, &mut rng).unwrap();
        for _ in 0..8 {
            let pick = selector
                .select(&catalog.all_modules(), &catalog, &counts, &mut rng)
                .unwrap();
            if pick.module == ModuleId(3) {
                assert!(!pick.override_taken);
            }
        }
    }

    #[test]
    fn preferred_with_certainty() {
        let catalog = catalog();
        let counts = PlacementCounts::for_catalog(&catalog);
        let mut selector = SelectionPolicy::Preferred {
            module: "rock_0".into(),
            probability: 1.0,
        }
        .build(&catalog)
        .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let pick = selector
            .select(&catalog.all_modules(), &catalog, &counts, &mut rng)
            .unwrap();
        assert_eq!(pick.module, ModuleId(3));
        // Falls back to the domain when the preferred module is gone.
        let pick = selector.select(&bitvec![0, 1, 0, 0], &catalog, &counts, &mut rng).unwrap();
        assert_eq!(pick.module, ModuleId(1));
    }

    #[test]
    fn preferred_validation() {
        let catalog = catalog();
        assert!(matches!(
            SelectionPolicy::Preferred {
                module: "rock_0".into(),
                probability: 1.5
            }
            .build(&catalog),
            Err(WfcError::Configuration(_))
        ));
        assert!(matches!(
            SelectionPolicy::Preferred {
                module: "lava_0".into(),
                probability: 0.5
            }
            .build(&catalog),
            Err(WfcError::Catalog(_))
        ));
    }

    #[test]
    fn empty_domain_selects_nothing() {
        let catalog = catalog();
        let counts = PlacementCounts::for_catalog(&catalog);
        let mut rng = StdRng::seed_from_u64(0);
        let empty = bitvec![0; 4];
        assert!(UniformSelector.select(&empty, &catalog, &counts, &mut rng).is_none());
        assert!(OverrideSelector::new(2)
            .select(&empty, &catalog, &counts, &mut rng)
            .is_none());
    }
}
