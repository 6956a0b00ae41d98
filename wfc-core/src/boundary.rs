//! Initial restrictions applied before the first collapse.

use crate::grid::{Coords, GridDimensions};
use crate::WfcError;
use bitvec::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use wfc_rules::{ModuleCatalog, Topology};

/// How the grid's outer shell is constrained.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "kebab-case"))]
pub enum BoundarySeeding {
    /// Every cell starts with the full catalog.
    #[default]
    None,
    /// Cells on the outer shell start restricted to the named modules.
    Shell {
        /// Module names allowed on the boundary.
        modules: Vec<String>,
    },
}

/// A single cell pre-restricted to the named modules.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeedCell {
    /// Cell to restrict; must lie inside the grid.
    pub coords: Coords,
    /// Module names the cell is restricted to; must not be empty.
    pub modules: Vec<String>,
}

impl SeedCell {
    /// Restricts `coords` to the named modules.
    pub fn new<S: Into<String>>(coords: Coords, modules: impl IntoIterator<Item = S>) -> Self {
        Self {
            coords,
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }
}

/// Resolves shell seeding and individual seeds into `(coords, allowed)` pairs.
///
/// A cell named by both receives the intersection once applied to the grid,
/// since each restriction only ever narrows.
///
/// # Errors
///
/// * `WfcError::Catalog` for an unknown module name.
/// * `WfcError::Configuration` for an empty module list or a seed outside the grid.
pub fn resolve_seeds(
    boundary: &BoundarySeeding,
    seeds: &[SeedCell],
    dimensions: GridDimensions,
    catalog: &ModuleCatalog,
) -> Result<Vec<(Coords, BitVec)>, WfcError> {
    let topology = catalog.topology();
    let mut resolved = Vec::new();

    if let BoundarySeeding::Shell { modules } = boundary {
        if modules.is_empty() {
            return Err(WfcError::Configuration(
                "boundary seeding needs at least one module".into(),
            ));
        }
        let allowed = catalog.domain_of(modules)?;
        resolved.extend(
            shell_cells(dimensions, topology)
                .into_iter()
                .map(|coords| (coords, allowed.clone())),
        );
    }

    for seed in seeds {
        let (x, y, z) = seed.coords;
        if x >= dimensions.width || y >= dimensions.height || z >= dimensions.depth {
            return Err(WfcError::Configuration(format!(
                "seed cell ({x}, {y}, {z}) lies outside the {}x{}x{} grid",
                dimensions.width, dimensions.height, dimensions.depth
            )));
        }
        if seed.modules.is_empty() {
            return Err(WfcError::Configuration(format!(
                "seed cell ({x}, {y}, {z}) names no modules"
            )));
        }
        resolved.push((seed.coords, catalog.domain_of(&seed.modules)?));
    }

    Ok(resolved)
}

/// Every cell on an outer face, in storage order.
pub fn shell_cells(dimensions: GridDimensions, topology: Topology) -> Vec<Coords> {
    let mut cells = Vec::new();
    for z in 0..dimensions.depth {
        for y in 0..dimensions.height {
            for x in 0..dimensions.width {
                if dimensions.is_boundary((x, y, z), topology) {
                    cells.push((x, y, z));
                }
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfc_rules::{sockets, CatalogError, TileDefinition};

    fn catalog() -> ModuleCatalog {
        let defs = vec![
            TileDefinition::new("air", vec![sockets([0]); 6]),
            TileDefinition::new("rock", vec![sockets([0, 1]); 6]),
        ];
        ModuleCatalog::build(Topology::Volumetric, &defs).unwrap()
    }

    #[test]
    fn shell_of_a_cube_skips_the_core() {
        let cells = shell_cells(GridDimensions::new(3, 3, 3), Topology::Volumetric);
        assert_eq!(cells.len(), 26);
        assert!(!cells.contains(&(1, 1, 1)));
    }

    #[test]
    fn planar_shell_is_the_ring() {
        let cells = shell_cells(GridDimensions::planar(4, 3), Topology::Planar);
        assert_eq!(cells.len(), 10);
    }

    #[test]
    fn shell_and_seeds_resolve_to_domains() {
        let catalog = catalog();
        let boundary = BoundarySeeding::Shell {
            modules: vec!["air_I".into()],
        };
        let seeds = vec![SeedCell::new((1, 1, 1), ["rock_I"])];
        let resolved = resolve_seeds(&boundary, &seeds, GridDimensions::new(3, 3, 3), &catalog).unwrap();
        assert_eq!(resolved.len(), 27);
        let (coords, allowed) = resolved.last().unwrap();
        assert_eq!(*coords, (1, 1, 1));
        assert_eq!(allowed, &bitvec![0, 1]);
    }

    #[test]
    fn bad_seeds_are_rejected() {
        let catalog = catalog();
        let dims = GridDimensions::new(2, 2, 2);
        let unknown = BoundarySeeding::Shell {
            modules: vec!["lava_I".into()],
        };
        assert!(matches!(
            resolve_seeds(&unknown, &[], dims, &catalog),
            Err(WfcError::Catalog(CatalogError::UnknownModule(_)))
        ));
        let outside = vec![SeedCell::new((5, 0, 0), ["air_I"])];
        assert!(matches!(
            resolve_seeds(&BoundarySeeding::None, &outside, dims, &catalog),
            Err(WfcError::Configuration(_))
        ));
        let empty = vec![SeedCell::new::<String>((0, 0, 0), [])];
        assert!(matches!(
            resolve_seeds(&BoundarySeeding::None, &empty, dims, &catalog),
            Err(WfcError::Configuration(_))
        ));
    }
}
