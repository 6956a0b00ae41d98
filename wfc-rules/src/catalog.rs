use crate::compatibility::{build_links, is_symmetric};
use crate::expander::expand_tile;
use crate::module::Module;
use crate::topology::{Direction, Topology};
use crate::types::{BaseTileId, CatalogError, ModuleId, TileDefinition};
use bitvec::prelude::*;
use log::info;
use std::collections::HashMap;

/// A base tile as kept in the catalog, shared by all of its orientations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTile {
    /// Base identifier from the definition.
    pub name: String,
    /// Rendering reference, if any.
    pub sprite: Option<String>,
    /// Modules generated from this tile.
    pub modules: Vec<ModuleId>,
}

/// The immutable set of oriented modules plus their compatibility graph.
///
/// Built once from tile definitions; the solver only ever reads it.
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    topology: Topology,
    modules: Vec<Module>,
    base_tiles: Vec<BaseTile>,
    name_index: HashMap<String, ModuleId>,
}

impl ModuleCatalog {
    /// Expands every definition into its orientations and links the result.
    ///
    /// # Errors
    ///
    /// * `CatalogError::EmptyCatalog` if `definitions` is empty.
    /// * `CatalogError::SocketListLength` if a tile does not list one socket
    ///   set per direction of `topology`.
    /// * `CatalogError::UnknownOrientation` for an orientation tag outside
    ///   the rotation group.
    /// * `CatalogError::DuplicateModuleName` if two modules share a name.
    pub fn build(topology: Topology, definitions: &[TileDefinition]) -> Result<Self, CatalogError> {
        if definitions.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        let mut modules: Vec<Module> = Vec::new();
        let mut base_tiles = Vec::with_capacity(definitions.len());
        let mut name_index = HashMap::new();

        for (index, definition) in definitions.iter().enumerate() {
            let expanded = expand_tile(topology, definition, BaseTileId(index), modules.len())?;
            let mut ids = Vec::with_capacity(expanded.len());
            for module in &expanded {
                if name_index.insert(module.name.clone(), module.id).is_some() {
                    return Err(CatalogError::DuplicateModuleName(module.name.clone()));
                }
                ids.push(module.id);
            }
            base_tiles.push(BaseTile {
                name: definition.name.clone(),
                sprite: definition.sprite.clone(),
                modules: ids,
            });
            modules.extend(expanded);
        }

        let links = build_links(topology, &mut modules);
        debug_assert!(is_symmetric(topology, &modules));
        info!(
            "Module catalog ready: {} base tiles, {} modules, {} links",
            base_tiles.len(),
            modules.len(),
            links
        );

        Ok(Self {
            topology,
            modules,
            base_tiles,
            name_index,
        })
    }

    /// Lattice the catalog was built for.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the catalog has no modules (never true for a built catalog).
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Looks a module up by id.
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0)
    }

    /// Every module, indexed by `ModuleId`.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Looks a module up by its unique name.
    pub fn id_of(&self, name: &str) -> Option<ModuleId> {
        self.name_index.get(name).copied()
    }

    /// Resolves a list of module names into a domain bit set.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownModule` for a name not in the catalog.
    pub fn domain_of<S: AsRef<str>>(&self, names: &[S]) -> Result<BitVec, CatalogError> {
        let mut domain = bitvec![0; self.len()];
        for name in names {
            let id = self
                .id_of(name.as_ref())
                .ok_or_else(|| CatalogError::UnknownModule(name.as_ref().to_owned()))?;
            domain.set(id.0, true);
        }
        Ok(domain)
    }

    /// Base tiles, indexed by `BaseTileId`.
    pub fn base_tiles(&self) -> &[BaseTile] {
        &self.base_tiles
    }

    /// Modules allowed to sit in `direction` from `id`.
    #[inline]
    pub fn links(&self, id: ModuleId, direction: Direction) -> Option<&BitSlice> {
        self.modules.get(id.0).and_then(|m| m.links(direction))
    }

    /// A domain containing every module.
    pub fn all_modules(&self) -> BitVec {
        bitvec![1; self.len()]
    }

    /// Number of distinct socket types in use (highest id + 1).
    pub fn socket_type_count(&self) -> usize {
        self.modules
            .iter()
            .flat_map(|m| m.sockets.iter())
            .flat_map(|set| set.iter())
            .max()
            .map_or(0, |&highest| highest as usize + 1)
    }

    /// Re-checks the link symmetry invariant.
    pub fn is_symmetric(&self) -> bool {
        is_symmetric(self.topology, &self.modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sockets;

    fn pipes() -> Vec<TileDefinition> {
        vec![
            TileDefinition::new("empty", vec![sockets([0]); 4]),
            TileDefinition::new("line", vec![sockets([0]), sockets([1]), sockets([0]), sockets([1])])
                .with_orientations(["0", "90"]),
            TileDefinition::new("corner", vec![sockets([1]), sockets([1]), sockets([0]), sockets([0])])
                .with_orientations(["*"])
                .with_self_attraction(false),
        ]
    }

    #[test]
    fn build_expands_and_indexes() {
        let catalog = ModuleCatalog::build(Topology::Planar, &pipes()).unwrap();
        assert_eq!(catalog.len(), 1 + 2 + 4);
        assert_eq!(catalog.base_tiles().len(), 3);
        assert_eq!(catalog.base_tiles()[2].modules.len(), 4);
        assert_eq!(catalog.id_of("line_90"), Some(ModuleId(2)));
        assert_eq!(catalog.id_of("line_180"), None);
        let corner = catalog.module(catalog.id_of("corner_270").unwrap()).unwrap();
        assert!(!corner.self_attraction());
        assert_eq!(corner.base(), BaseTileId(2));
        assert_eq!(catalog.socket_type_count(), 2);
        assert!(catalog.is_symmetric());
    }

    #[test]
    fn duplicate_module_names_are_rejected() {
        let defs = vec![
            TileDefinition::new("a", vec![sockets([0]); 4]),
            TileDefinition::new("a", vec![sockets([1]); 4]),
        ];
        assert_eq!(
            ModuleCatalog::build(Topology::Planar, &defs).unwrap_err(),
            CatalogError::DuplicateModuleName("a_0".into())
        );

        let repeated = vec![TileDefinition::new("b", vec![sockets([0]); 4]).with_orientations(["90", "90"])];
        assert!(matches!(
            ModuleCatalog::build(Topology::Planar, &repeated),
            Err(CatalogError::DuplicateModuleName(_))
        ));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert_eq!(
            ModuleCatalog::build(Topology::Volumetric, &[]).unwrap_err(),
            CatalogError::EmptyCatalog
        );
    }

    #[test]
    fn domain_of_resolves_names() {
        let catalog = ModuleCatalog::build(Topology::Planar, &pipes()).unwrap();
        let domain = catalog.domain_of(&["empty_0", "corner_90"]).unwrap();
        assert_eq!(domain.count_ones(), 2);
        assert!(domain[0]);
        assert!(domain[catalog.id_of("corner_90").unwrap().0]);
        assert_eq!(
            catalog.domain_of(&["nope"]).unwrap_err(),
            CatalogError::UnknownModule("nope".into())
        );
    }
}
