use crate::module::Module;
use crate::topology::{Direction, Topology};
use bitvec::prelude::*;
use log::debug;
use rayon::prelude::*;

/// Builds the directional compatibility graph in place.
///
/// For every unordered pair of modules `(A, B)` and every direction `d`, `B`
/// may sit in direction `d` of `A` iff `A`'s sockets facing `d` intersect
/// `B`'s sockets facing `opposite(d)`. Both sides of a link are written in the
/// same step, so `B ∈ A.links[d] ⇔ A ∈ B.links[opposite(d)]` holds by
/// construction.
///
/// Pair tests only read the modules and run in parallel; the writes happen
/// afterwards on a single thread.
///
/// Returns the number of directed links stored.
pub fn build_links(topology: Topology, modules: &mut [Module]) -> usize {
    let num_modules = modules.len();
    let num_directions = topology.direction_count();

    let matches: Vec<(usize, Direction, usize)> = {
        let modules: &[Module] = modules;
        (0..num_modules)
            .into_par_iter()
            .flat_map_iter(|a| {
                (a..num_modules).flat_map(move |b| {
                    (0..num_directions).filter_map(move |d| {
                        let faces_a = modules[a].sockets.get(d)?;
                        let faces_b = modules[b].sockets.get(topology.opposite(d))?;
                        (!faces_a.is_disjoint(faces_b)).then_some((a, d, b))
                    })
                })
            })
            .collect()
    };

    for module in modules.iter_mut() {
        module.links = vec![bitvec![0; num_modules]; num_directions];
    }
    for &(a, direction, b) in &matches {
        link(topology, modules, a, direction, b);
    }

    let total = modules
        .iter()
        .flat_map(|m| m.links.iter())
        .map(|links| links.count_ones())
        .sum();
    debug!(
        "Compatibility graph built: {} modules, {} directions, {} directed links",
        num_modules, num_directions, total
    );
    total
}

fn link(topology: Topology, modules: &mut [Module], a: usize, direction: Direction, b: usize) {
    modules[a].links[direction].set(b, true);
    modules[b].links[topology.opposite(direction)].set(a, true);
}

/// Checks `B ∈ A.links[d] ⇔ A ∈ B.links[opposite(d)]` for every pair and direction.
pub fn is_symmetric(topology: Topology, modules: &[Module]) -> bool {
    modules.iter().enumerate().all(|(a, module)| {
        topology.directions().all(|d| {
            let Some(links) = module.links.get(d) else {
                return false;
            };
            modules.iter().enumerate().all(|(b, other)| {
                let forward = links.get(b).map_or(false, |bit| *bit);
                let backward = other
                    .links
                    .get(topology.opposite(d))
                    .and_then(|l| l.get(a).map(|bit| *bit))
                    .unwrap_or(false);
                forward == backward
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expander::expand_tile;
    use crate::topology::planar;
    use crate::types::{sockets, BaseTileId, TileDefinition};

    fn expand_all(topology: Topology, defs: &[TileDefinition]) -> Vec<Module> {
        let mut modules = Vec::new();
        for (i, def) in defs.iter().enumerate() {
            let expanded = expand_tile(topology, def, BaseTileId(i), modules.len()).unwrap();
            modules.extend(expanded);
        }
        modules
    }

    #[test]
    fn intersecting_sockets_link_both_ways() {
        let topology = Topology::Planar;
        // A exposes 1 to the right, B accepts {1, 2} on its left.
        let a = TileDefinition::new("a", vec![sockets([0]), sockets([1]), sockets([0]), sockets([0])]);
        let b = TileDefinition::new("b", vec![sockets([9]), sockets([9]), sockets([9]), sockets([1, 2])]);
        let mut modules = expand_all(topology, &[a, b]);
        build_links(topology, &mut modules);

        assert!(modules[0].links(planar::RIGHT).unwrap()[1]);
        assert!(modules[1].links(planar::LEFT).unwrap()[0]);
        assert!(!modules[1].links(planar::RIGHT).unwrap()[0]);
        // a fits itself vertically (0 against 0) but not horizontally.
        assert!(modules[0].links(planar::UP).unwrap()[0]);
        assert!(!modules[0].links(planar::RIGHT).unwrap()[0]);
        assert!(is_symmetric(topology, &modules));
    }

    #[test]
    fn disjoint_sockets_produce_no_links() {
        let topology = Topology::Planar;
        let a = TileDefinition::new("a", vec![sockets([0]); 4]);
        let b = TileDefinition::new("b", vec![sockets([1]); 4]);
        let mut modules = expand_all(topology, &[a, b]);
        let total = build_links(topology, &mut modules);
        // Each module only links to itself in every direction.
        assert_eq!(total, 2 * 4);
        assert!(!modules[0].links(planar::RIGHT).unwrap()[1]);
    }

    #[test]
    fn rotated_modules_stay_symmetric() {
        let topology = Topology::Volumetric;
        let pipe = TileDefinition::new(
            "pipe",
            vec![sockets([0]), sockets([1]), sockets([0]), sockets([0]), sockets([1, 2]), sockets([0])],
        )
        .with_orientations(["*"]);
        let empty = TileDefinition::new("empty", vec![sockets([0]); 6]);
        let mut modules = expand_all(topology, &[pipe, empty]);
        assert_eq!(modules.len(), 25);
        build_links(topology, &mut modules);
        assert!(is_symmetric(topology, &modules));
    }
}
