use proptest::prelude::*;
use wfc_rules::{sockets, ModuleCatalog, ModuleId, TileDefinition, Topology};

fn socket_set() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..4, 1..3)
}

fn planar_tile() -> impl Strategy<Value = (Vec<Vec<u32>>, bool)> {
    (prop::collection::vec(socket_set(), 4), any::<bool>())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn links_are_symmetric_under_direction_reversal(
        tiles in prop::collection::vec(planar_tile(), 1..5)
    ) {
        let topology = Topology::Planar;
        let defs: Vec<TileDefinition> = tiles
            .into_iter()
            .enumerate()
            .map(|(i, (faces, rotate))| {
                let def = TileDefinition::new(
                    format!("t{i}"),
                    faces.into_iter().map(sockets).collect(),
                );
                if rotate { def.with_orientations(["*"]) } else { def }
            })
            .collect();
        let catalog = ModuleCatalog::build(topology, &defs).unwrap();

        for a in 0..catalog.len() {
            for b in 0..catalog.len() {
                for d in topology.directions() {
                    let forward = catalog.links(ModuleId(a), d).unwrap()[b];
                    let backward = catalog.links(ModuleId(b), topology.opposite(d)).unwrap()[a];
                    prop_assert_eq!(forward, backward);

                    // Links mean exactly "facing sockets intersect".
                    let faces_a = catalog.module(ModuleId(a)).unwrap().sockets(d).unwrap();
                    let faces_b = catalog
                        .module(ModuleId(b))
                        .unwrap()
                        .sockets(topology.opposite(d))
                        .unwrap();
                    prop_assert_eq!(forward, !faces_a.is_disjoint(faces_b));
                }
            }
        }
    }
}
