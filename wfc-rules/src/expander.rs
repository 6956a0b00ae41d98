use crate::module::Module;
use crate::rotation::{Orientation, RotationGroup, ALL_ORIENTATIONS};
use crate::topology::Topology;
use crate::types::{BaseTileId, CatalogError, ModuleId, TileDefinition};
use log::trace;

/// Resolves the orientation tags requested by a tile definition.
///
/// An empty request yields the identity only; the `"*"` sentinel yields the
/// whole rotation group. Every other tag is validated even when `"*"` is
/// present.
///
/// # Errors
///
/// Returns `CatalogError::UnknownOrientation` for a tag outside the group.
pub fn requested_orientations(
    topology: Topology,
    definition: &TileDefinition,
) -> Result<Vec<Orientation>, CatalogError> {
    if definition.orientations.is_empty() {
        return Ok(vec![Orientation::identity(topology)]);
    }
    let mut wildcard = false;
    let mut orientations = Vec::with_capacity(definition.orientations.len());
    for tag in &definition.orientations {
        if tag == ALL_ORIENTATIONS {
            wildcard = true;
            continue;
        }
        let orientation =
            Orientation::parse(topology, tag).ok_or_else(|| CatalogError::UnknownOrientation {
                tile: definition.name.clone(),
                tag: tag.clone(),
            })?;
        orientations.push(orientation);
    }
    if wildcard {
        return Ok(RotationGroup::all(topology));
    }
    Ok(orientations)
}

/// Produces one [`Module`] per requested orientation of a base tile.
///
/// For each orientation the per-direction socket sets are permuted exactly as
/// the geometric rotation moves the faces. Module ids are assigned
/// consecutively starting at `first_id`. Links are left empty for the
/// compatibility graph builder.
///
/// # Errors
///
/// * `CatalogError::SocketListLength` if the definition does not list one
///   socket set per direction.
/// * `CatalogError::UnknownOrientation` for tags outside the rotation group.
pub fn expand_tile(
    topology: Topology,
    definition: &TileDefinition,
    base: BaseTileId,
    first_id: usize,
) -> Result<Vec<Module>, CatalogError> {
    let expected = topology.direction_count();
    if definition.sockets.len() != expected {
        return Err(CatalogError::SocketListLength {
            tile: definition.name.clone(),
            expected,
            found: definition.sockets.len(),
        });
    }

    let orientations = requested_orientations(topology, definition)?;
    let mut modules = Vec::with_capacity(orientations.len());
    for (offset, orientation) in orientations.into_iter().enumerate() {
        let sockets = orientation
            .rotate_faces(topology, &definition.sockets)
            .ok_or_else(|| CatalogError::UnknownOrientation {
                tile: definition.name.clone(),
                tag: orientation.tag().to_owned(),
            })?;
        let name = format!("{}_{}", definition.name, orientation.tag());
        trace!("Expanded {} with sockets {:?}", name, sockets);
        modules.push(Module {
            id: ModuleId(first_id + offset),
            name,
            base,
            orientation,
            sockets,
            links: Vec::new(),
            self_attraction: definition.self_attraction,
        });
    }
    Ok(modules)
}
