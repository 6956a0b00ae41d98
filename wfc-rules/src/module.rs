use crate::rotation::Orientation;
use crate::topology::Direction;
use crate::types::{BaseTileId, ModuleId, SocketSet};
use bitvec::prelude::*;

/// One concrete, oriented tile variant.
///
/// Socket sets and identity are fixed when the orientation is expanded; the
/// `links` are filled once by the compatibility graph builder and never
/// change afterwards.
#[derive(Debug, Clone)]
pub struct Module {
    pub(crate) id: ModuleId,
    pub(crate) name: String,
    pub(crate) base: BaseTileId,
    pub(crate) orientation: Orientation,
    pub(crate) sockets: Vec<SocketSet>,
    pub(crate) links: Vec<BitVec>,
    pub(crate) self_attraction: bool,
}

impl Module {
    /// Dense index of this module in its catalog.
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Unique name, `"{base tile}_{orientation tag}"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The base tile this module was derived from.
    pub fn base(&self) -> BaseTileId {
        self.base
    }

    /// The orientation applied to the base tile.
    pub fn orientation(&self) -> &Orientation {
        &self.orientation
    }

    /// Socket types exposed towards `direction`.
    pub fn sockets(&self, direction: Direction) -> Option<&SocketSet> {
        self.sockets.get(direction)
    }

    /// All socket sets, indexed by direction.
    pub fn all_sockets(&self) -> &[SocketSet] {
        &self.sockets
    }

    /// Modules allowed to sit in `direction` from this one.
    pub fn links(&self, direction: Direction) -> Option<&BitSlice> {
        self.links.get(direction).map(BitVec::as_bitslice)
    }

    /// Whether the override policy may repeat this module.
    pub fn self_attraction(&self) -> bool {
        self.self_attraction
    }
}
