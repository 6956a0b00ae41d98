use std::collections::BTreeSet;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Integer tag describing what a tile face exposes.
pub type SocketType = u32;

/// The socket types exposed by one face. Two faces fit when their sets intersect.
pub type SocketSet = BTreeSet<SocketType>;

/// Identifies one oriented module inside a [`crate::ModuleCatalog`].
///
/// Used as an index into the catalog and as a bit index in domain sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModuleId(pub usize);

/// Identifies the base tile a module was derived from, regardless of orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BaseTileId(pub usize);

/// A base tile as written in a catalog file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileDefinition {
    /// Base identifier; module names are `"{name}_{orientation}"`.
    pub name: String,
    /// Rendering reference, passed through to the presentation layer untouched.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sprite: Option<String>,
    /// One socket set per direction, in the topology's direction order.
    pub sockets: Vec<SocketSet>,
    /// Orientation tags to generate. `["*"]` requests the whole rotation group;
    /// an empty list means identity only.
    #[cfg_attr(feature = "serde", serde(default))]
    pub orientations: Vec<String>,
    /// Whether the override policy may repeat this module.
    #[cfg_attr(feature = "serde", serde(default = "default_self_attraction"))]
    pub self_attraction: bool,
}

#[cfg(feature = "serde")]
fn default_self_attraction() -> bool {
    true
}

impl TileDefinition {
    /// Creates an identity-only, self-attracting definition.
    pub fn new(name: impl Into<String>, sockets: Vec<SocketSet>) -> Self {
        Self {
            name: name.into(),
            sprite: None,
            sockets,
            orientations: Vec::new(),
            self_attraction: true,
        }
    }

    /// Builder-style helper for the requested orientation tags.
    pub fn with_orientations<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orientations = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style helper for the self-attraction flag.
    pub fn with_self_attraction(mut self, self_attraction: bool) -> Self {
        self.self_attraction = self_attraction;
        self
    }
}

/// Errors raised while turning tile definitions into a module catalog.
///
/// All of these are fatal and surface before any solving begins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No tile definitions were supplied.
    #[error("Catalog contains no tiles")]
    EmptyCatalog,
    /// Two modules ended up with the same name.
    #[error("Duplicate module name: {0}")]
    DuplicateModuleName(String),
    /// An orientation tag does not name an element of the rotation group.
    #[error("Unknown orientation tag '{tag}' on tile '{tile}'")]
    UnknownOrientation {
        /// Base tile carrying the tag.
        tile: String,
        /// The offending tag.
        tag: String,
    },
    /// A tile lists the wrong number of socket sets for the topology.
    #[error("Tile '{tile}' has {found} socket lists, expected {expected}")]
    SocketListLength {
        /// Base tile name.
        tile: String,
        /// Direction count of the topology.
        expected: usize,
        /// Number of socket lists supplied.
        found: usize,
    },
    /// A module name used in configuration does not exist in the catalog.
    #[error("Unknown module: {0}")]
    UnknownModule(String),
}

/// Shorthand for building a socket set in tests and demos.
pub fn sockets<I: IntoIterator<Item = SocketType>>(types: I) -> SocketSet {
    types.into_iter().collect()
}
