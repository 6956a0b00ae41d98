//! Tile definitions, the rotation group and the module catalog.
//!
//! This crate turns base tile definitions into oriented [`Module`]s and links
//! them into the directional compatibility graph the solver consumes.

use thiserror::Error;

pub mod catalog;
pub mod compatibility;
pub mod expander;
pub mod formats;
pub mod loader;
pub mod module;
pub mod rotation;
pub mod topology;
pub mod types;

pub use catalog::{BaseTile, ModuleCatalog};
pub use module::Module;
pub use rotation::{Orientation, RotationGroup, Turn};
pub use topology::{Direction, Topology};
pub use types::{sockets, BaseTileId, CatalogError, ModuleId, SocketSet, SocketType, TileDefinition};

/// Errors raised while loading a catalog file.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("I/O error reading file: {0}")]
    Io(#[from] std::io::Error),
    /// The content is not valid for its format.
    #[error("Failed to parse catalog format (e.g., RON/JSON): {0}")]
    ParseError(String),
    /// No parser handles the file's extension.
    #[error("Unsupported catalog format: {0}")]
    UnsupportedFormat(String),
    /// The definitions parsed but do not form a valid catalog.
    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}
