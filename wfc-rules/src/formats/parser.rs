use crate::topology::Topology;
use crate::types::TileDefinition;
use crate::LoadError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Top-level structure of a catalog file, independent of its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CatalogFile {
    /// Lattice the tiles are designed for; decides how many socket lists each tile needs.
    #[cfg_attr(feature = "serde", serde(default))]
    pub topology: Topology,
    /// Base tile definitions, in catalog order.
    pub tiles: Vec<TileDefinition>,
}

/// Trait defining the interface for format-specific catalog parsers.
///
/// Implementors of this trait can parse tile definitions from different file formats
/// (e.g., RON, JSON).
pub trait FormatParser {
    /// Parses file content into a [`CatalogFile`].
    ///
    /// # Arguments
    ///
    /// * `content` - A string slice containing the file content
    ///
    /// # Returns
    ///
    /// * `Ok(CatalogFile)` - Successfully parsed definitions
    /// * `Err(LoadError)` - Error encountered during parsing
    fn parse(&self, content: &str) -> Result<CatalogFile, LoadError>;

    /// Returns a descriptive name for this parser format.
    ///
    /// This can be used for debugging, logging, or user-facing error messages.
    fn format_name(&self) -> &'static str;
}
