//! Module defining parsers for different catalog file formats.

// Export the core parser trait
pub mod parser;
pub use parser::{CatalogFile, FormatParser};

// Format-specific implementations
#[cfg(feature = "serde")]
pub mod json_format;
#[cfg(feature = "serde")]
pub mod ron_format;
