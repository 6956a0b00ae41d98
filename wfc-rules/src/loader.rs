use crate::catalog::ModuleCatalog;
use crate::formats::{CatalogFile, FormatParser};
use crate::LoadError;
use std::path::Path;

/// Picks a parser for a catalog file based on its extension.
///
/// # Errors
///
/// Returns `LoadError::UnsupportedFormat` for extensions other than `.ron` and `.json`.
pub fn parser_for(path: &Path) -> Result<Box<dyn FormatParser>, LoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        #[cfg(feature = "serde")]
        Some("ron") => Ok(Box::new(crate::formats::ron_format::RonFormatParser::new())),
        #[cfg(feature = "serde")]
        Some("json") => Ok(Box::new(crate::formats::json_format::JsonFormatParser::new())),
        _ => Err(LoadError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Reads and parses a catalog file without building it.
///
/// # Errors
///
/// I/O, format selection and parse failures.
pub fn read_catalog_file(path: &Path) -> Result<CatalogFile, LoadError> {
    let parser = parser_for(path)?;
    log::debug!("Reading catalog {:?} as {}", path, parser.format_name());
    let content = std::fs::read_to_string(path)?;
    parser.parse(&content)
}

/// Loads tile definitions from a file and builds the module catalog.
///
/// # Arguments
///
/// * `path` - The path to the catalog file (`.ron` or `.json`).
///
/// # Returns
///
/// The built `ModuleCatalog` on success, or a `LoadError` on failure.
pub fn load_from_file(path: &Path) -> Result<ModuleCatalog, LoadError> {
    let file = read_catalog_file(path)?;
    log::info!(
        "Loaded {} tile definitions ({:?}) from {:?}",
        file.tiles.len(),
        file.topology,
        path
    );
    Ok(ModuleCatalog::build(file.topology, &file.tiles)?)
}
