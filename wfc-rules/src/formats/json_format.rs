use crate::formats::{CatalogFile, FormatParser};
use crate::LoadError;

/// A parser implementation for JSON catalog files.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatParser;

impl JsonFormatParser {
    /// Creates a new JSON format parser
    pub fn new() -> Self {
        Self
    }
}

impl FormatParser for JsonFormatParser {
    fn format_name(&self) -> &'static str {
        "JSON"
    }

    fn parse(&self, json_content: &str) -> Result<CatalogFile, LoadError> {
        serde_json::from_str(json_content)
            .map_err(|e| LoadError::ParseError(format!("JSON deserialization failed: {e}")))
    }
}
