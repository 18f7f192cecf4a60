use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ParseToolRequest {
    /// Parser name from `listparsers` output, e.g. "gamess" or "nwchem".
    pub parser: String,
    /// Absolute path of the chemistry output file to convert.
    pub input_path: String,
    /// Catalog metadata. `experimentId`, when present, becomes the record's `id`.
    pub metadata: Option<Map<String, Value>>,
}

impl ParseToolRequest {
    /// Trimmed parser name, lowercased to match registry keys.
    pub fn parser_name(&self) -> String {
        self.parser.trim().to_lowercase()
    }
}
