use serde::Serialize;

use crate::parsers::ExternalToolParser;

#[derive(Debug, Serialize)]
pub struct ParserInfo {
    pub name: String,
    pub description: String,
    pub script: String,
    pub output_file: String,
    pub aux_file: Option<String>,
}

impl From<&ExternalToolParser> for ParserInfo {
    fn from(parser: &ExternalToolParser) -> Self {
        Self {
            name: parser.name().to_string(),
            description: parser.description().to_string(),
            script: parser.script_path().display().to_string(),
            output_file: parser.output_file().to_string(),
            aux_file: parser.aux_file().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListParsersResponse {
    pub parsers: Vec<ParserInfo>,
}

impl ListParsersResponse {
    pub fn to_markdown(&self) -> String {
        if self.parsers.is_empty() {
            return "No parsers available: no parser scripts were found.".to_string();
        }
        let mut out = String::from(
            "| parser | description | script | output | side output |\n|---|---|---|---|---|\n",
        );
        for p in &self.parsers {
            out.push_str(&format!(
                "| {} | {} | `{}` | {} | {} |\n",
                p.name,
                p.description,
                p.script,
                p.output_file,
                p.aux_file.as_deref().unwrap_or("-")
            ));
        }
        out
    }
}
