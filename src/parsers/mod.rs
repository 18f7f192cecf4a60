pub mod enrich;
pub mod gamess;
pub mod locate;
pub mod nwchem;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ParserError;
use crate::parsers::locate::ScriptLocator;

/// Static description of one external-tool parser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParserSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Script path relative to a script root, e.g. `chem/gamess.py`.
    pub script: String,
    pub output_file: String,
    /// Side output (e.g. a rendered molecule image). Passed as the fourth
    /// argument only when set.
    #[serde(default)]
    pub aux_file: Option<String>,
}

/// Parsers available without any configuration.
pub fn builtin_specs() -> Vec<ParserSpec> {
    vec![gamess::spec(), nwchem::spec()]
}

/// A parser whose script has been located on disk.
#[derive(Debug, Clone)]
pub struct ExternalToolParser {
    spec: ParserSpec,
    script_path: PathBuf,
}

impl ExternalToolParser {
    /// Resolve the script once. Fails if neither the override nor any
    /// bundled location has it.
    pub fn new(spec: ParserSpec, locator: &ScriptLocator) -> Result<Self, ParserError> {
        let script_path = locator.resolve(&spec.name, &spec.script)?;
        Ok(Self { spec, script_path })
    }

    /// Use an already-resolved script path as is.
    pub fn with_script_path(spec: ParserSpec, script_path: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            script_path: script_path.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn description(&self) -> &str {
        &self.spec.description
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn output_file(&self) -> &str {
        &self.spec.output_file
    }

    pub fn aux_file(&self) -> Option<&str> {
        self.spec.aux_file.as_deref()
    }
}
