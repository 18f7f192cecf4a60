use std::path::PathBuf;

use crate::config::Config;
use crate::error::ParserError;

/// Finds parser scripts: the override directory wins when the script exists
/// there, otherwise the first bundled directory that has it.
#[derive(Debug, Clone)]
pub struct ScriptLocator {
    override_dir: PathBuf,
    bundled_dirs: Vec<PathBuf>,
}

impl ScriptLocator {
    pub fn new(override_dir: impl Into<PathBuf>, bundled_dirs: Vec<PathBuf>) -> Self {
        Self {
            override_dir: override_dir.into(),
            bundled_dirs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.script_override_dir.clone(),
            config.bundled_script_dirs.clone(),
        )
    }

    pub fn resolve(&self, parser: &str, script: &str) -> Result<PathBuf, ParserError> {
        let configured = self.override_dir.join(script);
        if configured.is_file() {
            tracing::info!(parser, script = %configured.display(), "using configured parser script");
            return Ok(configured);
        }

        let bundled = self
            .bundled_dirs
            .iter()
            .map(|dir| dir.join(script))
            .find(|p| p.is_file())
            .ok_or_else(|| ParserError::ScriptNotFound {
                parser: parser.to_string(),
                script: script.to_string(),
            })?;

        tracing::info!(parser, script = %bundled.display(), "using bundled parser script");
        Ok(bundled)
    }
}
