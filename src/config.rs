use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ParserError;
use crate::parsers::ParserSpec;

pub const DEFAULT_WORKING_DIR: &str = "/tmp";
pub const DEFAULT_INTERPRETER: &str = "python";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Override location checked before the bundled script directories.
pub const DEFAULT_SCRIPT_OVERRIDE_DIR: &str = "../parser-scripts";

const CONFIG_ENV: &str = "CHEMPARSE_CONFIG";
const CONFIG_FILE: &str = "chemparse.toml";

/// What to do with the script's exit status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatusPolicy {
    /// Non-zero exit with no output artifact fails with `ProcessExit`.
    #[default]
    Strict,
    /// Exit status is ignored; only a missing artifact fails the call.
    Permissive,
}

/// How artifact file names are chosen inside the working directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactNaming {
    /// `<call-id>-<file name>`, unique per call.
    #[default]
    PerInvocation,
    /// The bare file names. Calls sharing a working directory must be serialized.
    Fixed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub working_dir: String,
    pub interpreter: String,
    pub timeout_secs: u64,
    pub exit_status: ExitStatusPolicy,
    pub artifact_naming: ArtifactNaming,
    pub script_override_dir: PathBuf,
    pub bundled_script_dirs: Vec<PathBuf>,
    /// Base64 the auxiliary molecule image into `MolecularImage`.
    pub embed_molecule_image: bool,
    pub max_concurrent: usize,
    /// Extra parsers; an entry named like a built-in replaces it.
    pub parsers: Vec<ParserSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_dir: DEFAULT_WORKING_DIR.to_string(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            exit_status: ExitStatusPolicy::default(),
            artifact_naming: ArtifactNaming::default(),
            script_override_dir: PathBuf::from(DEFAULT_SCRIPT_OVERRIDE_DIR),
            bundled_script_dirs: default_bundled_dirs(),
            embed_molecule_image: false,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            parsers: Vec::new(),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (if any), then environment overrides.
    /// Problems are logged and the previous layer is kept.
    pub fn load() -> Self {
        let path = env::var(CONFIG_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from(CONFIG_FILE)).filter(|p| p.exists()));

        let mut config = match path {
            Some(path) => match Self::from_file(&path) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "loaded config file");
                    config
                }
                Err(e) => {
                    tracing::warn!("{e}, using defaults");
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env();
        config
    }

    pub fn from_file(path: &Path) -> Result<Self, ParserError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ParserError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ParserError> {
        let config: Config =
            toml::from_str(text).map_err(|e| ParserError::Config(e.to_string()))?;
        if config.max_concurrent == 0 {
            return Err(ParserError::Config(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = env::var("CHEMPARSE_WORKING_DIR")
            && !dir.trim().is_empty()
        {
            self.working_dir = dir;
        }
        if let Ok(interpreter) = env::var("CHEMPARSE_INTERPRETER")
            && !interpreter.trim().is_empty()
        {
            self.interpreter = interpreter;
        }
        if let Ok(raw) = env::var("CHEMPARSE_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "ignoring invalid CHEMPARSE_TIMEOUT_SECS"),
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Working directory with a trailing separator, ready for file names to be
/// appended. Empty input falls back to the default.
pub fn normalize_working_dir(dir: &str) -> String {
    let mut dir = if dir.trim().is_empty() {
        DEFAULT_WORKING_DIR.to_string()
    } else {
        dir.to_string()
    };
    if !dir.ends_with(std::path::MAIN_SEPARATOR) {
        dir.push(std::path::MAIN_SEPARATOR);
    }
    dir
}

/// Scripts shipped next to the binary, then in the crate checkout
/// (development builds).
fn default_bundled_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(exe) = env::current_exe()
        && let Some(dir) = exe.parent()
    {
        dirs.push(dir.join("parser-scripts"));
    }
    dirs.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("parser-scripts"));
    dirs
}
