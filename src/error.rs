use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("script {script} for parser {parser} not found")]
    ScriptNotFound { parser: String, script: String },

    #[error("parser not found: {name}")]
    UnknownParser {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("failed to spawn {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("process exited with code {code}: {stderr}")]
    ProcessExit { code: i32, stderr: String },

    #[error("could not parse data: no output at {}", path.display())]
    OutputMissing { path: PathBuf },

    #[error("invalid JSON in {}: {source}", path.display())]
    JsonDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("output in {} is not a JSON object", path.display())]
    NotAnObject { path: PathBuf },

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl ParserError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True when the external tool ran but left nothing usable behind.
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            Self::OutputMissing { .. } | Self::JsonDecode { .. } | Self::NotAnObject { .. }
        )
    }

    /// Message safe to hand back to server clients. Omits filesystem paths
    /// from the working directory and truncates subprocess stderr.
    pub fn user_message(&self) -> String {
        match self {
            Self::ScriptNotFound { parser, .. } => {
                format!("parser script for {parser} is not installed")
            }
            Self::UnknownParser { name, suggestions } => {
                if suggestions.is_empty() {
                    format!("parser not found: {name}")
                } else {
                    format!(
                        "parser not found: {name}. Did you mean: {}?",
                        suggestions.join(", ")
                    )
                }
            }
            Self::Spawn { executable, .. } => format!("failed to start {executable}"),
            Self::Io { context, .. } => context.clone(),
            Self::Timeout(ms) => format!("parser timed out after {ms}ms"),
            Self::ProcessExit { code, stderr } => {
                if stderr.trim().is_empty() {
                    format!("parser script exited with code {code}")
                } else {
                    // Python tracebacks end with the actual exception.
                    let tail: String = stderr
                        .chars()
                        .rev()
                        .take(200)
                        .collect::<Vec<_>>()
                        .into_iter()
                        .rev()
                        .collect();
                    let prefix = if tail.len() < stderr.len() { "..." } else { "" };
                    format!("parser script exited with code {code}: {prefix}{tail}")
                }
            }
            Self::OutputMissing { .. } => "could not parse data".to_string(),
            Self::JsonDecode { .. } => "parser script produced invalid JSON".to_string(),
            Self::NotAnObject { .. } => "parser script output is not a JSON object".to_string(),
            Self::Config(msg) => format!("config error: {msg}"),
            Self::Other(msg) => msg.clone(),
        }
    }
}
