pub mod artifacts;
pub mod cli;
pub mod registry;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

/// One parse call: the file to convert plus optional catalog metadata.
#[derive(Debug, Clone)]
pub struct ParseRequest {
    pub input_path: PathBuf,
    /// Only `experimentId` is interpreted; everything else is ignored.
    pub metadata: Option<Map<String, Value>>,
    pub deadline: Instant,
}

impl ParseRequest {
    pub fn new(
        input_path: impl Into<PathBuf>,
        metadata: Option<Map<String, Value>>,
        timeout: Duration,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            metadata,
            deadline: Instant::now() + timeout,
        }
    }
}

#[derive(Debug)]
pub struct ParseResult {
    pub document: Map<String, Value>,
    pub parser: String,
}
