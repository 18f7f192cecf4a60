use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::config::{ArtifactNaming, Config};
use crate::dispatch::cli::ScriptDispatch;
use crate::dispatch::{ParseRequest, ParseResult};
use crate::error::ParserError;
use crate::parsers::locate::ScriptLocator;
use crate::parsers::{ExternalToolParser, ParserSpec, builtin_specs};

/// Document-type name → parser, plus the limits shared by every call.
pub struct Registry {
    parsers: HashMap<String, ExternalToolParser>,
    dispatch: ScriptDispatch,
    semaphore: Semaphore,
    /// Held for the whole call when artifact names are fixed: two calls
    /// would otherwise read and delete each other's output.
    fixed_names: Option<Mutex<()>>,
    timeout: Duration,
}

impl Registry {
    /// Built-in parsers followed by config-declared ones. Parsers whose
    /// script cannot be found are left out with a warning.
    pub fn from_config(config: Config) -> Self {
        let locator = ScriptLocator::from_config(&config);

        let mut specs: Vec<ParserSpec> = builtin_specs();
        for spec in &config.parsers {
            specs.retain(|s| !s.name.eq_ignore_ascii_case(&spec.name));
            specs.push(spec.clone());
        }

        let parsers = specs
            .into_iter()
            .filter_map(|spec| {
                let name = spec.name.clone();
                match ExternalToolParser::new(spec, &locator) {
                    Ok(parser) => Some(parser),
                    Err(e) => {
                        tracing::warn!("{e}, {name} parser unavailable");
                        None
                    }
                }
            })
            .collect();

        Self::with_parsers(&config, parsers)
    }

    pub fn with_parsers(config: &Config, parsers: Vec<ExternalToolParser>) -> Self {
        let parsers: HashMap<String, ExternalToolParser> = parsers
            .into_iter()
            .map(|p| (lookup_key(p.name()), p))
            .collect();

        if parsers.is_empty() {
            tracing::error!("no parser scripts found, no parsers available");
        }

        let dispatch = ScriptDispatch::from_config(config);
        let fixed_names = (dispatch.naming() == ArtifactNaming::Fixed).then_some(Mutex::new(()));

        Self {
            parsers,
            dispatch,
            semaphore: Semaphore::new(config.max_concurrent.max(1)),
            fixed_names,
            timeout: config.timeout(),
        }
    }

    /// Case-insensitive, like the `parse` tool's parser argument.
    pub fn get(&self, name: &str) -> Option<&ExternalToolParser> {
        self.parsers.get(&lookup_key(name))
    }

    /// All parsers, sorted by name.
    pub fn list_parsers(&self) -> Vec<&ExternalToolParser> {
        let mut parsers: Vec<_> = self.parsers.values().collect();
        parsers.sort_by(|a, b| a.name().cmp(b.name()));
        parsers
    }

    /// Returns the number of free subprocess permits (for testing).
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Request with the configured timeout as its deadline.
    pub fn request(
        &self,
        input_path: impl AsRef<Path>,
        metadata: Option<Map<String, Value>>,
    ) -> ParseRequest {
        ParseRequest::new(input_path.as_ref(), metadata, self.timeout)
    }

    /// Similar parser names for a failed lookup (substring match).
    /// Sorted alphabetically, capped at 5.
    pub fn suggest_parsers(&self, query: &str) -> Vec<String> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return vec![];
        }
        let mut suggestions: Vec<String> = self
            .parsers
            .keys()
            .filter(|k| {
                let k_lower = k.to_lowercase();
                k_lower.contains(&q) || q.contains(&k_lower)
            })
            .cloned()
            .collect();
        suggestions.sort();
        suggestions.truncate(5);
        suggestions
    }

    /// Acquire a semaphore permit with a deadline-aware timeout.
    async fn acquire_with_deadline(
        semaphore: &Semaphore,
        deadline: Instant,
    ) -> Result<SemaphorePermit<'_>, ParserError> {
        let timeout = deadline
            .checked_duration_since(Instant::now())
            .ok_or(ParserError::Timeout(0))?;

        tokio::time::timeout(timeout, semaphore.acquire())
            .await
            .map_err(|_| ParserError::Timeout(timeout.as_millis() as u64))?
            .map_err(|_| ParserError::Other("parser semaphore closed".to_string()))
    }

    /// Route `req` to the named parser. Every failure is logged here once:
    /// a script that ran but produced no usable document is a warning,
    /// anything else an error.
    pub async fn parse(&self, name: &str, req: &ParseRequest) -> Result<ParseResult, ParserError> {
        let result = self.dispatch_to(name, req).await;
        match &result {
            Err(e) if e.is_parse_failure() => {
                tracing::warn!(parser = name, input = %req.input_path.display(), "parse failed: {e}");
            }
            Err(e) => {
                tracing::error!(parser = name, input = %req.input_path.display(), "parse failed: {e}");
            }
            Ok(_) => {}
        }
        result
    }

    async fn dispatch_to(&self, name: &str, req: &ParseRequest) -> Result<ParseResult, ParserError> {
        let parser = self.get(name).ok_or_else(|| ParserError::UnknownParser {
            name: name.to_string(),
            suggestions: self.suggest_parsers(name),
        })?;

        let _permit = Self::acquire_with_deadline(&self.semaphore, req.deadline).await?;
        let _serial = match &self.fixed_names {
            Some(lock) => {
                let timeout = req
                    .deadline
                    .checked_duration_since(Instant::now())
                    .ok_or(ParserError::Timeout(0))?;
                Some(
                    tokio::time::timeout(timeout, lock.lock())
                        .await
                        .map_err(|_| ParserError::Timeout(timeout.as_millis() as u64))?,
                )
            }
            None => None,
        };

        let document = self.dispatch.parse(req, parser).await?;
        Ok(ParseResult {
            document,
            parser: parser.name().to_string(),
        })
    }
}

fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}
