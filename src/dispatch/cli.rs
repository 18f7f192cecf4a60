use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::config::{ArtifactNaming, Config, ExitStatusPolicy, normalize_working_dir};
use crate::dispatch::ParseRequest;
use crate::dispatch::artifacts::ArtifactSet;
use crate::error::ParserError;
use crate::parsers::ExternalToolParser;
use crate::parsers::enrich::{assign_ids, decode_document, embed_image};

pub const MAX_OUTPUT_BYTES: usize = 2 * 1024 * 1024; // 2MB

/// What a finished script left behind on its pipes.
#[derive(Debug)]
pub struct ScriptRun {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Runs parser scripts and turns their JSON artifacts into documents.
#[derive(Debug, Clone)]
pub struct ScriptDispatch {
    interpreter: String,
    working_dir: String,
    exit_status: ExitStatusPolicy,
    naming: ArtifactNaming,
    embed_molecule_image: bool,
}

impl ScriptDispatch {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            working_dir: config.working_dir.clone(),
            exit_status: config.exit_status,
            naming: config.artifact_naming,
            embed_molecule_image: config.embed_molecule_image,
        }
    }

    pub fn naming(&self) -> ArtifactNaming {
        self.naming
    }

    /// Run `parser` on the request's input and return the enriched document.
    ///
    /// Invocation: `<interpreter> <script> <input> <wd><output> [<wd><aux>]`.
    /// Artifacts are removed before returning, whatever the outcome.
    pub async fn parse(
        &self,
        req: &ParseRequest,
        parser: &ExternalToolParser,
    ) -> Result<Map<String, Value>, ParserError> {
        let working_dir = normalize_working_dir(&self.working_dir);
        let artifacts = ArtifactSet::new(
            &working_dir,
            parser.output_file(),
            parser.aux_file(),
            self.naming,
        );

        let result = self.run_parser(req, parser, &artifacts).await;
        artifacts.remove_all();
        result
    }

    async fn run_parser(
        &self,
        req: &ParseRequest,
        parser: &ExternalToolParser,
        artifacts: &ArtifactSet,
    ) -> Result<Map<String, Value>, ParserError> {
        let mut args: Vec<&OsStr> = vec![
            parser.script_path().as_os_str(),
            req.input_path.as_os_str(),
        ];
        args.extend(artifacts.args().into_iter().map(|p| p.as_os_str()));

        let run = self.run_script(&self.interpreter, &args, req.deadline).await?;

        if !run.stderr.trim().is_empty() {
            tracing::warn!(parser = parser.name(), stderr = %run.stderr, "parser script wrote to stderr");
        }
        if !run.stdout.is_empty() {
            tracing::debug!(
                parser = parser.name(),
                stdout = %String::from_utf8_lossy(&run.stdout),
                "parser script stdout"
            );
        }

        let output = artifacts.output_path();
        let produced = tokio::fs::try_exists(output).await.map_err(|e| {
            ParserError::io(format!("cannot check {}", output.display()), e)
        })?;
        if !produced {
            if self.exit_status == ExitStatusPolicy::Strict && !run.status.success() {
                return Err(ParserError::ProcessExit {
                    code: run.status.code().unwrap_or(-1),
                    stderr: run.stderr,
                });
            }
            return Err(ParserError::OutputMissing {
                path: output.to_path_buf(),
            });
        }

        if !run.status.success() {
            tracing::warn!(
                parser = parser.name(),
                code = run.status.code().unwrap_or(-1),
                "parser script failed but left output, using it"
            );
        }

        let bytes = tokio::fs::read(output).await.map_err(|e| {
            ParserError::io(format!("failed to read {}", output.display()), e)
        })?;
        let mut document = decode_document(&bytes, output)?;
        assign_ids(&mut document, req.metadata.as_ref());

        if self.embed_molecule_image
            && let Some(image) = artifacts.aux_path()
        {
            embed_image(&mut document, image).await;
        }

        tracing::info!(
            parser = parser.name(),
            elapsed_ms = run.elapsed.as_millis() as u64,
            fields = document.len(),
            "parsed document"
        );
        Ok(document)
    }

    /// Execute a script and collect its pipes.
    ///
    /// - No shell: `Command::new` + args
    /// - Own process group, killed as a whole on timeout or pipe overflow
    /// - stdout/stderr each capped at MAX_OUTPUT_BYTES
    /// - stdin is /dev/null
    pub async fn run_script<S: AsRef<OsStr>>(
        &self,
        executable: &str,
        args: &[S],
        deadline: Instant,
    ) -> Result<ScriptRun, ParserError> {
        let start = Instant::now();

        let timeout = deadline
            .checked_duration_since(start)
            .filter(|d| *d > Duration::from_millis(100))
            .ok_or(ParserError::Timeout(0))?;

        let mut cmd = Command::new(executable);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| ParserError::Spawn {
            executable: executable.to_string(),
            source,
        })?;

        // process_group(0) makes the child its own group leader (pgid == pid).
        // Dropping the guard kills the whole group, so a cancelled call takes
        // the script's helpers down with it before the artifacts are removed.
        let group = ProcessGroup(child.id());

        let (Some(stdout_pipe), Some(stderr_pipe)) = (child.stdout.take(), child.stderr.take())
        else {
            return Err(ParserError::io(
                format!("{executable} pipes unavailable"),
                std::io::Error::other("stdout/stderr not captured"),
            ));
        };

        let read_future = async {
            let mut stdout_handle = tokio::spawn(read_capped(stdout_pipe, "stdout"));
            let mut stderr_handle = tokio::spawn(read_capped(stderr_pipe, "stderr"));

            // A full pipe blocks the writer; kill the group so the other
            // reader sees EOF instead of waiting out the deadline.
            let (stdout_buf, stderr_buf) = tokio::select! {
                result = &mut stdout_handle => {
                    let buf = result.unwrap_or_default();
                    if buf.len() >= MAX_OUTPUT_BYTES {
                        group.kill();
                    }
                    (buf, stderr_handle.await.unwrap_or_default())
                }
                result = &mut stderr_handle => {
                    let buf = result.unwrap_or_default();
                    if buf.len() >= MAX_OUTPUT_BYTES {
                        group.kill();
                    }
                    (stdout_handle.await.unwrap_or_default(), buf)
                }
            };
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((stdout_buf, stderr_buf, status))
        };

        let outcome = tokio::time::timeout(timeout, read_future).await;
        let (stdout, stderr_raw, status) = match outcome {
            Ok(result) => result.map_err(|e| {
                ParserError::io(format!("failed to read from {executable}"), e)
            })?,
            Err(_) => {
                group.kill();
                // Reap so nothing is still writing when artifacts are removed.
                let _ = child.wait().await;
                let elapsed_ms = start.elapsed().as_millis() as u64;
                tracing::warn!(executable, elapsed_ms, "parser script timed out");
                return Err(ParserError::Timeout(elapsed_ms));
            }
        };

        Ok(ScriptRun {
            status,
            stdout,
            stderr: String::from_utf8_lossy(&stderr_raw).into_owned(),
            elapsed: start.elapsed(),
        })
    }
}

async fn read_capped<R: AsyncRead + Unpin>(pipe: R, name: &'static str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_OUTPUT_BYTES.min(64 * 1024));
    let mut capped = pipe.take(MAX_OUTPUT_BYTES as u64);
    if let Err(e) = capped.read_to_end(&mut buf).await {
        tracing::warn!("{name} pipe read error: {e}");
    }
    buf
}

/// Process group led by a spawned script. Killed with SIGKILL on drop,
/// which also takes out stragglers left behind by a script that exited.
struct ProcessGroup(Option<u32>);

impl ProcessGroup {
    fn kill(&self) {
        if let Some(pid) = self.0 {
            // SAFETY: signalling a process group we created; a stale pgid only yields ESRCH.
            unsafe {
                libc::kill(-(pid as i32), libc::SIGKILL);
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}
