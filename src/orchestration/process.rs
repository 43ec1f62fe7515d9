//! Build engine driven as a child process
//!
//! The request is written to the engine's stdin as JSON. The engine
//! reports progress on stderr, one JSON message per line; any other stderr
//! line is treated as diagnostic output. Archive bytes for single-file
//! exporters arrive on stdout.

use super::engine::{BuildEngine, SolveRequest, SolveResponse};
use super::{engine_error_output, ENGINE_ERROR_TAIL_LINES};
use crate::definition::Definition;
use crate::error::{BuildError, BuildResult};
use crate::status::{SolveStatus, StatusSender};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct EngineInput<'a> {
    definition: Option<&'a Definition>,
    exporter_output_dir: Option<&'a PathBuf>,
    exporter_output_stream: bool,
    #[serde(flatten)]
    request: &'a SolveRequest,
}

/// One line of the engine's stderr protocol
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EngineMessage {
    Status(SolveStatus),
    Response(SolveResponse),
}

/// Engine reached by running a local command
pub struct ProcessEngine {
    command: String,
    args: Vec<String>,
    addr: Option<String>,
}

impl ProcessEngine {
    /// Create an engine that runs `command args... [--addr <addr>]`
    pub fn new(command: impl Into<String>, args: Vec<String>, addr: Option<String>) -> Self {
        Self {
            command: command.into(),
            args,
            addr,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        if let Some(addr) = &self.addr {
            cmd.arg("--addr").arg(addr);
        }
        cmd
    }
}

#[async_trait]
impl BuildEngine for ProcessEngine {
    async fn solve(
        &self,
        definition: Option<Definition>,
        mut request: SolveRequest,
        status: StatusSender,
        cancel: CancellationToken,
    ) -> BuildResult<SolveResponse> {
        let writer = request.exporter_output.take_writer();
        let input = serde_json::to_vec(&EngineInput {
            definition: definition.as_ref(),
            exporter_output_dir: request.exporter_output_dir(),
            exporter_output_stream: writer.is_some(),
            request: &request,
        })?;

        info!(
            "Starting build session {} with {}",
            request.session.id, self.command
        );
        debug!("Executing: {} {:?}", self.command, self.args);

        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .stdout(if writer.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BuildError::EngineSpawn {
                command: self.command.clone(),
                source: e,
            })?;

        let run = async move {
            let stdin = child.stdin.take();
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();

            let feed = async {
                if let Some(mut stdin) = stdin {
                    if let Err(e) = stdin.write_all(&input).await {
                        debug!("Build engine did not accept the request: {}", e);
                    }
                }
            };

            let export = async {
                match (stdout, writer) {
                    (Some(mut out), Some(writer)) => {
                        let mut writer = writer.into_async();
                        tokio::io::copy(&mut out, &mut writer).await?;
                        writer.flush().await
                    }
                    _ => Ok::<(), std::io::Error>(()),
                }
            };

            let events = read_engine_messages(stderr, &status);

            let ((), exported, (response, diagnostics)) = tokio::join!(feed, export, events);

            let exit = child
                .wait()
                .await
                .map_err(|e| BuildError::io("waiting for build engine", e))?;

            if !exit.success() {
                let lines: Vec<String> = diagnostics.into_iter().collect();
                let output = engine_error_output(&lines);
                return Err(BuildError::Engine(if output.is_empty() {
                    format!("engine exited with {}", exit)
                } else {
                    output
                }));
            }

            exported.map_err(|e| BuildError::io("writing exporter output", e))?;
            Ok::<_, BuildError>(response.unwrap_or_default())
        };

        tokio::select! {
            result = run => result,
            _ = cancel.cancelled() => {
                debug!("Build cancelled, stopping {}", self.command);
                Err(BuildError::Cancelled)
            }
        }
    }

    fn engine_name(&self) -> &str {
        &self.command
    }
}

/// Read stderr until EOF, forwarding status messages.
///
/// Returns the final response, if the engine sent one, and the tail of
/// the non-protocol lines.
async fn read_engine_messages(
    stderr: Option<ChildStderr>,
    status: &StatusSender,
) -> (Option<SolveResponse>, VecDeque<String>) {
    let mut response = None;
    let mut diagnostics = VecDeque::new();
    let mut consumers_gone = false;

    let Some(stderr) = stderr else {
        return (response, diagnostics);
    };
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read build engine output: {}", e);
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EngineMessage>(line) {
            Ok(EngineMessage::Status(event)) => {
                if !consumers_gone && status.send(Arc::new(event)).await.is_err() {
                    debug!("Status consumers went away, dropping further events");
                    consumers_gone = true;
                }
            }
            Ok(EngineMessage::Response(r)) => response = Some(r),
            Err(_) => {
                debug!("engine: {}", line);
                if diagnostics.len() == ENGINE_ERROR_TAIL_LINES {
                    diagnostics.pop_front();
                }
                diagnostics.push_back(line.to_string());
            }
        }
    }

    (response, diagnostics)
}
