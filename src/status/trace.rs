//! Trace recording of status events
//!
//! Writes one JSON line per event to the trace file. Recording is
//! best-effort: write failures are logged and the stream keeps draining.

use super::StatusReceiver;
use crate::error::{BuildError, BuildResult};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// An opened trace file
#[derive(Debug)]
pub struct TraceRecorder {
    path: PathBuf,
    file: File,
}

impl TraceRecorder {
    /// Open (append, create) the trace file
    pub fn open(path: &Path) -> BuildResult<Self> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = options.open(path).map_err(|e| BuildError::TraceOpen {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!("tracing logs to {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file: File::from_std(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record every event until the queue closes.
    ///
    /// Never fails: each event that cannot be written is logged and skipped.
    pub async fn record(mut self, mut events: StatusReceiver) -> BuildResult<()> {
        while let Some(event) = events.recv().await {
            let mut line = match serde_json::to_string(event.as_ref()) {
                Ok(s) => s,
                Err(e) => {
                    error!("Failed to serialize trace event: {}", e);
                    continue;
                }
            };
            line.push('\n');

            if let Err(e) = self.file.write_all(line.as_bytes()).await {
                error!("Failed to write trace {}: {}", self.path.display(), e);
            }
        }

        if let Err(e) = self.file.flush().await {
            error!("Failed to flush trace {}: {}", self.path.display(), e);
        }
        Ok(())
    }
}
