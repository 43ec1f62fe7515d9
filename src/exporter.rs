//! Exporter kinds and output target resolution
//!
//! Decides whether build output goes to a file, a directory or stdout,
//! and opens the file here so the handle's lifetime is owned by the caller.

use crate::error::{BuildError, BuildResult};
use crate::ui::UiContext;
use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use tokio::io::AsyncWrite;

/// Known exporters; anything else is carried by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExporterKind {
    Image,
    Local,
    Oci,
    Docker,
    Other(String),
}

/// What kind of filesystem artifact an exporter produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterCategory {
    /// Writes a directory tree
    Directory,
    /// Writes one archive stream
    SingleArchive,
    /// Produces nothing on the client side
    NoArtifact,
}

impl ExporterKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "image" => ExporterKind::Image,
            "local" => ExporterKind::Local,
            "oci" => ExporterKind::Oci,
            "docker" => ExporterKind::Docker,
            other => ExporterKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExporterKind::Image => "image",
            ExporterKind::Local => "local",
            ExporterKind::Oci => "oci",
            ExporterKind::Docker => "docker",
            ExporterKind::Other(name) => name,
        }
    }

    pub fn category(&self) -> ExporterCategory {
        match self {
            ExporterKind::Local => ExporterCategory::Directory,
            ExporterKind::Oci | ExporterKind::Docker => ExporterCategory::SingleArchive,
            ExporterKind::Image | ExporterKind::Other(_) => ExporterCategory::NoArtifact,
        }
    }
}

impl fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for single-archive exporter bytes
#[derive(Debug)]
pub enum OutputWriter {
    File { path: PathBuf, file: File },
    Stdout,
}

impl OutputWriter {
    /// Convert into an async writer for the engine to copy into
    pub fn into_async(self) -> Box<dyn AsyncWrite + Send + Unpin> {
        match self {
            OutputWriter::File { file, .. } => Box::new(tokio::fs::File::from_std(file)),
            OutputWriter::Stdout => Box::new(tokio::io::stdout()),
        }
    }
}

/// Where the exporter's output ends up. Never both a file and a directory.
#[derive(Debug, Default)]
pub enum ExporterOutput {
    #[default]
    None,
    SingleFile(OutputWriter),
    Directory(PathBuf),
}

impl ExporterOutput {
    /// Whether archive bytes are going to stdout
    pub fn is_stdout(&self) -> bool {
        matches!(self, ExporterOutput::SingleFile(OutputWriter::Stdout))
    }

    /// Whether the `output` attribute was consumed
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ExporterOutput::None)
    }

    /// Directory path for directory exporters
    pub fn directory(&self) -> Option<&PathBuf> {
        match self {
            ExporterOutput::Directory(path) => Some(path),
            _ => None,
        }
    }

    /// Take the single-file writer, leaving `None` behind
    pub fn take_writer(&mut self) -> Option<OutputWriter> {
        match std::mem::take(self) {
            ExporterOutput::SingleFile(writer) => Some(writer),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// Resolve the output target for an exporter.
///
/// Directory exporters need a path. Archive exporters create the file, or
/// fall back to stdout when it is not a terminal. Other exporters reject
/// any path.
pub fn resolve_exporter_output(
    exporter: &ExporterKind,
    output: &str,
    ctx: &UiContext,
) -> BuildResult<ExporterOutput> {
    match exporter.category() {
        ExporterCategory::Directory => {
            if output.is_empty() {
                return Err(BuildError::OutputDirectoryRequired);
            }
            Ok(ExporterOutput::Directory(PathBuf::from(output)))
        }
        ExporterCategory::SingleArchive => {
            if !output.is_empty() {
                let path = PathBuf::from(output);
                match std::fs::metadata(&path) {
                    Ok(meta) if meta.is_dir() => return Err(BuildError::DestinationIsDirectory),
                    Ok(_) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(BuildError::DestinationInvalid { path, source: e }),
                }
                let file = File::create(&path).map_err(|e| BuildError::OutputCreate {
                    path: path.clone(),
                    source: e,
                })?;
                return Ok(ExporterOutput::SingleFile(OutputWriter::File { path, file }));
            }

            if ctx.stdout_is_terminal() {
                return Err(BuildError::RefuseConsoleOutput {
                    exporter: exporter.to_string(),
                });
            }
            Ok(ExporterOutput::SingleFile(OutputWriter::Stdout))
        }
        ExporterCategory::NoArtifact => {
            if !output.is_empty() {
                return Err(BuildError::OutputNotSupported {
                    output: output.to_string(),
                    exporter: exporter.to_string(),
                });
            }
            Ok(ExporterOutput::None)
        }
    }
}
