//! Error types for buildctl
//!
//! All modules use `BuildResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildctl operations
pub type BuildResult<T> = Result<T, BuildError>;

/// Coarse classification used when reporting a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed option strings, conflicting flags, unknown values
    Validation,
    /// Files that could not be created or opened
    Resource,
    /// Missing terminal, missing piped input, missing agent socket
    Environment,
    /// Failures reported by the build engine itself
    Engine,
    /// Configuration file problems
    Configuration,
    /// Anything else
    Internal,
}

/// All errors that can occur in buildctl
#[derive(Error, Debug)]
pub enum BuildError {
    // Option validation errors
    #[error("invalid field '{field}' must be a key=value pair")]
    MalformedField { field: String },

    #[error("{option} requires type=<type>")]
    MissingType { option: &'static str },

    #[error("invalid value {0}")]
    InvalidAssignment(String),

    #[error("failed to parse option '{spec}': {reason}")]
    OptionSyntax { spec: String, reason: String },

    #[error("unsupported secret type \"{0}\"")]
    UnsupportedSecretType(String),

    #[error("unexpected key '{key}' in '{field}'")]
    UnexpectedSecretKey { key: String, field: String },

    #[error("{0}")]
    OptionConflict(String),

    #[error("unknown entitlement {0}")]
    UnknownEntitlement(String),

    #[error("invalid {option}: {source}")]
    InvalidOption {
        option: String,
        #[source]
        source: Box<BuildError>,
    },

    // Session attachment errors
    #[error("secret missing ID")]
    SecretMissingId,

    #[error("secret {0} too big. max size 500KB")]
    SecretTooLarge(String),

    #[error("failed to stat {path}: {source}")]
    SecretStat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate ssh agent id {0}")]
    SshDuplicateId(String),

    #[error("invalid empty ssh agent socket, make sure SSH_AUTH_SOCK is set")]
    SshAgentSocketMissing,

    #[error("invalid ssh agent path {path}: {source}")]
    SshPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Exporter output errors
    #[error("output directory is required for local exporter")]
    OutputDirectoryRequired,

    #[error("destination file is a directory")]
    DestinationIsDirectory,

    #[error("invalid destination file: {path}: {source}")]
    DestinationInvalid {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create output file {path}: {source}")]
    OutputCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output file is required for {exporter} exporter. refusing to write to console")]
    RefuseConsoleOutput { exporter: String },

    #[error("output {output} is not supported by {exporter} exporter")]
    OutputNotSupported { output: String, exporter: String },

    // Environment errors
    #[error("please specify --frontend or pipe a build definition to stdin")]
    NoBuildInput,

    #[error("empty definition sent to build. Specify --frontend instead?")]
    EmptyDefinition,

    #[error("failed to parse input: {0}")]
    DefinitionParse(#[source] serde_json::Error),

    #[error("progress mode tty requires a terminal on stderr")]
    TerminalUnavailable,

    // Trace errors
    #[error("failed to open trace file {path}: {source}")]
    TraceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Engine errors
    #[error("failed to start build engine {command}: {source}")]
    EngineSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("build engine failed: {0}")]
    Engine(String),

    #[error("build cancelled")]
    Cancelled,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl BuildError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap an error with the name of the option it came from
    pub fn invalid_option(option: impl Into<String>, source: BuildError) -> Self {
        Self::InvalidOption {
            option: option.into(),
            source: Box::new(source),
        }
    }

    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidOption { source, .. } => source.category(),

            Self::MalformedField { .. }
            | Self::MissingType { .. }
            | Self::InvalidAssignment(_)
            | Self::OptionSyntax { .. }
            | Self::UnsupportedSecretType(_)
            | Self::UnexpectedSecretKey { .. }
            | Self::OptionConflict(_)
            | Self::UnknownEntitlement(_)
            | Self::SecretMissingId
            | Self::SecretTooLarge(_)
            | Self::SshDuplicateId(_)
            | Self::OutputDirectoryRequired
            | Self::DestinationIsDirectory
            | Self::OutputNotSupported { .. }
            | Self::EmptyDefinition
            | Self::DefinitionParse(_)
            | Self::User(_) => ErrorCategory::Validation,

            Self::SecretStat { .. }
            | Self::SshPath { .. }
            | Self::DestinationInvalid { .. }
            | Self::OutputCreate { .. }
            | Self::TraceOpen { .. }
            | Self::Io { .. } => ErrorCategory::Resource,

            Self::SshAgentSocketMissing
            | Self::RefuseConsoleOutput { .. }
            | Self::NoBuildInput
            | Self::TerminalUnavailable => ErrorCategory::Environment,

            Self::EngineSpawn { .. } | Self::Engine(_) | Self::Cancelled => ErrorCategory::Engine,

            Self::ConfigInvalid { .. }
            | Self::ConfigDirCreate { .. }
            | Self::TomlParse(_)
            | Self::TomlSerialize(_) => ErrorCategory::Configuration,

            Self::Json(_) | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidOption { source, .. } => source.hint(),
            Self::NoBuildInput => Some("Pipe a definition: <generator> | buildctl build"),
            Self::RefuseConsoleOutput { .. } => {
                Some("Pass --exporter-opt output=<file> or redirect stdout to a file")
            }
            Self::TerminalUnavailable => Some("Use --progress plain when not attached to a terminal"),
            Self::SshAgentSocketMissing => Some("Start an agent with: eval $(ssh-agent)"),
            Self::UnsupportedSecretType(_) => Some("Only type=file secrets are supported"),
            Self::EngineSpawn { .. } => Some("Set engine.command with: buildctl config set engine.command <path>"),
            _ => None,
        }
    }
}
