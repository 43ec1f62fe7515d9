//! CLI argument definitions using clap derive

use crate::ui::ProgressMode;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// buildctl - build client for a BuildKit-style engine
///
/// Turns command-line options into a build request, runs it on the
/// configured engine and renders progress as it arrives.
#[derive(Parser, Debug)]
#[command(name = "buildctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "BUILDCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Engine address, overrides engine.addr from the config
    #[arg(long, global = true, env = "BUILDKIT_HOST")]
    pub addr: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a definition or frontend target
    Build(BuildArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug, Default)]
pub struct BuildArgs {
    /// Define exporter for build result
    #[arg(long, default_value = "")]
    pub exporter: String,

    /// Define custom options for exporter (key=value)
    #[arg(long = "exporter-opt", value_name = "KEY=VALUE")]
    pub exporter_opt: Vec<String>,

    /// Set type of progress (auto, plain, tty). Use plain to show container output
    #[arg(long, value_enum)]
    pub progress: Option<ProgressMode>,

    /// Path to trace file. Defaults to no tracing
    #[arg(long, value_name = "FILE")]
    pub trace: Option<PathBuf>,

    /// Allow build access to the local directory (name=path)
    #[arg(long, value_name = "NAME=PATH")]
    pub local: Vec<String>,

    /// Define frontend used for build
    #[arg(long)]
    pub frontend: Option<String>,

    /// Define custom options for frontend (key=value)
    #[arg(long = "frontend-opt", value_name = "KEY=VALUE")]
    pub frontend_opt: Vec<String>,

    /// Disable cache for all the vertices
    #[arg(long)]
    pub no_cache: bool,

    /// Export build cache, e.g. type=registry,ref=example.com/foo/bar
    #[arg(long = "export-cache", value_name = "SPEC")]
    pub export_cache: Vec<String>,

    /// Define custom options for cache exporting (DEPRECATED)
    #[arg(long = "export-cache-opt", hide = true)]
    pub export_cache_opt: Vec<String>,

    /// Import build cache, e.g. type=registry,ref=example.com/foo/bar
    #[arg(long = "import-cache", value_name = "SPEC")]
    pub import_cache: Vec<String>,

    /// Secret value exposed to the build. Format id=secretname,src=filepath
    #[arg(long, value_name = "SPEC")]
    pub secret: Vec<String>,

    /// Allow extra privileged entitlement, e.g. network.host, security.unconfined
    #[arg(long, value_name = "ENTITLEMENT")]
    pub allow: Vec<String>,

    /// Allow forwarding SSH agent to the builder. Format default|<id>[=<socket>|<key>[,<key>]]
    #[arg(long, value_name = "SPEC")]
    pub ssh: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., engine.command)
        key: String,
        /// Value to set
        value: String,
    },
}
