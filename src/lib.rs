//! buildctl - build client for a BuildKit-style engine
//!
//! Parses build options, assembles session attachments and the exporter
//! output target, then drives one build while fanning the engine's status
//! stream out to the progress display and an optional trace file.

pub mod cli;
pub mod config;
pub mod definition;
pub mod error;
pub mod exporter;
pub mod options;
pub mod orchestration;
pub mod session;
pub mod status;
pub mod ui;

pub use error::{BuildError, BuildResult};
