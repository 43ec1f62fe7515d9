//! Build status events and their delivery
//!
//! The engine emits a stream of [`SolveStatus`] records. They are shared
//! as `Arc`s so every consumer sees the same immutable value.

pub mod fanout;
pub mod trace;

pub use fanout::{fan_out, Forwarder};
pub use trace::TraceRecorder;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One shared, immutable status event
pub type StatusEvent = Arc<SolveStatus>;

/// Producer side of a status queue
pub type StatusSender = mpsc::Sender<StatusEvent>;

/// Consumer side of a status queue
pub type StatusReceiver = mpsc::Receiver<StatusEvent>;

/// A batch of progress information emitted by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveStatus {
    pub vertexes: Vec<Vertex>,
    pub statuses: Vec<VertexStatus>,
    pub logs: Vec<VertexLog>,
}

/// A node of the build graph as the engine reports it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vertex {
    pub digest: String,
    pub inputs: Vec<String>,
    pub name: String,
    pub cached: bool,
    pub started: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Progress of a sub-task of a vertex (e.g. a layer download)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexStatus {
    pub id: String,
    pub vertex: String,
    pub name: String,
    pub total: i64,
    pub current: i64,
    pub timestamp: Option<DateTime<Utc>>,
    pub started: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
}

/// Output produced by a vertex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexLog {
    pub vertex: String,
    pub stream: i32,
    pub data: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Create a bounded status queue
pub fn channel(capacity: usize) -> (StatusSender, StatusReceiver) {
    mpsc::channel(capacity.max(1))
}
