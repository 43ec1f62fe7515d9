//! Build engine abstraction
//!
//! The engine receives one assembled [`SolveRequest`], emits status events
//! while it works, and returns a final [`SolveResponse`].

use crate::definition::Definition;
use crate::error::BuildResult;
use crate::exporter::{ExporterKind, ExporterOutput};
use crate::options::{CacheOptionEntry, Entitlement};
use crate::session::Session;
use crate::status::StatusSender;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Everything the engine needs for one build
#[derive(Debug, Serialize)]
pub struct SolveRequest {
    #[serde(serialize_with = "serialize_exporter")]
    pub exporter: ExporterKind,
    pub exporter_attrs: BTreeMap<String, String>,
    /// Owned for the duration of the engine call and dropped with the request
    #[serde(skip)]
    pub exporter_output: ExporterOutput,
    pub frontend: Option<String>,
    pub frontend_attrs: BTreeMap<String, String>,
    pub local_dirs: BTreeMap<String, String>,
    pub cache_exports: Vec<CacheOptionEntry>,
    pub cache_imports: Vec<CacheOptionEntry>,
    pub session: Session,
    pub allowed_entitlements: Vec<Entitlement>,
}

impl SolveRequest {
    /// Directory the exporter writes into, if any
    pub fn exporter_output_dir(&self) -> Option<&PathBuf> {
        self.exporter_output.directory()
    }
}

fn serialize_exporter<S: serde::Serializer>(kind: &ExporterKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.as_str())
}

/// Final result of a build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveResponse {
    pub exporter_response: BTreeMap<String, String>,
}

/// Abstract build engine interface
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Run one build.
    ///
    /// Status events go to `status`; the sender is dropped when this
    /// returns, which closes the stream. Implementations abort when
    /// `cancel` fires.
    async fn solve(
        &self,
        definition: Option<Definition>,
        request: SolveRequest,
        status: StatusSender,
        cancel: CancellationToken,
    ) -> BuildResult<SolveResponse>;

    /// Human-readable engine name for logs
    fn engine_name(&self) -> &str;
}
