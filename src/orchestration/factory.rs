//! Engine factory
//!
//! Builds the engine client from configuration and command-line overrides.

use crate::config::schema::EngineConfig;
use crate::orchestration::engine::BuildEngine;
use crate::orchestration::process::ProcessEngine;
use std::sync::Arc;

/// Create the build engine client.
///
/// `addr` (from `--addr`/`BUILDKIT_HOST`) takes precedence over the
/// configured address.
pub fn create_engine(config: &EngineConfig, addr: Option<String>) -> Arc<dyn BuildEngine> {
    let addr = addr.or_else(|| config.addr.clone());
    Arc::new(ProcessEngine::new(
        config.command.clone(),
        config.args.clone(),
        addr,
    ))
}
