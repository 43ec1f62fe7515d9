//! SSH agent forwarding provider

use crate::error::{BuildError, BuildResult};
use crate::options::SshAgentConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Agent id used when a spec leaves it empty
const DEFAULT_AGENT_ID: &str = "default";

/// Forwarded agents keyed by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SshAgentProvider {
    agents: BTreeMap<String, Vec<PathBuf>>,
}

impl SshAgentProvider {
    /// Build from configs, falling back to `SSH_AUTH_SOCK` for configs
    /// without paths.
    pub fn new(configs: Vec<SshAgentConfig>) -> BuildResult<Self> {
        let socket = std::env::var("SSH_AUTH_SOCK").ok();
        Self::with_agent_socket(configs, socket)
    }

    /// Build with an explicit fallback agent socket
    pub fn with_agent_socket(
        configs: Vec<SshAgentConfig>,
        agent_socket: Option<String>,
    ) -> BuildResult<Self> {
        let mut agents = BTreeMap::new();

        for config in configs {
            let id = if config.id.is_empty() {
                DEFAULT_AGENT_ID.to_string()
            } else {
                config.id
            };

            if agents.contains_key(&id) {
                return Err(BuildError::SshDuplicateId(id));
            }

            let paths = if config.paths.is_empty() {
                match agent_socket.as_deref() {
                    Some(sock) if !sock.is_empty() => vec![sock.to_string()],
                    _ => return Err(BuildError::SshAgentSocketMissing),
                }
            } else {
                config.paths
            };

            let paths = paths
                .into_iter()
                .map(PathBuf::from)
                .map(|path| match std::fs::metadata(&path) {
                    Ok(_) => Ok(path),
                    Err(e) => Err(BuildError::SshPath { path, source: e }),
                })
                .collect::<BuildResult<Vec<_>>>()?;

            agents.insert(id, paths);
        }

        Ok(Self { agents })
    }

    /// Paths forwarded for an agent id
    pub fn paths(&self, id: &str) -> Option<&[PathBuf]> {
        self.agents.get(id).map(Vec::as_slice)
    }

    /// Ids of all forwarded agents
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }
}
