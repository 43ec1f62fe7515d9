//! SSH agent forwarding specs: `default|<id>[=<socket>|<key>[,<key>]]`

use serde::Serialize;

/// One forwarded agent: an id and the sockets or key files backing it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SshAgentConfig {
    pub id: String,
    pub paths: Vec<String>,
}

/// Parse a single `--ssh` value
pub fn parse_ssh_spec(value: &str) -> SshAgentConfig {
    match value.split_once('=') {
        Some((id, paths)) => SshAgentConfig {
            id: id.to_string(),
            paths: paths.split(',').map(str::to_string).collect(),
        },
        None => SshAgentConfig {
            id: value.to_string(),
            paths: Vec::new(),
        },
    }
}

/// Parse all `--ssh` values
pub fn parse_ssh_specs(values: &[String]) -> Vec<SshAgentConfig> {
    values.iter().map(|v| parse_ssh_spec(v)).collect()
}
