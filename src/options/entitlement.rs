//! Entitlement tokens accepted by `--allow`

use crate::error::{BuildError, BuildResult};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// An elevated capability a build may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Entitlement {
    /// Run steps in the host network namespace
    #[serde(rename = "network.host")]
    NetworkHost,
    /// Run steps without the default security profile
    #[serde(rename = "security.unconfined")]
    SecurityUnconfined,
}

impl Entitlement {
    /// The token used on the command line and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Entitlement::NetworkHost => "network.host",
            Entitlement::SecurityUnconfined => "security.unconfined",
        }
    }
}

impl fmt::Display for Entitlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entitlement {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "network.host" => Ok(Entitlement::NetworkHost),
            "security.unconfined" => Ok(Entitlement::SecurityUnconfined),
            other => Err(BuildError::UnknownEntitlement(other.to_string())),
        }
    }
}

/// Parse all `--allow` values
pub fn parse_entitlements(values: &[String]) -> BuildResult<Vec<Entitlement>> {
    values.iter().map(|v| v.parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tokens() {
        let parsed = parse_entitlements(&[
            "network.host".to_string(),
            "security.unconfined".to_string(),
        ])
        .unwrap();
        assert_eq!(
            parsed,
            vec![Entitlement::NetworkHost, Entitlement::SecurityUnconfined]
        );
    }

    #[test]
    fn unknown_token_is_an_error() {
        let err = parse_entitlements(&["network.none".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "unknown entitlement network.none");
    }

    #[test]
    fn serializes_as_token() {
        let json = serde_json::to_string(&Entitlement::NetworkHost).unwrap();
        assert_eq!(json, "\"network.host\"");
    }
}
