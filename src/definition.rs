//! Serialized build graph read from stdin
//!
//! The graph is opaque to buildctl: each op is an encoded string produced
//! by a graph generator. Only per-op metadata is touched, to disable
//! caching when `--no-cache` is given without a frontend.

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Read;

/// Metadata attached to one op, keyed by op digest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpMetadata {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_cache: bool,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A build graph definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub def: Vec<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, OpMetadata>,
}

impl Definition {
    /// Decode a definition from a reader
    pub fn read_from<R: Read>(reader: R) -> BuildResult<Self> {
        serde_json::from_reader(reader).map_err(BuildError::DefinitionParse)
    }

    pub fn is_empty(&self) -> bool {
        self.def.is_empty()
    }

    /// Mark every op as not cacheable, creating metadata entries as needed
    pub fn ignore_cache(&mut self) {
        for op in &self.def {
            self.metadata.entry(op_digest(op)).or_default().ignore_cache = true;
        }
    }
}

/// Content digest of an encoded op
pub fn op_digest(op: &str) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(op.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_format() {
        assert_eq!(
            op_digest(""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn reads_json() {
        let def = Definition::read_from(r#"{"def":["op1","op2"]}"#.as_bytes()).unwrap();
        assert_eq!(def.def.len(), 2);
        assert!(def.metadata.is_empty());
    }

    #[test]
    fn garbage_input_fails() {
        let err = Definition::read_from("not json".as_bytes()).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse input"));
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        assert!(Definition::read_from("".as_bytes()).is_err());
        assert!(Definition::read_from("{}".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn ignore_cache_marks_every_op_and_keeps_existing_metadata() {
        let digest = op_digest("op1");
        let input = format!(
            r#"{{"def":["op1","op2"],"metadata":{{"{}":{{"description":{{"name":"x"}}}}}}}}"#,
            digest
        );
        let mut def = Definition::read_from(input.as_bytes()).unwrap();
        def.ignore_cache();

        assert_eq!(def.metadata.len(), 2);
        let first = &def.metadata[&digest];
        assert!(first.ignore_cache);
        assert!(first.extra.contains_key("description"));
        assert!(def.metadata[&op_digest("op2")].ignore_cache);
    }
}
