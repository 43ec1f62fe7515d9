//! Secret specs: `type=file,id=<id>,src=<path>`

use super::split_fields;
use crate::error::{BuildError, BuildResult};
use crate::session::SecretStore;
use serde::Serialize;
use std::path::PathBuf;

/// A file-backed secret exposed to the build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecretSource {
    pub id: String,
    pub file_path: PathBuf,
}

/// Parse a single `--secret` value
pub fn parse_secret(value: &str) -> BuildResult<SecretSource> {
    let mut source = SecretSource::default();

    for field in split_fields(value)? {
        let (key, value) = match field.split_once('=') {
            Some((key, value)) => (key.to_lowercase(), value.to_string()),
            None => return Err(BuildError::MalformedField { field }),
        };

        match key.as_str() {
            "type" => {
                if value != "file" {
                    return Err(BuildError::UnsupportedSecretType(value));
                }
            }
            "id" => source.id = value,
            "source" | "src" => source.file_path = PathBuf::from(value),
            _ => return Err(BuildError::UnexpectedSecretKey { key, field }),
        }
    }

    Ok(source)
}

/// Parse all `--secret` values into a secret store
pub fn parse_secret_specs(values: &[String]) -> BuildResult<SecretStore> {
    let sources = values
        .iter()
        .map(|v| parse_secret(v))
        .collect::<BuildResult<Vec<_>>>()?;
    SecretStore::new(sources)
}
