//! File-backed secret store

use crate::error::{BuildError, BuildResult};
use crate::options::SecretSource;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Largest secret file accepted
pub const MAX_SECRET_SIZE: u64 = 500 * 1024;

/// Secrets keyed by id. Contents are read by the engine at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecretStore {
    sources: BTreeMap<String, PathBuf>,
}

impl SecretStore {
    /// Validate sources and index them by id.
    ///
    /// An empty path defaults to the id. Every file must exist and fit
    /// under [`MAX_SECRET_SIZE`].
    pub fn new(sources: Vec<SecretSource>) -> BuildResult<Self> {
        let mut map = BTreeMap::new();
        for source in sources {
            if source.id.is_empty() {
                return Err(BuildError::SecretMissingId);
            }
            let path = if source.file_path.as_os_str().is_empty() {
                PathBuf::from(&source.id)
            } else {
                source.file_path
            };
            let meta = std::fs::metadata(&path).map_err(|e| BuildError::SecretStat {
                path: path.clone(),
                source: e,
            })?;
            if meta.len() > MAX_SECRET_SIZE {
                return Err(BuildError::SecretTooLarge(source.id));
            }
            map.insert(source.id, path);
        }
        Ok(Self { sources: map })
    }

    /// Path registered for a secret id
    pub fn path(&self, id: &str) -> Option<&PathBuf> {
        self.sources.get(id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
