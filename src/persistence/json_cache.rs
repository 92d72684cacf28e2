//! File-backed cache of raw provider payloads.
//!
//! Keys are slash-separated (`games/E/2023`) and map to
//! `<root>/games/E/2023.json`.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ElwfError, Result};

#[derive(Debug, Clone)]
pub struct JsonCache {
    root: PathBuf,
}

impl JsonCache {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let segments: Vec<&str> = key.split('/').collect();
        if key.is_empty() || segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
            return Err(ElwfError::Validation(format!("invalid cache key {key:?}")));
        }
        let (file, dirs) = match segments.split_last() {
            Some(split) => split,
            None => return Err(ElwfError::Validation(format!("invalid cache key {key:?}"))),
        };
        let mut path = self.root.clone();
        path.extend(dirs);
        // dotted codes such as E2023.1 keep their suffix
        path.push(format!("{file}.json"));
        Ok(path)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn store(&self, key: &str, payload: &Value) -> Result<PathBuf> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_vec_pretty(payload)?)?;
        debug!(key, path = %path.display(), "cached payload");
        Ok(path)
    }

    /// `Ok(None)` on a cache miss.
    pub fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}
