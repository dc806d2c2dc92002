//! Canonical JSON result writing.
//!
//! Every result collection is serialized to `<name>.json.tmp` and then
//! atomically renamed, so consumers never observe a half-written file.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Write a collection as pretty-printed JSON, atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| OutputError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|source| OutputError::Io { path: tmp.clone(), source })?;
    std::fs::rename(&tmp, path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "wrote output");
    Ok(())
}
