//! Connections read back from a JSON snapshot.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConnectionSource;
use crate::{Connection, Error, Result, Snapshot};

/// Reads a snapshot written by `psq snapshot`, or a bare JSON array of records.
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
    name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Snapshot(Snapshot),
    Records(Vec<Connection>),
}

impl JsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("snapshot {}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full snapshot. Bare arrays get an empty host and the file's
    /// modification time.
    pub fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Err(Error::SnapshotNotFound(self.path.clone()));
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let file: SnapshotFile = serde_json::from_str(&contents)?;
        match file {
            SnapshotFile::Snapshot(snapshot) => Ok(snapshot),
            SnapshotFile::Records(connections) => {
                let captured_at = std::fs::metadata(&self.path)?.modified()?.into();
                Ok(Snapshot {
                    host: String::new(),
                    captured_at,
                    connections,
                })
            }
        }
    }
}

impl ConnectionSource for JsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn connections(&self) -> Result<Vec<Connection>> {
        let snapshot = self.load()?;
        tracing::debug!(
            path = %self.path.display(),
            host = %snapshot.host,
            count = snapshot.connections.len(),
            "loaded snapshot"
        );
        Ok(snapshot.connections)
    }
}
