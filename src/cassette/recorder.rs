//! Collects port interactions and writes them out as a cassette.

use std::path::PathBuf;

use chrono::Utc;

use super::format::{Cassette, Interaction};

/// Accumulates interactions in completion order until [`finish`](Self::finish).
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    commit: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Start an empty session that will be written to `path`.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, commit: &str) -> Self {
        Self { path: path.into(), name: name.into(), commit: commit.to_string(), interactions: Vec::new() }
    }

    /// Append one call. Sequence numbers follow append order.
    pub fn record(
        &mut self,
        port: &str,
        method: &str,
        input: serde_json::Value,
        output: serde_json::Value,
    ) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: port.to_string(),
            method: method.to_string(),
            input,
            output,
        });
    }

    /// Number of interactions recorded so far.
    #[must_use]
    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }

    /// Serialize the session to YAML, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn finish(self) -> Result<PathBuf, std::io::Error> {
        let Self { path, name, commit, interactions } = self;
        let cassette = Cassette { name, recorded_at: Utc::now(), commit, interactions };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, yaml)?;
        Ok(path)
    }
}
