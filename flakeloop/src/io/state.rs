//! Retry state persistence shared with the next runner invocation.
//!
//! One plain-text file holds the most recent failing set, one failed-test
//! full name per line in discovery order, duplicates preserved. The
//! orchestrator is the only writer; the admission filter inside a later
//! runner process is the only reader. Two orchestrators must not share a
//! state path concurrently.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

pub struct RetryStateStore {
    path: PathBuf,
}

impl RetryStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the persisted retry set (atomic: temp file + rename).
    pub fn save(&self, names: &[String]) -> Result<()> {
        debug!(path = %self.path.display(), count = names.len(), "writing retry state");
        let mut buf = names.join("\n");
        buf.push('\n');

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, buf)
            .with_context(|| format!("write temp retry state {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("replace retry state {}", self.path.display()))?;
        Ok(())
    }

    /// Load the persisted retry set, or `None` when no state exists.
    ///
    /// Tolerates a final empty line from the newline-terminated format; a
    /// file with no names at all counts as absent state.
    pub fn load(&self) -> Result<Option<Vec<String>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read retry state {}", self.path.display()));
            }
        };
        let names: Vec<String> = contents
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        debug!(path = %self.path.display(), count = names.len(), "retry state loaded");
        if names.is_empty() {
            return Ok(None);
        }
        Ok(Some(names))
    }

    /// Remove any persisted state. Missing state is a no-op, not an error,
    /// because the loop clears speculatively at several exit points.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "retry state cleared");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("remove retry state {}", self.path.display()))
            }
        }
    }
}
