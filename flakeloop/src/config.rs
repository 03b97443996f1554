//! Run configuration assembled once from the CLI.
//!
//! The record is immutable and passed into every component at construction;
//! there is no process-wide mutable configuration.

use std::path::PathBuf;

use anyhow::{Result, anyhow};

/// Default location of the persisted retry set, relative to the working
/// directory shared with the external test runner.
pub const DEFAULT_STATE_PATH: &str = ".flakeloop/retry-specs";

/// Truncate buffered runner stdout/stderr beyond this many bytes.
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 10_000_000;

/// Immutable configuration for one orchestrator run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Path to the external test-runner binary.
    pub binary: PathBuf,
    /// Test targets forwarded to the runner.
    pub specs: Vec<String>,
    /// Extra arguments forwarded verbatim after the specs.
    pub extra_args: Vec<String>,
    /// Wall-clock timeout per run in seconds. 0 disables the timeout.
    pub timeout_secs: u64,
    /// Pause between retries in seconds. 0 disables the pause.
    pub pause_secs: u64,
    /// Maximum retries after the first attempt. 0 means one attempt.
    pub max_retries: u32,
    /// Bound on buffered runner output held in memory.
    pub output_limit_bytes: usize,
    /// Where the retry set is persisted for the next runner invocation.
    pub state_path: PathBuf,
    /// Optional filter-hook command invoked around each attempt.
    pub hook: Option<Vec<String>>,
    /// CLI verbosity count, consumed by logging init.
    pub verbosity: u8,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.specs.is_empty() {
            return Err(anyhow!("no test targets supplied"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if let Some(hook) = &self.hook
            && (hook.is_empty() || hook[0].trim().is_empty())
        {
            return Err(anyhow!("hook command must be a non-empty array"));
        }
        Ok(())
    }
}
