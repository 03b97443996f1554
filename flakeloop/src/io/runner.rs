//! Process supervision for the external test-runner binary.
//!
//! The [`TestRunner`] trait decouples the retry loop from the actual
//! subprocess so tests can script outcomes without spawning anything.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::config::RunConfig;
use crate::core::admission::RETRY_ADMISSION_FLAG;
use crate::io::process::run_command_tee;

/// How one supervised run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Exit code 0: the runner reports a clean pass.
    Clean,
    /// Exit code 1: test failures are present but output is parseable.
    TestFailures,
    /// Any other exit code: the run says nothing about individual tests.
    Inconclusive { code: Option<i32> },
    /// The wall-clock timeout fired before the runner exited.
    TimedOut,
}

impl RunStatus {
    /// Whether the captured output is worth parsing.
    pub fn is_conclusive(&self) -> bool {
        matches!(self, RunStatus::Clean | RunStatus::TestFailures)
    }
}

/// Outcome of one supervised run: the status plus the captured streams.
#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// The external binary does not exist; retrying cannot help.
#[derive(Debug, Clone)]
pub struct MissingBinaryError {
    pub path: PathBuf,
}

impl fmt::Display for MissingBinaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test runner binary not found: {}", self.path.display())
    }
}

impl std::error::Error for MissingBinaryError {}

/// Abstraction over the supervised test-runner invocation.
pub trait TestRunner {
    /// Run the external binary for the given 1-based attempt.
    fn execute(&self, attempt: u32) -> Result<RunOutcome>;
}

/// Supervisor that spawns the configured binary.
pub struct ProcessRunner {
    config: RunConfig,
}

impl ProcessRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }
}

impl TestRunner for ProcessRunner {
    #[instrument(skip_all, fields(attempt))]
    fn execute(&self, attempt: u32) -> Result<RunOutcome> {
        // Checked before spawn so the loop can abort instead of retrying.
        if !self.config.binary.exists() {
            return Err(MissingBinaryError {
                path: self.config.binary.clone(),
            }
            .into());
        }

        let mut cmd = Command::new(&self.config.binary);
        cmd.args(&self.config.specs)
            .args(&self.config.extra_args)
            .arg(RETRY_ADMISSION_FLAG);

        info!(binary = %self.config.binary.display(), attempt, "starting test runner");
        let timeout = (self.config.timeout_secs > 0)
            .then(|| Duration::from_secs(self.config.timeout_secs));
        let output = run_command_tee(cmd, timeout, self.config.output_limit_bytes)
            .context("run test runner")?;

        let status = if output.timed_out {
            warn!(
                timeout_secs = self.config.timeout_secs,
                "test runner timed out"
            );
            RunStatus::TimedOut
        } else {
            match output.status.code() {
                Some(0) => RunStatus::Clean,
                Some(1) => RunStatus::TestFailures,
                code => {
                    warn!(exit_code = ?code, "test runner exited inconclusively");
                    RunStatus::Inconclusive { code }
                }
            }
        };

        debug!(status = ?status, "test runner finished");
        Ok(RunOutcome {
            status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_config;

    #[test]
    fn missing_binary_is_a_typed_fatal_error() {
        let config = test_config("retry-specs");
        let runner = ProcessRunner::new(config);

        let err = runner.execute(1).unwrap_err();
        let missing = err
            .downcast_ref::<MissingBinaryError>()
            .expect("downcast to MissingBinaryError");
        assert_eq!(missing.path, PathBuf::from("/nonexistent/test-runner"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn fake_runner(temp: &tempfile::TempDir, script: &str) -> PathBuf {
            let path = temp.path().join("fake-runner.sh");
            fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write script");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
            path
        }

        #[test]
        fn classifies_exit_one_as_test_failures_and_appends_marker() {
            let temp = tempfile::tempdir().expect("tempdir");
            let mut config = test_config(temp.path().join("retry-specs"));
            config.binary = fake_runner(&temp, "echo \"args: $@\"\nexit 1");

            let runner = ProcessRunner::new(config);
            let outcome = runner.execute(1).expect("execute");

            assert_eq!(outcome.status, RunStatus::TestFailures);
            let stdout = String::from_utf8_lossy(&outcome.stdout);
            assert!(stdout.contains("suite.conf"));
            assert!(stdout.contains(RETRY_ADMISSION_FLAG));
        }

        #[test]
        fn classifies_exit_zero_as_clean() {
            let temp = tempfile::tempdir().expect("tempdir");
            let mut config = test_config(temp.path().join("retry-specs"));
            config.binary = fake_runner(&temp, "echo ok\nexit 0");

            let runner = ProcessRunner::new(config);
            let outcome = runner.execute(1).expect("execute");
            assert_eq!(outcome.status, RunStatus::Clean);
        }

        #[test]
        fn classifies_other_exit_codes_as_inconclusive() {
            let temp = tempfile::tempdir().expect("tempdir");
            let mut config = test_config(temp.path().join("retry-specs"));
            config.binary = fake_runner(&temp, "exit 2");

            let runner = ProcessRunner::new(config);
            let outcome = runner.execute(1).expect("execute");
            assert_eq!(outcome.status, RunStatus::Inconclusive { code: Some(2) });
            assert!(!outcome.status.is_conclusive());
        }

        #[test]
        fn timeout_yields_timed_out_status() {
            let temp = tempfile::tempdir().expect("tempdir");
            let mut config = test_config(temp.path().join("retry-specs"));
            config.binary = fake_runner(&temp, "sleep 30");
            config.timeout_secs = 1;

            let runner = ProcessRunner::new(config);
            let outcome = runner.execute(1).expect("execute");
            assert_eq!(outcome.status, RunStatus::TimedOut);
        }
    }
}
