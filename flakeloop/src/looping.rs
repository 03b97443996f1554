//! Bounded retry loop: run, parse, persist, pause, retry.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::core::parser::{ParseResult, parse};
use crate::io::hooks::{FilterHook, PostRunReport};
use crate::io::runner::{RunStatus, TestRunner};
use crate::io::state::RetryStateStore;

/// Reason why the loop stopped without a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// A run passed outright.
    Success,
    /// The retry budget ran out before a clean pass.
    Exhausted {
        /// The most recent conclusive failing set, for diagnostics.
        last_failed: Vec<String>,
    },
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Total subprocess attempts made (at most `max_retries + 1`).
    pub attempts: u32,
    pub stop: LoopStop,
}

/// Drive the retry cycle until success, retry exhaustion, or a fatal error.
///
/// Fatal paths (missing binary, hook errors, I/O errors) return `Err`; the
/// caller maps them to exit codes. Persisted retry state is cleared on every
/// terminal path, fatal ones included, so a stale failing set never leaks
/// into an unrelated later run.
pub fn run_loop<R: TestRunner>(
    config: &RunConfig,
    runner: &R,
    hooks: &dyn FilterHook,
    store: &RetryStateStore,
) -> Result<LoopOutcome> {
    let result = drive(config, runner, hooks, store);
    if result.is_err() {
        // Best-effort cleanup on the fatal path; the original error wins.
        if let Err(clear_err) = store.clear() {
            warn!(err = %clear_err, "failed to clear retry state during abort");
        }
    }
    result
}

fn drive<R: TestRunner>(
    config: &RunConfig,
    runner: &R,
    hooks: &dyn FilterHook,
    store: &RetryStateStore,
) -> Result<LoopOutcome> {
    let max_attempts = config.max_retries.saturating_add(1);
    let mut last_failed: Vec<String> = Vec::new();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        if attempt > max_attempts {
            error!(
                max_retries = config.max_retries,
                "retries exhausted without a clean pass"
            );
            store.clear()?;
            return Ok(LoopOutcome {
                attempts: max_attempts,
                stop: LoopStop::Exhausted { last_failed },
            });
        }
        info!(attempt, max_attempts, "starting attempt");

        hooks.prerun(attempt)?;

        let outcome = runner.execute(attempt)?;

        let parsed = if outcome.status.is_conclusive() {
            Some(parse(&outcome.stdout, &outcome.stderr))
        } else {
            match outcome.status {
                RunStatus::TimedOut => warn!(attempt, "run timed out; retrying"),
                RunStatus::Inconclusive { code } => {
                    warn!(attempt, exit_code = ?code, "run inconclusive; retrying");
                }
                RunStatus::Clean | RunStatus::TestFailures => {}
            }
            None
        };

        let (failed, parse_failed) = match parsed {
            Some(ParseResult::Failures(names)) => (names, false),
            Some(ParseResult::Unparseable(reason)) => {
                warn!(attempt, reason = ?reason, "runner output could not be parsed; retrying");
                (Vec::new(), true)
            }
            None => (Vec::new(), true),
        };

        hooks.postrun(
            attempt,
            &PostRunReport {
                attempt,
                failed: failed.clone(),
                parse_failed,
            },
        )?;

        if !parse_failed && failed.is_empty() {
            info!(attempt, "all tests passed");
            store.clear()?;
            return Ok(LoopOutcome {
                attempts: attempt,
                stop: LoopStop::Success,
            });
        }

        if parse_failed {
            // Next run must be unrestricted: everything might still be failing.
            store.clear()?;
        } else {
            info!(
                attempt,
                failed = failed.len(),
                "persisting failing set for retry"
            );
            store.save(&failed)?;
            last_failed = failed;
        }

        if config.pause_secs > 0 {
            debug!(pause_secs = config.pause_secs, "pausing before retry");
            thread::sleep(Duration::from_secs(config.pause_secs));
        }
    }
}
