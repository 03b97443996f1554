//! Test-only doubles for the retry loop.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::config::RunConfig;
use crate::io::hooks::{FilterHook, PostRunReport};
use crate::io::runner::{RunOutcome, RunStatus, TestRunner};

/// A deterministic configuration pointing at a nonexistent binary; scripted
/// runners never spawn it.
pub fn test_config(state_path: impl Into<PathBuf>) -> RunConfig {
    RunConfig {
        binary: PathBuf::from("/nonexistent/test-runner"),
        specs: vec!["suite.conf".to_string()],
        extra_args: Vec::new(),
        timeout_secs: 0,
        pause_secs: 0,
        max_retries: 2,
        output_limit_bytes: 1_000_000,
        state_path: state_path.into(),
        hook: None,
        verbosity: 0,
    }
}

/// Runner stdout containing a failures block with the given names.
pub fn failure_output(names: &[&str]) -> Vec<u8> {
    let mut out = String::from("Started\n.F.F\n\n");
    out.push_str("* Failures *\n");
    for (idx, name) in names.iter().enumerate() {
        out.push_str(&format!("{}) {}\n", idx + 1, name));
        out.push_str("   Message: expected true to be false\n");
    }
    out.push_str("* End *\n\n");
    out.push_str(&format!("4 specs, {} failures\n", names.len()));
    out.into_bytes()
}

/// Runner stdout for a clean pass (no failures block).
pub fn passing_output() -> Vec<u8> {
    b"Started\n....\n\n4 specs, 0 failures\n".to_vec()
}

/// stderr carrying only the tool's single trailing blank line.
pub fn clean_stderr() -> Vec<u8> {
    b"\n".to_vec()
}

/// One scripted supervised run.
pub struct ScriptedRun {
    pub status: RunStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Test runner returning queued outcomes without spawning processes.
pub struct ScriptedRunner {
    runs: RefCell<VecDeque<ScriptedRun>>,
    attempts_seen: RefCell<Vec<u32>>,
}

impl ScriptedRunner {
    pub fn new(runs: Vec<ScriptedRun>) -> Self {
        Self {
            runs: RefCell::new(runs.into()),
            attempts_seen: RefCell::new(Vec::new()),
        }
    }

    /// Number of `execute` calls so far.
    pub fn invocations(&self) -> usize {
        self.attempts_seen.borrow().len()
    }

    /// Attempt indices in call order.
    pub fn attempts_seen(&self) -> Vec<u32> {
        self.attempts_seen.borrow().clone()
    }
}

impl TestRunner for ScriptedRunner {
    fn execute(&self, attempt: u32) -> Result<RunOutcome> {
        self.attempts_seen.borrow_mut().push(attempt);
        let run = self
            .runs
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted runner exhausted at attempt {attempt}"))?;
        Ok(RunOutcome {
            status: run.status,
            stdout: run.stdout,
            stderr: run.stderr,
        })
    }
}

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
    Prerun { attempt: u32 },
    Postrun { attempt: u32, report: PostRunReport },
}

/// Hook that records every call; optionally snapshots the retry state file
/// at prerun so tests can observe mid-loop persistence.
#[derive(Default)]
pub struct RecordingHook {
    calls: RefCell<Vec<HookCall>>,
    state_probe: Option<PathBuf>,
    state_seen: RefCell<Vec<Option<String>>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the contents of `path` (or `None` when absent) at every prerun.
    pub fn probing(path: impl Into<PathBuf>) -> Self {
        Self {
            state_probe: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.borrow().clone()
    }

    pub fn state_seen(&self) -> Vec<Option<String>> {
        self.state_seen.borrow().clone()
    }
}

impl FilterHook for RecordingHook {
    fn prerun(&self, attempt: u32) -> Result<()> {
        if let Some(path) = &self.state_probe {
            self.state_seen
                .borrow_mut()
                .push(std::fs::read_to_string(path).ok());
        }
        self.calls.borrow_mut().push(HookCall::Prerun { attempt });
        Ok(())
    }

    fn postrun(&self, attempt: u32, report: &PostRunReport) -> Result<()> {
        self.calls.borrow_mut().push(HookCall::Postrun {
            attempt,
            report: report.clone(),
        });
        Ok(())
    }
}

/// Hook whose prerun fails; drives the fatal path.
pub struct FailingHook;

impl FilterHook for FailingHook {
    fn prerun(&self, attempt: u32) -> Result<()> {
        Err(anyhow!("hook exploded at attempt {attempt}"))
    }
}
