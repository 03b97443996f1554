//! Pre/post-run filter hooks.
//!
//! A hook is an externally supplied capability invoked around every run
//! attempt: `prerun` may mutate environment or fixtures before the runner
//! starts (e.g. seed data), `postrun` is a fire-and-forget side channel for
//! reporting. Both entry points default to no-ops, so a hook may implement
//! either side only. The orchestrator blocks until a hook settles before
//! proceeding; an error raised by a hook aborts the whole loop.

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::debug;
use wait_timeout::ChildExt;

pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// What the post-run hook is told about an attempt.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PostRunReport {
    /// 1-based attempt index.
    pub attempt: u32,
    /// Failed-test full names from this attempt (empty on a clean pass).
    pub failed: Vec<String>,
    /// True when the runner output could not be parsed; `failed` is then
    /// meaningless and the whole suite is assumed suspect.
    pub parse_failed: bool,
}

/// Externally supplied pre/post-run callbacks.
pub trait FilterHook {
    /// Called before each attempt with the 1-based attempt index.
    fn prerun(&self, _attempt: u32) -> Result<()> {
        Ok(())
    }

    /// Called after each attempt with the parsed result. Observed only; the
    /// loop never branches on it.
    fn postrun(&self, _attempt: u32, _report: &PostRunReport) -> Result<()> {
        Ok(())
    }
}

/// Hook used when no hook command is configured.
pub struct NoopHook;

impl FilterHook for NoopHook {}

/// Hook backed by an external command.
///
/// Invoked as `cmd... prerun <attempt>` and `cmd... postrun <attempt>`; the
/// post-run invocation additionally receives the JSON-encoded
/// [`PostRunReport`] on stdin. The hook settles when the process exits; a
/// non-zero exit or a timeout is an error.
pub struct CommandHook {
    command: Vec<String>,
    timeout: Duration,
}

impl CommandHook {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }

    fn run(&self, entry: &str, attempt: u32, stdin: Option<&[u8]>) -> Result<()> {
        let program = self
            .command
            .first()
            .ok_or_else(|| anyhow!("hook command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(&self.command[1..])
            .arg(entry)
            .arg(attempt.to_string())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(hook = %program, entry, attempt, "invoking filter hook");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn {entry} hook"))?;

        if let Some(input) = stdin {
            let mut child_stdin = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("stdin was not piped"))?;
            child_stdin.write_all(input).context("write hook stdin")?;
        }

        let status = match child
            .wait_timeout(self.timeout)
            .with_context(|| format!("wait for {entry} hook"))?
        {
            Some(status) => status,
            None => {
                child.kill().context("kill hook process")?;
                child.wait().context("wait hook process")?;
                return Err(anyhow!("{entry} hook timed out after {:?}", self.timeout));
            }
        };

        let output = child.wait_with_output().context("collect hook output")?;
        if !status.success() {
            return Err(anyhow!(
                "{entry} hook failed with status {:?}: {}",
                status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }
}

impl FilterHook for CommandHook {
    fn prerun(&self, attempt: u32) -> Result<()> {
        self.run("prerun", attempt, None)
    }

    fn postrun(&self, attempt: u32, report: &PostRunReport) -> Result<()> {
        let payload = serde_json::to_vec(report).context("serialize post-run report")?;
        self.run("postrun", attempt, Some(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_hook_settles_immediately() {
        let hook = NoopHook;
        hook.prerun(1).expect("prerun");
        hook.postrun(
            1,
            &PostRunReport {
                attempt: 1,
                failed: Vec::new(),
                parse_failed: false,
            },
        )
        .expect("postrun");
    }

    #[test]
    fn report_serializes_to_stable_json() {
        let report = PostRunReport {
            attempt: 2,
            failed: vec!["Suite A > does X".to_string()],
            parse_failed: false,
        };
        let json = serde_json::to_string(&report).expect("serialize");
        assert_eq!(
            json,
            "{\"attempt\":2,\"failed\":[\"Suite A > does X\"],\"parse_failed\":false}"
        );
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;

        fn hook_script(temp: &tempfile::TempDir, script: &str) -> PathBuf {
            let path = temp.path().join("hook.sh");
            fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write script");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
            path
        }

        #[test]
        fn command_hook_passes_entry_point_and_attempt() {
            let temp = tempfile::tempdir().expect("tempdir");
            let calls = temp.path().join("calls.txt");
            let script = hook_script(&temp, &format!("echo \"$1 $2\" >> {}", calls.display()));

            let hook = CommandHook::new(vec![script.display().to_string()]);
            hook.prerun(3).expect("prerun");

            let recorded = fs::read_to_string(&calls).expect("read calls");
            assert_eq!(recorded, "prerun 3\n");
        }

        #[test]
        fn command_hook_forwards_leading_arguments() {
            let temp = tempfile::tempdir().expect("tempdir");
            let calls = temp.path().join("calls.txt");
            let script = hook_script(&temp, &format!("echo \"$1 $2 $3\" >> {}", calls.display()));

            let hook = CommandHook::new(vec![script.display().to_string(), "staging".to_string()]);
            hook.prerun(1).expect("prerun");

            let recorded = fs::read_to_string(&calls).expect("read calls");
            assert_eq!(recorded, "staging prerun 1\n");
        }

        #[test]
        fn command_hook_feeds_report_on_stdin() {
            let temp = tempfile::tempdir().expect("tempdir");
            let payload = temp.path().join("payload.json");
            let script = hook_script(&temp, &format!("cat > {}", payload.display()));

            let hook = CommandHook::new(vec![script.display().to_string()]);
            let report = PostRunReport {
                attempt: 1,
                failed: vec!["Suite A > does X".to_string()],
                parse_failed: false,
            };
            hook.postrun(1, &report).expect("postrun");

            let recorded = fs::read_to_string(&payload).expect("read payload");
            assert!(recorded.contains("\"attempt\":1"));
            assert!(recorded.contains("Suite A > does X"));
        }

        #[test]
        fn failing_hook_command_is_an_error() {
            let temp = tempfile::tempdir().expect("tempdir");
            let script = hook_script(&temp, "echo nope >&2\nexit 3");

            let hook = CommandHook::new(vec![script.display().to_string()]);
            let err = hook.prerun(1).unwrap_err();
            assert!(err.to_string().contains("prerun hook failed"));
            assert!(err.to_string().contains("nope"));
        }
    }
}
