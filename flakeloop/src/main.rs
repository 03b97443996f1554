//! CLI entry point for the flaky end-to-end test retrier.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use flakeloop::config::{DEFAULT_OUTPUT_LIMIT_BYTES, DEFAULT_STATE_PATH, RunConfig};
use flakeloop::exit_codes;
use flakeloop::io::hooks::{CommandHook, FilterHook, NoopHook};
use flakeloop::io::runner::{MissingBinaryError, ProcessRunner};
use flakeloop::io::state::RetryStateStore;
use flakeloop::logging;
use flakeloop::looping::{LoopStop, run_loop};

#[derive(Parser)]
#[command(
    name = "flakeloop",
    version,
    about = "Retry a flaky end-to-end test run until it passes or the budget runs out"
)]
struct Cli {
    /// Path to the external test-runner binary.
    #[arg(long)]
    binary: PathBuf,

    /// Wall-clock timeout per run in seconds (0 disables the timeout).
    #[arg(long, default_value_t = 0)]
    timeout: u64,

    /// Pause between retries in seconds (0 disables the pause).
    #[arg(long, default_value_t = 0)]
    pause: u64,

    /// Maximum number of retries after the first attempt.
    #[arg(long, default_value_t = 2)]
    max_retries: u32,

    /// Where the retry set is persisted for the next runner invocation.
    #[arg(long, default_value = DEFAULT_STATE_PATH)]
    state_file: PathBuf,

    /// Filter-hook executable invoked around each attempt (`HOOK prerun N` /
    /// `HOOK postrun N` with a JSON report on stdin).
    #[arg(long, value_name = "HOOK")]
    hook: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Test targets to forward to the runner.
    #[arg(value_name = "SPEC")]
    specs: Vec<String>,

    /// Extra arguments forwarded verbatim after the specs.
    #[arg(last = true, value_name = "ARGS")]
    extra_args: Vec<String>,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        RunConfig {
            binary: self.binary,
            specs: self.specs,
            extra_args: self.extra_args,
            timeout_secs: self.timeout,
            pause_secs: self.pause,
            max_retries: self.max_retries,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            state_path: self.state_file,
            hook: self.hook.map(|path| vec![path.display().to_string()]),
            verbosity: self.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = cli.into_config();

    if config.specs.is_empty() {
        error!("no test targets supplied");
        std::process::exit(exit_codes::NO_TESTS);
    }
    if let Err(err) = config.validate() {
        error!("{err:#}");
        std::process::exit(exit_codes::FATAL);
    }

    let store = RetryStateStore::new(config.state_path.clone());
    let hooks: Box<dyn FilterHook> = match &config.hook {
        Some(command) => Box::new(CommandHook::new(command.clone())),
        None => Box::new(NoopHook),
    };
    let runner = ProcessRunner::new(config.clone());

    match run_loop(&config, &runner, hooks.as_ref(), &store) {
        Ok(outcome) => match outcome.stop {
            LoopStop::Success => {
                info!(attempts = outcome.attempts, "suite passed");
                std::process::exit(exit_codes::OK);
            }
            LoopStop::Exhausted { last_failed } => {
                error!(
                    attempts = outcome.attempts,
                    still_failing = last_failed.len(),
                    "retries exhausted"
                );
                std::process::exit(exit_codes::EXHAUSTED);
            }
        },
        Err(err) => {
            error!("{err:#}");
            if err.downcast_ref::<MissingBinaryError>().is_some() {
                std::process::exit(exit_codes::MISSING_BINARY);
            }
            std::process::exit(exit_codes::FATAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_invocation() {
        let cli = Cli::parse_from(["flakeloop", "--binary", "bin/runner", "suite.conf"]);
        assert_eq!(cli.binary, PathBuf::from("bin/runner"));
        assert_eq!(cli.specs, vec!["suite.conf".to_string()]);
        assert_eq!(cli.max_retries, 2);
        assert_eq!(cli.timeout, 0);
        assert_eq!(cli.state_file, PathBuf::from(DEFAULT_STATE_PATH));
    }

    #[test]
    fn parse_passthrough_args_after_double_dash() {
        let cli = Cli::parse_from([
            "flakeloop",
            "--binary",
            "bin/runner",
            "a.conf",
            "b.conf",
            "--",
            "--browser",
            "chrome",
        ]);
        assert_eq!(cli.specs, vec!["a.conf".to_string(), "b.conf".to_string()]);
        assert_eq!(
            cli.extra_args,
            vec!["--browser".to_string(), "chrome".to_string()]
        );
    }

    #[test]
    fn parse_hook_command() {
        let cli = Cli::parse_from([
            "flakeloop",
            "--binary",
            "bin/runner",
            "--hook",
            "scripts/reset.sh",
            "suite.conf",
        ]);
        assert_eq!(cli.hook, Some(PathBuf::from("scripts/reset.sh")));
        assert_eq!(cli.specs, vec!["suite.conf".to_string()]);
    }

    #[test]
    fn parse_verbosity_count() {
        let cli = Cli::parse_from(["flakeloop", "--binary", "b", "-vv", "s.conf"]);
        assert_eq!(cli.verbose, 2);
    }
}
