//! Failure extraction from the external runner's console output.
//!
//! The runner prints a failures block delimited by section-marker lines, with
//! one numbered entry per failed test:
//!
//! ```text
//! * Failures *
//! 1) Suite A > does X
//!    Message: expected true to be false
//! 2) Suite B > does Y
//! * End *
//! ```
//!
//! Scraping another program's console output is inherently brittle; the three
//! patterns below are the single source of truth for that grammar and must
//! track the external tool, not be "fixed" locally.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Opens the failures block.
static BLOCK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\s+Failures\s+\*$").expect("block-start pattern"));
/// Any section marker; closes the failures block when seen while collecting.
static SECTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\s+\w+\s+\*$").expect("section-marker pattern"));
/// One failed test: a number, a closing paren, then the full name.
static NUMBERED_FAILURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\)\s+(.+)$").expect("numbered-failure pattern"));

/// Why a run's output could not be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    /// The runner produced no stdout at all.
    NoOutput,
    /// stderr carried more than the tool's single trailing blank line.
    StderrNoise,
}

/// Result of parsing one captured run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// Failed-test full names in print order; empty means a clean pass.
    Failures(Vec<String>),
    /// The output is unusable; the caller must assume everything may still
    /// be failing.
    Unparseable(ParseFailure),
}

enum ScanState {
    Scanning,
    Collecting,
}

/// Extract failed-test names from one run's captured streams.
///
/// The pre-checks short-circuit before scanning: empty stdout and noisy
/// stderr both make the run unusable. The tool is known to emit exactly one
/// trailing blank line on stderr on success, so strictly more than one line
/// after trimming signals real error text. That is an assumption about this
/// specific tool, preserved exactly rather than generalized.
pub fn parse(stdout: &[u8], stderr: &[u8]) -> ParseResult {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);

    if stdout.trim().is_empty() {
        return ParseResult::Unparseable(ParseFailure::NoOutput);
    }
    if stderr.trim().lines().count() > 1 {
        return ParseResult::Unparseable(ParseFailure::StderrNoise);
    }

    let mut state = ScanState::Scanning;
    let mut failed = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        match state {
            ScanState::Scanning => {
                if BLOCK_START.is_match(line) {
                    state = ScanState::Collecting;
                }
            }
            ScanState::Collecting => {
                if SECTION_MARKER.is_match(line) {
                    state = ScanState::Scanning;
                } else if let Some(caps) = NUMBERED_FAILURE.captures(line) {
                    failed.push(caps[2].to_string());
                }
                // Anything else is continuation/diagnostic text.
            }
        }
    }

    debug!(failed = failed.len(), "parsed runner output");
    ParseResult::Failures(failed)
}
