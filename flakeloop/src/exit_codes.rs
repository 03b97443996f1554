//! Stable exit codes for scripting consumers of the retrier.

/// The suite passed, possibly after retries.
pub const OK: i32 = 0;
/// Unrecoverable error during orchestration (hook failure, I/O, ...).
pub const FATAL: i32 = 1;
/// No test targets were supplied; no subprocess was spawned.
pub const NO_TESTS: i32 = 2;
/// The external test-runner binary does not exist.
pub const MISSING_BINARY: i32 = 3;
/// The retry budget ran out without a clean pass.
pub const EXHAUSTED: i32 = 4;
