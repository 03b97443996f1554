//! Flaky end-to-end test retrier.
//!
//! Launches an external test-runner binary, extracts failed-test names from
//! its console output, persists them, and reruns until everything passes or
//! the retry budget runs out. A later invocation of the runner consults the
//! persisted set through the admission filter and executes only the failing
//! cases. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (output parsing, admission
//!   policy). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (process supervision, retry-state
//!   persistence, hook commands). Isolated to enable scripted doubles in
//!   tests.
//!
//! [`looping`] coordinates core logic with I/O to implement the retry cycle;
//! the CLI maps loop outcomes to the stable [`exit_codes`].

pub mod config;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
