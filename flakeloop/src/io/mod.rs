//! Side-effecting operations for the retry loop.

pub mod hooks;
pub mod process;
pub mod runner;
pub mod state;
