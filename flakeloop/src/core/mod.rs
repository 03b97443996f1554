//! Pure, deterministic logic: no I/O, fully testable in isolation.

pub mod admission;
pub mod parser;
