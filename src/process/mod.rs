//! External process execution with full output capture.

/// One-shot process runner.
pub mod invoker;
