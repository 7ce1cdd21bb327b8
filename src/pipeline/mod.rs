//! The `apply_grain` operation and its configuration.

/// Startup configuration.
pub mod config;
/// Stage machine sequencing normalize, invoke and cleanup.
pub mod orchestrator;
