//! Grain parameters and their translation into `filmgrainer` arguments.

/// Typed argument builder.
pub mod args;
/// Parameter model and validation.
pub mod params;
