//! Temporary filesystem artifacts and the hand-off of the final output image.

/// The output image handed back to callers.
pub mod output;
/// Artifact creation, naming and release accounting.
pub mod store;
