//! Input decoding and re-encoding into the canonical PNG format.

/// Decoder chain: trait, built-in decoders and registry.
pub mod decode;
/// Source image type and the normalizer itself.
pub mod normalizer;
