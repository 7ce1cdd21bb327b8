//! Film grain as a service.
//!
//! The crate takes an uploaded image plus grain settings, normalizes the image to PNG, runs the
//! external `filmgrainer` tool on it and hands back the grained result.
//!
//! # Pipeline overview
//!
//! 1. **Normalize**: decode any supported format (HEIC behind the `heif` feature) and re-encode
//!    it as PNG into a temporary artifact ([`Normalizer`]).
//! 2. **Map**: turn [`GrainParameters`] into discrete `filmgrainer` arguments ([`GrainArgs`]).
//! 3. **Invoke**: run the tool with an explicit argument vector, capturing both output streams
//!    ([`ProcessInvoker`]).
//! 4. **Hand off**: remove the intermediate and return the output as a [`GrainedImage`], which
//!    owns its file until the caller reads, persists or drops it.
//!
//! [`Pipeline::apply_grain`] sequences these steps. The [`server`] module exposes it over HTTP.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod artifact;
mod foundation;
mod grain;
mod normalize;
mod pipeline;
mod process;

/// `tracing-subscriber` setup for binaries.
pub mod logging;
/// HTTP transport (`/health`, `/process`).
pub mod server;

pub use artifact::output::{GrainedImage, OUTPUT_CONTENT_TYPE};
pub use artifact::store::{ArtifactRole, ArtifactStats, ArtifactStore, TemporaryArtifact};
pub use foundation::error::{FailureKind, FilmgrainError, FilmgrainResult, PipelineFailure};
pub use grain::args::{GrainArgs, map_to_arguments};
pub use grain::params::{
    DEFAULT_GRAIN_POWER, DEFAULT_HIGHS, DEFAULT_SHADOWS, GrainIntensity, GrainParameters,
    GrainType, format_decimal,
};
pub use normalize::decode::{DecoderRegistry, HeifDecoder, ImageDecoder, RasterDecoder, is_heif};
pub use normalize::normalizer::{CANONICAL_SUFFIX, Normalizer, SourceImage};
pub use pipeline::config::{DEFAULT_EXECUTABLE, PipelineConfig};
pub use pipeline::orchestrator::{Pipeline, PipelineStage};
pub use process::invoker::{ProcessInvoker, ProcessOutput, tool_responds};
pub use server::config::ServerConfig;
