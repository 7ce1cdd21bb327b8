//! HTTP transport around the pipeline.

/// Listen address and limits.
pub mod config;
/// Multipart request parsing.
pub mod form;
/// Router, handlers and error mapping.
pub mod routes;
