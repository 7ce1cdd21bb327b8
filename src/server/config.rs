use std::net::SocketAddr;

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
/// Default request body limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// HTTP transport settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: SocketAddr,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Upper bound on pipeline runs in flight; unbounded when `None`.
    pub max_concurrent: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_concurrent: None,
        }
    }
}
