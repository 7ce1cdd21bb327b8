use std::time::Duration;

use serde::Serialize;

/// Result alias used throughout the crate.
pub type FilmgrainResult<T> = Result<T, FilmgrainError>;

/// Every way a grain invocation can fail.
#[derive(thiserror::Error, Debug)]
pub enum FilmgrainError {
    /// Input could not be decoded by any registered decoder.
    #[error("decode error: {0}")]
    Decode(String),

    /// The external tool could not be started at all.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        /// Program that was asked to run.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The external tool ran and exited unsuccessfully.
    #[error("{program} failed ({}): {stderr} | {stdout}", describe_exit(.exit_code))]
    ToolExecution {
        /// Program that ran.
        program: String,
        /// Exit code, `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
        /// Captured standard output, verbatim.
        stdout: String,
        /// Captured standard error, verbatim.
        stderr: String,
    },

    /// The external tool exceeded the configured wait bound and was killed.
    #[error("{program} did not finish within {}s and was terminated", .after.as_secs_f64())]
    Timeout {
        /// Program that ran.
        program: String,
        /// Configured bound.
        after: Duration,
    },

    /// Temporary artifact creation or removal failed.
    #[error("resource error: {0}")]
    Resource(String),

    /// Caller supplied parameters the tool cannot accept.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unexpected failure with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl FilmgrainError {
    /// Build a [`FilmgrainError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`FilmgrainError::Resource`].
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`FilmgrainError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Decode(_) => FailureKind::Decode,
            Self::Launch { .. } => FailureKind::Launch,
            Self::ToolExecution { .. } => FailureKind::ToolExecution,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Resource(_) => FailureKind::Resource,
            Self::Validation(_) => FailureKind::Validation,
            Self::Other(_) => FailureKind::Internal,
        }
    }

    /// Flatten into the structured failure handed to the transport layer.
    pub fn failure(&self) -> PipelineFailure {
        PipelineFailure {
            kind: self.kind(),
            detail: self.to_string(),
        }
    }
}

/// Coarse failure category surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unreadable or unsupported input image.
    Decode,
    /// External tool missing or not spawnable.
    Launch,
    /// External tool exited nonzero.
    ToolExecution,
    /// External tool exceeded the wait bound.
    Timeout,
    /// Temporary artifact management failed.
    Resource,
    /// Rejected parameters.
    Validation,
    /// Anything else.
    Internal,
}

/// Structured failure: a kind plus a human-readable detail string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipelineFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable detail. For tool failures this carries the exit code and both streams.
    pub detail: String,
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
