use std::{ffi::OsString, path::PathBuf, time::Duration};

use crate::foundation::error::{FilmgrainError, FilmgrainResult};

/// Name the external grain tool is looked up by on `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "filmgrainer";

/// Process-wide pipeline settings, fixed at startup.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Grain tool to run: a bare name resolved via `PATH`, or a path.
    pub executable: OsString,
    /// Directory for temporary artifacts; the system temp dir when `None`.
    pub work_dir: Option<PathBuf>,
    /// Upper bound on one tool run; unbounded when `None`.
    pub timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.into(),
            work_dir: None,
            timeout: None,
        }
    }
}

impl PipelineConfig {
    /// Use `executable` instead of `filmgrainer`.
    pub fn with_executable(mut self, executable: impl Into<OsString>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Create artifacts under `dir`.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Bound each tool run by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the settings before any request is served.
    pub fn validate(&self) -> FilmgrainResult<()> {
        if self.executable.is_empty() {
            return Err(FilmgrainError::validation("executable must not be empty"));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(FilmgrainError::validation("timeout must be non-zero"));
        }
        if let Some(dir) = &self.work_dir
            && !dir.is_dir()
        {
            return Err(FilmgrainError::validation(format!(
                "work dir '{}' does not exist or is not a directory",
                dir.display()
            )));
        }
        Ok(())
    }
}
