use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tempfile::TempPath;

use crate::{
    artifact::output::GrainedImage,
    foundation::error::{FilmgrainError, FilmgrainResult},
};

/// What a temporary artifact is used for. Only used for naming and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactRole {
    /// Canonical-format copy of the input image.
    Normalized,
    /// File the external tool writes its result into.
    Output,
}

impl ArtifactRole {
    fn as_str(self) -> &'static str {
        match self {
            Self::Normalized => "normalized",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
pub(crate) struct ArtifactCounters {
    acquired: AtomicU64,
    released: AtomicU64,
}

impl ArtifactCounters {
    pub(crate) fn note_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of how many artifacts a store has handed out and taken back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArtifactStats {
    /// Artifacts created.
    pub acquired: u64,
    /// Artifacts released (removed, or persisted elsewhere by their final owner).
    pub released: u64,
}

impl ArtifactStats {
    /// Artifacts that are still alive.
    pub fn live(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Creates uniquely named temporary files under one directory and tracks their release.
///
/// Clones share the same counters, so one store can be handed to every request.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    tag: Option<String>,
    counters: Arc<ArtifactCounters>,
}

impl ArtifactStore {
    /// Store rooted at `root`. The directory must exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tag: None,
            counters: Arc::default(),
        }
    }

    /// Store rooted at the system temporary directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Directory artifacts are created in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A view of this store whose artifact names carry `tag`. Counters stay shared.
    pub fn tagged(&self, tag: impl Into<String>) -> Self {
        Self {
            root: self.root.clone(),
            tag: Some(tag.into()),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Create a new empty backing file with a unique name ending in `suffix`.
    pub fn acquire(&self, role: ArtifactRole, suffix: &str) -> FilmgrainResult<TemporaryArtifact> {
        let prefix = match &self.tag {
            Some(tag) => format!("filmgrain-{tag}-{role}-"),
            None => format!("filmgrain-{role}-"),
        };

        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(suffix)
            .tempfile_in(&self.root)
            .map_err(|e| {
                FilmgrainError::resource(format!(
                    "failed to create {role} artifact in '{}': {e}",
                    self.root.display()
                ))
            })?;

        let temp = file.into_temp_path();
        self.counters.acquired.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(path = %temp.display(), %role, "acquired artifact");

        Ok(TemporaryArtifact {
            location: temp.to_path_buf(),
            temp: Some(temp),
            role,
            counters: Arc::clone(&self.counters),
        })
    }

    /// Current acquisition/release counts.
    pub fn stats(&self) -> ArtifactStats {
        ArtifactStats {
            acquired: self.counters.acquired.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
        }
    }
}

/// A file-backed scratch buffer with exactly one release event.
///
/// Dropping an unreleased artifact releases it, so every exit path cleans up.
#[derive(Debug)]
pub struct TemporaryArtifact {
    location: PathBuf,
    temp: Option<TempPath>,
    role: ArtifactRole,
    counters: Arc<ArtifactCounters>,
}

impl TemporaryArtifact {
    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.location
    }

    /// Role this artifact was acquired for.
    pub fn role(&self) -> ArtifactRole {
        self.role
    }

    /// Whether [`release`](Self::release) already ran.
    pub fn is_released(&self) -> bool {
        self.temp.is_none()
    }

    /// Remove the backing file. Safe to call more than once, and a file that is already gone is
    /// not an error.
    pub fn release(&mut self) -> FilmgrainResult<()> {
        let Some(temp) = self.temp.take() else {
            return Ok(());
        };
        self.counters.note_released();
        tracing::trace!(path = %self.location.display(), role = %self.role, "released artifact");
        remove_temp_path(temp)
    }

    /// Hand the artifact to the caller as the pipeline result. It is not released here.
    pub fn into_output(mut self) -> FilmgrainResult<GrainedImage> {
        let temp = self.temp.take().ok_or_else(|| {
            FilmgrainError::resource(format!(
                "{} artifact '{}' was already released",
                self.role,
                self.location.display()
            ))
        })?;
        Ok(GrainedImage::new(temp, Arc::clone(&self.counters)))
    }
}

impl Drop for TemporaryArtifact {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(error = %err, "failed to clean up temporary artifact");
        }
    }
}

pub(crate) fn remove_temp_path(temp: TempPath) -> FilmgrainResult<()> {
    let path = temp.to_path_buf();
    match temp.close() {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FilmgrainError::resource(format!(
            "failed to remove '{}': {e}",
            path.display()
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/artifact/store.rs"]
mod tests;
