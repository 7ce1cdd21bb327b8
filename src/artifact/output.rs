use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use tempfile::TempPath;

use crate::{
    artifact::store::{ArtifactCounters, remove_temp_path},
    foundation::error::{FilmgrainError, FilmgrainResult},
};

/// Content type of every image the pipeline produces.
pub const OUTPUT_CONTENT_TYPE: &str = "image/png";

/// A finished grain result, owning the output file it lives in.
///
/// Whoever holds this value owns the file: it is removed on [`release`](Self::release), after
/// [`into_bytes`](Self::into_bytes), or on drop. [`persist`](Self::persist) moves it out of the
/// temporary area instead.
#[derive(Debug)]
pub struct GrainedImage {
    location: PathBuf,
    temp: Option<TempPath>,
    counters: Arc<ArtifactCounters>,
}

impl GrainedImage {
    pub(crate) fn new(temp: TempPath, counters: Arc<ArtifactCounters>) -> Self {
        Self {
            location: temp.to_path_buf(),
            temp: Some(temp),
            counters,
        }
    }

    /// Path of the output image.
    pub fn path(&self) -> &Path {
        &self.location
    }

    /// MIME type of the output image.
    pub fn content_type(&self) -> &'static str {
        OUTPUT_CONTENT_TYPE
    }

    /// Read the whole image into memory without giving up ownership.
    pub fn read(&self) -> FilmgrainResult<Vec<u8>> {
        let bytes = std::fs::read(&self.location)
            .with_context(|| format!("read output image '{}'", self.location.display()))?;
        Ok(bytes)
    }

    /// Read the image and remove the backing file.
    pub fn into_bytes(mut self) -> FilmgrainResult<Vec<u8>> {
        let bytes = self.read()?;
        self.release_inner()?;
        Ok(bytes)
    }

    /// Move the image to `dest`, falling back to a copy when a rename is not possible
    /// (for example across filesystems). Returns `dest`.
    pub fn persist(mut self, dest: impl AsRef<Path>) -> FilmgrainResult<PathBuf> {
        let dest = dest.as_ref();
        let Some(temp) = self.temp.take() else {
            return Err(FilmgrainError::resource("output image was already released"));
        };
        self.counters.note_released();

        match temp.persist(dest) {
            Ok(()) => {}
            Err(err) => {
                let temp = err.path;
                tracing::debug!(
                    error = %err.error,
                    dest = %dest.display(),
                    "rename failed, copying output image instead"
                );
                std::fs::copy(&temp, dest).with_context(|| {
                    format!(
                        "copy '{}' to '{}'",
                        self.location.display(),
                        dest.display()
                    )
                })?;
                remove_temp_path(temp)?;
            }
        }
        Ok(dest.to_path_buf())
    }

    /// Remove the backing file now.
    pub fn release(mut self) -> FilmgrainResult<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> FilmgrainResult<()> {
        let Some(temp) = self.temp.take() else {
            return Ok(());
        };
        self.counters.note_released();
        remove_temp_path(temp)
    }
}

impl Drop for GrainedImage {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            tracing::warn!(error = %err, "failed to clean up output image");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/artifact/output.rs"]
mod tests;
