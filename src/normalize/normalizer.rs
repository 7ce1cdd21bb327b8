use std::{
    fs::File,
    io::{BufWriter, Write as _},
};

use anyhow::Context as _;
use image::{DynamicImage, ImageFormat};

use crate::{
    artifact::store::{ArtifactRole, ArtifactStore, TemporaryArtifact},
    foundation::error::{FilmgrainError, FilmgrainResult},
    normalize::decode::DecoderRegistry,
};

/// File suffix of normalized artifacts.
pub const CANONICAL_SUFFIX: &str = ".png";

/// Raw upload bytes plus whatever the uploader said about their format.
#[derive(Clone, Debug, Default)]
pub struct SourceImage {
    bytes: Vec<u8>,
    declared_format: Option<String>,
}

impl SourceImage {
    /// Wrap raw bytes with no format hint.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            declared_format: None,
        }
    }

    /// Attach a format hint: a file name, an extension, or a MIME type.
    pub fn with_declared_format(mut self, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        self.declared_format = (!hint.trim().is_empty()).then_some(hint);
        self
    }

    /// Read a file, using its name as the format hint.
    pub fn from_path(path: &std::path::Path) -> FilmgrainResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
        let src = Self::new(bytes);
        Ok(match path.file_name() {
            Some(name) => src.with_declared_format(name.to_string_lossy()),
            None => src,
        })
    }

    /// Encoded image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared format hint, if any.
    pub fn declared_format(&self) -> Option<&str> {
        self.declared_format.as_deref()
    }
}

/// Decodes arbitrary input and re-encodes it as PNG into a fresh artifact.
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    decoders: DecoderRegistry,
}

impl Normalizer {
    /// Normalizer using `decoders`.
    pub fn new(decoders: DecoderRegistry) -> Self {
        Self { decoders }
    }

    /// Registered decoder chain.
    pub fn decoders(&self) -> &DecoderRegistry {
        &self.decoders
    }

    /// Decode `source` and write it as PNG into an artifact acquired from `store`.
    ///
    /// The returned artifact belongs to the caller. On error nothing is left behind.
    pub fn normalize(
        &self,
        source: &SourceImage,
        store: &ArtifactStore,
    ) -> FilmgrainResult<TemporaryArtifact> {
        let hint = source.declared_format();
        let decoder = self.decoders.select(source.bytes(), hint).ok_or_else(|| {
            FilmgrainError::decode(match hint {
                Some(hint) => format!("unsupported or unknown image format (declared '{hint}')"),
                None => "unsupported or unknown image format".to_string(),
            })
        })?;

        let decoded = decoder.decode(source.bytes(), hint)?;
        tracing::debug!(
            decoder = decoder.name(),
            width = decoded.width(),
            height = decoded.height(),
            "decoded source image"
        );

        let mut artifact = store.acquire(ArtifactRole::Normalized, CANONICAL_SUFFIX)?;
        if let Err(err) = write_png(&to_png_compatible(decoded), &artifact) {
            if let Err(cleanup) = artifact.release() {
                tracing::warn!(error = %cleanup, "failed to remove partial normalized artifact");
            }
            return Err(err);
        }
        Ok(artifact)
    }
}

/// PNG has no float channels; widen those to 16-bit RGBA and leave everything else alone.
fn to_png_compatible(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            DynamicImage::ImageRgba16(img.to_rgba16())
        }
        other => other,
    }
}

fn write_png(img: &DynamicImage, artifact: &TemporaryArtifact) -> FilmgrainResult<()> {
    let file = File::create(artifact.path())
        .with_context(|| format!("open '{}' for writing", artifact.path().display()))?;
    let mut writer = BufWriter::new(file);
    img.write_to(&mut writer, ImageFormat::Png)
        .with_context(|| format!("encode png '{}'", artifact.path().display()))?;
    writer
        .flush()
        .with_context(|| format!("flush '{}'", artifact.path().display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/normalize/normalizer.rs"]
mod tests;
