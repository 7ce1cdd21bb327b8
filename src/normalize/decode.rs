use std::sync::Arc;

use image::{DynamicImage, ImageFormat};

use crate::foundation::error::{FilmgrainError, FilmgrainResult};

/// One entry in the decoder chain.
pub trait ImageDecoder: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether `bytes` look like something this decoder reads (magic-byte check).
    fn recognizes(&self, bytes: &[u8]) -> bool;

    /// Whether this decoder claims a declared format hint such as `heic` or `image/jpeg`.
    fn claims(&self, hint: &str) -> bool;

    /// Decode `bytes` into pixels.
    fn decode(&self, bytes: &[u8], hint: Option<&str>) -> FilmgrainResult<DynamicImage>;
}

/// Lowercased extension or MIME subtype, e.g. `photo.HEIC` -> `heic`, `image/jpeg` -> `jpeg`.
pub(crate) fn normalize_hint(hint: &str) -> String {
    let hint = hint.trim();
    let tail = hint
        .rsplit(['.', '/'])
        .next()
        .unwrap_or(hint)
        .trim_start_matches("x-");
    tail.to_ascii_lowercase()
}

/// Everything the `image` crate reads: PNG, JPEG, GIF, BMP, TIFF, WebP, ICO, TGA, ...
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn recognizes(&self, bytes: &[u8]) -> bool {
        image::guess_format(bytes).is_ok_and(|f| f.reading_enabled())
    }

    fn claims(&self, hint: &str) -> bool {
        let hint = normalize_hint(hint);
        ImageFormat::from_extension(&hint).is_some_and(|f| f.reading_enabled())
    }

    fn decode(&self, bytes: &[u8], hint: Option<&str>) -> FilmgrainResult<DynamicImage> {
        let decoded = match image::guess_format(bytes) {
            Ok(_) => image::load_from_memory(bytes),
            // Formats without magic bytes (TGA) only decode through the declared hint.
            Err(_) => {
                let format = hint
                    .map(normalize_hint)
                    .and_then(|h| ImageFormat::from_extension(&h))
                    .ok_or_else(|| FilmgrainError::decode("unrecognized image format"))?;
                image::load_from_memory_with_format(bytes, format)
            }
        };
        decoded.map_err(|e| FilmgrainError::decode(format!("{} decoder: {e}", self.name())))
    }
}

/// ISO-BMFF brands used by HEIF/HEIC/AVIF-in-HEIF files.
const HEIF_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"hevm", b"hevs", b"mif1", b"msf1",
];

/// Whether `bytes` start with an `ftyp` box carrying a HEIF-family brand.
pub fn is_heif(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    let box_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let end = box_len.clamp(12, bytes.len());
    // Major brand at 8..12, then minor version, then compatible brands.
    let major = &bytes[8..12];
    let compatible = bytes.get(16..end).unwrap_or_default();
    std::iter::once(major)
        .chain(compatible.chunks_exact(4))
        .any(|brand| HEIF_BRANDS.iter().any(|b| b.as_slice() == brand))
}

/// HEIC/HEIF decoder backed by `libheif`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeifDecoder;

impl ImageDecoder for HeifDecoder {
    fn name(&self) -> &'static str {
        "heif"
    }

    fn recognizes(&self, bytes: &[u8]) -> bool {
        is_heif(bytes)
    }

    fn claims(&self, hint: &str) -> bool {
        matches!(normalize_hint(hint).as_str(), "heic" | "heif" | "heics" | "heifs")
    }

    #[cfg(feature = "heif")]
    fn decode(&self, bytes: &[u8], _hint: Option<&str>) -> FilmgrainResult<DynamicImage> {
        use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

        let heif_err = |stage: &str, e: libheif_rs::HeifError| {
            FilmgrainError::decode(format!("heif decoder: {stage}: {e}"))
        };

        let lib = LibHeif::new();
        let ctx = HeifContext::read_from_bytes(bytes).map_err(|e| heif_err("read container", e))?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| heif_err("primary image", e))?;
        let decoded = lib
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
            .map_err(|e| heif_err("decode", e))?;

        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| FilmgrainError::decode("heif decoder: no interleaved RGBA plane"))?;

        let (width, height) = (plane.width, plane.height);
        let row_len = width as usize * 4;
        let mut rgba = Vec::with_capacity(row_len * height as usize);
        for row in plane.data.chunks(plane.stride).take(height as usize) {
            let row = row
                .get(..row_len)
                .ok_or_else(|| FilmgrainError::decode("heif decoder: truncated pixel row"))?;
            rgba.extend_from_slice(row);
        }

        image::RgbaImage::from_raw(width, height, rgba)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| FilmgrainError::decode("heif decoder: pixel buffer size mismatch"))
    }

    #[cfg(not(feature = "heif"))]
    fn decode(&self, _bytes: &[u8], _hint: Option<&str>) -> FilmgrainResult<DynamicImage> {
        Err(FilmgrainError::decode(
            "HEIC/HEIF input requires the 'heif' feature",
        ))
    }
}

/// Ordered, immutable decoder chain, built once at startup and shared between requests.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: Arc<[Arc<dyn ImageDecoder>]>,
}

impl DecoderRegistry {
    /// Registry with exactly `decoders`, tried in order.
    pub fn new(decoders: Vec<Arc<dyn ImageDecoder>>) -> Self {
        Self {
            decoders: decoders.into(),
        }
    }

    /// Names of the registered decoders, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    /// Pick the decoder for `bytes`: magic bytes first, then the declared hint.
    pub fn select(&self, bytes: &[u8], hint: Option<&str>) -> Option<&dyn ImageDecoder> {
        self.decoders
            .iter()
            .find(|d| d.recognizes(bytes))
            .or_else(|| {
                let hint = hint?;
                self.decoders.iter().find(|d| d.claims(hint))
            })
            .map(|d| d.as_ref())
    }
}

impl Default for DecoderRegistry {
    /// The raster decoder followed by the HEIF decoder.
    fn default() -> Self {
        Self::new(vec![Arc::new(RasterDecoder), Arc::new(HeifDecoder)])
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("decoders", &self.names())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/normalize/decode.rs"]
mod tests;
