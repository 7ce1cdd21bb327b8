use std::io::Cursor;

use super::*;

fn encode(format: ImageFormat, img: DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn scratch_store() -> (tempfile::TempDir, ArtifactStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    (dir, store)
}

#[test]
fn common_formats_normalize_to_png_with_same_dimensions() {
    let (_dir, store) = scratch_store();
    let normalizer = Normalizer::default();

    for format in [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Bmp,
        ImageFormat::Gif,
        ImageFormat::Tiff,
        ImageFormat::WebP,
    ] {
        let src_img = match format {
            ImageFormat::WebP => DynamicImage::ImageRgba8(gradient(37, 21).to_rgba8()),
            _ => gradient(37, 21),
        };
        let source = SourceImage::new(encode(format, src_img));
        let artifact = normalizer.normalize(&source, &store).unwrap();

        let written = std::fs::read(artifact.path()).unwrap();
        assert_eq!(
            image::guess_format(&written).unwrap(),
            ImageFormat::Png,
            "{format:?}"
        );
        let reread = image::load_from_memory(&written).unwrap();
        assert_eq!((reread.width(), reread.height()), (37, 21), "{format:?}");
    }

    assert_eq!(store.stats().live(), 0);
}

#[test]
fn float_images_are_widened_for_png() {
    let (_dir, store) = scratch_store();
    let hdr = DynamicImage::ImageRgb32F(image::Rgb32FImage::from_pixel(
        5,
        4,
        image::Rgb([0.25, 0.5, 0.75]),
    ));
    let png_compatible = to_png_compatible(hdr);
    assert!(matches!(png_compatible, DynamicImage::ImageRgba16(_)));
    assert_eq!((png_compatible.width(), png_compatible.height()), (5, 4));

    let artifact = store.acquire(ArtifactRole::Normalized, ".png").unwrap();
    write_png(&png_compatible, &artifact).unwrap();
    let reread = image::open(artifact.path()).unwrap();
    assert_eq!((reread.width(), reread.height()), (5, 4));
}

#[test]
fn corrupt_input_is_decode_error_and_acquires_nothing() {
    let (_dir, store) = scratch_store();
    let normalizer = Normalizer::default();

    let err = normalizer
        .normalize(&SourceImage::new(b"not an image at all".to_vec()), &store)
        .unwrap_err();
    assert!(matches!(err, FilmgrainError::Decode(_)));

    let mut png = encode(ImageFormat::Png, gradient(8, 8));
    png.truncate(30);
    let err = normalizer
        .normalize(&SourceImage::new(png), &store)
        .unwrap_err();
    assert!(matches!(err, FilmgrainError::Decode(_)));

    assert_eq!(store.stats().acquired, 0);
}

#[test]
fn unknown_format_error_mentions_declared_hint() {
    let (_dir, store) = scratch_store();
    let source = SourceImage::new(b"garbage".to_vec()).with_declared_format("scan.xyz");
    let err = Normalizer::default()
        .normalize(&source, &store)
        .unwrap_err();
    assert!(err.to_string().contains("scan.xyz"), "{err}");
}

#[test]
fn blank_hint_is_ignored() {
    let source = SourceImage::new(vec![1, 2, 3]).with_declared_format("  ");
    assert_eq!(source.declared_format(), None);
}

#[test]
fn from_path_uses_file_name_as_hint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("holiday.JPG");
    std::fs::write(&path, encode(ImageFormat::Jpeg, gradient(4, 4))).unwrap();

    let source = SourceImage::from_path(&path).unwrap();
    assert_eq!(source.declared_format(), Some("holiday.JPG"));
    assert!(!source.bytes().is_empty());
}

#[test]
fn normalize_leaves_input_untouched() {
    let (_dir, store) = scratch_store();
    let bytes = encode(ImageFormat::Png, gradient(6, 6));
    let source = SourceImage::new(bytes.clone());
    let _artifact = Normalizer::default().normalize(&source, &store).unwrap();
    assert_eq!(source.bytes(), bytes.as_slice());
}

#[test]
fn custom_decoder_chain_is_the_only_one_consulted() {
    let (_dir, store) = scratch_store();
    let normalizer = Normalizer::new(DecoderRegistry::new(vec![std::sync::Arc::new(
        crate::normalize::decode::HeifDecoder,
    )]));
    assert_eq!(normalizer.decoders().names(), vec!["heif"]);

    let png = encode(ImageFormat::Png, gradient(4, 4));
    let err = normalizer
        .normalize(&SourceImage::new(png), &store)
        .unwrap_err();
    assert!(matches!(err, FilmgrainError::Decode(_)), "{err:?}");
    assert_eq!(store.stats().acquired, 0);
}

#[cfg(feature = "heif")]
#[test]
fn heic_normalizes_to_png_with_same_dimensions() {
    let (_dir, store) = scratch_store();
    let heic = std::fs::read(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/alpha.heic"),
    )
    .unwrap();
    assert!(crate::normalize::decode::is_heif(&heic));

    let artifact = Normalizer::default()
        .normalize(&SourceImage::new(heic).with_declared_format("alpha.heic"), &store)
        .unwrap();
    let written = std::fs::read(artifact.path()).unwrap();
    assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Png);
    let reread = image::load_from_memory(&written).unwrap();
    assert_eq!((reread.width(), reread.height()), (256, 256));
}
