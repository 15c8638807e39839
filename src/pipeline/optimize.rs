//! Image optimisation: bound the payload of each page before upload.
//!
//! A 1.5× render of a letter-size page is ~1300 × 1650 px of RGBA, several
//! megabytes once encoded losslessly. The vision API bills and queues by
//! image size, while legibility of body text survives a downscale to ~1000 px
//! and a drop to grayscale. This stage turns a rendered page into the
//! smallest image that still reads well, per the [`ImageProfile`].

use crate::config::{ColorMode, ImageProfile, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::error::{ImageError, ParameterError, ParameterErrorKind};
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder};
use tracing::debug;

/// The unit actually transmitted to the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedImage {
    /// Encoded image bytes (JPEG or PNG).
    pub bytes: Vec<u8>,
    /// MIME type matching `bytes`.
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Decode raw image bytes (typically PNG from a renderer) and optimise them.
pub fn optimize_bytes(
    raw: &[u8],
    profile: &ImageProfile,
) -> Result<OptimizedImage, image::ImageError> {
    let img = image::load_from_memory(raw)?;
    optimize_image(&img, profile)
}

/// Downscale, reduce colour and re-encode a rendered page.
///
/// The output never exceeds the input in either dimension and its longer
/// side never exceeds `profile.max_dimension`, which must be at least 1.
pub fn optimize_image(
    img: &DynamicImage,
    profile: &ImageProfile,
) -> Result<OptimizedImage, image::ImageError> {
    if profile.max_dimension == 0 {
        return Err(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::Generic("max_dimension must be at least 1".into()),
        )));
    }
    let (width, height) = img.dimensions();
    let (target_w, target_h) = target_dimensions(width, height, profile.max_dimension);

    let resized = if (target_w, target_h) == (width, height) {
        img.clone()
    } else {
        img.resize_exact(target_w, target_h, profile.resample.filter())
    };

    let (pixels, color_type) = match profile.color {
        ColorMode::Grayscale => (resized.to_luma8().into_raw(), ExtendedColorType::L8),
        ColorMode::Rgb => (resized.to_rgb8().into_raw(), ExtendedColorType::Rgb8),
    };

    let mut bytes = Vec::new();
    match profile.format {
        OutputFormat::Jpeg { quality } => {
            JpegEncoder::new_with_quality(&mut bytes, quality).write_image(
                &pixels,
                target_w,
                target_h,
                color_type,
            )?;
        }
        OutputFormat::Png => {
            PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, PngFilter::Adaptive)
                .write_image(&pixels, target_w, target_h, color_type)?;
        }
    }

    debug!(
        "Optimised {}x{} → {}x{} ({} bytes, {})",
        width,
        height,
        target_w,
        target_h,
        bytes.len(),
        profile.format.mime_type()
    );

    Ok(OptimizedImage {
        bytes,
        mime_type: profile.format.mime_type(),
        width: target_w,
        height: target_h,
    })
}

/// Scale `(width, height)` uniformly so the longer side fits `max_dimension`.
///
/// Returns the input unchanged when it already fits. Each side is at least 1;
/// a `max_dimension` of 0 is treated as 1.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    let longest = width.max(height);
    if longest <= max_dimension || longest == 0 {
        return (width, height);
    }
    let ratio = max_dimension as f64 / longest as f64;
    let scale = |side: u32| -> u32 {
        ((side as f64 * ratio).round() as u32).clamp(1, max_dimension)
    };
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Resample;
    use image::{Rgba, RgbaImage};

    fn page(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255])))
    }

    #[test]
    fn target_dimensions_preserves_aspect_ratio() {
        assert_eq!(target_dimensions(3000, 1200, 800), (800, 320));
        assert_eq!(target_dimensions(1200, 3000, 800), (320, 800));
        assert_eq!(target_dimensions(1000, 1000, 800), (800, 800));
    }

    #[test]
    fn target_dimensions_never_upscales() {
        assert_eq!(target_dimensions(300, 200, 800), (300, 200));
        assert_eq!(target_dimensions(800, 10, 800), (800, 10));
    }

    #[test]
    fn target_dimensions_keeps_thin_images_visible() {
        assert_eq!(target_dimensions(10_000, 1, 800), (800, 1));
    }

    #[test]
    fn target_dimensions_with_zero_bound_does_not_panic() {
        assert_eq!(target_dimensions(100, 50, 0), (1, 1));
        assert_eq!(target_dimensions(0, 0, 0), (0, 0));
    }

    #[test]
    fn zero_max_dimension_is_a_parameter_error() {
        let profile = ImageProfile {
            max_dimension: 0,
            ..ImageProfile::compact()
        };
        let err = optimize_image(&page(40, 60), &profile).unwrap_err();
        assert!(matches!(err, ImageError::Parameter(_)), "{err:?}");
    }

    #[test]
    fn arbitrary_sizes_fit_the_bound() {
        for (w, h) in [(1, 1), (799, 801), (1275, 1650), (4096, 17), (17, 4096)] {
            let (tw, th) = target_dimensions(w, h, 800);
            assert!(tw.max(th) <= 800, "{w}x{h} -> {tw}x{th}");
            assert!(tw <= w && th <= h, "{w}x{h} -> {tw}x{th}");
            // Each side is within one pixel of the exact uniform scale.
            let ratio = (800.0 / w.max(h) as f64).min(1.0);
            assert!((tw as f64 - w as f64 * ratio).abs() <= 1.0, "{w}x{h} -> {tw}x{th}");
            assert!((th as f64 - h as f64 * ratio).abs() <= 1.0, "{w}x{h} -> {tw}x{th}");
        }
    }

    #[test]
    fn grayscale_jpeg_output_decodes_within_bound() {
        let out = optimize_image(&page(1275, 1650), &ImageProfile::fast()).unwrap();
        assert_eq!(out.mime_type, "image/jpeg");
        assert_eq!((out.width, out.height), (618, 800));

        let decoded = image::load_from_memory(&out.bytes).expect("valid jpeg");
        assert_eq!(decoded.dimensions(), (618, 800));
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn rgb_png_output_is_lossless() {
        let profile = ImageProfile {
            max_dimension: 64,
            resample: Resample::Nearest,
            color: ColorMode::Rgb,
            format: OutputFormat::Png,
        };
        let out = optimize_image(&page(32, 16), &profile).unwrap();
        assert_eq!(out.mime_type, "image/png");

        let decoded = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (32, 16));
        assert_eq!(decoded.get_pixel(5, 5).0, [200, 30, 30]);
    }

    #[test]
    fn optimize_bytes_accepts_png_input() {
        let mut raw = Vec::new();
        page(2000, 1000)
            .write_to(&mut std::io::Cursor::new(&mut raw), image::ImageFormat::Png)
            .unwrap();

        let out = optimize_bytes(&raw, &ImageProfile::compact()).unwrap();
        assert_eq!((out.width, out.height), (1024, 512));
    }

    #[test]
    fn optimize_bytes_rejects_garbage() {
        assert!(optimize_bytes(b"not an image", &ImageProfile::compact()).is_err());
    }
}
