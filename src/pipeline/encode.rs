//! Image encoding: [`OptimizedImage`] → base64 `ImageData` for the vision API.
//!
//! Vision APIs (OpenAI, Anthropic, Gemini) accept images as base64 data
//! embedded in the JSON request body. `detail: "high"` asks GPT-4-class
//! models to tile the image instead of reading a single 512 px overview,
//! which is what makes contract fine print legible.

use crate::pipeline::optimize::OptimizedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// Wrap an optimised page as a base64 `ImageData` with high detail.
pub fn to_image_data(image: &OptimizedImage) -> ImageData {
    let b64 = STANDARD.encode(&image.bytes);
    debug!(
        "Encoded {}x{} {} → {} bytes base64",
        image.width,
        image.height,
        image.mime_type,
        b64.len()
    );
    ImageData::new(b64, image.mime_type).with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageProfile;
    use crate::pipeline::optimize::optimize_image;
    use image::{DynamicImage, Rgba, RgbaImage};

    #[test]
    fn encodes_optimised_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let optimized = optimize_image(&img, &ImageProfile::compact()).unwrap();

        let data = to_image_data(&optimized);
        assert_eq!(data.mime_type, "image/jpeg");

        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, optimized.bytes);
    }
}
