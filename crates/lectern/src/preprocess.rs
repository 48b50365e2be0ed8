//! Image preprocessing before OCR dispatch.
//!
//! Photographs and screenshots are downscaled to a maximum width, optionally
//! converted to grayscale, and re-encoded as JPEG so the OCR request stays
//! small. Anything that cannot be decoded is passed through untouched and left
//! for the gateway to reject.

use crate::core::routing::JPEG_MIME_TYPE;
use crate::types::ImagePayload;
use crate::{LecternError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader, RgbaImage};
use rayon::prelude::*;
use std::io::Cursor;

/// Images with more pixels than this are converted to grayscale in parallel.
pub const PARALLEL_PIXEL_THRESHOLD: u64 = 512 * 512;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessOptions {
    pub max_width: u32,
    /// JPEG quality factor in (0, 1]
    pub quality: f64,
    pub grayscale: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            max_width: 1000,
            quality: 0.7,
            grayscale: false,
        }
    }
}

impl PreprocessOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 {
            return Err(LecternError::validation("max_width must be greater than 0"));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(LecternError::validation(format!(
                "quality must be in (0, 1], got {}",
                self.quality
            )));
        }
        Ok(())
    }

    /// The quality factor as a JPEG encoder setting.
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Output dimensions for an image of `width` x `height`.
///
/// Images no wider than `max_width` keep their size. Wider images are scaled
/// to exactly `max_width` with the height rounded to the nearest pixel.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (height as f64 * max_width as f64 / width as f64).round() as u32;
    (max_width, scaled.max(1))
}

/// Replace every pixel with its luma, `round(0.299 R + 0.587 G + 0.114 B)`.
/// Alpha is left as is.
pub fn grayscale_in_place(image: &mut RgbaImage) {
    let pixels = image.width() as u64 * image.height() as u64;
    let buffer: &mut [u8] = image.as_mut();

    if pixels > PARALLEL_PIXEL_THRESHOLD {
        buffer.par_chunks_exact_mut(4).for_each(gray_pixel);
    } else {
        buffer.chunks_exact_mut(4).for_each(gray_pixel);
    }
}

/// Weights in thousandths; exact halves round up.
#[inline]
fn gray_pixel(px: &mut [u8]) {
    let weighted = 299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2]);
    let luma = ((weighted + 500) / 1000) as u8;
    px[0] = luma;
    px[1] = luma;
    px[2] = luma;
}

/// Preprocess raw image bytes.
///
/// Never fails: on decode or encode errors the original bytes are returned
/// as a passthrough payload labelled with `mime_hint` (or JPEG).
pub fn preprocess(bytes: &[u8], mime_hint: Option<&str>, options: &PreprocessOptions) -> ImagePayload {
    match try_preprocess(bytes, options) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, size = bytes.len(), "Image preprocessing failed, passing original payload through");
            ImagePayload::passthrough(bytes, mime_hint.unwrap_or(JPEG_MIME_TYPE))
        }
    }
}

/// Preprocess an image given as a `data:` URL or bare base64.
///
/// If the base64 itself is invalid, the original text is kept verbatim.
pub fn preprocess_data_url(input: &str, options: &PreprocessOptions) -> ImagePayload {
    let (mime, encoded) = split_data_url(input);

    match STANDARD.decode(encoded.trim()) {
        Ok(bytes) => preprocess(&bytes, mime, options),
        Err(e) => {
            tracing::debug!(error = %e, "Image payload is not valid base64, passing through");
            ImagePayload::from_encoded(encoded, mime.unwrap_or(JPEG_MIME_TYPE))
        }
    }
}

/// Split `data:<mime>;base64,<data>` into its MIME type and data.
/// Input without a data-URL header is returned as bare data.
pub fn split_data_url(input: &str) -> (Option<&str>, &str) {
    let Some(rest) = input.strip_prefix("data:") else {
        return (None, input);
    };
    let Some((header, data)) = rest.split_once(',') else {
        return (None, input);
    };
    let mime = header.strip_suffix(";base64").unwrap_or(header);
    let mime = (!mime.is_empty()).then_some(mime);
    (mime, data)
}

fn try_preprocess(bytes: &[u8], options: &PreprocessOptions) -> Result<ImagePayload> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LecternError::image_processing_with_source("Failed to detect image format", e))?;

    let image = reader
        .decode()
        .map_err(|e| LecternError::image_processing_with_source("Failed to decode image", e))?;

    let (width, height) = image.dimensions();
    let (target_width, target_height) = target_dimensions(width, height, options.max_width);

    let image = if (target_width, target_height) != (width, height) {
        image.resize_exact(target_width, target_height, FilterType::Triangle)
    } else {
        image
    };

    let image = if options.grayscale {
        let mut rgba = image.into_rgba8();
        grayscale_in_place(&mut rgba);
        DynamicImage::ImageRgba8(rgba)
    } else {
        image
    };

    let rgb = image.into_rgb8();

    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, options.jpeg_quality());
    encoder
        .encode_image(&rgb)
        .map_err(|e| LecternError::image_processing_with_source("Failed to encode JPEG", e))?;

    Ok(ImagePayload {
        encoded_data: STANDARD.encode(&buffer),
        mime_type: JPEG_MIME_TYPE.to_string(),
        width: target_width,
        height: target_height,
        quality_factor: Some(options.quality),
        grayscale: options.grayscale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 90]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn decode_payload(payload: &ImagePayload) -> DynamicImage {
        let bytes = STANDARD.decode(&payload.encoded_data).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_target_dimensions() {
        assert_eq!(target_dimensions(2000, 1000, 1000), (1000, 500));
        assert_eq!(target_dimensions(300, 101, 100), (100, 34));
        assert_eq!(target_dimensions(1000, 700, 1000), (1000, 700));
        assert_eq!(target_dimensions(640, 480, 1000), (640, 480));
        assert_eq!(target_dimensions(5000, 1, 1000), (1000, 1));
    }

    #[test]
    fn test_jpeg_quality_mapping() {
        let mut options = PreprocessOptions::default();
        assert_eq!(options.jpeg_quality(), 70);
        options.quality = 1.0;
        assert_eq!(options.jpeg_quality(), 100);
        options.quality = 0.001;
        assert_eq!(options.jpeg_quality(), 1);
    }

    #[test]
    fn test_options_validate() {
        assert!(PreprocessOptions::default().validate().is_ok());
        let bad = PreprocessOptions {
            quality: 1.2,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = PreprocessOptions {
            max_width: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_downscales_wide_image() {
        let options = PreprocessOptions {
            max_width: 100,
            ..Default::default()
        };
        let payload = preprocess(&png_bytes(300, 101), Some("image/png"), &options);

        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!((payload.width, payload.height), (100, 34));
        assert_eq!(payload.quality_factor, Some(0.7));

        let decoded = decode_payload(&payload);
        assert_eq!(decoded.dimensions(), (100, 34));
    }

    #[test]
    fn test_never_upscales() {
        let payload = preprocess(&png_bytes(40, 30), None, &PreprocessOptions::default());
        assert_eq!((payload.width, payload.height), (40, 30));
        assert!(!payload.is_passthrough());
    }

    #[test]
    fn test_grayscale_formula_keeps_alpha() {
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([10, 200, 30, 77]));
        grayscale_in_place(&mut img);

        for px in img.pixels() {
            assert_eq!(px.0, [124, 124, 124, 77]);
        }
    }

    #[test]
    fn test_grayscale_rounds_halves_up() {
        // 0.299*14 + 0.587*2 + 0.114*10 = 6.5
        let mut px = [14, 2, 10, 255];
        gray_pixel(&mut px);
        assert_eq!(px, [7, 7, 7, 255]);

        // 0.299*100 + 0.587*50 + 0.114*25 = 62.1
        let mut px = [100, 50, 25, 0];
        gray_pixel(&mut px);
        assert_eq!(px, [62, 62, 62, 0]);

        let mut px = [255, 255, 255, 9];
        gray_pixel(&mut px);
        assert_eq!(px, [255, 255, 255, 9]);
    }

    #[test]
    fn test_grayscale_parallel_matches_sequential() {
        let mut large = RgbaImage::from_fn(600, 600, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 17, 255]));
        grayscale_in_place(&mut large);

        for (x, y, px) in large.enumerate_pixels() {
            let mut expected = [(x % 256) as u8, (y % 256) as u8, 17, 255];
            gray_pixel(&mut expected);
            assert_eq!(px.0, expected, "pixel ({}, {})", x, y);
        }
    }

    #[test]
    fn test_grayscale_payload() {
        let options = PreprocessOptions {
            grayscale: true,
            ..Default::default()
        };
        let payload = preprocess(&png_bytes(16, 16), None, &options);
        assert!(payload.grayscale);

        let decoded = decode_payload(&payload).to_rgb8();
        let px = decoded.get_pixel(8, 8);
        assert!(px[0].abs_diff(px[1]) <= 4 && px[1].abs_diff(px[2]) <= 4, "not gray: {:?}", px);
    }

    #[test]
    fn test_undecodable_bytes_pass_through() {
        let bytes = b"definitely not an image";
        let payload = preprocess(bytes, Some("image/png"), &PreprocessOptions::default());

        assert!(payload.is_passthrough());
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&payload.encoded_data).unwrap(), bytes);
    }

    #[test]
    fn test_split_data_url() {
        assert_eq!(split_data_url("data:image/png;base64,AAAA"), (Some("image/png"), "AAAA"));
        assert_eq!(split_data_url("AAAA"), (None, "AAAA"));
        assert_eq!(split_data_url("data:;base64,AAAA"), (None, "AAAA"));
    }

    #[test]
    fn test_preprocess_data_url() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(2000, 1000)));
        let payload = preprocess_data_url(&url, &PreprocessOptions::default());
        assert_eq!((payload.width, payload.height), (1000, 500));
        assert!(payload.data_url().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_invalid_base64_kept_verbatim() {
        let payload = preprocess_data_url("data:image/png;base64,@@@", &PreprocessOptions::default());
        assert!(payload.is_passthrough());
        assert_eq!(payload.encoded_data, "@@@");
        assert_eq!(payload.mime_type, "image/png");
    }
}
