//! Image decode/encode helpers.

use std::io::Cursor;

use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageFormat, ImageReader, RgbaImage};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Templates larger than this on either side are downscaled before editing.
pub const MAX_TEMPLATE_DIMENSION: u32 = 1200;

/// Decode an image and apply its EXIF orientation.
pub fn decode_oriented(bytes: &[u8]) -> MediaResult<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::invalid_image(e.to_string()))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| MediaError::invalid_image(e.to_string()))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut image =
        DynamicImage::from_decoder(decoder).map_err(|e| MediaError::invalid_image(e.to_string()))?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Encode an image as PNG.
pub fn encode_png(image: &DynamicImage) -> MediaResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| MediaError::encode_failed(e.to_string()))?;
    Ok(buf.into_inner())
}

/// A decoded template ready for masking and editing.
#[derive(Debug, Clone)]
pub struct PreparedTemplate {
    rgba: RgbaImage,
    has_alpha: bool,
    png: Vec<u8>,
}

impl PreparedTemplate {
    /// Template pixels with the original transparency, if any.
    pub fn rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    /// Whether the source image carried an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Opaque RGB PNG sent to the editing service.
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgba.dimensions()
    }
}

/// Decode a template, upright it per EXIF, downscale it to fit
/// `max_dimension`, and re-encode an opaque PNG copy for the editor.
pub fn prepare_template(bytes: &[u8], max_dimension: u32) -> MediaResult<PreparedTemplate> {
    let mut image = decode_oriented(bytes).map_err(|e| match e {
        MediaError::InvalidImage(msg) => MediaError::invalid_image(format!("template: {}", msg)),
        other => other,
    })?;

    let (width, height) = image.dimensions();
    if width > max_dimension || height > max_dimension {
        image = image.resize(max_dimension, max_dimension, FilterType::Lanczos3);
        debug!(
            "Downscaled template from {}x{} to {}x{}",
            width,
            height,
            image.width(),
            image.height()
        );
    }

    let has_alpha = image.color().has_alpha();
    let png = encode_png(&DynamicImage::ImageRgb8(image.to_rgb8()))?;

    Ok(PreparedTemplate {
        rgba: image.to_rgba8(),
        has_alpha,
        png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    fn png_of(image: DynamicImage) -> Vec<u8> {
        encode_png(&image).unwrap()
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_oriented(b"definitely not an image").unwrap_err();
        assert!(matches!(err, MediaError::InvalidImage(_)));
    }

    #[test]
    fn test_decode_roundtrip_dimensions() {
        let bytes = png_of(DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 20, Rgb([1, 2, 3]))));
        let decoded = decode_oriented(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (30, 20));
    }

    /// JPEG carrying an EXIF orientation tag of `orientation`.
    fn jpeg_with_orientation(width: u32, height: u32, orientation: u8) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 60, 30])))
            .write_to(&mut buf, ImageFormat::Jpeg)
            .unwrap();
        let jpeg = buf.into_inner();

        let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(&[0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
        app1.extend_from_slice(&[0x00, 0x01]);
        app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, orientation, 0x00, 0x00]);
        app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&app1);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_template_follows_exif_orientation() {
        // Orientation 6: stored landscape, displayed rotated 90 degrees clockwise.
        let bytes = jpeg_with_orientation(40, 20, 6);
        assert_eq!(decode_oriented(&bytes).unwrap().dimensions(), (20, 40));

        let template = prepare_template(&bytes, MAX_TEMPLATE_DIMENSION).unwrap();
        assert_eq!(template.dimensions(), (20, 40));
    }

    #[test]
    fn test_template_rejects_garbage() {
        let err = prepare_template(b"nope", MAX_TEMPLATE_DIMENSION).unwrap_err();
        assert!(matches!(err, MediaError::InvalidImage(msg) if msg.starts_with("template:")));
    }

    #[test]
    fn test_large_template_downscaled() {
        let bytes = png_of(DynamicImage::ImageRgb8(RgbImage::new(2400, 600)));
        let template = prepare_template(&bytes, MAX_TEMPLATE_DIMENSION).unwrap();
        assert_eq!(template.dimensions(), (1200, 300));
        assert!(!template.has_alpha());
    }

    #[test]
    fn test_template_keeps_alpha_but_editor_copy_is_opaque() {
        let bytes = png_of(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            10,
            10,
            Rgba([0, 0, 0, 0]),
        )));
        let template = prepare_template(&bytes, MAX_TEMPLATE_DIMENSION).unwrap();
        assert!(template.has_alpha());
        assert_eq!(template.rgba().get_pixel(0, 0)[3], 0);

        let editor_copy = image::load_from_memory(template.png()).unwrap();
        assert!(!editor_copy.color().has_alpha());
    }
}
