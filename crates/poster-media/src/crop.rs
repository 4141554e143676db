//! Subject crop computation.
//!
//! Expands a face box by a padding ratio and clamps the result to the
//! image, so the crop always stays in bounds and never collapses.

use image::DynamicImage;
use poster_models::FaceRegion;
use tracing::debug;

use crate::error::MediaResult;
use crate::image_io::{decode_oriented, encode_png};

/// Padding applied around the user's face, as a fraction of face size.
pub const SUBJECT_PADDING_RATIO: f64 = 0.5;

/// Integer crop rectangle, `left..right` by `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Clamp `lo..hi` into `0..=limit`, keeping at least one pixel.
fn clamp_span(lo: f64, hi: f64, limit: u32) -> (u32, u32) {
    let limit_f = limit as f64;
    // NaN casts to 0
    let mut start = lo.floor().clamp(0.0, limit_f) as u32;
    let mut end = hi.ceil().clamp(0.0, limit_f) as u32;

    if end <= start {
        if start >= limit {
            start = limit.saturating_sub(1);
        }
        end = (start + 1).min(limit);
    }
    (start, end)
}

/// Compute the padded crop box for a face.
///
/// `pad_x = width * ratio` and `pad_y = height * ratio` are added on every
/// side, then the box is clamped to the image. For any image of at least
/// 1x1 the result satisfies `left < right <= image_width` and
/// `top < bottom <= image_height`.
pub fn crop_box(face: &FaceRegion, image_width: u32, image_height: u32, padding_ratio: f64) -> CropBox {
    let ratio = padding_ratio.max(0.0);
    let pad_x = face.width.abs() * ratio;
    let pad_y = face.height.abs() * ratio;

    let (left, right) = clamp_span(face.x - pad_x, face.x2() + pad_x, image_width);
    let (top, bottom) = clamp_span(face.y - pad_y, face.y2() + pad_y, image_height);

    CropBox {
        left,
        top,
        right,
        bottom,
    }
}

/// The user's photo, oriented, cropped and re-encoded.
#[derive(Debug, Clone)]
pub struct SubjectImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode the user's photo and crop it around the face when one is known.
pub fn prepare_subject(
    photo: &[u8],
    face: Option<&FaceRegion>,
    padding_ratio: f64,
) -> MediaResult<SubjectImage> {
    let mut image = DynamicImage::ImageRgb8(decode_oriented(photo)?.to_rgb8());

    if let Some(face) = face {
        let crop = crop_box(face, image.width(), image.height(), padding_ratio);
        debug!(?crop, "Cropping subject around face");
        image = image.crop_imm(crop.left, crop.top, crop.width(), crop.height());
    }

    Ok(SubjectImage {
        png: encode_png(&image)?,
        width: image.width(),
        height: image.height(),
    })
}
