//! Soft inpainting mask synthesis.
//!
//! Masks are produced by an ordered list of tiers; the first tier that
//! produces a mask wins:
//!
//! 1. **Alpha**: thresholded template transparency, lightly feathered
//! 2. **Face**: ellipse around the template's primary face, heavily blurred
//! 3. **Fallback**: static ellipse in the upper center of the poster
//!
//! The fallback tier cannot fail, so synthesis always yields a mask with
//! the same dimensions as the template.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_filled_ellipse_mut;
use imageproc::filter::gaussian_blur_f32;
use metrics::counter;
use poster_models::{FaceRegion, MaskStrategy, MaskTier};
use tracing::{debug, info, warn};

use crate::error::MediaResult;
use crate::face_locator::{FaceLocator, FaceSelection};
use crate::image_io::{encode_png, PreparedTemplate};

const MASK_ON: Luma<u8> = Luma([255]);

/// Geometry and blur parameters for each tier.
#[derive(Debug, Clone)]
pub struct MaskConfig {
    /// Pixels with alpha below this value are masked.
    pub alpha_threshold: u8,
    pub alpha_feather_sigma: f32,
    pub face_blur_sigma: f32,
    pub fallback_blur_sigma: f32,
    /// Horizontal padding on each side, as a fraction of face width.
    pub face_pad_side: f64,
    /// Padding above the face, as a fraction of face height.
    pub face_pad_top: f64,
    /// Padding below the face, as a fraction of face height.
    pub face_pad_bottom: f64,
    /// Fallback ellipse bounds as fractions of `(w, h)`: left, top, right, bottom.
    pub fallback_box: [f64; 4],
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: 250,
            alpha_feather_sigma: 2.0,
            face_blur_sigma: 30.0,
            fallback_blur_sigma: 40.0,
            face_pad_side: 0.4,
            face_pad_top: 0.8,
            face_pad_bottom: 0.5,
            fallback_box: [0.3, 0.15, 0.7, 0.6],
        }
    }
}

/// Result of a single tier attempt.
#[derive(Debug, Clone)]
pub enum TierOutcome {
    Produced(GrayImage),
    Skipped(String),
}

/// A mask and the tier that produced it.
#[derive(Debug, Clone)]
pub struct SynthesizedMask {
    pub image: GrayImage,
    pub tier: MaskTier,
}

impl SynthesizedMask {
    pub fn to_png(&self) -> MediaResult<Vec<u8>> {
        encode_png(&DynamicImage::ImageLuma8(self.image.clone()))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

// =============================================================================
// Mask Primitives
// =============================================================================

/// Hard mask from template transparency: 255 where alpha is below
/// `threshold`, 0 elsewhere.
pub fn threshold_alpha(template: &PreparedTemplate, threshold: u8) -> GrayImage {
    let rgba = template.rgba();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        if rgba.get_pixel(x, y)[3] < threshold {
            MASK_ON
        } else {
            Luma([0])
        }
    })
}

fn blur(mask: &GrayImage, sigma: f32) -> GrayImage {
    if sigma > 0.0 {
        gaussian_blur_f32(mask, sigma)
    } else {
        mask.clone()
    }
}

/// Filled ellipse inscribed in `(x1, y1)-(x2, y2)`; radii are at least one pixel.
fn ellipse_mask(width: u32, height: u32, x1: f64, y1: f64, x2: f64, y2: f64) -> GrayImage {
    let mut mask = GrayImage::new(width, height);

    let center = (((x1 + x2) / 2.0).round() as i32, ((y1 + y2) / 2.0).round() as i32);
    let rx = (((x2 - x1).abs() / 2.0).round() as i32).max(1);
    let ry = (((y2 - y1).abs() / 2.0).round() as i32).max(1);

    draw_filled_ellipse_mut(&mut mask, center, rx, ry, MASK_ON);
    mask
}

fn has_transparency(template: &PreparedTemplate, threshold: u8) -> bool {
    template.has_alpha() && template.rgba().pixels().any(|p| p[3] < threshold)
}

// =============================================================================
// Tiered Synthesis
// =============================================================================

/// Builds inpainting masks for templates.
#[derive(Clone, Default)]
pub struct MaskSynthesizer {
    config: MaskConfig,
    strategy: MaskStrategy,
    locator: FaceLocator,
}

impl MaskSynthesizer {
    pub fn new(config: MaskConfig, strategy: MaskStrategy, locator: FaceLocator) -> Self {
        Self {
            config,
            strategy,
            locator,
        }
    }

    /// Synthesize a mask for `template`.
    ///
    /// Face detection only runs when the strategy includes the face tier and
    /// the alpha tier has nothing to offer. Rendering runs on the blocking pool.
    pub async fn synthesize(&self, template: &PreparedTemplate) -> SynthesizedMask {
        let face = if self.strategy.uses_detection()
            && !has_transparency(template, self.config.alpha_threshold)
        {
            self.locator.locate(template.png()).await
        } else {
            FaceSelection::NoFace
        };

        let this = self.clone();
        let owned = template.clone();
        match tokio::task::spawn_blocking(move || this.render(&owned, face)).await {
            Ok(mask) => mask,
            Err(e) => {
                warn!("Mask rendering task failed: {}", e);
                self.render(template, face)
            }
        }
    }

    /// Run the tiers against an already-resolved face lookup.
    pub fn render(&self, template: &PreparedTemplate, face: FaceSelection) -> SynthesizedMask {
        let (width, height) = template.dimensions();

        for &tier in self.strategy.tiers() {
            let outcome = match tier {
                MaskTier::Alpha => self.alpha_tier(template),
                MaskTier::Face => self.face_tier(width, height, face),
                MaskTier::Fallback => TierOutcome::Produced(self.fallback_mask(width, height)),
            };

            match outcome {
                TierOutcome::Produced(image) => {
                    info!(tier = %tier, width, height, "Mask synthesized");
                    counter!("poster_mask_tier_total", "tier" => tier.as_str()).increment(1);
                    return SynthesizedMask { image, tier };
                }
                TierOutcome::Skipped(reason) => {
                    debug!(tier = %tier, "Mask tier skipped: {}", reason);
                }
            }
        }

        // Every strategy ends with the fallback tier; this only guards a
        // misconfigured tier list.
        counter!("poster_mask_tier_total", "tier" => MaskTier::Fallback.as_str()).increment(1);
        SynthesizedMask {
            image: self.fallback_mask(width, height),
            tier: MaskTier::Fallback,
        }
    }

    fn alpha_tier(&self, template: &PreparedTemplate) -> TierOutcome {
        if !template.has_alpha() {
            return TierOutcome::Skipped("template has no alpha channel".to_string());
        }
        if !has_transparency(template, self.config.alpha_threshold) {
            return TierOutcome::Skipped("template is fully opaque".to_string());
        }

        let hard = threshold_alpha(template, self.config.alpha_threshold);
        TierOutcome::Produced(blur(&hard, self.config.alpha_feather_sigma))
    }

    fn face_tier(&self, width: u32, height: u32, face: FaceSelection) -> TierOutcome {
        match face {
            FaceSelection::Found(region) => match self.face_mask(width, height, &region) {
                Some(mask) => TierOutcome::Produced(mask),
                None => TierOutcome::Skipped("face ellipse misses the template".to_string()),
            },
            FaceSelection::NoFace => TierOutcome::Skipped("no face on template".to_string()),
            FaceSelection::LowConfidence(_) => {
                TierOutcome::Skipped("template face below confidence threshold".to_string())
            }
        }
    }

    /// Blurred ellipse around `face`, or `None` when the face box is empty or
    /// the ellipse leaves no pixel on the template.
    fn face_mask(&self, width: u32, height: u32, face: &FaceRegion) -> Option<GrayImage> {
        if !(face.width > 0.0 && face.height > 0.0) {
            return None;
        }

        let c = &self.config;
        let (x1, y1) = (face.x - face.width * c.face_pad_side, face.y - face.height * c.face_pad_top);
        let (x2, y2) = (
            face.x2() + face.width * c.face_pad_side,
            face.y2() + face.height * c.face_pad_bottom,
        );
        if x2 <= 0.0 || y2 <= 0.0 || x1 >= width as f64 || y1 >= height as f64 {
            return None;
        }

        let mask = ellipse_mask(width, height, x1, y1, x2, y2);
        if mask.pixels().all(|p| p[0] == 0) {
            return None;
        }
        Some(blur(&mask, c.face_blur_sigma))
    }

    fn fallback_mask(&self, width: u32, height: u32) -> GrayImage {
        let [left, top, right, bottom] = self.config.fallback_box;
        let (w, h) = (width as f64, height as f64);
        let mask = ellipse_mask(width, height, w * left, h * top, w * right, h * bottom);
        blur(&mask, self.config.fallback_blur_sigma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::FaceDetector;
    use crate::error::{MediaError, MediaResult};
    use crate::image_io::prepare_template;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use poster_models::{ConfidencePolicy, DetectedFace};
    use std::sync::Arc;

    struct FixedDetector(Vec<DetectedFace>);

    #[async_trait]
    impl FaceDetector for FixedDetector {
        async fn detect(&self, _image: &[u8]) -> MediaResult<Vec<DetectedFace>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct UnreachableDetector;

    #[async_trait]
    impl FaceDetector for UnreachableDetector {
        async fn detect(&self, _image: &[u8]) -> MediaResult<Vec<DetectedFace>> {
            Err(MediaError::detection_failed("dns error"))
        }

        fn name(&self) -> &'static str {
            "unreachable"
        }
    }

    fn opaque_template(width: u32, height: u32) -> PreparedTemplate {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 90, 90])));
        prepare_template(&encode_png(&image).unwrap(), 1200).unwrap()
    }

    /// Opaque poster with a transparent window at `x0..x1`, `y0..y1`.
    fn windowed_template(width: u32, height: u32, window: (u32, u32, u32, u32)) -> PreparedTemplate {
        let (x0, y0, x1, y1) = window;
        let rgba = RgbaImage::from_fn(width, height, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                Rgba([0, 0, 0, 10])
            } else {
                Rgba([200, 10, 10, 255])
            }
        });
        prepare_template(&encode_png(&DynamicImage::ImageRgba8(rgba)).unwrap(), 1200).unwrap()
    }

    fn synthesizer(detector: Option<Arc<dyn FaceDetector>>, strategy: MaskStrategy) -> MaskSynthesizer {
        MaskSynthesizer::new(
            MaskConfig::default(),
            strategy,
            FaceLocator::new(detector, ConfidencePolicy::accept_all()),
        )
    }

    #[test]
    fn test_threshold_matches_alpha_exactly() {
        let rgba = RgbaImage::from_fn(4, 1, |x, _| Rgba([0, 0, 0, [0, 249, 250, 255][x as usize]]));
        let template =
            prepare_template(&encode_png(&DynamicImage::ImageRgba8(rgba)).unwrap(), 1200).unwrap();

        let hard = threshold_alpha(&template, 250);
        let values: Vec<u8> = hard.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![255, 255, 0, 0]);
    }

    #[tokio::test]
    async fn test_alpha_tier_wins_over_face() {
        let detector = FixedDetector(vec![DetectedFace::from_box(10.0, 10.0, 20.0, 20.0, 0.9)]);
        let synth = synthesizer(Some(Arc::new(detector)), MaskStrategy::FaceGeometry);
        let template = windowed_template(80, 120, (20, 20, 60, 60));

        let mask = synth.synthesize(&template).await;
        assert_eq!(mask.tier, MaskTier::Alpha);
        assert_eq!(mask.dimensions(), (80, 120));
        assert!(mask.image.get_pixel(40, 40)[0] > 200);
        assert!(mask.image.get_pixel(5, 110)[0] < 10);
    }

    #[tokio::test]
    async fn test_face_tier_centers_on_face() {
        let detector = FixedDetector(vec![DetectedFace::from_box(140.0, 60.0, 40.0, 50.0, 0.9)]);
        let synth = synthesizer(Some(Arc::new(detector)), MaskStrategy::FaceGeometry);

        let mask = synth.synthesize(&opaque_template(400, 400)).await;
        assert_eq!(mask.tier, MaskTier::Face);
        assert_eq!(mask.dimensions(), (400, 400));
        assert!(mask.image.get_pixel(160, 80)[0] > mask.image.get_pixel(380, 380)[0]);
    }

    #[tokio::test]
    async fn test_unreachable_detector_falls_back() {
        let synth = synthesizer(Some(Arc::new(UnreachableDetector)), MaskStrategy::FaceGeometry);

        let mask = synth.synthesize(&opaque_template(160, 200)).await;
        assert_eq!(mask.tier, MaskTier::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_without_detector_is_centered_and_nonempty() {
        let synth = synthesizer(None, MaskStrategy::FaceGeometry);

        let mask = synth.synthesize(&opaque_template(160, 200)).await;
        assert_eq!(mask.tier, MaskTier::Fallback);
        assert_eq!(mask.dimensions(), (160, 200));

        // Ellipse center sits at (0.5w, 0.375h).
        let center = mask.image.get_pixel(80, 75)[0];
        assert!(center > 0);
        assert!(center > mask.image.get_pixel(0, 199)[0]);
        assert!(center > mask.image.get_pixel(159, 0)[0]);
    }

    #[tokio::test]
    async fn test_alpha_strategy_skips_detection() {
        let detector = FixedDetector(vec![DetectedFace::from_box(10.0, 10.0, 20.0, 20.0, 0.9)]);
        let synth = synthesizer(Some(Arc::new(detector)), MaskStrategy::AlphaThreshold);

        let mask = synth.synthesize(&opaque_template(100, 100)).await;
        assert_eq!(mask.tier, MaskTier::Fallback);
    }

    #[test]
    fn test_low_confidence_face_demotes() {
        let synth = synthesizer(None, MaskStrategy::FaceGeometry);
        let face = FaceRegion::new(10.0, 10.0, 20.0, 20.0);

        let mask = synth.render(&opaque_template(64, 64), FaceSelection::LowConfidence(face));
        assert_eq!(mask.tier, MaskTier::Fallback);
    }

    #[test]
    fn test_face_outside_template_demotes() {
        let synth = synthesizer(None, MaskStrategy::FaceGeometry);
        let face = FaceRegion::new(-500.0, -500.0, 50.0, 50.0);

        let mask = synth.render(&opaque_template(200, 200), FaceSelection::Found(face));
        assert_eq!(mask.tier, MaskTier::Fallback);
        assert!(mask.image.pixels().any(|p| p[0] > 0));
    }

    #[test]
    fn test_zero_size_face_demotes() {
        let synth = synthesizer(None, MaskStrategy::FaceGeometry);
        let face = FaceRegion::new(10.0, 10.0, 0.0, 0.0);

        let mask = synth.render(&opaque_template(200, 200), FaceSelection::Found(face));
        assert_eq!(mask.tier, MaskTier::Fallback);
        assert!(mask.image.pixels().any(|p| p[0] > 0));
    }

    #[test]
    fn test_face_partly_on_template_is_kept() {
        let synth = synthesizer(None, MaskStrategy::FaceGeometry);
        let face = FaceRegion::new(-20.0, 150.0, 60.0, 60.0);

        let mask = synth.render(&opaque_template(200, 200), FaceSelection::Found(face));
        assert_eq!(mask.tier, MaskTier::Face);
        assert!(mask.image.get_pixel(5, 180)[0] > 0);
    }

    #[test]
    fn test_tiny_template_still_masked() {
        let synth = synthesizer(None, MaskStrategy::FaceGeometry);
        let mask = synth.render(&opaque_template(1, 1), FaceSelection::NoFace);
        assert_eq!(mask.dimensions(), (1, 1));
        assert_eq!(mask.tier, MaskTier::Fallback);
    }

    #[test]
    fn test_mask_png_is_grayscale() {
        let synth = synthesizer(None, MaskStrategy::FaceGeometry);
        let mask = synth.render(&opaque_template(32, 32), FaceSelection::NoFace);
        let decoded = image::load_from_memory(&mask.to_png().unwrap()).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
    }
}
