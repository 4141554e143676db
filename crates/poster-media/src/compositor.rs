//! Poster finishing: scrim and text overlays on the edited image.

use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, warn};

use crate::error::MediaResult;
use crate::image_io::{decode_oriented, encode_png};
use crate::text::{draw_centered, draw_styled, wrap_text, FontSet, Outline, TextStyle};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GOLD: Rgba<u8> = Rgba([255, 215, 0, 255]);
const SILVER: Rgba<u8> = Rgba([204, 204, 204, 255]);

/// Positions, sizes and colors of the poster overlays.
///
/// Offsets suffixed `_from_bottom` are measured up from the bottom edge.
#[derive(Debug, Clone)]
pub struct PosterLayout {
    /// Fraction of the height where the scrim begins.
    pub scrim_start: f32,
    pub scrim_level: u8,
    pub scrim_blur_sigma: f32,

    pub name_y: i32,
    pub name: TextStyle,
    pub tagline_y: i32,
    pub tagline: TextStyle,
    pub title_from_bottom: i32,
    pub title: TextStyle,
    pub credits_from_bottom: i32,
    pub credits: TextStyle,

    pub cover_x: i32,
    pub cover_from_bottom: i32,
    pub cover_wrap_chars: usize,
    pub cover_line_height: i32,
    pub cover: TextStyle,
}

impl Default for PosterLayout {
    fn default() -> Self {
        let shadow = Outline::Shadow { offset: 3 };
        Self {
            scrim_start: 0.65,
            scrim_level: 230,
            scrim_blur_sigma: 60.0,

            name_y: 60,
            name: TextStyle {
                size: 70.0,
                fill: WHITE,
                outline: shadow,
                bold: true,
            },
            tagline_y: 150,
            tagline: TextStyle {
                size: 36.0,
                fill: WHITE,
                outline: shadow,
                bold: false,
            },
            title_from_bottom: 200,
            title: TextStyle {
                size: 100.0,
                fill: GOLD,
                outline: shadow,
                bold: true,
            },
            credits_from_bottom: 100,
            credits: TextStyle {
                size: 20.0,
                fill: SILVER,
                outline: shadow,
                bold: false,
            },

            cover_x: 40,
            cover_from_bottom: 420,
            cover_wrap_chars: 40,
            cover_line_height: 30,
            cover: TextStyle {
                size: 24.0,
                fill: WHITE,
                outline: Outline::Stroke { width: 2 },
                bold: false,
            },
        }
    }
}

/// Text drawn on a poster. Empty fields are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosterText {
    pub name: String,
    pub tagline: String,
    pub title: String,
    pub cover_text: String,
    /// Pre-rendered billing line.
    pub credits: String,
}

/// Applies the scrim and text overlays.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    fonts: FontSet,
    layout: PosterLayout,
}

impl Compositor {
    pub fn new(fonts: FontSet, layout: PosterLayout) -> Self {
        Self { fonts, layout }
    }

    /// Finish an edited image and return PNG bytes.
    pub fn compose(&self, edited: &[u8], text: &PosterText) -> MediaResult<Vec<u8>> {
        let mut canvas = decode_oriented(edited)?.to_rgba8();

        self.apply_scrim(&mut canvas);
        self.draw_text(&mut canvas, text);

        encode_png(&DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()))
    }

    /// Darken the lower part of the image with a blurred black layer.
    pub fn apply_scrim(&self, canvas: &mut RgbaImage) {
        let (width, height) = canvas.dimensions();
        let start = (height as f32 * self.layout.scrim_start) as u32;
        let level = self.layout.scrim_level;

        let gradient = GrayImage::from_fn(width, height, |_, y| {
            if y >= start {
                Luma([level])
            } else {
                Luma([0])
            }
        });
        let gradient = if self.layout.scrim_blur_sigma > 0.0 {
            gaussian_blur_f32(&gradient, self.layout.scrim_blur_sigma)
        } else {
            gradient
        };

        for (pixel, alpha) in canvas.pixels_mut().zip(gradient.pixels()) {
            let keep = 1.0 - alpha[0] as f32 / 255.0;
            for channel in pixel.0.iter_mut().take(3) {
                *channel = (*channel as f32 * keep).round() as u8;
            }
        }
    }

    fn draw_text(&self, canvas: &mut RgbaImage, text: &PosterText) {
        if self.fonts.is_empty() {
            warn!("Skipping poster text, no fonts loaded");
            return;
        }

        let layout = &self.layout;
        let height = canvas.height() as i32;

        let centered = [
            (text.name.to_uppercase(), &layout.name, layout.name_y),
            (text.tagline.clone(), &layout.tagline, layout.tagline_y),
            (text.title.to_uppercase(), &layout.title, height - layout.title_from_bottom),
            (text.credits.clone(), &layout.credits, height - layout.credits_from_bottom),
        ];
        for (content, style, y) in centered {
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            if let Some(font) = self.fonts.pick(style.bold) {
                draw_centered(canvas, font, style, y, content);
            }
        }

        let cover = text.cover_text.trim();
        if !cover.is_empty() {
            if let Some(font) = self.fonts.pick(layout.cover.bold) {
                let lines = wrap_text(cover, layout.cover_wrap_chars);
                debug!(lines = lines.len(), "Drawing cover text");
                let top = height - layout.cover_from_bottom;
                for (i, line) in lines.iter().enumerate() {
                    let y = top + i as i32 * layout.cover_line_height;
                    draw_styled(canvas, font, &layout.cover, layout.cover_x, y, line);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn white_poster(width: u32, height: u32) -> Vec<u8> {
        encode_png(&DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([255, 255, 255]),
        )))
        .unwrap()
    }

    fn sample_text() -> PosterText {
        PosterText {
            name: "Jane Doe".to_string(),
            tagline: "This summer, nobody is safe".to_string(),
            title: "The Matrix".to_string(),
            cover_text: "A hacker learns the truth about reality and decides it needs more jokes".to_string(),
            credits: "DIRECTED BY AL DENTE   PRODUCED BY HAZEL NUTT".to_string(),
        }
    }

    #[test]
    fn test_scrim_darkens_bottom_only() {
        let compositor = Compositor::new(FontSet::empty(), PosterLayout::default());
        let out = compositor.compose(&white_poster(120, 200), &PosterText::default()).unwrap();
        let image = image::load_from_memory(&out).unwrap();

        assert_eq!(image.dimensions(), (120, 200));
        let top = image.get_pixel(60, 0)[0];
        let bottom = image.get_pixel(60, 199)[0];
        assert!(top > 200, "top was {}", top);
        assert!(bottom < top - 50, "bottom {} top {}", bottom, top);
    }

    #[test]
    fn test_missing_fonts_still_composes() {
        let compositor = Compositor::new(FontSet::empty(), PosterLayout::default());
        let out = compositor.compose(&white_poster(64, 64), &sample_text()).unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn test_rejects_undecodable_input() {
        let compositor = Compositor::default();
        assert!(compositor.compose(b"garbage", &sample_text()).is_err());
    }

    #[test]
    fn test_text_drawn_with_system_font() {
        let path = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";
        let fonts = FontSet::load(path, path);
        if fonts.is_empty() {
            return;
        }

        let plain = Compositor::new(FontSet::empty(), PosterLayout::default())
            .compose(&white_poster(600, 800), &PosterText::default())
            .unwrap();
        let titled = Compositor::new(fonts, PosterLayout::default())
            .compose(&white_poster(600, 800), &sample_text())
            .unwrap();

        let plain = image::load_from_memory(&plain).unwrap().to_rgb8();
        let titled = image::load_from_memory(&titled).unwrap().to_rgb8();
        assert_ne!(plain, titled);

        // Gold title band.
        let gold = titled
            .enumerate_pixels()
            .filter(|(_, y, _)| (600..700).contains(y))
            .any(|(_, _, p)| p[0] > 200 && p[1] > 150 && p[2] < 80);
        assert!(gold);
    }

    #[test]
    fn test_credits_drawn_with_outline() {
        let path = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";
        let fonts = FontSet::load(path, path);
        if fonts.is_empty() {
            return;
        }

        let layout = PosterLayout {
            scrim_level: 0,
            ..PosterLayout::default()
        };
        let text = PosterText {
            credits: "DIRECTED BY AL DENTE   PRODUCED BY HAZEL NUTT".to_string(),
            ..PosterText::default()
        };
        let out = Compositor::new(fonts, layout)
            .compose(&white_poster(600, 800), &text)
            .unwrap();
        let image = image::load_from_memory(&out).unwrap().to_rgb8();

        // Credits sit 100px above the bottom edge; shadow copies reach 3px past the fill.
        let band: Vec<[u8; 3]> = image
            .enumerate_pixels()
            .filter(|(_, y, _)| (690..740).contains(y))
            .map(|(_, _, p)| p.0)
            .collect();
        assert!(band.iter().any(|p| *p == [204, 204, 204]), "no silver fill");
        assert!(band.iter().any(|p| p.iter().all(|&c| c < 40)), "no dark outline");
    }
}
