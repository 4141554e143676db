//! Outlined text drawing.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, warn};

/// Color used for shadows and strokes.
pub const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Bold and regular faces. Either may be missing.
#[derive(Clone, Default)]
pub struct FontSet {
    bold: Option<FontArc>,
    regular: Option<FontArc>,
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("bold", &self.bold.is_some())
            .field("regular", &self.regular.is_some())
            .finish()
    }
}

fn load_font(path: &Path) -> Option<FontArc> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %path.display(), "Failed to read font: {}", e);
            return None;
        }
    };
    match FontArc::try_from_vec(data) {
        Ok(font) => {
            debug!(path = %path.display(), "Loaded font");
            Some(font)
        }
        Err(e) => {
            warn!(path = %path.display(), "Invalid font file: {}", e);
            None
        }
    }
}

impl FontSet {
    /// Load fonts from disk. Unreadable files are logged and left empty.
    pub fn load(bold_path: impl AsRef<Path>, regular_path: impl AsRef<Path>) -> Self {
        let fonts = Self {
            bold: load_font(bold_path.as_ref()),
            regular: load_font(regular_path.as_ref()),
        };
        if fonts.is_empty() {
            warn!("No fonts available, poster text will be skipped");
        }
        fonts
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bold.is_none() && self.regular.is_none()
    }

    /// The requested weight, or whichever face is available.
    pub fn pick(&self, bold: bool) -> Option<&FontArc> {
        let (preferred, other) = if bold {
            (&self.bold, &self.regular)
        } else {
            (&self.regular, &self.bold)
        };
        preferred.as_ref().or(other.as_ref())
    }
}

/// Dark outline drawn under the fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outline {
    None,
    /// Copies at `(-offset, -offset)` and `(offset, offset)`.
    Shadow { offset: i32 },
    /// Copies at the eight neighbours `width` pixels away.
    Stroke { width: i32 },
}

impl Outline {
    fn offsets(&self) -> Vec<(i32, i32)> {
        match *self {
            Outline::None => Vec::new(),
            Outline::Shadow { offset } => vec![(-offset, -offset), (offset, offset)],
            Outline::Stroke { width } => {
                let mut offsets = Vec::with_capacity(8);
                for dx in [-width, 0, width] {
                    for dy in [-width, 0, width] {
                        if dx != 0 || dy != 0 {
                            offsets.push((dx, dy));
                        }
                    }
                }
                offsets
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub fill: Rgba<u8>,
    pub outline: Outline,
    pub bold: bool,
}

impl TextStyle {
    pub fn scale(&self) -> PxScale {
        PxScale::from(self.size)
    }
}

/// Draw `text` with its top-left corner at `(x, y)`.
pub fn draw_styled(canvas: &mut RgbaImage, font: &FontArc, style: &TextStyle, x: i32, y: i32, text: &str) {
    let scale = style.scale();
    for (dx, dy) in style.outline.offsets() {
        draw_text_mut(canvas, OUTLINE_COLOR, x + dx, y + dy, scale, font, text);
    }
    draw_text_mut(canvas, style.fill, x, y, scale, font, text);
}

/// Draw `text` horizontally centered with its top edge at `y`.
pub fn draw_centered(canvas: &mut RgbaImage, font: &FontArc, style: &TextStyle, y: i32, text: &str) {
    let (text_width, _) = text_size(style.scale(), font, text);
    let x = (canvas.width() as i32 - text_width as i32) / 2;
    draw_styled(canvas, font, style, x, y, text);
}

/// Greedy word wrap to at most `width_chars` characters per line.
///
/// Words longer than a line are split.
pub fn wrap_text(text: &str, width_chars: usize) -> Vec<String> {
    let width = width_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        if word.is_empty() {
            continue;
        }

        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

    #[test]
    fn test_wrap_respects_width() {
        let text = "Tonight the fate of the galaxy rests in the hands of one very confused accountant";
        let lines = wrap_text(text, 40);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let lines = wrap_text("a supercalifragilistic b", 5);
        assert_eq!(lines, vec!["a", "super", "calif", "ragil", "istic", "b"]);
    }

    #[test]
    fn test_wrap_empty() {
        assert!(wrap_text("   ", 40).is_empty());
        assert!(wrap_text("", 40).is_empty());
    }

    #[test]
    fn test_outline_offsets() {
        assert_eq!(Outline::Shadow { offset: 3 }.offsets(), vec![(-3, -3), (3, 3)]);
        let stroke = Outline::Stroke { width: 2 }.offsets();
        assert_eq!(stroke.len(), 8);
        assert!(!stroke.contains(&(0, 0)));
        assert!(Outline::None.offsets().is_empty());
    }

    #[test]
    fn test_missing_fonts_load_empty() {
        let fonts = FontSet::load("/nonexistent/bold.ttf", "/nonexistent/regular.ttf");
        assert!(fonts.is_empty());
        assert!(fonts.pick(true).is_none());
    }

    #[test]
    fn test_draws_when_system_font_present() {
        let fonts = FontSet::load(SYSTEM_FONT, SYSTEM_FONT);
        let Some(font) = fonts.pick(true) else {
            return;
        };

        let mut canvas = RgbaImage::from_pixel(200, 80, Rgba([0, 0, 255, 255]));
        let style = TextStyle {
            size: 40.0,
            fill: Rgba([255, 255, 255, 255]),
            outline: Outline::Shadow { offset: 3 },
            bold: true,
        };
        draw_centered(&mut canvas, font, &style, 10, "HELLO");

        assert!(canvas.pixels().any(|p| p[0] > 200 && p[1] > 200));
    }
}
