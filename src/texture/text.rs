//! Text label rasterization.

use bevy::color::ColorToPacked;
use bevy::log::warn;
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use thiserror::Error;

use super::raster::Raster;
use super::TextureError;
use crate::design::{TextLabelSpec, parse_color};

/// Largest canvas edge a label may produce.
pub const MAX_TEXT_CANVAS: u32 = 4096;

/// Canvas width per point of font size.
const CANVAS_WIDTH_PER_POINT: f32 = 8.0;

/// Canvas height per point of font size.
const CANVAS_HEIGHT_PER_POINT: f32 = 2.0;

/// Error returned by [`FontLibrary::load_font`].
#[derive(Error, Debug, Clone)]
#[error("Failed to load font '{family}': {reason}")]
pub struct FontLoadError {
    pub family: String,
    pub reason: String,
}

/// Tight single-channel coverage of a laid-out string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphCoverage {
    pub width: u32,
    pub height: u32,
    /// Row-major, `width * height` entries.
    pub alpha: Vec<u8>,
}

/// Turns a string into glyph coverage.
pub trait TextShaper: Send + Sync {
    /// Lay out `text` in `family` at `px` pixels per em.
    ///
    /// Returns `None` when no font can render it.
    fn shape(&self, family: &str, text: &str, px: f32) -> Option<GlyphCoverage>;
}

/// Fonts available to text labels, keyed by family name.
///
/// The first loaded font serves as the fallback for unknown families.
#[derive(Default)]
pub struct FontLibrary {
    fonts: Vec<(String, fontdue::Font)>,
}

impl FontLibrary {
    /// Family name of the font bundled with Bevy.
    pub const DEFAULT_FAMILY: &'static str = "default";

    pub fn new() -> Self {
        Self::default()
    }

    /// A library holding Bevy's bundled font, which serves as the fallback.
    pub fn with_default_font() -> Self {
        let mut library = Self::new();
        if let Err(e) = library.load_font(Self::DEFAULT_FAMILY, bevy::text::DEFAULT_FONT_DATA) {
            warn!("{e}");
        }
        library
    }

    /// Parse a TrueType or OpenType font and register it under `family`.
    pub fn load_font(&mut self, family: &str, bytes: &[u8]) -> Result<(), FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()).map_err(
            |reason| FontLoadError {
                family: family.to_string(),
                reason: reason.to_string(),
            },
        )?;
        let key = family.to_ascii_lowercase();
        self.fonts.retain(|(name, _)| *name != key);
        self.fonts.push((key, font));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.fonts.iter().map(|(name, _)| name.as_str())
    }

    fn resolve(&self, family: &str) -> Option<&fontdue::Font> {
        let key = family.to_ascii_lowercase();
        self.fonts
            .iter()
            .find(|(name, _)| *name == key)
            .or_else(|| self.fonts.first())
            .map(|(_, font)| font)
    }
}

impl TextShaper for FontLibrary {
    fn shape(&self, family: &str, text: &str, px: f32) -> Option<GlyphCoverage> {
        let font = self.resolve(family)?;

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings::default());
        layout.append(&[font], &TextStyle::new(text, px, 0));

        let glyphs: Vec<_> = layout
            .glyphs()
            .iter()
            .filter(|g| g.width > 0 && g.height > 0)
            .collect();
        if glyphs.is_empty() {
            return None;
        }

        let min_x = glyphs.iter().map(|g| g.x.floor() as i32).min()?;
        let min_y = glyphs.iter().map(|g| g.y.floor() as i32).min()?;
        let max_x = glyphs
            .iter()
            .map(|g| g.x.floor() as i32 + g.width as i32)
            .max()?;
        let max_y = glyphs
            .iter()
            .map(|g| g.y.floor() as i32 + g.height as i32)
            .max()?;

        let width = (max_x - min_x) as u32;
        let height = (max_y - min_y) as u32;
        let mut alpha = vec![0u8; width as usize * height as usize];

        for glyph in glyphs {
            let (metrics, bitmap) = font.rasterize_config(glyph.key);
            let ox = (glyph.x.floor() as i32 - min_x) as usize;
            let oy = (glyph.y.floor() as i32 - min_y) as usize;
            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let x = ox + col;
                    let y = oy + row;
                    if x >= width as usize || y >= height as usize {
                        continue;
                    }
                    let dst = &mut alpha[y * width as usize + x];
                    *dst = (*dst).max(bitmap[row * metrics.width + col]);
                }
            }
        }

        Some(GlyphCoverage {
            width,
            height,
            alpha,
        })
    }
}

/// Canvas size for a label at `point_size`.
pub fn text_canvas_size(point_size: f32) -> (u32, u32) {
    let side = |per_point: f32| ((point_size * per_point).ceil() as u32).clamp(1, MAX_TEXT_CANVAS);
    (side(CANVAS_WIDTH_PER_POINT), side(CANVAS_HEIGHT_PER_POINT))
}

/// Render `spec` centred on a transparent canvas.
pub fn rasterize_text(shaper: &dyn TextShaper, spec: &TextLabelSpec) -> Result<Raster, TextureError> {
    if spec.content.trim().is_empty() {
        return Err(TextureError::EmptyText);
    }
    if !spec.point_size.is_finite() || spec.point_size <= 0.0 {
        return Err(TextureError::InvalidPointSize {
            size: spec.point_size,
        });
    }
    let color = parse_color(&spec.color)?.to_u8_array();
    let coverage = shaper
        .shape(&spec.font_family, &spec.content, spec.point_size)
        .ok_or_else(|| TextureError::FontUnavailable {
            family: spec.font_family.clone(),
        })?;

    let (width, height) = text_canvas_size(spec.point_size);
    let mut raster = Raster::new(width, height)?;

    let left = (width as i64 - coverage.width as i64) / 2;
    let top = (height as i64 - coverage.height as i64) / 2;
    for cy in 0..coverage.height {
        let y = top + cy as i64;
        if y < 0 || y >= height as i64 {
            continue;
        }
        for cx in 0..coverage.width {
            let x = left + cx as i64;
            if x < 0 || x >= width as i64 {
                continue;
            }
            let a = coverage.alpha[(cy * coverage.width + cx) as usize];
            if a == 0 {
                continue;
            }
            let alpha = (u16::from(a) * u16::from(color[3]) / 255) as u8;
            raster.set_pixel(x as u32, y as u32, [color[0], color[1], color[2], alpha]);
        }
    }

    Ok(raster)
}
