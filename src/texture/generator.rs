//! Declarative texture specs and the cached generator.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bevy::color::ColorToPacked;
use bevy::prelude::*;
use thiserror::Error;

use super::cache::TextureCache;
use super::gradient::rasterize_gradient;
use super::raster::{Raster, RasterError};
use super::text::{FontLibrary, TextShaper, rasterize_text};
use crate::design::{ColorParseError, GradientSpec, TextLabelSpec, parse_color};

/// Errors that can occur when synthesizing a texture.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextureError {
    #[error("Invalid color: {0}")]
    InvalidColor(#[from] ColorParseError),

    #[error("Texture size must be non-zero, got {size}")]
    InvalidSize { size: u32 },

    #[error("Gradient angle must be finite, got {angle}")]
    InvalidAngle { angle: f32 },

    #[error("Text label has no content")]
    EmptyText,

    #[error("Text point size must be positive, got {size}")]
    InvalidPointSize { size: f32 },

    #[error("No font available for family '{family}'")]
    FontUnavailable { family: String },

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// What to synthesize.
#[derive(Clone, Debug, PartialEq, Hash)]
pub enum TextureSpec {
    Solid { color: String, size: u32 },
    Gradient { gradient: GradientSpec, size: u32 },
    Text(TextLabelSpec),
}

impl TextureSpec {
    /// Stable cache key for this spec.
    pub fn cache_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Synthesizes rasters from [`TextureSpec`]s, caching by spec hash.
pub struct TextureGenerator {
    cache: TextureCache,
    shaper: Box<dyn TextShaper>,
}

impl Default for TextureGenerator {
    fn default() -> Self {
        Self::new(64)
    }
}

impl std::fmt::Debug for TextureGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureGenerator")
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl TextureGenerator {
    /// A generator shaping text with Bevy's bundled font.
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: TextureCache::new(cache_capacity),
            shaper: Box::new(FontLibrary::with_default_font()),
        }
    }

    pub fn with_shaper(mut self, shaper: impl TextShaper + 'static) -> Self {
        self.set_shaper(shaper);
        self
    }

    /// Replace the text shaper. Cached rasters are dropped.
    pub fn set_shaper(&mut self, shaper: impl TextShaper + 'static) {
        self.shaper = Box::new(shaper);
        self.cache.clear();
    }

    /// Synthesize `spec`, or return the cached raster for an identical spec.
    ///
    /// Invalid specs are logged and yield `None`.
    pub fn generate(&mut self, spec: &TextureSpec) -> Option<Arc<Raster>> {
        let key = spec.cache_key();
        if let Some(raster) = self.cache.get(key) {
            return Some(raster);
        }

        match self.rasterize(spec) {
            Ok(raster) => {
                let raster = Arc::new(raster);
                self.cache.insert(key, raster.clone());
                Some(raster)
            }
            Err(e) => {
                warn!("Skipping texture synthesis: {e}");
                None
            }
        }
    }

    /// Synthesize `spec` without touching the cache.
    pub fn rasterize(&self, spec: &TextureSpec) -> Result<Raster, TextureError> {
        match spec {
            TextureSpec::Solid { color, size } => {
                if *size == 0 {
                    return Err(TextureError::InvalidSize { size: 0 });
                }
                let pixel = parse_color(color)?.to_u8_array();
                Ok(Raster::filled(*size, *size, pixel)?)
            }
            TextureSpec::Gradient { gradient, size } => rasterize_gradient(gradient, *size),
            TextureSpec::Text(label) => rasterize_text(self.shaper.as_ref(), label),
        }
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::text::tests::BlockShaper;

    #[test]
    fn test_solid_fill() {
        let generator = TextureGenerator::new(4);
        let raster = generator
            .rasterize(&TextureSpec::Solid {
                color: "#ff0000".to_string(),
                size: 4,
            })
            .unwrap();
        assert!(raster.pixels().iter().all(|p| *p == [255, 0, 0, 255]));
    }

    #[test]
    fn test_generate_caches_identical_specs() {
        let mut generator = TextureGenerator::new(4);
        let spec = TextureSpec::Gradient {
            gradient: GradientSpec::linear("#3498db", "#e74c3c", 45.0),
            size: 16,
        };

        let a = generator.generate(&spec).unwrap();
        let b = generator.generate(&spec).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(generator.cached_count(), 1);
    }

    #[test]
    fn test_generate_is_deterministic_without_cache() {
        let mut generator = TextureGenerator::new(0);
        let spec = TextureSpec::Gradient {
            gradient: GradientSpec::radial("#ffffff", "#222222"),
            size: 16,
        };

        let a = generator.generate(&spec).unwrap();
        let b = generator.generate(&spec).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_invalid_spec_returns_none() {
        let mut generator = TextureGenerator::new(4);
        let spec = TextureSpec::Solid {
            color: "#nothex".to_string(),
            size: 4,
        };
        assert!(generator.generate(&spec).is_none());
        assert_eq!(generator.cached_count(), 0);
    }

    #[test]
    fn test_text_uses_shaper() {
        let mut generator = TextureGenerator::new(4).with_shaper(BlockShaper);
        let spec = TextureSpec::Text(TextLabelSpec::new("HELLO").with_color("white"));
        let raster = generator.generate(&spec).unwrap();
        assert!(raster.pixels().iter().any(|p| p[3] == 255));
    }

    #[test]
    fn test_default_generator_renders_text() {
        let mut generator = TextureGenerator::new(4);
        let spec = TextureSpec::Text(TextLabelSpec::new("HELLO").with_color("white"));
        let raster = generator.generate(&spec).unwrap();
        assert!(raster.pixels().iter().any(|p| p[3] > 0));
    }

    #[test]
    fn test_cache_key_distinguishes_kinds() {
        let solid = TextureSpec::Solid {
            color: "#000000".to_string(),
            size: 8,
        };
        let text = TextureSpec::Text(TextLabelSpec::new("#000000"));
        assert_ne!(solid.cache_key(), text.cache_key());
    }
}
