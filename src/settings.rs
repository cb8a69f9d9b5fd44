//! Engine configuration.

use bevy::prelude::*;

/// Tunables shared by every engine component.
///
/// # Example
/// ```ignore
/// use bevy_garment::prelude::*;
///
/// let settings = GarmentSettings::default()
///     .with_color_half_life(0.05)
///     .with_primary_surface("body");
/// ```
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct GarmentSettings {
    /// Seconds for an eased color to cover half the remaining distance.
    ///
    /// Default: 0.08
    pub color_half_life: f32,

    /// Edge length of generated gradient rasters, in pixels.
    ///
    /// Default: 512
    pub gradient_resolution: u32,

    /// Number of generated rasters kept by the texture cache.
    ///
    /// Default: 64
    pub texture_cache_capacity: usize,

    /// Pattern texels darker than this are tinted.
    ///
    /// Default: 0.5
    pub darkness_threshold: f32,

    /// Pattern texels with alpha at or below this are never tinted.
    ///
    /// Default: 0.1
    pub alpha_epsilon: f32,

    /// Substituted for a non-positive or non-finite pattern scale.
    pub default_pattern_scale: f32,

    /// Substituted for an out-of-range pattern opacity.
    pub default_pattern_opacity: f32,

    /// Surface receiving global decals. `None` picks the first scanned surface.
    pub primary_surface: Option<String>,

    /// Depth fade factor of spawned decal materials.
    pub decal_depth_fade: f32,
}

impl Default for GarmentSettings {
    fn default() -> Self {
        Self {
            color_half_life: 0.08,
            gradient_resolution: 512,
            texture_cache_capacity: 64,
            darkness_threshold: 0.5,
            alpha_epsilon: 0.1,
            default_pattern_scale: 1.0,
            default_pattern_opacity: 0.8,
            primary_surface: None,
            decal_depth_fade: 0.5,
        }
    }
}

impl GarmentSettings {
    pub fn with_color_half_life(mut self, seconds: f32) -> Self {
        self.color_half_life = seconds;
        self
    }

    pub fn with_gradient_resolution(mut self, pixels: u32) -> Self {
        self.gradient_resolution = pixels;
        self
    }

    pub fn with_texture_cache_capacity(mut self, capacity: usize) -> Self {
        self.texture_cache_capacity = capacity;
        self
    }

    pub fn with_mask(mut self, darkness_threshold: f32, alpha_epsilon: f32) -> Self {
        self.darkness_threshold = darkness_threshold;
        self.alpha_epsilon = alpha_epsilon;
        self
    }

    pub fn with_primary_surface(mut self, name: impl Into<String>) -> Self {
        self.primary_surface = Some(name.into());
        self
    }

    pub fn with_decal_depth_fade(mut self, factor: f32) -> Self {
        self.decal_depth_fade = factor;
        self
    }
}
