//! CPU description of a composite shading program.

use std::sync::Arc;

use bevy::color::{Alpha, Mix};
use bevy::prelude::*;

use crate::design::{
    AppearanceMode, GradientSpec, PatternOverlaySpec, SurfaceSpec, TintMode, parse_color,
    parse_color_or,
};
use crate::settings::GarmentSettings;
use crate::texture::Raster;

/// The surface fields whose change needs a new fetch-and-build.
///
/// Everything else (opacity, tint color, scale, rotation, roughness,
/// metalness, base color) is refreshed by the frame loop on the live composite.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeKey {
    mode: AppearanceMode,
    gradient: Option<GradientSpec>,
    pattern: Option<String>,
    tint_mode: TintMode,
    tint_gradient: Option<GradientSpec>,
}

impl CompositeKey {
    pub fn from_spec(spec: &SurfaceSpec) -> Self {
        let overlay = &spec.pattern;
        Self {
            mode: spec.mode,
            gradient: (spec.mode == AppearanceMode::Gradient).then(|| spec.gradient.clone()),
            pattern: overlay.active_pattern().map(str::to_string),
            tint_mode: overlay.tint_mode,
            tint_gradient: (overlay.tint_mode == TintMode::Gradient)
                .then(|| overlay.tint_gradient.clone()),
        }
    }

    pub fn overlay_enabled(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }
}

/// Which pattern texels receive the tint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskSettings {
    pub darkness_threshold: f32,
    pub alpha_epsilon: f32,
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            darkness_threshold: 0.5,
            alpha_epsilon: 0.1,
        }
    }
}

impl MaskSettings {
    pub fn from_settings(settings: &GarmentSettings) -> Self {
        Self {
            darkness_threshold: settings.darkness_threshold,
            alpha_epsilon: settings.alpha_epsilon,
        }
    }

    /// `1 - mean(r, g, b)` of the sRGB-encoded texel.
    pub fn darkness(texel: Srgba) -> f32 {
        1.0 - (texel.red + texel.green + texel.blue) / 3.0
    }

    pub fn is_masked(&self, texel: Srgba) -> bool {
        Self::darkness(texel) > self.darkness_threshold && texel.alpha > self.alpha_epsilon
    }
}

/// Overlay parameters the frame loop refreshes without a rebuild.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayParams {
    pub tint: Srgba,
    pub opacity: f32,
    pub scale: f32,
    pub rotation_degrees: f32,
    pub roughness: f32,
    pub metalness: f32,
}

impl OverlayParams {
    /// Read `spec`, substituting defaults for malformed values.
    pub fn sanitized(spec: &PatternOverlaySpec, settings: &GarmentSettings) -> Self {
        Self::read(spec, settings, parse_color_or(&spec.tint_color, Srgba::BLACK))
    }

    /// [`Self::sanitized`] for the per-frame path, reporting a bad tint at debug level only.
    pub fn refreshed(spec: &PatternOverlaySpec, settings: &GarmentSettings) -> Self {
        let tint = parse_color(&spec.tint_color).unwrap_or_else(|e| {
            debug!("{e}");
            Srgba::BLACK
        });
        Self::read(spec, settings, tint)
    }

    fn read(spec: &PatternOverlaySpec, settings: &GarmentSettings, tint: Srgba) -> Self {
        let scale = if spec.scale.is_finite() && spec.scale > 0.0 {
            spec.scale
        } else {
            settings.default_pattern_scale
        };
        let opacity = if (0.0..=1.0).contains(&spec.opacity) {
            spec.opacity
        } else {
            settings.default_pattern_opacity
        };
        let rotation_degrees = if spec.rotation_degrees.is_finite() {
            spec.rotation_degrees
        } else {
            0.0
        };
        let unit = |value: f32, fallback: f32| {
            if value.is_nan() {
                fallback
            } else {
                value.clamp(0.0, 1.0)
            }
        };

        Self {
            tint,
            opacity,
            scale,
            rotation_degrees,
            roughness: unit(spec.roughness, 0.5),
            metalness: unit(spec.metalness, 0.0),
        }
    }
}

/// A built composite: base appearance blended with a tinted pattern.
///
/// The output is opaque and replaces the surface's base material outright.
#[derive(Clone, Debug)]
pub struct CompositeMaterial {
    /// Surface revision this composite was built for.
    pub revision: u64,
    pub pattern_path: String,
    pub pattern: Arc<Raster>,
    /// Gradient raster of the base appearance, if any.
    pub base_texture: Option<Arc<Raster>>,
    /// Gradient raster used as the tint, if the tint mode is gradient.
    pub tint_texture: Option<Arc<Raster>>,
    pub base_color: Srgba,
    pub overlay: OverlayParams,
    pub mask: MaskSettings,
    dirty: bool,
}

impl CompositeMaterial {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        revision: u64,
        pattern_path: impl Into<String>,
        pattern: Arc<Raster>,
        base_texture: Option<Arc<Raster>>,
        tint_texture: Option<Arc<Raster>>,
        base_color: Srgba,
        overlay: OverlayParams,
        mask: MaskSettings,
    ) -> Self {
        Self {
            revision,
            pattern_path: pattern_path.into(),
            pattern,
            base_texture,
            tint_texture,
            base_color,
            overlay,
            mask,
            dirty: false,
        }
    }

    /// Whether parameters changed since the shader uniforms were last written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Move the composite to `revision` over a new base appearance, keeping its pattern.
    pub fn rebase(
        &mut self,
        revision: u64,
        base_texture: Option<Arc<Raster>>,
        tint_texture: Option<Arc<Raster>>,
        base_color: Srgba,
    ) {
        self.revision = revision;
        self.base_texture = base_texture;
        self.tint_texture = tint_texture;
        self.base_color = base_color;
        self.dirty = true;
    }

    /// Pattern-space coordinate for a surface UV: rotated about the tile centre, then scaled.
    pub fn pattern_uv(&self, uv: Vec2) -> Vec2 {
        let rotated = Vec2::from_angle(self.overlay.rotation_degrees.to_radians())
            .rotate(uv - Vec2::splat(0.5))
            + Vec2::splat(0.5);
        rotated * self.overlay.scale
    }

    /// Base color at `uv` before the overlay is applied.
    pub fn base_at(&self, uv: Vec2) -> Srgba {
        let texel = self
            .base_texture
            .as_ref()
            .map_or(Srgba::WHITE, |raster| raster.sample_clamped(uv));
        let texel = LinearRgba::from(texel);
        let tint = LinearRgba::from(self.base_color);
        Srgba::from(LinearRgba::new(
            texel.red * tint.red,
            texel.green * tint.green,
            texel.blue * tint.blue,
            1.0,
        ))
    }

    /// The color the composite shader produces at `uv`.
    pub fn shade(&self, uv: Vec2) -> Srgba {
        let base = self.base_at(uv);
        let texel = self.pattern.sample_repeat(self.pattern_uv(uv));
        if !self.mask.is_masked(texel) {
            return base;
        }

        let tint = self
            .tint_texture
            .as_ref()
            .map_or(self.overlay.tint, |raster| raster.sample_clamped(uv));
        let mixed = LinearRgba::from(base).mix(&LinearRgba::from(tint), self.overlay.opacity);
        Srgba::from(mixed).with_alpha(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Srgba, b: Srgba) -> bool {
        (a.red - b.red).abs() < 1e-3
            && (a.green - b.green).abs() < 1e-3
            && (a.blue - b.blue).abs() < 1e-3
    }

    fn single_texel(pixel: [u8; 4]) -> Arc<Raster> {
        Arc::new(Raster::filled(1, 1, pixel).unwrap())
    }

    fn composite(pattern: Arc<Raster>, base: Srgba, tint: Srgba, opacity: f32) -> CompositeMaterial {
        let overlay = OverlayParams {
            tint,
            opacity,
            scale: 1.0,
            rotation_degrees: 0.0,
            roughness: 0.5,
            metalness: 0.0,
        };
        CompositeMaterial::new(
            1,
            "patterns/test.png",
            pattern,
            None,
            None,
            base,
            overlay,
            MaskSettings::default(),
        )
    }

    #[test]
    fn test_dark_opaque_texel_takes_tint() {
        // darkness = 1 - 26/255 ~= 0.9
        let pattern = single_texel([26, 26, 26, 255]);
        let tint = Srgba::rgb(0.9, 0.2, 0.1);
        let material = composite(pattern, Srgba::rgb(0.2, 0.6, 0.3), tint, 1.0);

        assert!(close(material.shade(Vec2::new(0.3, 0.7)), tint));
    }

    #[test]
    fn test_transparent_texel_keeps_base() {
        let pattern = single_texel([0, 0, 0, 0]);
        let base = Srgba::rgb(0.2, 0.6, 0.3);
        let material = composite(pattern, base, Srgba::rgb(0.9, 0.2, 0.1), 1.0);

        assert!(close(material.shade(Vec2::new(0.3, 0.7)), base));
    }

    #[test]
    fn test_light_texel_keeps_base() {
        let pattern = single_texel([200, 200, 200, 255]);
        let base = Srgba::rgb(0.2, 0.6, 0.3);
        let material = composite(pattern, base, Srgba::BLACK, 1.0);

        assert!(close(material.shade(Vec2::ZERO), base));
    }

    #[test]
    fn test_opacity_weights_mix() {
        let pattern = single_texel([0, 0, 0, 255]);
        let base = Srgba::rgb(0.8, 0.4, 0.2);
        let material = composite(pattern, base, Srgba::BLACK, 0.5);

        let expected = Srgba::from(LinearRgba::from(base) * 0.5);
        assert!(close(material.shade(Vec2::ZERO), expected));
    }

    #[test]
    fn test_mask_rule() {
        let mask = MaskSettings::default();
        assert!(mask.is_masked(Srgba::new(0.1, 0.1, 0.1, 1.0)));
        assert!(!mask.is_masked(Srgba::new(0.1, 0.1, 0.1, 0.05)));
        assert!(!mask.is_masked(Srgba::new(0.5, 0.5, 0.5, 1.0)));
    }

    #[test]
    fn test_pattern_uv_scale_and_rotation() {
        let mut material = composite(single_texel([0; 4]), Srgba::WHITE, Srgba::BLACK, 1.0);
        material.overlay.scale = 4.0;
        assert!((material.pattern_uv(Vec2::new(0.25, 0.5)) - Vec2::new(1.0, 2.0)).length() < 1e-5);

        material.overlay.scale = 1.0;
        material.overlay.rotation_degrees = 180.0;
        assert!((material.pattern_uv(Vec2::new(0.25, 0.5)) - Vec2::new(0.75, 0.5)).length() < 1e-5);
    }

    #[test]
    fn test_sanitized_params() {
        let settings = GarmentSettings::default();
        let spec = PatternOverlaySpec {
            scale: -2.0,
            opacity: 3.0,
            tint_color: "???".to_string(),
            roughness: f32::NAN,
            metalness: 4.0,
            ..PatternOverlaySpec::with_pattern("p.png")
        };

        let params = OverlayParams::sanitized(&spec, &settings);
        assert_eq!(params.scale, 1.0);
        assert_eq!(params.opacity, 0.8);
        assert_eq!(params.tint, Srgba::BLACK);
        assert_eq!(params.roughness, 0.5);
        assert_eq!(params.metalness, 1.0);
        assert_eq!(OverlayParams::refreshed(&spec, &settings), params);
    }

    #[test]
    fn test_key_ignores_live_parameters() {
        let mut spec = SurfaceSpec::new("#ffffff");
        spec.pattern = PatternOverlaySpec::with_pattern("p.png");
        let key = CompositeKey::from_spec(&spec);

        spec.pattern.opacity = 0.1;
        spec.pattern.scale = 3.0;
        spec.solid_color = "#000000".to_string();
        assert_eq!(CompositeKey::from_spec(&spec), key);

        spec.pattern.pattern = Some("q.png".to_string());
        assert_ne!(CompositeKey::from_spec(&spec), key);
    }
}
