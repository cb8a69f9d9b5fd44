//! Material extension that blends a tinted pattern over the base appearance.

use bevy::asset::embedded_asset;
use bevy::color::ColorToComponents;
use bevy::image::{
    ImageAddressMode, ImageFilterMode, ImageLoaderSettings, ImageSampler, ImageSamplerDescriptor,
};
use bevy::pbr::{ExtendedMaterial, MaterialExtension, StandardMaterial};
use bevy::prelude::*;
use bevy::render::render_resource::{AsBindGroup, ShaderType};
use bevy::shader::ShaderRef;

use super::composite::CompositeMaterial;

/// Shader asset path (embedded).
const PATTERN_OVERLAY_SHADER_PATH: &str =
    "embedded://bevy_garment/material/shaders/pattern_overlay.wgsl";

/// Convenience type alias for the complete composite shading program.
pub type CompositeShading = ExtendedMaterial<StandardMaterial, PatternOverlayExtension>;

pub(crate) fn register_embedded_assets(app: &mut App) {
    embedded_asset!(app, "shaders/pattern_overlay.wgsl");
}

/// GPU-side overlay parameters.
#[derive(Clone, Copy, Debug, Default, ShaderType, Reflect, PartialEq)]
pub struct PatternOverlaySettings {
    /// Linear RGBA tint, used unless `FLAG_TINT_TEXTURE` is set.
    pub tint: Vec4,
    pub scale: f32,
    pub opacity: f32,
    /// Radians.
    pub rotation: f32,
    pub darkness_threshold: f32,
    pub alpha_epsilon: f32,
    pub flags: u32,
}

impl PatternOverlaySettings {
    pub const FLAG_TINT_TEXTURE: u32 = 1 << 0;

    pub fn from_composite(composite: &CompositeMaterial) -> Self {
        let overlay = &composite.overlay;
        let mut flags = 0u32;
        if composite.tint_texture.is_some() {
            flags |= Self::FLAG_TINT_TEXTURE;
        }

        Self {
            tint: LinearRgba::from(overlay.tint).to_vec4(),
            scale: overlay.scale,
            opacity: overlay.opacity,
            rotation: overlay.rotation_degrees.to_radians(),
            darkness_threshold: composite.mask.darkness_threshold,
            alpha_epsilon: composite.mask.alpha_epsilon,
            flags,
        }
    }
}

/// Pattern texture, optional gradient tint texture and overlay uniforms.
///
/// Bindings start at 100 to stay clear of [`StandardMaterial`]'s slots.
#[derive(Asset, AsBindGroup, Reflect, Debug, Clone)]
pub struct PatternOverlayExtension {
    #[uniform(100)]
    pub settings: PatternOverlaySettings,

    #[texture(101)]
    #[sampler(102)]
    pub pattern: Handle<Image>,

    #[texture(103)]
    #[sampler(104)]
    pub tint_texture: Option<Handle<Image>>,
}

impl MaterialExtension for PatternOverlayExtension {
    fn fragment_shader() -> ShaderRef {
        PATTERN_OVERLAY_SHADER_PATH.into()
    }

    fn deferred_fragment_shader() -> ShaderRef {
        PATTERN_OVERLAY_SHADER_PATH.into()
    }
}

/// Sampler for repeating alpha-masked patterns.
///
/// Nearest filtering with no mip chain keeps mask edges hard; linear
/// filtering or mipmaps would bleed semi-transparent fringes across tiles.
pub fn pattern_sampler() -> ImageSampler {
    ImageSampler::Descriptor(ImageSamplerDescriptor {
        address_mode_u: ImageAddressMode::Repeat,
        address_mode_v: ImageAddressMode::Repeat,
        address_mode_w: ImageAddressMode::Repeat,
        mag_filter: ImageFilterMode::Nearest,
        min_filter: ImageFilterMode::Nearest,
        mipmap_filter: ImageFilterMode::Nearest,
        ..default()
    })
}

/// Loader settings applied to every pattern fetch.
pub fn configure_pattern_loader(settings: &mut ImageLoaderSettings) {
    settings.sampler = pattern_sampler();
}

/// Assemble the shading program for `composite` on top of `base`.
pub fn build_composite_shading(
    composite: &CompositeMaterial,
    base: &StandardMaterial,
    pattern: Handle<Image>,
    tint_texture: Option<Handle<Image>>,
) -> CompositeShading {
    let mut base = base.clone();
    base.alpha_mode = AlphaMode::Opaque;

    let mut shading = CompositeShading {
        base,
        extension: PatternOverlayExtension {
            settings: PatternOverlaySettings::default(),
            pattern,
            tint_texture,
        },
    };
    refresh_composite_shading(&mut shading, composite);
    shading
}

/// Rebuild `shading` over a new `base`, keeping the pattern image it samples.
pub fn rebase_composite_shading(
    shading: &mut CompositeShading,
    composite: &CompositeMaterial,
    base: &StandardMaterial,
    tint_texture: Option<Handle<Image>>,
) {
    let pattern = shading.extension.pattern.clone();
    *shading = build_composite_shading(composite, base, pattern, tint_texture);
}

/// Copy the frame-refreshed parameters of `composite` into `shading`.
pub fn refresh_composite_shading(shading: &mut CompositeShading, composite: &CompositeMaterial) {
    shading.base.base_color = Color::Srgba(composite.base_color);
    shading.base.perceptual_roughness = composite.overlay.roughness;
    shading.base.metallic = composite.overlay.metalness;
    shading.extension.settings = PatternOverlaySettings::from_composite(composite);
}
