//! Composite materials: a base appearance blended with a tinted pattern.
//!
//! [`TextureCompositor`] decides when a composite must be rebuilt and which
//! fetched pattern may become current. [`CompositeShading`] is the Bevy
//! material extension that renders a [`CompositeMaterial`] on the GPU; it
//! extends [`StandardMaterial`](bevy::pbr::StandardMaterial), so lighting,
//! roughness and metalness behave as on any other PBR surface.

mod composite;
mod compositor;
mod extension;
mod systems;

pub use composite::{CompositeKey, CompositeMaterial, MaskSettings, OverlayParams};
pub use compositor::{
    BuildOutcome, CompositeRequest, FetchError, FetchRequest, TextureCompositor,
};
pub use extension::{
    CompositeShading, PatternOverlayExtension, PatternOverlaySettings, build_composite_shading,
    configure_pattern_loader, pattern_sampler, rebase_composite_shading,
    refresh_composite_shading,
};
pub(crate) use extension::register_embedded_assets;
pub use systems::poll_pattern_fetches;
