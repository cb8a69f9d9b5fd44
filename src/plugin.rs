//! Plugin for garment decoration.
use bevy::prelude::*;

use crate::decal::{DecalEntities, sync_decals};
use crate::design::DesignState;
use crate::engine::DecorEngine;
use crate::material::{CompositeShading, poll_pattern_fetches};
use crate::settings::GarmentSettings;
use crate::systems::{
    GarmentSystems, PatternFetches, QueuedEffects, SurfaceBindings, apply_design_changes,
    discover_surfaces, interpolate_materials,
};

/// Plugin that decorates glTF garment models from a [`DesignState`].
///
/// This plugin registers:
/// - [`CompositeShading`] as a material type
/// - Embedded shader assets
/// - [`DesignState`], [`DecorEngine`] and the render-side bookkeeping resources
/// - The [`GarmentSystems`] set in `Update`
///
/// Decals are forward decals, so the camera needs a `DepthPrepass`.
///
/// # Example
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_garment::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(GarmentDecorPlugin::default())
///     .run();
/// ```
#[derive(Default)]
pub struct GarmentDecorPlugin {
    pub settings: GarmentSettings,
}

impl GarmentDecorPlugin {
    pub fn new(settings: GarmentSettings) -> Self {
        Self { settings }
    }
}

impl Plugin for GarmentDecorPlugin {
    fn build(&self, app: &mut App) {
        // Embed the shader into the binary
        crate::material::register_embedded_assets(app);
        app.add_plugins(MaterialPlugin::<CompositeShading>::default())
            .insert_resource(self.settings.clone())
            .insert_resource(DecorEngine::new(self.settings.clone()))
            .init_resource::<DesignState>()
            .init_resource::<SurfaceBindings>()
            .init_resource::<PatternFetches>()
            .init_resource::<QueuedEffects>()
            .init_resource::<DecalEntities>()
            .add_systems(
                Update,
                (
                    discover_surfaces,
                    apply_design_changes,
                    poll_pattern_fetches,
                    interpolate_materials,
                    sync_decals,
                )
                    .chain()
                    .in_set(GarmentSystems),
            );
    }
}
