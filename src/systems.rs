//! Systems that connect the engine to the Bevy scene.

use std::collections::HashMap;

use bevy::gltf::GltfMaterialName;
use bevy::image::ImageSampler;
use bevy::prelude::*;

use crate::design::DesignState;
use crate::engine::{DecorEngine, EngineEffect};
use crate::material::{
    CompositeShading, FetchRequest, configure_pattern_loader, rebase_composite_shading,
};
use crate::registry::SceneSurface;

/// System set for every garment decoration system.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct GarmentSystems;

/// Render-side handles of one surface.
#[derive(Debug)]
pub struct SurfaceBinding {
    /// Mesh entities drawn with this surface's material.
    pub entities: Vec<Entity>,
    /// Owned clone of the authored material, carrying the base appearance.
    pub base: Handle<StandardMaterial>,
    /// Image uploaded for the base gradient raster, with its cache key.
    pub base_texture: Option<(u64, Handle<Image>)>,
    /// Composite currently assigned in place of `base`.
    pub composite: Option<Handle<CompositeShading>>,
    pub original_color: Srgba,
}

/// Surface name to render handles, for the model currently loaded.
#[derive(Resource, Debug, Default)]
pub struct SurfaceBindings {
    surfaces: HashMap<String, SurfaceBinding>,
}

impl SurfaceBindings {
    pub fn get(&self, name: &str) -> Option<&SurfaceBinding> {
        self.surfaces.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut SurfaceBinding> {
        self.surfaces.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    fn owner_of(&self, entity: Entity) -> Option<&SurfaceBinding> {
        self.surfaces.values().find(|b| b.entities.contains(&entity))
    }
}

/// Pattern loads started for [`EngineEffect::FetchRequested`] and not yet resolved.
#[derive(Resource, Debug, Default)]
pub struct PatternFetches {
    pub(crate) in_flight: Vec<(FetchRequest, Handle<Image>)>,
}

impl PatternFetches {
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// Effects produced outside [`apply_design_changes`], applied on its next run.
#[derive(Resource, Debug, Default)]
pub struct QueuedEffects(pub(crate) Vec<EngineEffect>);

/// Rescan the model whenever glTF meshes with named materials are spawned.
#[allow(clippy::too_many_arguments)]
pub fn discover_surfaces(
    mut commands: Commands,
    added: Query<(), Added<GltfMaterialName>>,
    named: Query<(
        Entity,
        &GltfMaterialName,
        Option<&MeshMaterial3d<StandardMaterial>>,
    )>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut engine: ResMut<DecorEngine>,
    mut state: ResMut<DesignState>,
    mut bindings: ResMut<SurfaceBindings>,
    mut queued: ResMut<QueuedEffects>,
) {
    if added.is_empty() {
        return;
    }

    let mut order: Vec<String> = Vec::new();
    let mut found: HashMap<String, SurfaceBinding> = HashMap::new();
    for (entity, name, material) in &named {
        let name = name.0.clone();
        let previous = bindings.owner_of(entity);
        let template = previous
            .map(|b| b.base.clone())
            .or_else(|| material.map(|m| m.0.clone()));
        let Some(template) = template else {
            continue;
        };

        if let Some(binding) = found.get_mut(&name) {
            binding.entities.push(entity);
            commands
                .entity(entity)
                .remove::<MeshMaterial3d<CompositeShading>>()
                .insert(MeshMaterial3d(binding.base.clone()));
            continue;
        }

        let Some(authored) = materials.get(&template).cloned() else {
            continue;
        };
        let original_color = previous
            .map(|b| b.original_color)
            .unwrap_or_else(|| authored.base_color.to_srgba());
        let base = materials.add(StandardMaterial {
            base_color: Color::Srgba(original_color),
            base_color_texture: None,
            ..authored
        });
        commands
            .entity(entity)
            .remove::<MeshMaterial3d<CompositeShading>>()
            .insert(MeshMaterial3d(base.clone()));

        order.push(name.clone());
        found.insert(
            name,
            SurfaceBinding {
                entities: vec![entity],
                base,
                base_texture: None,
                composite: None,
                original_color,
            },
        );
    }

    let scene: Vec<SceneSurface> = order
        .iter()
        .filter_map(|name| {
            let binding = found.get(name)?;
            Some(SceneSurface::new(name.clone(), binding.original_color))
        })
        .collect();
    bindings.surfaces = found;

    match engine.load_model(&scene, &mut state) {
        Ok(effects) => queued.0.extend(effects),
        Err(e) => warn!("Garment model scan failed: {e}"),
    }
}

/// React to state changes: push base appearance, start pattern loads, rebuild or drop composites.
#[allow(clippy::too_many_arguments)]
pub fn apply_design_changes(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut engine: ResMut<DecorEngine>,
    mut state: ResMut<DesignState>,
    mut bindings: ResMut<SurfaceBindings>,
    mut fetches: ResMut<PatternFetches>,
    mut queued: ResMut<QueuedEffects>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
    mut composites: ResMut<Assets<CompositeShading>>,
) {
    let mut effects = std::mem::take(&mut queued.0);
    effects.extend(engine.process_changes(&mut state));

    for effect in effects {
        match effect {
            EngineEffect::AppearanceApplied(name) => {
                let (Some(slot), Some(binding)) =
                    (engine.registry().slot(&name), bindings.get_mut(&name))
                else {
                    continue;
                };
                let base = slot.base();
                binding.base_texture = match (&base.texture, base.texture_key) {
                    (Some(raster), Some(key)) => match binding.base_texture.take() {
                        Some((current, handle)) if current == key => Some((current, handle)),
                        _ => Some((key, images.add(raster.to_image(ImageSampler::linear())))),
                    },
                    _ => None,
                };
                if let Some(material) = materials.get_mut(&binding.base) {
                    material.base_color = Color::Srgba(slot.displayed_color());
                    material.base_color_texture =
                        binding.base_texture.as_ref().map(|(_, handle)| handle.clone());
                }
                debug!("Applied base appearance to '{name}'");
            }
            EngineEffect::FetchRequested(request) => {
                let handle = asset_server.load_with_settings(
                    request.path.clone(),
                    configure_pattern_loader,
                );
                fetches.in_flight.push((request, handle));
            }
            EngineEffect::CompositeRebuilt(name) => {
                let (Some(slot), Some(binding)) =
                    (engine.registry().slot(&name), bindings.get(&name))
                else {
                    continue;
                };
                let (Some(composite), Some(base)) =
                    (slot.composite(), materials.get(&binding.base))
                else {
                    continue;
                };
                let Some(shading) = binding
                    .composite
                    .as_ref()
                    .and_then(|handle| composites.get_mut(handle))
                else {
                    continue;
                };
                let tint = composite
                    .tint_texture
                    .as_ref()
                    .map(|raster| images.add(raster.to_image(ImageSampler::linear())));
                rebase_composite_shading(shading, composite, base, tint);
                debug!("Rebuilt composite on '{name}' over its new base");
            }
            EngineEffect::CompositeCleared(name) => {
                let Some(binding) = bindings.get_mut(&name) else {
                    continue;
                };
                binding.composite = None;
                for &entity in &binding.entities {
                    commands
                        .entity(entity)
                        .remove::<MeshMaterial3d<CompositeShading>>()
                        .insert(MeshMaterial3d(binding.base.clone()));
                }
                debug!("Restored base material on '{name}'");
            }
            EngineEffect::DecalsChanged => {}
        }
    }
}

/// Ease displayed colors and refresh composite uniforms.
pub fn interpolate_materials(
    time: Res<Time>,
    mut engine: ResMut<DecorEngine>,
    state: Res<DesignState>,
    bindings: Res<SurfaceBindings>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut composites: ResMut<Assets<CompositeShading>>,
) {
    let update = engine.tick(time.delta_secs(), &state);
    if update.is_empty() {
        return;
    }

    for name in &update.colors_changed {
        let (Some(slot), Some(binding)) = (engine.registry().slot(name), bindings.get(name)) else {
            continue;
        };
        if let Some(material) = materials.get_mut(&binding.base) {
            material.base_color = Color::Srgba(slot.displayed_color());
        }
    }

    for name in &update.composites_dirty {
        let Some(slot) = engine.registry_mut().slot_mut(name) else {
            continue;
        };
        let Some(composite) = slot.composite_mut() else {
            continue;
        };
        if let Some(shading) = bindings
            .get(name)
            .and_then(|b| b.composite.as_ref())
            .and_then(|handle| composites.get_mut(handle))
        {
            crate::material::refresh_composite_shading(shading, composite);
        }
        composite.clear_dirty();
    }
}
