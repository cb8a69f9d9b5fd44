//! Reconciles forward decal entities with the latest [`DecalPlan`].

use std::collections::{HashMap, HashSet};
use std::f32::consts::FRAC_PI_2;

use bevy::asset::LoadState;
use bevy::image::ImageSampler;
use bevy::pbr::decal::{ForwardDecal, ForwardDecalMaterial, ForwardDecalMaterialExt};
use bevy::prelude::*;

use super::overlay::{DecalDraw, DecalImage, DecalImageSource, DecalKey};
use crate::design::DesignState;
use crate::engine::DecorEngine;
use crate::systems::SurfaceBindings;

type DecalMaterial = ForwardDecalMaterial<StandardMaterial>;

struct SpawnedDecal {
    entity: Entity,
    image: DecalImage,
    material: Handle<DecalMaterial>,
}

/// Strong handles of external decal images, kept while a plan references them.
#[derive(Default)]
struct DecalImageHandles {
    handles: HashMap<String, Handle<Image>>,
    referenced: HashSet<String>,
}

impl DecalImageHandles {
    fn get_or_load(&mut self, path: &str, load: impl FnOnce() -> Handle<Image>) -> Handle<Image> {
        self.referenced.insert(path.to_string());
        self.handles
            .entry(path.to_string())
            .or_insert_with(load)
            .clone()
    }

    fn get(&self, path: &str) -> Option<&Handle<Image>> {
        self.handles.get(path)
    }

    /// Drop the handle of a failed load so the next plan starts it again.
    fn forget(&mut self, path: &str) {
        self.handles.remove(path);
    }

    /// Release every handle the plan just made did not ask for.
    fn release_unreferenced(&mut self) {
        let referenced = std::mem::take(&mut self.referenced);
        self.handles.retain(|path, _| referenced.contains(path));
    }

    fn tracks(&self, id: AssetId<Image>) -> bool {
        self.handles.values().any(|handle| handle.id() == id)
    }

    fn len(&self) -> usize {
        self.handles.len()
    }
}

/// Live decal entities and the external images they reference.
#[derive(Resource, Default)]
pub struct DecalEntities {
    parent: Option<Entity>,
    spawned: HashMap<DecalKey, SpawnedDecal>,
    images: DecalImageHandles,
}

impl DecalEntities {
    pub fn entity(&self, key: &DecalKey) -> Option<Entity> {
        self.spawned.get(key).map(|d| d.entity)
    }

    pub fn len(&self) -> usize {
        self.spawned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty()
    }

    /// Number of external images currently held.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

/// Resolves logo paths through the asset server, starting loads on first sight.
struct AssetImageSource<'a> {
    server: &'a AssetServer,
    handles: &'a mut DecalImageHandles,
}

impl DecalImageSource for AssetImageSource<'_> {
    fn is_ready(&mut self, path: &str) -> bool {
        let server = self.server;
        let handle = self
            .handles
            .get_or_load(path, || server.load(path.to_string()));
        match self.server.get_load_state(handle.id()) {
            Some(LoadState::Loaded) => true,
            Some(LoadState::Failed(e)) => {
                warn!("Decal image '{path}' failed to load: {e}");
                self.handles.forget(path);
                false
            }
            _ => false,
        }
    }
}

/// Transform of a decal entity for `draw`.
///
/// Forward decals project along their local -Y; placements face +Z.
pub fn decal_transform(draw: &DecalDraw) -> Transform {
    let mut transform = draw.transform;
    transform.rotation *= Quat::from_rotation_x(FRAC_PI_2);
    transform
}

/// Re-plan decals when slots changed or a referenced image finished loading.
#[allow(clippy::too_many_arguments)]
pub fn sync_decals(
    mut commands: Commands,
    mut engine: ResMut<DecorEngine>,
    state: Res<DesignState>,
    bindings: Res<SurfaceBindings>,
    asset_server: Res<AssetServer>,
    mut images: ResMut<Assets<Image>>,
    mut decal_materials: ResMut<Assets<DecalMaterial>>,
    mut decals: ResMut<DecalEntities>,
    mut events: MessageReader<AssetEvent<Image>>,
) {
    let image_loaded = events.read().any(|event| match event {
        AssetEvent::LoadedWithDependencies { id } => decals.images.tracks(*id),
        _ => false,
    });
    if !engine.decals_dirty() && !image_loaded {
        return;
    }

    let parent = engine
        .primary_surface()
        .and_then(|name| bindings.get(name))
        .and_then(|binding| binding.entities.first().copied());
    let Some(parent) = parent else {
        return;
    };
    if decals.parent != Some(parent) {
        // A new model despawned the old parent together with its children.
        decals.spawned.clear();
        decals.parent = Some(parent);
    }

    let plan = {
        let mut source = AssetImageSource {
            server: &asset_server,
            handles: &mut decals.images,
        };
        engine.plan_decals(&state, &mut source)
    };
    decals.images.release_unreferenced();

    let stale: Vec<DecalKey> = decals
        .spawned
        .keys()
        .filter(|key| plan.get(key).is_none())
        .cloned()
        .collect();
    for key in stale {
        if let Some(old) = decals.spawned.remove(&key) {
            commands.entity(old.entity).despawn();
        }
    }

    let depth_fade = engine.settings().decal_depth_fade;
    for draw in plan.draws() {
        let transform = decal_transform(draw);

        if let Some(existing) = decals.spawned.get(&draw.key) {
            if existing.image == draw.image {
                commands.entity(existing.entity).insert(transform);
                if let Some(material) = decal_materials.get_mut(&existing.material) {
                    material.base.depth_bias = draw.layer as f32;
                }
                continue;
            }
        }
        if let Some(old) = decals.spawned.remove(&draw.key) {
            commands.entity(old.entity).despawn();
        }

        let texture = match &draw.image {
            DecalImage::Path(path) => match decals.images.get(path) {
                Some(handle) => handle.clone(),
                None => continue,
            },
            DecalImage::Raster(raster) => images.add(raster.to_image(ImageSampler::linear())),
        };
        let material = decal_materials.add(ForwardDecalMaterial {
            base: StandardMaterial {
                base_color_texture: Some(texture),
                alpha_mode: AlphaMode::Blend,
                depth_bias: draw.layer as f32,
                ..default()
            },
            extension: ForwardDecalMaterialExt {
                depth_fade_factor: depth_fade,
            },
        });
        let entity = commands
            .spawn((
                ForwardDecal,
                MeshMaterial3d(material.clone()),
                transform,
                ChildOf(parent),
                Name::new(format!("Decal {:?}", draw.key)),
            ))
            .id();
        decals.spawned.insert(
            draw.key.clone(),
            SpawnedDecal {
                entity,
                image: draw.image.clone(),
                material,
            },
        );
    }
}
