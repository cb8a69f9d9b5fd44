//! Resolves pattern loads and swaps composites onto their surfaces.

use bevy::asset::LoadState;
use bevy::image::ImageSampler;
use bevy::prelude::*;

use super::compositor::{BuildOutcome, FetchError, FetchRequest};
use super::extension::{CompositeShading, build_composite_shading};
use crate::design::DesignState;
use crate::engine::DecorEngine;
use crate::systems::{PatternFetches, SurfaceBindings};
use crate::texture::Raster;

fn resolve(
    request: &FetchRequest,
    handle: &Handle<Image>,
    asset_server: &AssetServer,
    images: &Assets<Image>,
) -> Option<Result<Raster, FetchError>> {
    match asset_server.get_load_state(handle.id())? {
        LoadState::Loaded => {
            let result = match images.get(handle) {
                Some(image) => Raster::from_image(image).map_err(|source| FetchError::Decode {
                    path: request.path.clone(),
                    source,
                }),
                None => Err(FetchError::MissingAsset {
                    path: request.path.clone(),
                }),
            };
            Some(result)
        }
        LoadState::Failed(e) => Some(Err(FetchError::Load {
            path: request.path.clone(),
            reason: e.to_string(),
        })),
        _ => None,
    }
}

/// Hand finished pattern loads to the engine and assign applied composites.
///
/// Superseded and failed loads drop their image handle; the surface keeps
/// whatever material it had.
#[allow(clippy::too_many_arguments)]
pub fn poll_pattern_fetches(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut engine: ResMut<DecorEngine>,
    state: Res<DesignState>,
    mut fetches: ResMut<PatternFetches>,
    mut bindings: ResMut<SurfaceBindings>,
    mut images: ResMut<Assets<Image>>,
    materials: Res<Assets<StandardMaterial>>,
    mut composites: ResMut<Assets<CompositeShading>>,
) {
    if fetches.in_flight.is_empty() {
        return;
    }

    let in_flight = std::mem::take(&mut fetches.in_flight);
    for (request, handle) in in_flight {
        let Some(result) = resolve(&request, &handle, &asset_server, &images) else {
            fetches.in_flight.push((request, handle));
            continue;
        };
        if engine.complete_fetch(&request, result, &state) != BuildOutcome::Applied {
            continue;
        }

        let (Some(slot), Some(binding)) = (
            engine.registry().slot(&request.surface),
            bindings.get_mut(&request.surface),
        ) else {
            continue;
        };
        let (Some(composite), Some(base)) = (slot.composite(), materials.get(&binding.base)) else {
            continue;
        };

        let tint = composite
            .tint_texture
            .as_ref()
            .map(|raster| images.add(raster.to_image(ImageSampler::linear())));
        let shading = composites.add(build_composite_shading(composite, base, handle, tint));
        for &entity in &binding.entities {
            commands
                .entity(entity)
                .remove::<MeshMaterial3d<StandardMaterial>>()
                .insert(MeshMaterial3d(shading.clone()));
        }
        // The prior composite is released with its handle.
        binding.composite = Some(shading);
    }
}
