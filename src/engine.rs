//! The decoration engine: one owner for every component, driven by state changes.

use bevy::prelude::*;

use crate::decal::{DecalImageSource, DecalKey, DecalOverlayManager, DecalPlan};
use crate::design::{DesignChange, DesignState};
use crate::frame::{FrameInterpolator, FrameUpdate};
use crate::material::{BuildOutcome, CompositeRequest, FetchError, FetchRequest, TextureCompositor};
use crate::registry::{AppearanceSync, MaterialRegistry, OverlayStatus, ScanError, SceneQuery};
use crate::settings::GarmentSettings;
use crate::texture::{Raster, TextShaper, TextureGenerator};

/// Work the host has to carry out after the engine reacted to a change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEffect {
    /// The base appearance of a surface was replaced.
    AppearanceApplied(String),
    /// A pattern image must be fetched and handed to [`DecorEngine::complete_fetch`].
    FetchRequested(FetchRequest),
    /// The surface's composite now sits on a new base appearance; its shading must be rebuilt.
    CompositeRebuilt(String),
    /// The surface's composite was dropped; it shows its base material again.
    CompositeCleared(String),
    /// Decal slots changed; call [`DecorEngine::plan_decals`].
    DecalsChanged,
}

/// Owns the registry, texture generator, compositor, decal planner and
/// frame interpolator, and routes each [`DesignChange`] to the components
/// that depend on it.
#[derive(Resource, Debug)]
pub struct DecorEngine {
    settings: GarmentSettings,
    registry: MaterialRegistry,
    generator: TextureGenerator,
    compositor: TextureCompositor,
    decals: DecalOverlayManager,
    interpolator: FrameInterpolator,
    decals_dirty: bool,
}

impl Default for DecorEngine {
    fn default() -> Self {
        Self::new(GarmentSettings::default())
    }
}

impl DecorEngine {
    pub fn new(settings: GarmentSettings) -> Self {
        Self {
            registry: MaterialRegistry::new(),
            generator: TextureGenerator::new(settings.texture_cache_capacity),
            compositor: TextureCompositor::new(settings.clone()),
            decals: DecalOverlayManager::new(),
            interpolator: FrameInterpolator::new(settings.clone()),
            decals_dirty: false,
            settings,
        }
    }

    pub fn settings(&self) -> &GarmentSettings {
        &self.settings
    }

    pub fn registry(&self) -> &MaterialRegistry {
        &self.registry
    }

    pub fn generator_mut(&mut self) -> &mut TextureGenerator {
        &mut self.generator
    }

    /// Replace the text shaper. Every text decal is re-synthesized.
    pub fn set_text_shaper(&mut self, shaper: impl TextShaper + 'static) {
        self.generator.set_shaper(shaper);
        self.decals = DecalOverlayManager::new();
        self.decals_dirty = true;
    }

    /// Surface that receives decals: the configured one if present, else the first scanned.
    pub fn primary_surface(&self) -> Option<&str> {
        let surfaces = self.registry.list_surfaces();
        self.settings
            .primary_surface
            .as_deref()
            .filter(|name| self.registry.contains(name))
            .or_else(|| surfaces.first().map(String::as_str))
    }

    /// Scan a freshly loaded model and bring every surface in line with `state`.
    pub fn load_model<S: SceneQuery>(
        &mut self,
        scene: &S,
        state: &mut DesignState,
    ) -> Result<Vec<EngineEffect>, ScanError> {
        let names = self.registry.load_model(scene, state)?;
        let mut effects = Vec::new();

        for name in &names {
            let Some(spec) = state.surface(name) else {
                continue;
            };
            self.registry.apply_appearance(
                name,
                spec,
                &mut self.generator,
                self.settings.gradient_resolution,
            );
            effects.push(EngineEffect::AppearanceApplied(name.clone()));
            let request = self
                .compositor
                .sync(&mut self.registry, name, spec, &mut self.generator);
            if let Some(CompositeRequest::Fetch(request)) = request {
                effects.push(EngineEffect::FetchRequested(request));
            }
        }

        self.decals = DecalOverlayManager::new();
        self.decals_dirty = true;
        effects.push(EngineEffect::DecalsChanged);
        Ok(effects)
    }

    /// Drain the change queue of `state` and react to each change.
    pub fn process_changes(&mut self, state: &mut DesignState) -> Vec<EngineEffect> {
        let changes = state.drain_changes();
        if changes.is_empty() {
            return Vec::new();
        }

        // (surface, appearance, overlay) in first-seen order.
        let mut touched: Vec<(String, bool, bool)> = Vec::new();
        let mut mark = |surface: &str, appearance: bool, overlay: bool| {
            match touched.iter_mut().find(|(name, ..)| name == surface) {
                Some(entry) => {
                    entry.1 |= appearance;
                    entry.2 |= overlay;
                }
                None => touched.push((surface.to_string(), appearance, overlay)),
            }
        };
        let mut decals_changed = false;

        for change in &changes {
            match change {
                DesignChange::SurfaceSeeded { surface } => mark(surface, true, true),
                DesignChange::SurfaceAppearanceChanged { surface } => mark(surface, true, true),
                DesignChange::PatternOverlayChanged { surface } => mark(surface, false, true),
                DesignChange::DecorationRemoved { surface, id } => {
                    self.decals.evict(&DecalKey::Decoration {
                        surface: surface.clone(),
                        id: *id,
                    });
                    decals_changed = true;
                }
                DesignChange::DecorationAdded { .. }
                | DesignChange::DecorationUpdated { .. }
                | DesignChange::GlobalDecalsChanged => decals_changed = true,
            }
        }

        let mut effects = Vec::new();
        for (name, appearance, overlay) in touched {
            let Some(spec) = state.surface(&name) else {
                continue;
            };
            if !self.registry.contains(&name) {
                continue;
            }
            if appearance {
                let sync = self.registry.sync_appearance(
                    &name,
                    spec,
                    &mut self.generator,
                    self.settings.gradient_resolution,
                );
                if sync == AppearanceSync::Applied {
                    effects.push(EngineEffect::AppearanceApplied(name.clone()));
                }
            }
            if overlay {
                let request = self
                    .compositor
                    .sync(&mut self.registry, &name, spec, &mut self.generator);
                match request {
                    Some(CompositeRequest::Fetch(request)) => {
                        effects.push(EngineEffect::FetchRequested(request))
                    }
                    Some(CompositeRequest::Rebuilt) => {
                        effects.push(EngineEffect::CompositeRebuilt(name.clone()))
                    }
                    Some(CompositeRequest::Clear) => {
                        effects.push(EngineEffect::CompositeCleared(name.clone()))
                    }
                    None => {}
                }
            }
        }

        if decals_changed {
            self.decals_dirty = true;
            effects.push(EngineEffect::DecalsChanged);
        }
        effects
    }

    /// Hand back the result of a [`EngineEffect::FetchRequested`].
    pub fn complete_fetch(
        &mut self,
        request: &FetchRequest,
        result: Result<Raster, FetchError>,
        state: &DesignState,
    ) -> BuildOutcome {
        let Some(spec) = state.surface(&request.surface) else {
            return BuildOutcome::Superseded;
        };
        self.compositor
            .complete(&mut self.registry, request, result, spec, &mut self.generator)
    }

    /// Advance easing by `dt` seconds.
    pub fn tick(&mut self, dt: f32, state: &DesignState) -> FrameUpdate {
        self.interpolator.tick(dt, &mut self.registry, state)
    }

    /// Whether decal slots changed since the last [`Self::plan_decals`].
    pub fn decals_dirty(&self) -> bool {
        self.decals_dirty
    }

    pub fn plan_decals(
        &mut self,
        state: &DesignState,
        images: &mut dyn DecalImageSource,
    ) -> DecalPlan {
        self.decals_dirty = false;
        self.decals.plan(
            state,
            self.registry.list_surfaces(),
            images,
            &mut self.generator,
        )
    }

    pub fn overlay_status(&self, name: &str) -> Option<OverlayStatus> {
        self.registry.overlay_status(name)
    }

    /// Whether the UI can hide the loading indicator for `name`.
    pub fn overlay_ready(&self, name: &str) -> bool {
        self.registry.is_overlay_ready(name)
    }

    pub(crate) fn registry_mut(&mut self) -> &mut MaterialRegistry {
        &mut self.registry
    }
}
