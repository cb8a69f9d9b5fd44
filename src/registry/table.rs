//! The owned surface table.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::prelude::*;
use thiserror::Error;

use super::scene::SceneQuery;
use crate::design::{AppearanceMode, DesignState, SurfaceSpec, parse_color_or};
use crate::material::{CompositeKey, CompositeMaterial};
use crate::texture::{Raster, TextureGenerator, TextureSpec};

/// Errors that can occur when scanning a model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Model exposes no paintable surfaces")]
    NoSurfaces,
}

/// The base appearance currently assigned to a surface.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseAppearance {
    /// Intrinsic material tint. White while a gradient raster is shown.
    pub tint: Srgba,
    pub texture: Option<Arc<Raster>>,
    /// Cache key of the texture spec `texture` was generated from.
    pub texture_key: Option<u64>,
}

impl BaseAppearance {
    pub fn solid(color: Srgba) -> Self {
        Self {
            tint: color,
            texture: None,
            texture_key: None,
        }
    }
}

/// What [`MaterialRegistry::sync_appearance`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppearanceSync {
    /// The base appearance was replaced and the displayed color snapped.
    Applied,
    /// Only the solid target color moved; the frame loop eases toward it.
    Retargeted,
    Unchanged,
}

/// Loading state of a surface's pattern overlay, for UI loading indicators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayStatus {
    Disabled,
    Loading,
    Ready,
    Failed,
}

/// Rendered state of one surface.
#[derive(Debug)]
pub struct SurfaceSlot {
    name: String,
    original_color: Srgba,
    mode: AppearanceMode,
    base: BaseAppearance,
    displayed_color: Srgba,
    pub(crate) revision: u64,
    pub(crate) composite_key: Option<CompositeKey>,
    pub(crate) composite: Option<CompositeMaterial>,
    pub(crate) pending: Option<u64>,
    pub(crate) failed: Option<u64>,
}

impl SurfaceSlot {
    fn new(name: String, original_color: Srgba, revision: u64) -> Self {
        Self {
            name,
            original_color,
            mode: AppearanceMode::Solid,
            base: BaseAppearance::solid(original_color),
            displayed_color: original_color,
            revision,
            composite_key: None,
            composite: None,
            pending: None,
            failed: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original_color(&self) -> Srgba {
        self.original_color
    }

    pub fn mode(&self) -> AppearanceMode {
        self.mode
    }

    pub fn base(&self) -> &BaseAppearance {
        &self.base
    }

    /// The tint currently shown, which may lag the target while easing.
    pub fn displayed_color(&self) -> Srgba {
        self.displayed_color
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn composite(&self) -> Option<&CompositeMaterial> {
        self.composite.as_ref()
    }

    pub(crate) fn composite_mut(&mut self) -> Option<&mut CompositeMaterial> {
        self.composite.as_mut()
    }

    pub(crate) fn set_displayed_color(&mut self, color: Srgba) {
        self.displayed_color = color;
    }

    pub fn overlay_status(&self) -> OverlayStatus {
        let enabled = self
            .composite_key
            .as_ref()
            .is_some_and(CompositeKey::overlay_enabled);
        if !enabled {
            OverlayStatus::Disabled
        } else if self.pending == Some(self.revision) {
            OverlayStatus::Loading
        } else if self.failed == Some(self.revision) {
            OverlayStatus::Failed
        } else if self
            .composite
            .as_ref()
            .is_some_and(|c| c.revision == self.revision)
        {
            OverlayStatus::Ready
        } else {
            OverlayStatus::Loading
        }
    }
}

/// Surfaces discovered on the loaded model, in scan order.
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    order: Vec<String>,
    slots: HashMap<String, SurfaceSlot>,
    /// Shared across reloads so a result from a previous model can never
    /// match a revision of the current one.
    last_revision: u64,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous model and rebuild the table from `scene`.
    ///
    /// Names not yet present in `state` are seeded with the authored color.
    /// Surfaces without geometry are skipped.
    pub fn load_model<S: SceneQuery>(
        &mut self,
        scene: &S,
        state: &mut DesignState,
    ) -> Result<Vec<String>, ScanError> {
        self.order.clear();
        self.slots.clear();

        for surface in scene.surfaces() {
            if !surface.has_geometry {
                debug!("Skipping surface '{}' without geometry", surface.name);
                continue;
            }
            if self.slots.contains_key(&surface.name) {
                continue;
            }
            state.seed_surface(&surface.name, surface.original_color.to_hex());
            let revision = self.next_revision();
            self.order.push(surface.name.clone());
            self.slots.insert(
                surface.name.clone(),
                SurfaceSlot::new(surface.name, surface.original_color, revision),
            );
        }

        if self.order.is_empty() {
            warn!("Loaded model has no paintable surfaces");
            return Err(ScanError::NoSurfaces);
        }
        info!("Scanned {} surfaces: {:?}", self.order.len(), self.order);
        Ok(self.order.clone())
    }

    pub fn list_surfaces(&self) -> &[String] {
        &self.order
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn slot(&self, name: &str) -> Option<&SurfaceSlot> {
        self.slots.get(name)
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut SurfaceSlot> {
        self.slots.get_mut(name)
    }

    pub fn overlay_status(&self, name: &str) -> Option<OverlayStatus> {
        self.slots.get(name).map(SurfaceSlot::overlay_status)
    }

    /// Whether the UI can hide its loading indicator for `name`.
    ///
    /// A failed fetch counts as settled: the surface keeps its prior material.
    pub fn is_overlay_ready(&self, name: &str) -> bool {
        matches!(
            self.overlay_status(name),
            Some(OverlayStatus::Ready | OverlayStatus::Disabled | OverlayStatus::Failed)
        )
    }

    /// Replace the base appearance of `name` from `spec`.
    ///
    /// Gradient mode assigns a freshly generated raster with a white tint.
    /// Solid mode drops any raster and tints with the solid color. The
    /// displayed color snaps to the new tint. Returns `false` for unknown names.
    pub fn apply_appearance(
        &mut self,
        name: &str,
        spec: &SurfaceSpec,
        generator: &mut TextureGenerator,
        resolution: u32,
    ) -> bool {
        let Some(slot) = self.slots.get_mut(name) else {
            return false;
        };
        let solid = parse_color_or(&spec.solid_color, Srgba::BLACK);

        let base = match spec.mode {
            AppearanceMode::Solid => BaseAppearance::solid(solid),
            AppearanceMode::Gradient => {
                let texture_spec = TextureSpec::Gradient {
                    gradient: spec.gradient.clone(),
                    size: resolution,
                };
                match generator.generate(&texture_spec) {
                    Some(raster) => BaseAppearance {
                        tint: Srgba::WHITE,
                        texture: Some(raster),
                        texture_key: Some(texture_spec.cache_key()),
                    },
                    None => {
                        warn!("Surface '{name}' falls back to its solid color");
                        BaseAppearance::solid(solid)
                    }
                }
            }
        };

        slot.mode = spec.mode;
        slot.displayed_color = base.tint;
        slot.base = base;
        true
    }

    /// Bring `name` in line with `spec`, easing solid color edits instead of snapping.
    pub fn sync_appearance(
        &mut self,
        name: &str,
        spec: &SurfaceSpec,
        generator: &mut TextureGenerator,
        resolution: u32,
    ) -> AppearanceSync {
        let Some(slot) = self.slots.get_mut(name) else {
            return AppearanceSync::Unchanged;
        };

        match (slot.mode, spec.mode) {
            (AppearanceMode::Solid, AppearanceMode::Solid) if slot.base.texture.is_none() => {
                let color = parse_color_or(&spec.solid_color, Srgba::BLACK);
                if slot.base.tint == color {
                    return AppearanceSync::Unchanged;
                }
                slot.base.tint = color;
                AppearanceSync::Retargeted
            }
            (AppearanceMode::Gradient, AppearanceMode::Gradient) => {
                let key = TextureSpec::Gradient {
                    gradient: spec.gradient.clone(),
                    size: resolution,
                }
                .cache_key();
                if slot.base.texture_key == Some(key) {
                    return AppearanceSync::Unchanged;
                }
                self.apply_appearance(name, spec, generator, resolution);
                AppearanceSync::Applied
            }
            _ => {
                self.apply_appearance(name, spec, generator, resolution);
                AppearanceSync::Applied
            }
        }
    }

    pub(crate) fn next_revision(&mut self) -> u64 {
        self.last_revision += 1;
        self.last_revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::GradientSpec;
    use crate::registry::SceneSurface;
    use bevy::color::palettes::css;

    fn scene() -> Vec<SceneSurface> {
        vec![
            SceneSurface::new("body", css::RED),
            SceneSurface::new("sleeve", css::BLUE),
            SceneSurface {
                name: "ghost".to_string(),
                has_geometry: false,
                original_color: css::GREEN,
            },
            SceneSurface::new("body", css::YELLOW),
        ]
    }

    fn loaded() -> (MaterialRegistry, DesignState, TextureGenerator) {
        let mut registry = MaterialRegistry::new();
        let mut state = DesignState::new();
        registry.load_model(&scene(), &mut state).unwrap();
        (registry, state, TextureGenerator::new(8))
    }

    #[test]
    fn test_scan_seeds_unseen_surfaces() {
        let mut registry = MaterialRegistry::new();
        let mut state = DesignState::new();
        let names = registry.load_model(&scene(), &mut state).unwrap();

        assert_eq!(names, vec!["body".to_string(), "sleeve".to_string()]);
        assert!(!state.contains("ghost"));
        let body = state.surface("body").unwrap();
        assert_eq!(body.solid_color, css::RED.to_hex());
        assert!(!body.pattern.enabled);
        assert!(body.decorations.is_empty());
    }

    #[test]
    fn test_rescan_keeps_existing_specs() {
        let (mut registry, mut state, _) = loaded();
        state.set_solid_color("body", "#00ff00");

        let names = registry
            .load_model(&vec![SceneSurface::new("body", css::WHITE)], &mut state)
            .unwrap();

        assert_eq!(names, vec!["body".to_string()]);
        assert!(!registry.contains("sleeve"));
        assert_eq!(state.surface("body").unwrap().solid_color, "#00ff00");
    }

    #[test]
    fn test_empty_model() {
        let mut registry = MaterialRegistry::new();
        let mut state = DesignState::new();
        let result = registry.load_model(&Vec::new(), &mut state);
        assert_eq!(result, Err(ScanError::NoSurfaces));
        assert!(registry.list_surfaces().is_empty());
    }

    #[test]
    fn test_revisions_survive_reload() {
        let (mut registry, mut state, _) = loaded();
        let before = registry.slot("body").unwrap().revision();
        registry.load_model(&scene(), &mut state).unwrap();
        assert!(registry.slot("body").unwrap().revision() > before);
    }

    #[test]
    fn test_gradient_assigns_raster_and_white_tint() {
        let (mut registry, mut state, mut generator) = loaded();
        state.set_gradient("body", GradientSpec::linear("#3498db", "#e74c3c", 45.0));
        state.set_appearance_mode("body", AppearanceMode::Gradient);

        let spec = state.surface("body").unwrap().clone();
        assert!(registry.apply_appearance("body", &spec, &mut generator, 16));

        let slot = registry.slot("body").unwrap();
        assert_eq!(slot.base().tint, Srgba::WHITE);
        assert!(slot.base().texture.is_some());
    }

    #[test]
    fn test_solid_gradient_solid_round_trip() {
        let (mut registry, mut state, mut generator) = loaded();
        state.set_solid_color("body", "#123456");
        let spec = state.surface("body").unwrap().clone();
        registry.apply_appearance("body", &spec, &mut generator, 16);
        let original = registry.slot("body").unwrap().base().clone();

        state.set_appearance_mode("body", AppearanceMode::Gradient);
        let spec = state.surface("body").unwrap().clone();
        assert_eq!(
            registry.sync_appearance("body", &spec, &mut generator, 16),
            AppearanceSync::Applied
        );

        state.set_appearance_mode("body", AppearanceMode::Solid);
        let spec = state.surface("body").unwrap().clone();
        assert_eq!(
            registry.sync_appearance("body", &spec, &mut generator, 16),
            AppearanceSync::Applied
        );

        let slot = registry.slot("body").unwrap();
        assert_eq!(*slot.base(), original);
        assert!(slot.base().texture.is_none());
        assert_eq!(slot.displayed_color(), original.tint);
    }

    #[test]
    fn test_solid_edit_retargets() {
        let (mut registry, mut state, mut generator) = loaded();
        state.set_solid_color("body", "#00ff00");
        let spec = state.surface("body").unwrap().clone();

        assert_eq!(
            registry.sync_appearance("body", &spec, &mut generator, 16),
            AppearanceSync::Retargeted
        );
        let slot = registry.slot("body").unwrap();
        assert_eq!(slot.base().tint, css::LIME);
        assert_eq!(slot.displayed_color(), css::RED);
    }

    #[test]
    fn test_invalid_gradient_falls_back_to_solid() {
        let (mut registry, mut state, mut generator) = loaded();
        state.set_gradient("body", GradientSpec::linear("bogus", "#fff", 0.0));
        state.set_appearance_mode("body", AppearanceMode::Gradient);
        let spec = state.surface("body").unwrap().clone();

        registry.apply_appearance("body", &spec, &mut generator, 16);
        let slot = registry.slot("body").unwrap();
        assert!(slot.base().texture.is_none());
        assert_eq!(slot.base().tint, css::RED);
    }

    #[test]
    fn test_unknown_surface() {
        let (mut registry, state, mut generator) = loaded();
        let spec = state.surface("body").unwrap().clone();
        assert!(!registry.apply_appearance("collar", &spec, &mut generator, 16));
        assert_eq!(registry.overlay_status("collar"), None);
        assert!(registry.is_overlay_ready("body"));
    }
}
