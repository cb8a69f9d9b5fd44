//! Revision-gated fetch-and-build of composite materials.

use std::sync::Arc;

use bevy::prelude::*;
use thiserror::Error;

use super::composite::{CompositeKey, CompositeMaterial, MaskSettings, OverlayParams};
use crate::design::{SurfaceSpec, TintMode};
use crate::registry::MaterialRegistry;
use crate::settings::GarmentSettings;
use crate::texture::{Raster, RasterError, TextureGenerator, TextureSpec};

/// Errors that can occur while fetching a pattern image.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Failed to load '{path}': {reason}")]
    Load { path: String, reason: String },

    #[error("Failed to decode '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: RasterError,
    },

    #[error("Image '{path}' finished loading but is not available")]
    MissingAsset { path: String },
}

/// An image fetch the host must perform and report back through
/// [`TextureCompositor::complete`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub surface: String,
    /// Surface revision captured when the request was issued.
    pub revision: u64,
    pub path: String,
}

/// Work resulting from a spec change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompositeRequest {
    Fetch(FetchRequest),
    /// Only the base appearance moved. The current composite was rebuilt in
    /// place over it from the pattern it already holds.
    Rebuilt,
    /// The overlay was disabled; the surface goes back to its base material.
    Clear,
}

/// What happened to a completed fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The composite is now current for its surface.
    Applied,
    /// A newer revision exists; the result was dropped.
    Superseded,
    /// The fetch failed; the surface keeps its prior material.
    Failed,
}

/// Builds composites from fetched patterns, applying only the latest revision.
#[derive(Clone, Debug)]
pub struct TextureCompositor {
    settings: GarmentSettings,
}

impl TextureCompositor {
    pub fn new(settings: GarmentSettings) -> Self {
        Self { settings }
    }

    /// React to a possible change of `spec`.
    ///
    /// Bumps the surface revision when a structural field changed, which
    /// invalidates any fetch in flight for it. Call after the registry took
    /// the new base appearance.
    pub fn sync(
        &self,
        registry: &mut MaterialRegistry,
        name: &str,
        spec: &SurfaceSpec,
        generator: &mut TextureGenerator,
    ) -> Option<CompositeRequest> {
        let key = CompositeKey::from_spec(spec);
        let unchanged = registry
            .slot(name)?
            .composite_key
            .as_ref()
            .is_some_and(|current| *current == key);
        if unchanged {
            return None;
        }

        let revision = registry.next_revision();
        let slot = registry.slot_mut(name)?;
        slot.revision = revision;
        slot.failed = None;

        let holds_pattern = key.pattern().is_some_and(|path| {
            slot.composite
                .as_ref()
                .is_some_and(|composite| composite.pattern_path == path)
        });
        let request = match key.pattern() {
            Some(_) if holds_pattern => {
                slot.pending = None;
                let tint_texture = self.tint_texture(spec, generator);
                let base_texture = slot.base().texture.clone();
                let base_color = slot.displayed_color();
                if let Some(composite) = slot.composite_mut() {
                    composite.rebase(revision, base_texture, tint_texture, base_color);
                }
                debug!("Surface '{name}' rebuilt over its new base at revision {revision}");
                Some(CompositeRequest::Rebuilt)
            }
            Some(path) => {
                slot.pending = Some(revision);
                debug!("Surface '{name}' requests pattern '{path}' at revision {revision}");
                Some(CompositeRequest::Fetch(FetchRequest {
                    surface: name.to_string(),
                    revision,
                    path: path.to_string(),
                }))
            }
            None => {
                slot.pending = None;
                slot.composite.take().map(|_| CompositeRequest::Clear)
            }
        };
        slot.composite_key = Some(key);
        request
    }

    /// Apply the result of `request` if it is still current.
    pub fn complete(
        &self,
        registry: &mut MaterialRegistry,
        request: &FetchRequest,
        result: Result<Raster, FetchError>,
        spec: &SurfaceSpec,
        generator: &mut TextureGenerator,
    ) -> BuildOutcome {
        let Some(slot) = registry.slot_mut(&request.surface) else {
            debug!("Dropping pattern for vanished surface '{}'", request.surface);
            return BuildOutcome::Superseded;
        };
        if slot.revision != request.revision || slot.pending != Some(request.revision) {
            debug!(
                "Dropping stale pattern '{}' for '{}' (revision {} < {})",
                request.path, request.surface, request.revision, slot.revision
            );
            return BuildOutcome::Superseded;
        }
        slot.pending = None;

        let pattern = match result {
            Ok(pattern) => Arc::new(pattern),
            Err(e) => {
                warn!("Pattern overlay for '{}' unavailable: {e}", request.surface);
                slot.failed = Some(request.revision);
                return BuildOutcome::Failed;
            }
        };

        let tint_texture = self.tint_texture(spec, generator);
        let composite = CompositeMaterial::new(
            request.revision,
            request.path.clone(),
            pattern,
            slot.base().texture.clone(),
            tint_texture,
            // White over a real gradient, the fallback solid color otherwise.
            slot.displayed_color(),
            OverlayParams::sanitized(&spec.pattern, &self.settings),
            MaskSettings::from_settings(&self.settings),
        );
        // Replacing drops the previous composite and every texture only it held.
        slot.composite = Some(composite);
        info!(
            "Applied pattern '{}' to '{}' at revision {}",
            request.path, request.surface, request.revision
        );
        BuildOutcome::Applied
    }

    fn tint_texture(
        &self,
        spec: &SurfaceSpec,
        generator: &mut TextureGenerator,
    ) -> Option<Arc<Raster>> {
        match spec.pattern.tint_mode {
            TintMode::Solid => None,
            TintMode::Gradient => generator.generate(&TextureSpec::Gradient {
                gradient: spec.pattern.tint_gradient.clone(),
                size: self.settings.gradient_resolution,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{AppearanceMode, DesignState, GradientSpec, PatternOverlaySpec};
    use crate::registry::{OverlayStatus, SceneSurface};
    use bevy::color::palettes::css;

    struct Fixture {
        registry: MaterialRegistry,
        state: DesignState,
        generator: TextureGenerator,
        compositor: TextureCompositor,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = MaterialRegistry::new();
            let mut state = DesignState::new();
            registry
                .load_model(&vec![SceneSurface::new("body", css::WHITE)], &mut state)
                .unwrap();
            Self {
                registry,
                state,
                generator: TextureGenerator::new(8),
                compositor: TextureCompositor::new(
                    GarmentSettings::default().with_gradient_resolution(8),
                ),
            }
        }

        fn select(&mut self, pattern: &str) -> FetchRequest {
            self.state
                .set_pattern_overlay("body", PatternOverlaySpec::with_pattern(pattern));
            let spec = self.state.surface("body").unwrap().clone();
            match self
                .compositor
                .sync(&mut self.registry, "body", &spec, &mut self.generator)
            {
                Some(CompositeRequest::Fetch(request)) => request,
                other => panic!("expected a fetch, got {other:?}"),
            }
        }

        fn finish(&mut self, request: &FetchRequest, result: Result<Raster, FetchError>) -> BuildOutcome {
            let spec = self.state.surface("body").unwrap().clone();
            self.compositor
                .complete(&mut self.registry, request, result, &spec, &mut self.generator)
        }

        fn resync(&mut self) -> Option<CompositeRequest> {
            let spec = self.state.surface("body").unwrap().clone();
            self.registry
                .sync_appearance("body", &spec, &mut self.generator, 8);
            self.compositor
                .sync(&mut self.registry, "body", &spec, &mut self.generator)
        }

        fn current_path(&self) -> Option<String> {
            self.registry
                .slot("body")
                .unwrap()
                .composite()
                .map(|c| c.pattern_path.clone())
        }
    }

    fn pattern() -> Raster {
        Raster::filled(2, 2, [0, 0, 0, 255]).unwrap()
    }

    fn unmasked_pattern() -> Raster {
        Raster::filled(2, 2, [255, 255, 255, 255]).unwrap()
    }

    fn close(a: Srgba, b: Srgba) -> bool {
        (a.red - b.red).abs() < 1e-3
            && (a.green - b.green).abs() < 1e-3
            && (a.blue - b.blue).abs() < 1e-3
    }

    #[test]
    fn test_latest_request_wins_regardless_of_completion_order() {
        let mut fx = Fixture::new();
        let requests: Vec<FetchRequest> = ["a.png", "b.png", "c.png", "d.png"]
            .iter()
            .map(|p| fx.select(p))
            .collect();
        assert!(requests.windows(2).all(|w| w[0].revision < w[1].revision));

        // Last issued completes first, stale ones straggle in afterwards.
        let order = [3, 1, 0, 2];
        let outcomes: Vec<BuildOutcome> = order
            .iter()
            .map(|&i| fx.finish(&requests[i], Ok(pattern())))
            .collect();

        assert_eq!(
            outcomes,
            vec![
                BuildOutcome::Applied,
                BuildOutcome::Superseded,
                BuildOutcome::Superseded,
                BuildOutcome::Superseded
            ]
        );
        assert_eq!(fx.current_path().as_deref(), Some("d.png"));
    }

    #[test]
    fn test_stale_completion_before_latest() {
        let mut fx = Fixture::new();
        let first = fx.select("a.png");
        let second = fx.select("b.png");

        assert_eq!(fx.finish(&first, Ok(pattern())), BuildOutcome::Superseded);
        assert_eq!(fx.current_path(), None);
        assert_eq!(fx.registry.overlay_status("body"), Some(OverlayStatus::Loading));

        assert_eq!(fx.finish(&second, Ok(pattern())), BuildOutcome::Applied);
        assert_eq!(fx.registry.overlay_status("body"), Some(OverlayStatus::Ready));
        assert!(fx.registry.is_overlay_ready("body"));
    }

    #[test]
    fn test_duplicate_completion_is_ignored() {
        let mut fx = Fixture::new();
        let request = fx.select("a.png");
        assert_eq!(fx.finish(&request, Ok(pattern())), BuildOutcome::Applied);
        assert_eq!(fx.finish(&request, Ok(pattern())), BuildOutcome::Superseded);
    }

    #[test]
    fn test_failure_keeps_prior_composite() {
        let mut fx = Fixture::new();
        let first = fx.select("a.png");
        fx.finish(&first, Ok(pattern()));

        let second = fx.select("missing.png");
        let outcome = fx.finish(
            &second,
            Err(FetchError::Load {
                path: "missing.png".to_string(),
                reason: "not found".to_string(),
            }),
        );

        assert_eq!(outcome, BuildOutcome::Failed);
        assert_eq!(fx.current_path().as_deref(), Some("a.png"));
        assert_eq!(fx.registry.overlay_status("body"), Some(OverlayStatus::Failed));
        assert!(fx.registry.is_overlay_ready("body"));
    }

    #[test]
    fn test_failed_first_fetch_settles_loading() {
        let mut fx = Fixture::new();
        let request = fx.select("missing.png");
        assert!(!fx.registry.is_overlay_ready("body"));

        let error = FetchError::MissingAsset {
            path: "missing.png".to_string(),
        };
        assert_eq!(fx.finish(&request, Err(error)), BuildOutcome::Failed);
        assert_eq!(fx.current_path(), None);
        assert!(fx.registry.is_overlay_ready("body"));
    }

    #[test]
    fn test_unchanged_spec_issues_nothing() {
        let mut fx = Fixture::new();
        fx.select("a.png");
        let revision = fx.registry.slot("body").unwrap().revision();

        fx.state.update_pattern_overlay("body", |p| p.opacity = 0.3);
        let spec = fx.state.surface("body").unwrap().clone();
        assert_eq!(
            fx.compositor
                .sync(&mut fx.registry, "body", &spec, &mut fx.generator),
            None
        );
        assert_eq!(fx.registry.slot("body").unwrap().revision(), revision);
    }

    #[test]
    fn test_disable_clears_composite_and_invalidates_fetch() {
        let mut fx = Fixture::new();
        let first = fx.select("a.png");
        fx.finish(&first, Ok(pattern()));
        let second = fx.select("b.png");

        fx.state.update_pattern_overlay("body", |p| p.enabled = false);
        let spec = fx.state.surface("body").unwrap().clone();
        assert_eq!(
            fx.compositor
                .sync(&mut fx.registry, "body", &spec, &mut fx.generator),
            Some(CompositeRequest::Clear)
        );
        assert_eq!(fx.finish(&second, Ok(pattern())), BuildOutcome::Superseded);
        assert_eq!(fx.current_path(), None);
        assert_eq!(fx.registry.overlay_status("body"), Some(OverlayStatus::Disabled));
    }

    #[test]
    fn test_replaced_composite_releases_textures() {
        let mut fx = Fixture::new();
        let first = fx.select("a.png");
        fx.finish(&first, Ok(pattern()));
        let weak = Arc::downgrade(&fx.registry.slot("body").unwrap().composite().unwrap().pattern);

        let second = fx.select("b.png");
        fx.finish(&second, Ok(pattern()));
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_gradient_tint_generates_texture() {
        let mut fx = Fixture::new();
        fx.state.set_pattern_overlay(
            "body",
            PatternOverlaySpec::with_pattern("a.png").with_tint_gradient(
                GradientSpec::linear("#ff0000", "#0000ff", 0.0),
            ),
        );
        let spec = fx.state.surface("body").unwrap().clone();
        let Some(CompositeRequest::Fetch(request)) =
            fx.compositor
                .sync(&mut fx.registry, "body", &spec, &mut fx.generator)
        else {
            panic!("expected a fetch");
        };

        assert_eq!(fx.finish(&request, Ok(pattern())), BuildOutcome::Applied);
        let composite = fx.registry.slot("body").unwrap().composite().unwrap();
        assert!(composite.tint_texture.is_some());
    }

    #[test]
    fn test_gradient_to_solid_rebuilds_over_new_base() {
        let mut fx = Fixture::new();
        fx.state
            .set_gradient("body", GradientSpec::linear("#000000", "#ffffff", 0.0));
        fx.state.set_appearance_mode("body", AppearanceMode::Gradient);
        fx.resync();
        let request = fx.select("a.png");
        assert_eq!(fx.finish(&request, Ok(unmasked_pattern())), BuildOutcome::Applied);
        assert!(fx.registry.slot("body").unwrap().composite().unwrap().base_texture.is_some());

        fx.state.set_solid_color("body", "#00ff00");
        fx.state.set_appearance_mode("body", AppearanceMode::Solid);
        assert_eq!(fx.resync(), Some(CompositeRequest::Rebuilt));

        let slot = fx.registry.slot("body").unwrap();
        let composite = slot.composite().unwrap();
        assert_eq!(composite.revision, slot.revision());
        assert!(composite.base_texture.is_none());
        assert!(composite.is_dirty());
        assert!(close(composite.shade(Vec2::new(0.1, 0.5)), css::LIME));
        assert!(close(composite.shade(Vec2::new(0.9, 0.5)), css::LIME));
        assert_eq!(fx.registry.overlay_status("body"), Some(OverlayStatus::Ready));
    }

    #[test]
    fn test_reselecting_held_pattern_drops_pending_fetch() {
        let mut fx = Fixture::new();
        let first = fx.select("a.png");
        fx.finish(&first, Ok(pattern()));
        let second = fx.select("b.png");

        fx.state
            .set_pattern_overlay("body", PatternOverlaySpec::with_pattern("a.png"));
        assert_eq!(fx.resync(), Some(CompositeRequest::Rebuilt));
        assert_eq!(fx.finish(&second, Ok(pattern())), BuildOutcome::Superseded);
        assert_eq!(fx.current_path().as_deref(), Some("a.png"));
        assert_eq!(fx.registry.overlay_status("body"), Some(OverlayStatus::Ready));
    }

    #[test]
    fn test_failed_gradient_composite_keeps_solid_fallback() {
        let mut fx = Fixture::new();
        fx.state.set_solid_color("body", "#ff0000");
        fx.state
            .set_gradient("body", GradientSpec::linear("bogus", "#ffffff", 0.0));
        fx.state.set_appearance_mode("body", AppearanceMode::Gradient);
        fx.resync();

        let request = fx.select("a.png");
        assert_eq!(fx.finish(&request, Ok(unmasked_pattern())), BuildOutcome::Applied);
        let composite = fx.registry.slot("body").unwrap().composite().unwrap();
        assert_eq!(composite.base_color, css::RED);
        assert!(close(composite.shade(Vec2::new(0.5, 0.5)), css::RED));
    }
}
