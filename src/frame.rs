//! Per-frame easing of displayed colors and refresh of composite parameters.

use bevy::prelude::*;

use crate::design::{AppearanceMode, DesignState};
use crate::material::OverlayParams;
use crate::registry::MaterialRegistry;
use crate::settings::GarmentSettings;

/// Channels closer than this to their target snap onto it.
const SNAP_EPSILON: f32 = 1e-4;

/// Surfaces touched by one [`FrameInterpolator::tick`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameUpdate {
    /// Surfaces whose displayed color moved this frame.
    pub colors_changed: Vec<String>,
    /// Surfaces whose composite parameters need to be re-uploaded.
    pub composites_dirty: Vec<String>,
}

impl FrameUpdate {
    pub fn is_empty(&self) -> bool {
        self.colors_changed.is_empty() && self.composites_dirty.is_empty()
    }
}

/// Eases solid colors toward their targets with a frame-rate independent half-life.
#[derive(Clone, Debug)]
pub struct FrameInterpolator {
    settings: GarmentSettings,
}

impl FrameInterpolator {
    pub fn new(settings: GarmentSettings) -> Self {
        Self { settings }
    }

    /// Fraction of the remaining distance covered in `dt` seconds.
    pub fn blend_factor(&self, dt: f32) -> f32 {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let half_life = self.settings.color_half_life;
        if half_life <= 0.0 || !half_life.is_finite() {
            return 1.0;
        }
        1.0 - (-dt / half_life).exp2()
    }

    /// Advance every surface by `dt` seconds.
    pub fn tick(
        &self,
        dt: f32,
        registry: &mut MaterialRegistry,
        state: &DesignState,
    ) -> FrameUpdate {
        let factor = self.blend_factor(dt);
        let mut update = FrameUpdate::default();
        let names = registry.list_surfaces().to_vec();

        for name in names {
            let Some(slot) = registry.slot_mut(&name) else {
                continue;
            };

            if slot.mode() == AppearanceMode::Solid {
                let current = slot.displayed_color();
                let next = ease(current, slot.base().tint, factor);
                if next != current {
                    slot.set_displayed_color(next);
                    update.colors_changed.push(name.clone());
                }
            }

            let displayed = slot.displayed_color();
            let revision = slot.revision();
            let Some(spec) = state.surface(&name) else {
                continue;
            };
            let Some(composite) = slot.composite_mut() else {
                continue;
            };
            // A composite still waiting on its replacement keeps the base it was built over.
            let base_color = if composite.revision == revision {
                displayed
            } else {
                composite.base_color
            };
            let overlay = OverlayParams::refreshed(&spec.pattern, &self.settings);
            if composite.overlay != overlay || composite.base_color != base_color {
                composite.overlay = overlay;
                composite.base_color = base_color;
                composite.mark_dirty();
            }
            if composite.is_dirty() {
                update.composites_dirty.push(name);
            }
        }

        update
    }
}

fn ease(current: Srgba, target: Srgba, factor: f32) -> Srgba {
    let step = |from: f32, to: f32| {
        let next = from + (to - from) * factor;
        if (to - next).abs() < SNAP_EPSILON {
            to
        } else {
            next
        }
    };
    Srgba::new(
        step(current.red, target.red),
        step(current.green, target.green),
        step(current.blue, target.blue),
        step(current.alpha, target.alpha),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::PatternOverlaySpec;
    use crate::material::{CompositeRequest, TextureCompositor};
    use crate::registry::SceneSurface;
    use crate::texture::{Raster, TextureGenerator};
    use bevy::color::palettes::css;

    fn loaded() -> (MaterialRegistry, DesignState, TextureGenerator) {
        let mut registry = MaterialRegistry::new();
        let mut state = DesignState::new();
        registry
            .load_model(&vec![SceneSurface::new("body", css::BLACK)], &mut state)
            .unwrap();
        (registry, state, TextureGenerator::new(4))
    }

    fn retarget(registry: &mut MaterialRegistry, state: &mut DesignState, generator: &mut TextureGenerator) {
        state.set_solid_color("body", "#ffffff");
        let spec = state.surface("body").unwrap().clone();
        registry.sync_appearance("body", &spec, generator, 4);
    }

    #[test]
    fn test_blend_factor() {
        let interpolator = FrameInterpolator::new(GarmentSettings::default());
        assert_eq!(interpolator.blend_factor(0.0), 0.0);
        assert!((interpolator.blend_factor(0.08) - 0.5).abs() < 1e-6);
        assert_eq!(interpolator.blend_factor(-1.0), 0.0);
        assert_eq!(interpolator.blend_factor(f32::NAN), 0.0);
    }

    #[test]
    fn test_easing_is_frame_rate_independent() {
        let interpolator = FrameInterpolator::new(GarmentSettings::default());

        let (mut fast, mut fast_state, mut generator) = loaded();
        retarget(&mut fast, &mut fast_state, &mut generator);
        for _ in 0..12 {
            interpolator.tick(1.0 / 120.0, &mut fast, &fast_state);
        }

        let (mut slow, mut slow_state, mut generator) = loaded();
        retarget(&mut slow, &mut slow_state, &mut generator);
        for _ in 0..3 {
            interpolator.tick(1.0 / 30.0, &mut slow, &slow_state);
        }

        let a = fast.slot("body").unwrap().displayed_color();
        let b = slow.slot("body").unwrap().displayed_color();
        assert!((a.red - b.red).abs() < 1e-4);
        assert!(a.red > 0.0 && a.red < 1.0);
    }

    #[test]
    fn test_easing_converges_and_snaps() {
        let interpolator = FrameInterpolator::new(GarmentSettings::default());
        let (mut registry, mut state, mut generator) = loaded();
        retarget(&mut registry, &mut state, &mut generator);

        let mut frames = 0;
        while registry.slot("body").unwrap().displayed_color() != Srgba::WHITE {
            let update = interpolator.tick(1.0 / 60.0, &mut registry, &state);
            assert_eq!(update.colors_changed, vec!["body".to_string()]);
            frames += 1;
            assert!(frames < 600);
        }
        assert!(interpolator.tick(1.0 / 60.0, &mut registry, &state).is_empty());
    }

    #[test]
    fn test_live_parameters_mark_composite_dirty() {
        let interpolator = FrameInterpolator::new(GarmentSettings::default());
        let compositor = TextureCompositor::new(GarmentSettings::default());
        let (mut registry, mut state, mut generator) = loaded();

        state.set_pattern_overlay("body", PatternOverlaySpec::with_pattern("p.png"));
        let spec = state.surface("body").unwrap().clone();
        let Some(CompositeRequest::Fetch(request)) =
            compositor.sync(&mut registry, "body", &spec, &mut generator)
        else {
            panic!("expected a fetch");
        };
        let pattern = Raster::filled(1, 1, [0, 0, 0, 255]).unwrap();
        compositor.complete(&mut registry, &request, Ok(pattern), &spec, &mut generator);
        assert!(interpolator.tick(0.016, &mut registry, &state).composites_dirty.is_empty());

        state.update_pattern_overlay("body", |p| p.opacity = 0.25);
        let update = interpolator.tick(0.016, &mut registry, &state);
        assert_eq!(update.composites_dirty, vec!["body".to_string()]);
        let composite = registry.slot("body").unwrap().composite().unwrap();
        assert_eq!(composite.overlay.opacity, 0.25);
    }

    #[test]
    fn test_pending_composite_keeps_its_base_color() {
        let interpolator = FrameInterpolator::new(GarmentSettings::default());
        let compositor = TextureCompositor::new(GarmentSettings::default());
        let (mut registry, mut state, mut generator) = loaded();

        state.set_pattern_overlay("body", PatternOverlaySpec::with_pattern("a.png"));
        let spec = state.surface("body").unwrap().clone();
        let Some(CompositeRequest::Fetch(request)) =
            compositor.sync(&mut registry, "body", &spec, &mut generator)
        else {
            panic!("expected a fetch");
        };
        let pattern = Raster::filled(1, 1, [0, 0, 0, 255]).unwrap();
        compositor.complete(&mut registry, &request, Ok(pattern), &spec, &mut generator);

        // A second pattern is in flight while the color eases.
        state.set_pattern_overlay("body", PatternOverlaySpec::with_pattern("b.png"));
        let spec = state.surface("body").unwrap().clone();
        compositor.sync(&mut registry, "body", &spec, &mut generator);
        retarget(&mut registry, &mut state, &mut generator);
        interpolator.tick(0.08, &mut registry, &state);

        let slot = registry.slot("body").unwrap();
        assert!(slot.displayed_color().red > 0.0);
        assert_eq!(slot.composite().unwrap().base_color, css::BLACK);
    }
}
