//! Decal planning: which images are projected where, and in which order.

use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use bevy::prelude::*;

use crate::design::{DecorationKind, DesignState, Placement, TextLabelSpec};
use crate::texture::{Raster, TextureGenerator, TextureSpec};

/// Identity of a decal draw, stable across re-plans.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DecalKey {
    FullPrint,
    FrontLogo,
    FrontText,
    BackLogo,
    BackText,
    Decoration { surface: String, id: u32 },
}

/// Source of a decal's pixels.
#[derive(Clone, Debug)]
pub enum DecalImage {
    /// An external image, already loaded.
    Path(String),
    /// A synthesized text raster.
    Raster(Arc<Raster>),
}

impl PartialEq for DecalImage {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Path(a), Self::Path(b)) => a == b,
            (Self::Raster(a), Self::Raster(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// One projected image.
#[derive(Clone, Debug, PartialEq)]
pub struct DecalDraw {
    pub key: DecalKey,
    pub image: DecalImage,
    pub transform: Transform,
    /// Stacking order. Higher layers occlude lower ones.
    pub layer: u32,
}

impl DecalDraw {
    /// Whether `point` lies inside this draw's unit decal volume.
    pub fn contains(&self, point: Vec3) -> bool {
        let local = self.transform.compute_affine().inverse().transform_point3(point);
        local.abs().max_element() <= 0.5
    }
}

/// Ordered decal draws for one evaluation of the state description.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecalPlan {
    draws: Vec<DecalDraw>,
}

impl DecalPlan {
    pub fn draws(&self) -> &[DecalDraw] {
        &self.draws
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn get(&self, key: &DecalKey) -> Option<&DecalDraw> {
        self.draws.iter().find(|d| &d.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &DecalKey> {
        self.draws.iter().map(|d| &d.key)
    }

    /// The draw visible at `point`: the last one whose volume contains it.
    pub fn topmost_at(&self, point: Vec3) -> Option<&DecalDraw> {
        self.draws.iter().rev().find(|d| d.contains(point))
    }

    fn push(&mut self, key: DecalKey, image: DecalImage, placement: &Placement) {
        let layer = self.draws.len() as u32;
        self.draws.push(DecalDraw {
            key,
            image,
            transform: placement.to_transform(),
            layer,
        });
    }
}

/// Tells the planner whether an external image has finished loading.
pub trait DecalImageSource {
    /// May start the load as a side effect.
    fn is_ready(&mut self, path: &str) -> bool;
}

impl DecalImageSource for HashSet<String> {
    fn is_ready(&mut self, path: &str) -> bool {
        self.contains(path)
    }
}

struct TextEntry {
    spec_hash: u64,
    raster: Arc<Raster>,
}

/// Plans decal draws and owns the text rasters they reference.
#[derive(Default)]
pub struct DecalOverlayManager {
    texts: HashMap<DecalKey, TextEntry>,
}

impl std::fmt::Debug for DecalOverlayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecalOverlayManager")
            .field("texts", &self.texts.len())
            .finish()
    }
}

impl DecalOverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate every decal slot of `state`.
    ///
    /// Order: full print, front logo, front text, back logo, back text, then
    /// the decorations of each surface in `surfaces` order, each list in
    /// insertion order. Logos whose image is not ready are left out of this
    /// plan. Text rasters no longer referenced are released.
    pub fn plan(
        &mut self,
        state: &DesignState,
        surfaces: &[String],
        images: &mut dyn DecalImageSource,
        generator: &mut TextureGenerator,
    ) -> DecalPlan {
        let mut plan = DecalPlan::default();
        let global = state.global_decals();

        let print = &global.full_print;
        if print.enabled {
            let image = print.image.as_deref();
            self.plan_image(&mut plan, DecalKey::FullPrint, image, &print.placement, images);
        }
        for (logo_key, logo, text_key, text) in [
            (DecalKey::FrontLogo, &global.front_logo, DecalKey::FrontText, &global.front_text),
            (DecalKey::BackLogo, &global.back_logo, DecalKey::BackText, &global.back_text),
        ] {
            if logo.enabled {
                let image = logo.image.as_deref();
                self.plan_image(&mut plan, logo_key, image, &logo.placement, images);
            }
            if text.enabled {
                self.plan_text(&mut plan, text_key, &text.label, &text.placement, generator);
            }
        }

        for surface in surfaces {
            let Some(spec) = state.surface(surface) else {
                continue;
            };
            for decoration in spec.decorations.iter().filter(|d| d.enabled) {
                let key = DecalKey::Decoration {
                    surface: surface.clone(),
                    id: decoration.id,
                };
                let placement = &decoration.placement;
                match &decoration.kind {
                    DecorationKind::Logo { image } => {
                        self.plan_image(&mut plan, key, image.as_deref(), placement, images)
                    }
                    DecorationKind::Text(label) => {
                        self.plan_text(&mut plan, key, label, placement, generator)
                    }
                }
            }
        }

        let live: HashSet<&DecalKey> = plan.keys().collect();
        self.texts.retain(|key, _| live.contains(key));
        debug!("Planned {} decals", plan.len());
        plan
    }

    /// Drop the text raster held for `key`.
    pub fn evict(&mut self, key: &DecalKey) -> bool {
        self.texts.remove(key).is_some()
    }

    /// Drop every raster held for decorations of `surface`.
    pub fn evict_surface(&mut self, surface: &str) {
        self.texts.retain(|key, _| {
            !matches!(key, DecalKey::Decoration { surface: s, .. } if s == surface)
        });
    }

    pub fn text_count(&self) -> usize {
        self.texts.len()
    }

    fn plan_image(
        &self,
        plan: &mut DecalPlan,
        key: DecalKey,
        image: Option<&str>,
        placement: &Placement,
        images: &mut dyn DecalImageSource,
    ) {
        let Some(path) = image.filter(|p| !p.is_empty()) else {
            return;
        };
        if !images.is_ready(path) {
            debug!("Decal {key:?} waits for '{path}'");
            return;
        }
        plan.push(key, DecalImage::Path(path.to_string()), placement);
    }

    fn plan_text(
        &mut self,
        plan: &mut DecalPlan,
        key: DecalKey,
        label: &TextLabelSpec,
        placement: &Placement,
        generator: &mut TextureGenerator,
    ) {
        if label.content.trim().is_empty() {
            return;
        }
        let spec_hash = {
            let mut hasher = DefaultHasher::new();
            label.hash(&mut hasher);
            hasher.finish()
        };

        let raster = match self.texts.get(&key) {
            Some(entry) if entry.spec_hash == spec_hash => entry.raster.clone(),
            _ => {
                let Some(raster) = generator.generate(&TextureSpec::Text(label.clone())) else {
                    self.texts.remove(&key);
                    return;
                };
                self.texts.insert(
                    key.clone(),
                    TextEntry {
                        spec_hash,
                        raster: raster.clone(),
                    },
                );
                raster
            }
        };
        plan.push(key, DecalImage::Raster(raster), placement);
    }
}
