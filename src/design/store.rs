//! The shared state description and its change notifications.

use std::collections::BTreeMap;

use bevy::prelude::*;

use super::decoration::{Decoration, DecorationKind, Placement, TextLabelSpec};
use super::spec::{AppearanceMode, GradientSpec, PatternOverlaySpec, SurfaceSpec};

/// A typed notification emitted by every [`DesignState`] mutator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DesignChange {
    SurfaceSeeded { surface: String },
    /// Mode, solid color or gradient changed.
    SurfaceAppearanceChanged { surface: String },
    PatternOverlayChanged { surface: String },
    DecorationAdded { surface: String, id: u32 },
    DecorationUpdated { surface: String, id: u32 },
    DecorationRemoved { surface: String, id: u32 },
    GlobalDecalsChanged,
}

impl DesignChange {
    /// The surface this change concerns, if any.
    pub fn surface(&self) -> Option<&str> {
        match self {
            Self::SurfaceSeeded { surface }
            | Self::SurfaceAppearanceChanged { surface }
            | Self::PatternOverlayChanged { surface }
            | Self::DecorationAdded { surface, .. }
            | Self::DecorationUpdated { surface, .. }
            | Self::DecorationRemoved { surface, .. } => Some(surface),
            Self::GlobalDecalsChanged => None,
        }
    }

    pub fn affects_decals(&self) -> bool {
        matches!(
            self,
            Self::DecorationAdded { .. }
                | Self::DecorationUpdated { .. }
                | Self::DecorationRemoved { .. }
                | Self::GlobalDecalsChanged
        )
    }
}

/// A global image slot: the full print, or a logo on the front or back.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSlot {
    pub enabled: bool,
    pub image: Option<String>,
    pub placement: Placement,
}

/// A global text slot on the front or back of the garment.
#[derive(Clone, Debug, PartialEq)]
pub struct TextSlot {
    pub enabled: bool,
    pub label: TextLabelSpec,
    pub placement: Placement,
}

/// Decal slots that are not bound to a particular surface.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalDecals {
    pub full_print: ImageSlot,
    pub front_logo: ImageSlot,
    pub front_text: TextSlot,
    pub back_logo: ImageSlot,
    pub back_text: TextSlot,
}

impl Default for GlobalDecals {
    fn default() -> Self {
        let front = Placement::new(Vec3::new(0.0, 0.1, 0.2), 0.2);
        let back = Placement::new(Vec3::new(0.0, 0.1, -0.2), 0.2)
            .with_rotation(Vec3::new(0.0, 180.0, 0.0));
        let below = Vec3::new(0.0, -0.15, 0.0);

        Self {
            full_print: ImageSlot {
                enabled: false,
                image: None,
                placement: Placement::new(Vec3::ZERO, 1.0),
            },
            front_logo: ImageSlot {
                enabled: false,
                image: None,
                placement: front,
            },
            front_text: TextSlot {
                enabled: false,
                label: TextLabelSpec::default(),
                placement: Placement {
                    position: front.position + below,
                    ..front
                },
            },
            back_logo: ImageSlot {
                enabled: false,
                image: None,
                placement: back,
            },
            back_text: TextSlot {
                enabled: false,
                label: TextLabelSpec::default(),
                placement: Placement {
                    position: back.position + below,
                    ..back
                },
            },
        }
    }
}

/// The state description shared between the UI and the engine.
///
/// The UI writes through the mutators below; each one records a
/// [`DesignChange`] which the engine drains once per frame. The engine never
/// writes back, except to seed surfaces it discovers on a freshly loaded model.
#[derive(Resource, Default, Debug)]
pub struct DesignState {
    surfaces: BTreeMap<String, SurfaceSpec>,
    global: GlobalDecals,
    changes: Vec<DesignChange>,
}

impl DesignState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface(&self, name: &str) -> Option<&SurfaceSpec> {
        self.surfaces.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.surfaces.contains_key(name)
    }

    pub fn surface_names(&self) -> impl Iterator<Item = &str> {
        self.surfaces.keys().map(String::as_str)
    }

    pub fn global_decals(&self) -> &GlobalDecals {
        &self.global
    }

    /// Create a default entry for `name` unless one already exists.
    ///
    /// Returns `true` if the surface was newly seeded.
    pub fn seed_surface(&mut self, name: &str, solid_color: impl Into<String>) -> bool {
        if self.surfaces.contains_key(name) {
            return false;
        }
        self.surfaces
            .insert(name.to_string(), SurfaceSpec::new(solid_color));
        self.push(DesignChange::SurfaceSeeded {
            surface: name.to_string(),
        });
        true
    }

    pub fn set_appearance_mode(&mut self, name: &str, mode: AppearanceMode) -> bool {
        self.edit_appearance(name, |spec| {
            let changed = spec.mode != mode;
            spec.mode = mode;
            changed
        })
    }

    pub fn set_solid_color(&mut self, name: &str, color: impl Into<String>) -> bool {
        let color = color.into();
        self.edit_appearance(name, |spec| {
            let changed = spec.solid_color != color;
            spec.solid_color = color;
            changed
        })
    }

    pub fn set_gradient(&mut self, name: &str, gradient: GradientSpec) -> bool {
        self.edit_appearance(name, |spec| {
            let changed = spec.gradient != gradient;
            spec.gradient = gradient;
            changed
        })
    }

    pub fn set_pattern_overlay(&mut self, name: &str, overlay: PatternOverlaySpec) -> bool {
        self.update_pattern_overlay(name, |current| *current = overlay)
    }

    /// Edit the overlay in place. Emits a change only if the overlay differs afterwards.
    pub fn update_pattern_overlay(
        &mut self,
        name: &str,
        edit: impl FnOnce(&mut PatternOverlaySpec),
    ) -> bool {
        let Some(spec) = self.surfaces.get_mut(name) else {
            return false;
        };
        let before = spec.pattern.clone();
        edit(&mut spec.pattern);
        if spec.pattern != before {
            self.push(DesignChange::PatternOverlayChanged {
                surface: name.to_string(),
            });
        }
        true
    }

    /// Append a logo to `name`. Returns the new decoration id.
    pub fn add_logo(
        &mut self,
        name: &str,
        image: Option<String>,
        placement: Placement,
    ) -> Option<u32> {
        self.add_decoration(name, placement, DecorationKind::Logo { image })
    }

    /// Append a text label to `name`. Returns the new decoration id.
    pub fn add_text_label(
        &mut self,
        name: &str,
        label: TextLabelSpec,
        placement: Placement,
    ) -> Option<u32> {
        self.add_decoration(name, placement, DecorationKind::Text(label))
    }

    /// Edit a decoration in place. Its id cannot be changed.
    pub fn update_decoration(
        &mut self,
        name: &str,
        id: u32,
        edit: impl FnOnce(&mut Decoration),
    ) -> bool {
        let Some(decoration) = self
            .surfaces
            .get_mut(name)
            .and_then(|spec| spec.decorations.iter_mut().find(|d| d.id == id))
        else {
            return false;
        };
        let before = decoration.clone();
        edit(decoration);
        decoration.id = id;
        if *decoration != before {
            self.push(DesignChange::DecorationUpdated {
                surface: name.to_string(),
                id,
            });
        }
        true
    }

    /// Remove a decoration by id. Returns `false` if it did not exist.
    pub fn remove_decoration(&mut self, name: &str, id: u32) -> bool {
        let Some(spec) = self.surfaces.get_mut(name) else {
            return false;
        };
        let before = spec.decorations.len();
        spec.decorations.retain(|d| d.id != id);
        if spec.decorations.len() == before {
            return false;
        }
        self.push(DesignChange::DecorationRemoved {
            surface: name.to_string(),
            id,
        });
        true
    }

    pub fn set_global_decals(&mut self, global: GlobalDecals) {
        self.update_global_decals(|current| *current = global);
    }

    pub fn update_global_decals(&mut self, edit: impl FnOnce(&mut GlobalDecals)) {
        let before = self.global.clone();
        edit(&mut self.global);
        if self.global != before {
            self.push(DesignChange::GlobalDecalsChanged);
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Take all queued changes, in emission order.
    pub fn drain_changes(&mut self) -> Vec<DesignChange> {
        std::mem::take(&mut self.changes)
    }

    fn add_decoration(
        &mut self,
        name: &str,
        placement: Placement,
        kind: DecorationKind,
    ) -> Option<u32> {
        let spec = self.surfaces.get_mut(name)?;
        let id = spec.next_decoration_id;
        spec.next_decoration_id += 1;
        spec.decorations.push(Decoration {
            id,
            enabled: true,
            placement,
            kind,
        });
        self.push(DesignChange::DecorationAdded {
            surface: name.to_string(),
            id,
        });
        Some(id)
    }

    fn edit_appearance(&mut self, name: &str, edit: impl FnOnce(&mut SurfaceSpec) -> bool) -> bool {
        let Some(spec) = self.surfaces.get_mut(name) else {
            return false;
        };
        if edit(spec) {
            self.push(DesignChange::SurfaceAppearanceChanged {
                surface: name.to_string(),
            });
        }
        true
    }

    fn push(&mut self, change: DesignChange) {
        self.changes.push(change);
    }
}
