//! User-placed logos and text labels.

use std::hash::{Hash, Hasher};

use bevy::prelude::*;

/// Where a decal sits relative to the surface it is projected onto.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    /// Euler angles in degrees, applied X then Y then Z.
    pub rotation_degrees: Vec3,
    /// Edge length of the decal volume.
    pub scale: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation_degrees: Vec3::ZERO,
            scale: 0.2,
        }
    }
}

impl Placement {
    pub fn new(position: Vec3, scale: f32) -> Self {
        Self {
            position,
            scale,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, degrees: Vec3) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    pub fn to_transform(&self) -> Transform {
        let r = self.rotation_degrees;
        Transform {
            translation: self.position,
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                r.x.to_radians(),
                r.y.to_radians(),
                r.z.to_radians(),
            ),
            scale: Vec3::splat(self.scale),
        }
    }
}

/// Content, font and color of a rendered text label.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLabelSpec {
    pub content: String,
    pub font_family: String,
    pub point_size: f32,
    pub color: String,
}

impl Default for TextLabelSpec {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_family: "sans-serif".to_string(),
            point_size: 48.0,
            color: "#000000".to_string(),
        }
    }
}

impl TextLabelSpec {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_font(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size;
        self
    }
}

impl Hash for TextLabelSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content.hash(state);
        self.font_family.to_ascii_lowercase().hash(state);
        self.point_size.to_bits().hash(state);
        self.color.hash(state);
    }
}

/// What a decoration draws.
#[derive(Clone, Debug, PartialEq)]
pub enum DecorationKind {
    /// An uploaded image. `None` until the upload completes.
    Logo { image: Option<String> },
    Text(TextLabelSpec),
}

/// A logo or text label owned by one surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoration {
    /// Unique within the owning surface, stable for the decoration's lifetime.
    pub id: u32,
    pub enabled: bool,
    pub placement: Placement,
    pub kind: DecorationKind,
}

impl Decoration {
    pub fn is_logo(&self) -> bool {
        matches!(self.kind, DecorationKind::Logo { .. })
    }

    pub fn text(&self) -> Option<&TextLabelSpec> {
        match &self.kind {
            DecorationKind::Text(spec) => Some(spec),
            DecorationKind::Logo { .. } => None,
        }
    }
}
