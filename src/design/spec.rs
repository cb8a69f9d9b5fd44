//! Per-surface appearance descriptions.

use std::hash::{Hash, Hasher};

use super::decoration::Decoration;

/// Which base appearance a surface shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AppearanceMode {
    #[default]
    Solid,
    Gradient,
}

/// Shape of a two-stop gradient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
}

/// A two-stop gradient. Replaced wholesale on edit.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientSpec {
    pub kind: GradientKind,
    pub start: String,
    pub end: String,
    /// Direction in degrees. Only used by linear gradients.
    pub angle_degrees: f32,
}

impl Default for GradientSpec {
    fn default() -> Self {
        Self {
            kind: GradientKind::Linear,
            start: "#ffffff".to_string(),
            end: "#000000".to_string(),
            angle_degrees: 0.0,
        }
    }
}

impl GradientSpec {
    pub fn linear(start: impl Into<String>, end: impl Into<String>, angle_degrees: f32) -> Self {
        Self {
            kind: GradientKind::Linear,
            start: start.into(),
            end: end.into(),
            angle_degrees,
        }
    }

    pub fn radial(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            kind: GradientKind::Radial,
            start: start.into(),
            end: end.into(),
            angle_degrees: 0.0,
        }
    }
}

impl Hash for GradientSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.start.hash(state);
        self.end.hash(state);
        // The angle has no effect on radial gradients.
        if self.kind == GradientKind::Linear {
            self.angle_degrees.to_bits().hash(state);
        }
    }
}

/// How the pattern overlay is tinted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TintMode {
    #[default]
    Solid,
    Gradient,
}

/// A single tintable pattern laid over a surface's base appearance.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternOverlaySpec {
    pub enabled: bool,
    /// Asset path of the selected pattern image.
    pub pattern: Option<String>,
    /// Repeats per UV unit. Must be positive.
    pub scale: f32,
    pub opacity: f32,
    pub tint_mode: TintMode,
    pub tint_color: String,
    pub tint_gradient: GradientSpec,
    pub rotation_degrees: f32,
    pub roughness: f32,
    pub metalness: f32,
}

impl Default for PatternOverlaySpec {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern: None,
            scale: 1.0,
            opacity: 0.8,
            tint_mode: TintMode::Solid,
            tint_color: "#000000".to_string(),
            tint_gradient: GradientSpec::default(),
            rotation_degrees: 0.0,
            roughness: 0.5,
            metalness: 0.0,
        }
    }
}

impl PatternOverlaySpec {
    /// An enabled overlay using `pattern`, with default parameters.
    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            enabled: true,
            pattern: Some(pattern.into()),
            ..Default::default()
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_tint(mut self, color: impl Into<String>) -> Self {
        self.tint_mode = TintMode::Solid;
        self.tint_color = color.into();
        self
    }

    pub fn with_tint_gradient(mut self, gradient: GradientSpec) -> Self {
        self.tint_mode = TintMode::Gradient;
        self.tint_gradient = gradient;
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    /// The pattern path, if the overlay should currently be displayed.
    pub fn active_pattern(&self) -> Option<&str> {
        if self.enabled {
            self.pattern.as_deref().filter(|p| !p.is_empty())
        } else {
            None
        }
    }
}

/// Everything the user has configured for one named surface.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceSpec {
    pub mode: AppearanceMode,
    pub solid_color: String,
    pub gradient: GradientSpec,
    pub pattern: PatternOverlaySpec,
    /// Render order is insertion order.
    pub decorations: Vec<Decoration>,
    pub(crate) next_decoration_id: u32,
}

impl SurfaceSpec {
    /// A solid surface showing `color`, with no overlay and no decorations.
    pub fn new(solid_color: impl Into<String>) -> Self {
        Self {
            mode: AppearanceMode::Solid,
            solid_color: solid_color.into(),
            gradient: GradientSpec::default(),
            pattern: PatternOverlaySpec::default(),
            decorations: Vec::new(),
            next_decoration_id: 1,
        }
    }

    pub fn decoration(&self, id: u32) -> Option<&Decoration> {
        self.decorations.iter().find(|d| d.id == id)
    }
}

impl Default for SurfaceSpec {
    fn default() -> Self {
        Self::new("#ffffff")
    }
}
