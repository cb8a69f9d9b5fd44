//! Scene-graph query seam.

use bevy::prelude::*;

/// One material slot found in a loaded model.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneSurface {
    pub name: String,
    /// Whether any mesh actually renders with this material.
    pub has_geometry: bool,
    /// Base color authored in the model file.
    pub original_color: Srgba,
}

impl SceneSurface {
    pub fn new(name: impl Into<String>, original_color: Srgba) -> Self {
        Self {
            name: name.into(),
            has_geometry: true,
            original_color,
        }
    }
}

/// Anything that can enumerate the surfaces of a loaded model.
pub trait SceneQuery {
    fn surfaces(&self) -> Vec<SceneSurface>;
}

impl SceneQuery for Vec<SceneSurface> {
    fn surfaces(&self) -> Vec<SceneSurface> {
        self.clone()
    }
}
