//! Surface discovery and base appearance synchronization.
//!
//! [`MaterialRegistry`] owns one [`SurfaceSlot`] per named material slot of the
//! loaded model. Callers pull from it through [`MaterialRegistry::list_surfaces`]
//! and push appearance through [`MaterialRegistry::apply_appearance`]; nothing
//! reaches into the live render graph from here.

mod scene;
mod table;

pub use scene::{SceneQuery, SceneSurface};
pub use table::{
    AppearanceSync, BaseAppearance, MaterialRegistry, OverlayStatus, ScanError, SurfaceSlot,
};
