//! Logo, text and full-print decals projected onto the primary surface.
//!
//! [`DecalOverlayManager::plan`] turns the state description into an ordered
//! [`DecalPlan`]; the [`sync_decals`] system reconciles decal entities with it.

mod overlay;
mod systems;

pub use overlay::{DecalDraw, DecalImage, DecalImageSource, DecalKey, DecalOverlayManager, DecalPlan};
pub use systems::{DecalEntities, decal_transform, sync_decals};
