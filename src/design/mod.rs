//! The state description edited by the UI and read by the engine.
//!
//! The UI only ever talks to [`DesignState`]. Every mutator records a typed
//! [`DesignChange`], so engine components react to the edits they care about
//! instead of re-running on any change.

mod color;
mod decoration;
mod spec;
mod store;

pub use color::{ColorParseError, parse_color, parse_color_or};
pub use decoration::{Decoration, DecorationKind, Placement, TextLabelSpec};
pub use spec::{
    AppearanceMode, GradientKind, GradientSpec, PatternOverlaySpec, SurfaceSpec, TintMode,
};
pub use store::{DesignChange, DesignState, GlobalDecals, ImageSlot, TextSlot};
