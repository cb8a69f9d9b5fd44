//! # bevy_garment
//!
//! A Bevy plugin for decorating 3D garment models: per-surface solid or
//! gradient fills, tintable pattern overlays and projected logo/text decals,
//! all kept in sync with a central state description.
//!
//! ## Features
//!
//! - Surface discovery from glTF material names
//! - Procedural gradient and text rasters, cached by spec hash
//! - Opaque composite materials masking a repeating pattern over the base
//! - Revision-gated pattern loads: the latest edit always wins
//! - Frame-rate independent color easing
//! - Forward decals in a fixed stacking order
//!
//! ## Quick Start
//!
//! ```ignore
//! use bevy::core_pipeline::prepass::DepthPrepass;
//! use bevy::prelude::*;
//! use bevy_garment::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(GarmentDecorPlugin::default())
//!         .add_systems(Startup, setup)
//!         .add_systems(Update, paint)
//!         .run();
//! }
//!
//! fn setup(mut commands: Commands, asset_server: Res<AssetServer>) {
//!     commands.spawn(SceneRoot(asset_server.load("models/shirt.glb#Scene0")));
//!     commands.spawn((
//!         Camera3d::default(),
//!         DepthPrepass,
//!         Transform::from_xyz(0.0, 0.2, 1.5).looking_at(Vec3::ZERO, Vec3::Y),
//!     ));
//! }
//!
//! fn paint(mut state: ResMut<DesignState>, keys: Res<ButtonInput<KeyCode>>) {
//!     if keys.just_pressed(KeyCode::Space) {
//!         state.set_gradient("body", GradientSpec::linear("#3498db", "#e74c3c", 45.0));
//!         state.set_appearance_mode("body", AppearanceMode::Gradient);
//!     }
//! }
//! ```
//!
//! The engine core ([`engine::DecorEngine`] and everything below it) has no
//! ECS dependency and can be driven directly, which is how the unit tests use it.

pub mod decal;
pub mod design;
pub mod engine;
pub mod frame;
pub mod material;
mod plugin;
pub mod registry;
pub mod settings;
pub mod systems;
pub mod texture;

pub mod prelude {
    pub use crate::decal::{DecalImageSource, DecalKey, DecalPlan};
    pub use crate::design::{
        AppearanceMode, Decoration, DecorationKind, DesignChange, DesignState, GlobalDecals,
        GradientKind, GradientSpec, PatternOverlaySpec, Placement, SurfaceSpec, TextLabelSpec,
        TintMode,
    };
    pub use crate::engine::{DecorEngine, EngineEffect};
    pub use crate::material::{CompositeShading, PatternOverlayExtension};
    pub use crate::plugin::GarmentDecorPlugin;
    pub use crate::registry::{OverlayStatus, SceneSurface};
    pub use crate::settings::GarmentSettings;
    pub use crate::systems::{GarmentSystems, SurfaceBindings};
    pub use crate::texture::{FontLibrary, TextShaper};
}
