//! Loads a garment model and cycles through decorations with the keyboard.
//!
//! Expects `assets/models/shirt.glb` with `body` and `sleeve` materials, a
//! pattern at `assets/patterns/dots.png` and optionally a font at
//! `assets/fonts/label.ttf`.
//!
//! Keys: `1` solid color, `2` gradient, `3` toggle pattern, `4` add a text label,
//! `Backspace` remove the last label.

use bevy::core_pipeline::prepass::DepthPrepass;
use bevy::prelude::*;
use bevy_garment::prelude::*;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(GarmentDecorPlugin::new(
            GarmentSettings::default().with_primary_surface("body"),
        ))
        .add_systems(Startup, (setup, load_fonts))
        .add_systems(
            Update,
            (install_label_font, edit_design, report_loading).after(GarmentSystems),
        )
        .run();
}

fn setup(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.spawn(SceneRoot(asset_server.load("models/shirt.glb#Scene0")));

    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            ..default()
        },
        Transform::from_xyz(2.0, 4.0, 3.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Forward decals sample the depth prepass
    commands.spawn((
        Camera3d::default(),
        DepthPrepass,
        Msaa::Off,
        Transform::from_xyz(0.0, 0.3, 1.6).looking_at(Vec3::new(0.0, 0.1, 0.0), Vec3::Y),
    ));
}

#[derive(Resource)]
struct LabelFont(Handle<Font>);

fn load_fonts(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.insert_resource(LabelFont(asset_server.load("fonts/label.ttf")));
}

/// Text decals use Bevy's bundled font until the label font arrives.
fn install_label_font(
    mut events: MessageReader<AssetEvent<Font>>,
    label: Res<LabelFont>,
    fonts: Res<Assets<Font>>,
    mut engine: ResMut<DecorEngine>,
) {
    for event in events.read() {
        if !event.is_loaded_with_dependencies(&label.0) {
            continue;
        }
        let Some(font) = fonts.get(&label.0) else {
            continue;
        };
        let mut library = FontLibrary::with_default_font();
        match library.load_font("sans-serif", &font.data) {
            Ok(()) => engine.set_text_shaper(library),
            Err(e) => warn!("{e}"),
        }
    }
}

fn edit_design(
    keys: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<DesignState>,
    mut labels: Local<Vec<u32>>,
) {
    if keys.just_pressed(KeyCode::Digit1) {
        state.set_solid_color("body", "#2ecc71");
        state.set_appearance_mode("body", AppearanceMode::Solid);
    }
    if keys.just_pressed(KeyCode::Digit2) {
        state.set_gradient("body", GradientSpec::linear("#3498db", "#e74c3c", 45.0));
        state.set_appearance_mode("body", AppearanceMode::Gradient);
    }
    if keys.just_pressed(KeyCode::Digit3) {
        state.update_pattern_overlay("body", |overlay| {
            overlay.enabled = !overlay.enabled;
            overlay.pattern = Some("patterns/dots.png".to_string());
            overlay.opacity = 0.5;
            overlay.scale = 6.0;
        });
    }
    if keys.just_pressed(KeyCode::Digit4) {
        let offset = labels.len() as f32 * 0.05;
        let placement = Placement::new(Vec3::new(0.25, 0.1 - offset, 0.0), 0.1)
            .with_rotation(Vec3::new(0.0, 90.0, 0.0));
        if let Some(id) = state.add_text_label(
            "sleeve",
            TextLabelSpec::new("HELLO").with_color("white"),
            placement,
        ) {
            labels.push(id);
        }
    }
    if keys.just_pressed(KeyCode::Backspace) {
        if let Some(id) = labels.pop() {
            state.remove_decoration("sleeve", id);
        }
    }
}

fn report_loading(engine: Res<DecorEngine>, mut shown: Local<Option<OverlayStatus>>) {
    let status = engine.overlay_status("body");
    if status != *shown {
        let indicator = if engine.overlay_ready("body") { "hidden" } else { "spinning" };
        info!("Pattern overlay on 'body' is {status:?}, loading indicator {indicator}");
        *shown = status;
    }
}
