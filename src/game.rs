use std::f32::consts::PI;

use avian3d::prelude::*;
use bevy::light::CascadeShadowConfigBuilder;
use bevy::post_process::bloom::Bloom;
use bevy::post_process::motion_blur::MotionBlur;
use bevy::{math::Affine2, prelude::*};
use bevy_inspector_egui::bevy_egui::EguiPlugin;
use bevy_inspector_egui::quick::WorldInspectorPlugin;
use bevy_kira_audio::prelude::AudioPlugin;

use crate::assets::*;
use crate::camera::{CameraRig, CameraTarget};
use crate::companion::Companion;
use crate::player::controller::PlayerRoot;

pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(avian3d::prelude::PhysicsPlugins::default());
        app.insert_resource(avian3d::prelude::Gravity(Vec3::NEG_Y * 9.81));
        app.add_plugins(EguiPlugin::default());

        #[cfg(not(target_arch = "wasm32"))]
        app.add_plugins(WorldInspectorPlugin::new());

        app.add_plugins(AudioPlugin);
        app.add_plugins(bevy_hanabi::HanabiPlugin);
        app.add_plugins(crate::assets::AssetPlugin);
        app.add_plugins(crate::player::PlayerPlugin);
        app.add_plugins(crate::companion::CompanionPlugin);
        app.add_plugins(crate::camera::CameraPlugin);
        app.insert_resource(ClearColor(Color::srgb(0.48, 0.71, 0.89)));
        app.add_systems(OnEnter(MyStates::Next), setup);
    }
}

/// Lay out the meadow: ground slab, a handful of crates, lights, the rig,
/// the player and their companion.
fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut ambient_light: ResMut<AmbientLight>,
    assets: Res<GameAssets>,
) {
    ambient_light.brightness = 250.0;

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::OVERCAST_DAY,
            shadows_enabled: true,
            ..default()
        },
        Transform {
            translation: Vec3::new(0.0, 2.0, 0.0),
            rotation: Quat::from_rotation_x(-PI / 4.),
            ..default()
        },
        // The scene is small; tighter shadow bounds look better.
        CascadeShadowConfigBuilder {
            first_cascade_far_bound: 4.0,
            maximum_distance: 100.0,
            ..default()
        }
        .build(),
    ));

    // base
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(24.0, 0.1, 24.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color_texture: Some(assets.grass.clone()),
            uv_transform: Affine2::from_scale(Vec2::new(6.0, 6.0)),
            perceptual_roughness: 1.0,
            ..default()
        })),
        Name::new("Ground"),
        RigidBody::Static,
        Collider::cuboid(24.0, 0.1, 24.0),
    ));

    // Crates to shove around and drag back
    let planks = materials.add(StandardMaterial {
        base_color_texture: Some(assets.planks.clone()),
        perceptual_roughness: 0.9,
        ..default()
    });
    let crate_mesh = meshes.add(Cuboid::new(1.0, 1.0, 1.0));
    for (x, z) in [(3.0, -2.0), (-2.5, 3.5), (4.0, 4.0), (-4.0, -3.0)] {
        commands.spawn((
            Mesh3d(crate_mesh.clone()),
            MeshMaterial3d(planks.clone()),
            Transform::from_xyz(x, 0.55, z)
                .with_rotation(Quat::from_rotation_y(rand::random::<f32>() * PI)),
            Name::new("Crate"),
            RigidBody::Dynamic,
            Collider::cuboid(1.0, 1.0, 1.0),
        ));
    }

    commands.spawn((
        Camera3d::default(),
        CameraRig::default(),
        MotionBlur {
            shutter_angle: 1.25,
            samples: 2,
        },
        Transform::from_xyz(0.0, 5.0, 10.0).looking_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y),
        Bloom::NATURAL,
    ));

    commands.spawn((PlayerRoot, CameraTarget, Name::new("Player")));

    commands.spawn((
        Companion::default(),
        Transform::from_xyz(2.5, 0.05, 2.0),
        Name::new("Companion"),
    ));
}
