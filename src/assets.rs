use bevy::prelude::*;
use bevy_asset_loader::prelude::*;
use bevy_hanabi::prelude::*;
use bevy_kira_audio::AudioSource;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Default, States)]
pub enum MyStates {
    #[default]
    AssetLoading,
    AssetPreparing,
    Next,
}

#[derive(Resource, AssetCollection)]
pub struct GameAssets {
    #[asset(path = "grass.png")]
    #[asset(image(sampler(filter = linear, wrap = repeat)))]
    pub grass: Handle<Image>,

    #[asset(path = "planks.png")]
    #[asset(image(sampler(filter = linear, wrap = repeat)))]
    pub planks: Handle<Image>,

    #[asset(path = "player.glb#Scene0")]
    pub player: Handle<Scene>,

    #[asset(
        paths(
            "player.glb#Animation0",
            "player.glb#Animation1",
            "player.glb#Animation2",
            "player.glb#Animation3",
            "player.glb#Animation4",
            "player.glb#Animation5",
            "player.glb#Animation6",
        ),
        collection(typed)
    )]
    pub player_clips: Vec<Handle<AnimationClip>>,

    #[asset(path = "companion.glb#Scene0")]
    pub companion: Handle<Scene>,

    #[asset(
        paths(
            "companion.glb#Animation0",
            "companion.glb#Animation1",
            "companion.glb#Animation2",
        ),
        collection(typed)
    )]
    pub companion_clips: Vec<Handle<AnimationClip>>,

    #[asset(path = "sounds/whistle.ogg")]
    pub whistle_sfx: Handle<AudioSource>,

    pub dust: Handle<EffectAsset>,
}

pub struct AssetPlugin;

impl Plugin for AssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<MyStates>()
            .add_loading_state(
                LoadingState::new(MyStates::AssetLoading)
                    .continue_to_state(MyStates::AssetPreparing)
                    .load_collection::<GameAssets>(),
            )
            .add_systems(OnEnter(MyStates::AssetPreparing), prepare_assets);
    }
}

fn prepare_assets(
    mut assets: ResMut<GameAssets>,
    mut effects: ResMut<Assets<EffectAsset>>,
    mut state: ResMut<NextState<MyStates>>,
) {
    assets.dust = create_dust_effect(&mut effects);

    state.set(MyStates::Next);
}

/// Short-lived dirt puff kicked up when the player starts shoving a crate
fn create_dust_effect(effects: &mut ResMut<Assets<EffectAsset>>) -> Handle<EffectAsset> {
    let mut color_gradient = bevy_hanabi::Gradient::new();
    color_gradient.add_key(0.0, Vec4::new(0.55, 0.48, 0.38, 0.8));
    color_gradient.add_key(0.4, Vec4::new(0.6, 0.55, 0.45, 0.4));
    color_gradient.add_key(1.0, Vec4::new(0.65, 0.6, 0.5, 0.0));

    let mut size_gradient = bevy_hanabi::Gradient::new();
    size_gradient.add_key(0.0, Vec3::splat(0.06));
    size_gradient.add_key(0.6, Vec3::splat(0.12));
    size_gradient.add_key(1.0, Vec3::splat(0.04));

    let writer = ExprWriter::new();

    let age = writer.lit(0.).expr();
    let init_age = SetAttributeModifier::new(Attribute::AGE, age);

    let lifetime = writer.lit(0.4).uniform(writer.lit(0.9)).expr();
    let init_lifetime = SetAttributeModifier::new(Attribute::LIFETIME, lifetime);

    // Spawn in a flat ring at the crate's base
    let init_pos = SetPositionCircleModifier {
        center: writer.lit(Vec3::ZERO).expr(),
        axis: writer.lit(Vec3::Y).expr(),
        radius: writer.lit(0.25).expr(),
        dimension: ShapeDimension::Surface,
    };

    // Low outward scatter with a little lift
    let random_x = writer.lit(-0.6).uniform(writer.lit(0.6));
    let random_z = writer.lit(-0.6).uniform(writer.lit(0.6));
    let upward_speed = writer.lit(0.3).uniform(writer.lit(0.8));
    let velocity = random_x.vec3(upward_speed, random_z);
    let init_vel = SetAttributeModifier::new(Attribute::VELOCITY, velocity.expr());

    let drag = writer.lit(2.5).expr();
    let update_drag = LinearDragModifier::new(drag);

    effects.add(
        EffectAsset::new(512, SpawnerSettings::once(24.0.into()), writer.finish())
            .with_name("dust")
            .init(init_pos)
            .init(init_vel)
            .init(init_age)
            .init(init_lifetime)
            .update(update_drag)
            .render(ColorOverLifetimeModifier {
                gradient: color_gradient,
                blend: ColorBlendMode::Modulate,
                mask: ColorBlendMask::RGBA,
            })
            .render(SizeOverLifetimeModifier {
                gradient: size_gradient,
                screen_space_size: false,
            }),
    )
}
