use bevy::prelude::*;

use crate::animations_utils::LinkAnimationRigPluginFor;
use crate::assets::{GameAssets, MyStates};

pub mod animations;
pub mod systems;

pub struct CompanionPlugin;

#[derive(Component, Default)]
#[require(Transform, InheritedVisibility)]
pub struct Companion {
    pub following: bool,
}

/// Straight-line stand-in for a navigation agent: give it a destination and
/// a speed, read back the velocity it resolved this tick. `None` means idle.
#[derive(Component, Default, Debug)]
pub struct NavAgent {
    pub destination: Option<Vec3>,
    pub speed: f32,
    pub velocity: Vec3,
    pub(crate) gait: Option<systems::Gait>,
}

/// One-way summon event from the player.
#[derive(Message)]
pub struct WhistleCommand;

impl Plugin for CompanionPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(LinkAnimationRigPluginFor::<Companion>::default());
        app.add_message::<WhistleCommand>();
        app.add_observer(on_companion_spawn);
        app.add_observer(animations::on_companion_rig_ready);
        app.add_systems(
            Update,
            (
                systems::toggle_follow_on_whistle,
                systems::follow_player,
                systems::drive_agents,
                animations::animations_from_agent,
                animations::apply_animation_weights,
            )
                .chain()
                .run_if(in_state(MyStates::Next)),
        );
    }
}

fn on_companion_spawn(on: On<Add, Companion>, mut commands: Commands, assets: Res<GameAssets>) {
    commands.entity(on.event_target()).insert((
        children![(
            SceneRoot(assets.companion.clone()),
            Transform::from_scale(Vec3::splat(0.5)),
        )],
        NavAgent::default(),
    ));
}
