use bevy::prelude::*;

use crate::animations_utils::LinkAnimationRigPluginFor;
use crate::assets::MyStates;
use crate::player::animations::*;
use crate::player::controller::*;

pub mod animations;
pub mod controller;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(LinkAnimationRigPluginFor::<PlayerRoot>::default());
        app.add_observer(on_player_spawn);
        app.add_observer(on_player_rig_ready);
        // One controller tick: ground probe, grab input, movement, shoving,
        // then the animator write.
        app.add_systems(
            Update,
            (
                update_grounding,
                handle_pull_input,
                apply_controls,
                whistle,
                push_dynamic_bodies,
                update_animation_signals,
                animations_from_signals,
                apply_animation_weights,
            )
                .chain()
                .run_if(in_state(MyStates::Next)),
        );
        app.add_systems(
            Update,
            cleanup_dust_puffs.run_if(in_state(MyStates::Next)),
        );
    }
}
