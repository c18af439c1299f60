use bevy::prelude::*;

use crate::{
    animations_utils::AnimationRigOf,
    assets::GameAssets,
    player::controller::{AnimationSignals, PlayerRoot},
};

/// Above this blended speed the locomotion weight shifts from walk to run.
const RUN_BLEND_THRESHOLD: f32 = 0.7;
const WEIGHT_RATE: f32 = 5.0;

#[derive(Debug, Default, Component)]
pub struct PlayerAnimationsT<T> {
    idle: T,
    walking: T,
    running: T,
    pushing: T,
    pulling: T,
    jump: T,
    whistle: T,
}

impl<T> PlayerAnimationsT<T> {
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        [
            &self.idle,
            &self.walking,
            &self.running,
            &self.pushing,
            &self.pulling,
            &self.jump,
            &self.whistle,
        ]
        .into_iter()
    }
}

type PlayerClips = PlayerAnimationsT<AnimationNodeIndex>;
type PlayerWeights = PlayerAnimationsT<f32>;

pub fn on_player_rig_ready(
    on: On<Add, AnimationRigOf>,
    rigs: Query<&AnimationRigOf>,
    roots: Query<(), With<PlayerRoot>>,
    assets: Res<GameAssets>,
    mut players: Query<&mut AnimationPlayer>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    mut commands: Commands,
) -> Result {
    let target = on.event_target();
    let Ok(AnimationRigOf(root)) = rigs.get(target) else {
        return Ok(());
    };
    if roots.get(*root).is_err() {
        return Ok(());
    }

    let mut graph = AnimationGraph::new();
    let clips = PlayerClips {
        idle: graph.add_clip(assets.player_clips[0].clone(), 1.0, graph.root),
        walking: graph.add_clip(assets.player_clips[1].clone(), 1.0, graph.root),
        running: graph.add_clip(assets.player_clips[2].clone(), 1.0, graph.root),
        pushing: graph.add_clip(assets.player_clips[3].clone(), 1.0, graph.root),
        pulling: graph.add_clip(assets.player_clips[4].clone(), 1.0, graph.root),
        jump: graph.add_clip(assets.player_clips[5].clone(), 1.0, graph.root),
        whistle: graph.add_clip(assets.player_clips[6].clone(), 1.0, graph.root),
    };

    let mut player = players.get_mut(target)?;

    // The loop clips run continuously; state only moves their weights
    player.play(clips.idle).repeat();
    player.play(clips.walking).repeat();
    player.play(clips.running).repeat();
    player.play(clips.pushing).repeat();
    player.play(clips.pulling).repeat();

    commands
        .entity(target)
        .insert(AnimationGraphHandle(graphs.add(graph)))
        .insert(clips)
        .insert(PlayerWeights::default());

    Ok(())
}

pub fn animations_from_signals(
    mut q: Query<(
        &mut AnimationPlayer,
        &PlayerClips,
        &mut PlayerWeights,
        &AnimationRigOf,
    )>,
    mut signals_q: Query<&mut AnimationSignals, With<PlayerRoot>>,
) {
    for (mut player, clips, mut weights, AnimationRigOf(root)) in q.iter_mut() {
        let Ok(mut signals) = signals_q.get_mut(*root) else {
            continue;
        };

        // One-shot triggers, consumed here
        if signals.jump {
            player.start(clips.jump).set_seek_time(0.0);
            signals.jump = false;
        }
        if signals.whistle {
            player.start(clips.whistle).set_seek_time(0.0);
            signals.whistle = false;
        }

        let mut w = PlayerWeights::default();
        if signals.pulling {
            w.pulling = 1.0;
        } else if signals.pushing {
            w.pushing = 1.0;
        } else if signals.moving {
            if signals.speed > RUN_BLEND_THRESHOLD {
                w.running = signals.speed;
            } else {
                w.walking = (signals.speed / RUN_BLEND_THRESHOLD).min(1.0);
            }
        } else {
            w.idle = 1.0;
        }
        *weights = w;
    }
}

pub fn apply_animation_weights(
    mut q: Query<(&PlayerWeights, &PlayerClips, &mut AnimationPlayer)>,
    time: Res<Time>,
) {
    for (weights, clips, mut player) in q.iter_mut() {
        for (&weight, &clip) in weights.iter().zip(clips.iter()) {
            if let Some(clip) = player.animation_mut(clip) {
                let current = clip.weight();
                let new_weight = current + (weight - current) * WEIGHT_RATE * time.delta_secs();
                clip.set_weight(new_weight);
            }
        }
    }
}
