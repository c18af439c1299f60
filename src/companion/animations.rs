use bevy::prelude::*;

use crate::{
    animations_utils::AnimationRigOf,
    assets::GameAssets,
    companion::{
        Companion, NavAgent,
        systems::{RUN_SPEED, WALK_SPEED},
    },
};

const WEIGHT_RATE: f32 = 5.0;
const IDLE_EPSILON: f32 = 0.05;

#[derive(Debug, Default, Component)]
pub struct CompanionAnimationsT<T> {
    idle: T,
    walking: T,
    running: T,
}

impl<T> CompanionAnimationsT<T> {
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        [&self.idle, &self.walking, &self.running].into_iter()
    }
}

type CompanionClips = CompanionAnimationsT<AnimationNodeIndex>;
type CompanionWeights = CompanionAnimationsT<f32>;

pub fn on_companion_rig_ready(
    on: On<Add, AnimationRigOf>,
    rigs: Query<&AnimationRigOf>,
    roots: Query<(), With<Companion>>,
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
    let clips = CompanionClips {
        idle: graph.add_clip(assets.companion_clips[0].clone(), 1.0, graph.root),
        walking: graph.add_clip(assets.companion_clips[1].clone(), 1.0, graph.root),
        running: graph.add_clip(assets.companion_clips[2].clone(), 1.0, graph.root),
    };

    let mut player = players.get_mut(target)?;
    player.play(clips.idle).repeat();
    player.play(clips.walking).repeat();
    player.play(clips.running).repeat();

    commands
        .entity(target)
        .insert(AnimationGraphHandle(graphs.add(graph)))
        .insert(clips)
        .insert(CompanionWeights::default());

    Ok(())
}

/// Picks the locomotion clip from the speed the agent actually resolved,
/// and paces the stride with it.
pub fn animations_from_agent(
    mut q: Query<(
        &mut AnimationPlayer,
        &CompanionClips,
        &mut CompanionWeights,
        &AnimationRigOf,
    )>,
    agents: Query<&NavAgent, With<Companion>>,
) {
    for (mut player, clips, mut weights, AnimationRigOf(root)) in q.iter_mut() {
        let Ok(agent) = agents.get(*root) else {
            continue;
        };

        let speed = agent.velocity.length();
        let mut w = CompanionWeights::default();
        if speed < IDLE_EPSILON {
            w.idle = 1.0;
        } else if speed > (WALK_SPEED + RUN_SPEED) * 0.5 {
            w.running = 1.0;
        } else {
            w.walking = 1.0;
        }
        *weights = w;

        if let Some(walking) = player.animation_mut(clips.walking) {
            walking.set_speed((speed / WALK_SPEED).clamp(0.5, 1.5));
        }
        if let Some(running) = player.animation_mut(clips.running) {
            running.set_speed((speed / RUN_SPEED).clamp(0.5, 1.5));
        }
    }
}

pub fn apply_animation_weights(
    mut q: Query<(&CompanionWeights, &CompanionClips, &mut AnimationPlayer)>,
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
