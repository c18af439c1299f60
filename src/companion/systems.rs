use bevy::prelude::*;
use strum_macros::Display;

use super::{Companion, NavAgent, WhistleCommand};
use crate::player::controller::{PlayerRoot, facing_rotation};

/// Close enough; stop and wait for the next whistle.
pub const STOP_DISTANCE: f32 = 1.5;
/// Beyond this the companion breaks into a run.
pub const RUN_DISTANCE: f32 = 6.0;
pub const WALK_SPEED: f32 = 2.0;
pub const RUN_SPEED: f32 = 5.0;

const ARRIVAL_EPSILON: f32 = 0.05;
const TURN_RATE: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Gait {
    Walk,
    Run,
}

impl Gait {
    pub fn speed(self) -> f32 {
        match self {
            Gait::Walk => WALK_SPEED,
            Gait::Run => RUN_SPEED,
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum FollowStep {
    Seek { destination: Vec3, gait: Gait },
    Arrive,
}

/// Distance-gated locomotion decision for one tick.
pub(crate) fn follow_step(distance: f32, target: Vec3) -> FollowStep {
    if distance > STOP_DISTANCE {
        FollowStep::Seek {
            destination: target,
            gait: gait_for(distance),
        }
    } else {
        FollowStep::Arrive
    }
}

pub(crate) fn gait_for(distance: f32) -> Gait {
    if distance > RUN_DISTANCE {
        Gait::Run
    } else {
        Gait::Walk
    }
}

/// A whistle always inverts the flag, even when the companion is already
/// standing next to the player; in that case the next tick stops it again.
pub fn toggle_follow_on_whistle(
    mut whistles: MessageReader<WhistleCommand>,
    mut companions: Query<&mut Companion>,
) {
    for _ in whistles.read() {
        for mut companion in companions.iter_mut() {
            companion.following = !companion.following;
            info!("companion following: {}", companion.following);
        }
    }
}

pub fn follow_player(
    mut companions: Query<(&mut Companion, &mut NavAgent, &Transform)>,
    players: Query<&Transform, (With<PlayerRoot>, Without<Companion>)>,
) {
    for (mut companion, mut agent, transform) in companions.iter_mut() {
        let target = players.single().ok();
        if companion.following && let Some(player) = target {
            let distance = transform.translation.xz().distance(player.translation.xz());
            match follow_step(distance, player.translation) {
                FollowStep::Seek { destination, gait } => {
                    agent.destination = Some(destination);
                    agent.speed = gait.speed();
                    if agent.gait != Some(gait) {
                        debug!("companion gait: {gait}");
                        agent.gait = Some(gait);
                    }
                }
                FollowStep::Arrive => {
                    // Caught up: stop and drop the flag until re-whistled.
                    agent.destination = None;
                    agent.gait = None;
                    companion.following = false;
                }
            }
        } else {
            agent.destination = None;
            agent.gait = None;
        }
    }
}

/// Walks agents straight toward their destination over the ground plane and
/// turns them into the direction of travel.
pub fn drive_agents(mut q: Query<(&mut NavAgent, &mut Transform)>, time: Res<Time>) {
    for (mut agent, mut transform) in q.iter_mut() {
        let Some(destination) = agent.destination else {
            agent.velocity = Vec3::ZERO;
            continue;
        };

        let towards = (destination - transform.translation).with_y(0.0);
        if towards.length() < ARRIVAL_EPSILON {
            agent.velocity = Vec3::ZERO;
            continue;
        }

        let step = towards.normalize() * agent.speed;
        transform.translation += step * time.delta_secs();
        agent.velocity = step;
        transform.rotation = transform
            .rotation
            .slerp(facing_rotation(step), TURN_RATE * time.delta_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.01;

    #[test]
    fn arrives_inside_stop_distance() {
        let target = Vec3::new(3.0, 0.0, 4.0);
        assert_eq!(
            follow_step(STOP_DISTANCE - EPSILON, target),
            FollowStep::Arrive
        );
        // Whistling while already next to the player flips the flag back on,
        // but the decision is still Arrive, so it re-stops immediately.
        assert_eq!(follow_step(0.0, target), FollowStep::Arrive);
    }

    #[test]
    fn seeks_outside_stop_distance() {
        let target = Vec3::new(3.0, 0.0, 4.0);
        match follow_step(STOP_DISTANCE + EPSILON, target) {
            FollowStep::Seek { destination, gait } => {
                assert_eq!(destination, target);
                assert_eq!(gait, Gait::Walk);
            }
            FollowStep::Arrive => panic!("expected a seek just past the stop threshold"),
        }
    }

    #[test]
    fn gait_tiers_by_distance() {
        assert_eq!(gait_for(RUN_DISTANCE + EPSILON), Gait::Run);
        assert_eq!(gait_for(RUN_DISTANCE), Gait::Walk);
        assert_eq!(gait_for(STOP_DISTANCE + EPSILON), Gait::Walk);
        assert_eq!(gait_for(RUN_DISTANCE + 100.0).speed(), RUN_SPEED);
        assert_eq!(gait_for((STOP_DISTANCE + RUN_DISTANCE) * 0.5).speed(), WALK_SPEED);
    }
}
