use avian3d::prelude::*;
use bevy::prelude::*;
use bevy_hanabi::prelude::ParticleEffect;
use bevy_kira_audio::prelude::*;

use crate::assets::GameAssets;
use crate::companion::{Companion, WhistleCommand};

pub const WALK_SPEED: f32 = 5.0;
pub const SPRINT_SPEED: f32 = 8.0;
pub const GRAVITY: f32 = -9.81;
pub const JUMP_HEIGHT: f32 = 2.0;

pub const PUSH_STRENGTH: f32 = 5.0;
pub const PULL_SPEED: f32 = 0.5;
/// Prevents overlap where the crate would end up on top of the player.
pub const PULL_MIN_DISTANCE: f32 = 1.5;
pub const PULL_RANGE: f32 = 2.0;

/// A contact counts as an active push only when the player is facing the
/// crate this closely; anything shallower is incidental brushing.
pub const ACTIVE_PUSH_DOT: f32 = 0.5;

/// Small downward bias while grounded so the ground probe keeps contact.
const GROUNDED_STICK_VELOCITY: f32 = -2.0;
/// Capsule center sits 0.8 above its lowest point; a little slack on top.
const GROUND_EPSILON: f32 = 0.9;
const MOVE_EPSILON: f32 = 0.1;
const ROTATION_RATE: f32 = 10.0;
/// Matches a 0.1s damp window on the blended speed parameter.
const SPEED_DAMP_RATE: f32 = 10.0;

#[derive(Component, Default)]
#[require(Transform, InheritedVisibility)]
pub struct PlayerRoot;

/// Vertical state of the character motor; the planar part lives in
/// `LinearVelocity` and is resolved by the physics engine.
#[derive(Component, Default, Debug)]
pub struct CharacterMotor {
    pub vertical_velocity: f32,
    pub grounded: bool,
}

/// Crate currently being dragged. The body is owned by the scene; this is
/// only a handle held for the duration of the pull.
#[derive(Component, Default, Debug)]
pub struct PullState {
    pub active: bool,
    pub body: Option<Entity>,
}

impl PullState {
    pub fn grab(&mut self, body: Entity) {
        self.active = true;
        self.body = Some(body);
    }

    pub fn release(&mut self) {
        self.active = false;
        self.body = None;
    }
}

/// Rebuilt from the contact set every tick, never carried over.
#[derive(Component, Default, Debug)]
pub struct PushState {
    pub pushing: bool,
}

/// What the controller decided this tick, for the animation layer.
#[derive(Component, Default, Debug)]
pub struct ControllerSnapshot {
    pub normalized_speed: f32,
    pub moving: bool,
}

/// The animator parameter set. Written every tick so it always reflects the
/// tick's computed motion state; `jump` and `whistle` are one-shot triggers
/// cleared by the animation layer once consumed.
#[derive(Component, Default, Debug)]
pub struct AnimationSignals {
    pub speed: f32,
    pub moving: bool,
    pub pushing: bool,
    pub pulling: bool,
    pub jump: bool,
    pub whistle: bool,
}

#[derive(Component)]
pub struct DustPuff(pub Timer);

/// Planar movement sampled from the keyboard each tick.
pub(crate) struct MoveIntent {
    pub planar: Vec2,
    pub sprint: bool,
    pub pulling: bool,
}

pub fn on_player_spawn(on: On<Add, PlayerRoot>, mut commands: Commands, assets: Res<GameAssets>) {
    commands.entity(on.event_target()).insert((
        children![(
            SceneRoot(assets.player.clone()),
            Transform::from_scale(Vec3::splat(0.008)),
        )],
        // Capsule bottom rests on the ground plane at y = 0.05
        Transform::from_xyz(0.0, 0.85, 0.0),
        RigidBody::Dynamic,
        Collider::capsule(0.3, 1.0),
        LockedAxes::ROTATION_LOCKED,
        // Vertical velocity is integrated by the motor, not the engine
        GravityScale(0.0),
        Friction::new(0.0),
        CharacterMotor::default(),
        PullState::default(),
        PushState::default(),
        ControllerSnapshot::default(),
        AnimationSignals::default(),
        RayCaster::new(Vec3::ZERO, Dir3::NEG_Y),
    ));
}

/// Ground probe and gravity integration, ahead of the rest of the chain.
pub fn update_grounding(
    mut q: Query<(&RayHits, &mut CharacterMotor), With<PlayerRoot>>,
    time: Res<Time>,
) {
    for (hits, mut motor) in q.iter_mut() {
        let distance = hits.iter_sorted().next().map_or(f32::MAX, |h| h.distance);
        motor.grounded = distance <= GROUND_EPSILON;
        motor.vertical_velocity =
            integrate_vertical(motor.vertical_velocity, motor.grounded, time.delta_secs());
    }
}

/// Edge-triggered grab/release. Grabbing casts a short ray out of the
/// player's chest and only latches onto dynamic bodies.
pub fn handle_pull_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    spatial_query: SpatialQuery,
    mut q: Query<(Entity, &Transform, &mut PullState), With<PlayerRoot>>,
    bodies: Query<&RigidBody>,
) {
    let Ok((entity, transform, mut pull)) = q.single_mut() else {
        return;
    };

    if keyboard.just_pressed(KeyCode::KeyE) {
        let filter = SpatialQueryFilter::default().with_excluded_entities([entity]);
        if let Some(hit) = spatial_query.cast_ray(
            transform.translation,
            transform.forward(),
            PULL_RANGE,
            true,
            &filter,
        ) && bodies.get(hit.entity).is_ok_and(|rb| rb.is_dynamic())
        {
            pull.grab(hit.entity);
        }
    }

    if keyboard.just_released(KeyCode::KeyE) {
        pull.release();
    }
}

pub fn apply_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut q: Query<
        (
            &mut Transform,
            &mut LinearVelocity,
            &mut CharacterMotor,
            &mut PullState,
            &mut ControllerSnapshot,
            &mut AnimationSignals,
        ),
        With<PlayerRoot>,
    >,
    mut bodies: Query<(&mut Position, &mut Rotation), (With<RigidBody>, Without<PlayerRoot>)>,
) {
    let Ok((mut transform, mut linvel, mut motor, mut pull, mut snapshot, mut signals)) =
        q.single_mut()
    else {
        return;
    };

    let dt = time.delta_secs();
    let intent = sample_intent(&keyboard, pull.active);
    let (mut move_dir, speed) = planar_move(&intent);
    let moving = move_dir.length() > MOVE_EPSILON;

    let forward = *transform.forward();
    if pull.active && let Some(body) = pull.body {
        match bodies.get_mut(body) {
            Ok((mut position, mut rotation)) if forward.dot(move_dir) < 0.0 => {
                // Walking backwards drags the crate along: ease it toward a
                // point at fixed distance behind the player, at its own
                // height, yaw locked to the player's.
                let target = pull_target(transform.translation, forward, position.y);
                position.0 = position.0.lerp(target, PULL_SPEED * dt);
                rotation.0 = Quat::from_rotation_y(yaw_of(&transform.rotation));

                move_dir = -forward;
            }
            Ok(_) => {}
            // The crate vanished mid-drag; let go.
            Err(_) => pull.release(),
        }
    }

    if keyboard.just_pressed(KeyCode::Space) && motor.grounded {
        motor.vertical_velocity = jump_velocity(JUMP_HEIGHT, GRAVITY);
        signals.jump = true;
    }

    linvel.0 = move_dir * speed + Vec3::Y * motor.vertical_velocity;

    if move_dir != Vec3::ZERO && !pull.active {
        transform.rotation = transform
            .rotation
            .slerp(facing_rotation(move_dir), ROTATION_RATE * dt);
    }

    snapshot.normalized_speed = move_dir.length() * speed / SPRINT_SPEED;
    snapshot.moving = moving;
    signals.pulling = pull.active;
}

/// Summons or dismisses the companion. Nothing happens without one.
pub fn whistle(
    keyboard: Res<ButtonInput<KeyCode>>,
    companions: Query<(), With<Companion>>,
    mut q: Query<&mut AnimationSignals, With<PlayerRoot>>,
    mut whistles: MessageWriter<WhistleCommand>,
    audio: Res<Audio>,
    assets: Res<GameAssets>,
) {
    if !keyboard.just_pressed(KeyCode::KeyQ) || companions.is_empty() {
        return;
    }
    let Ok(mut signals) = q.single_mut() else {
        return;
    };

    signals.whistle = true;
    whistles.write(WhistleCommand);
    audio.play(assets.whistle_sfx.clone());
}

/// Shove touching crates. Runs after the motor move so the contact set
/// reflects this tick, and is skipped entirely while pulling.
pub fn push_dynamic_bodies(
    collisions: Collisions,
    time: Res<Time>,
    mut commands: Commands,
    assets: Res<GameAssets>,
    mut player_q: Query<(Entity, &Transform, &PullState, &mut PushState), With<PlayerRoot>>,
    mut bodies: Query<
        (&RigidBody, &Position, &mut Rotation, &mut LinearVelocity),
        Without<PlayerRoot>,
    >,
) {
    let Ok((player, transform, pull, mut push)) = player_q.single_mut() else {
        return;
    };

    let was_pushing = push.pushing;
    push.pushing = false;
    if pull.active {
        return;
    }

    let forward = *transform.forward();
    for pair in collisions.collisions_with(player) {
        if !pair.is_touching() {
            continue;
        }
        let other = if pair.collider1 == player {
            pair.collider2
        } else {
            pair.collider1
        };
        let Ok((body, position, mut rotation, mut linvel)) = bodies.get_mut(other) else {
            continue;
        };
        if !body.is_dynamic() {
            continue;
        }

        // Keep the crate upright
        rotation.0 = Quat::from_rotation_y(yaw_of(&rotation.0));

        let Some(push_dir) = horizontal_push_dir(transform.translation, position.0) else {
            continue;
        };
        linvel.0 += push_dir * PUSH_STRENGTH * time.delta_secs();

        if is_active_push(push_dir, forward) {
            debug!("pushing crate {other}");
            push.pushing = true;
        }
    }

    if push.pushing && !was_pushing {
        commands.spawn((
            ParticleEffect::new(assets.dust.clone()),
            Transform::from_translation(transform.translation - Vec3::Y * 0.75),
            DustPuff(Timer::from_seconds(1.5, TimerMode::Once)),
        ));
    }
}

pub fn cleanup_dust_puffs(
    mut commands: Commands,
    time: Res<Time>,
    mut puffs: Query<(Entity, &mut DustPuff)>,
) {
    for (entity, mut puff) in puffs.iter_mut() {
        if puff.0.tick(time.delta()).just_finished() {
            commands.entity(entity).despawn();
        }
    }
}

/// Last step of the chain: fold the tick's motion into the animator
/// parameters.
pub fn update_animation_signals(
    time: Res<Time>,
    mut q: Query<(&ControllerSnapshot, &PushState, &mut AnimationSignals), With<PlayerRoot>>,
) {
    for (snapshot, push, mut signals) in q.iter_mut() {
        signals.speed = damp(
            signals.speed,
            snapshot.normalized_speed,
            SPEED_DAMP_RATE,
            time.delta_secs(),
        );
        signals.moving = snapshot.moving;
        signals.pushing = push.pushing;
    }
}

fn sample_intent(keyboard: &ButtonInput<KeyCode>, pulling: bool) -> MoveIntent {
    let mut planar = Vec2::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        planar.y += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        planar.y -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        planar.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        planar.x += 1.0;
    }

    MoveIntent {
        planar: planar.normalize_or_zero(),
        sprint: keyboard.pressed(KeyCode::ShiftLeft),
        pulling,
    }
}

/// World-space move vector and speed for the tick. Pulling pins the speed
/// and restricts movement to the forward/backward axis.
pub(crate) fn planar_move(intent: &MoveIntent) -> (Vec3, f32) {
    let mut dir = Vec3::new(intent.planar.x, 0.0, -intent.planar.y);
    let mut speed = if intent.sprint { SPRINT_SPEED } else { WALK_SPEED };

    if intent.pulling {
        dir.x = 0.0;
        speed = PULL_SPEED;
    }

    (dir, speed)
}

pub(crate) fn integrate_vertical(vertical_velocity: f32, grounded: bool, dt: f32) -> f32 {
    let clamped = if grounded && vertical_velocity < 0.0 {
        GROUNDED_STICK_VELOCITY
    } else {
        vertical_velocity
    };
    clamped + GRAVITY * dt
}

/// Launch velocity reaching `jump_height` at the apex.
pub(crate) fn jump_velocity(jump_height: f32, gravity: f32) -> f32 {
    (jump_height * -2.0 * gravity).sqrt()
}

/// Yaw-only rotation looking along `dir` (-Z forward).
pub(crate) fn facing_rotation(dir: Vec3) -> Quat {
    Quat::from_rotation_y(f32::atan2(-dir.x, -dir.z))
}

pub(crate) fn yaw_of(rotation: &Quat) -> f32 {
    rotation.to_euler(EulerRot::YXZ).0
}

fn pull_target(player: Vec3, forward: Vec3, body_height: f32) -> Vec3 {
    let behind = player - forward * PULL_MIN_DISTANCE;
    Vec3::new(behind.x, body_height, behind.z)
}

pub(crate) fn horizontal_push_dir(player: Vec3, body: Vec3) -> Option<Vec3> {
    let dir = Vec3::new(body.x - player.x, 0.0, body.z - player.z);
    (dir.length_squared() > f32::EPSILON).then(|| dir.normalize())
}

pub(crate) fn is_active_push(push_dir: Vec3, forward: Vec3) -> bool {
    push_dir.dot(forward) > ACTIVE_PUSH_DOT
}

pub(crate) fn damp(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * (rate * dt).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(x: f32, y: f32, sprint: bool, pulling: bool) -> MoveIntent {
        MoveIntent {
            planar: Vec2::new(x, y),
            sprint,
            pulling,
        }
    }

    #[test]
    fn jump_requires_ground_contact() {
        // Airborne: gravity keeps integrating, no jump impulse is possible
        // because the grounded flag gates it.
        let mut vy = -3.0;
        vy = integrate_vertical(vy, false, 0.016);
        assert!(vy < -3.0);

        // Grounded: downward velocity is clamped to the stick bias first.
        let vy = integrate_vertical(-12.0, true, 0.016);
        assert!((vy - (GROUNDED_STICK_VELOCITY + GRAVITY * 0.016)).abs() < 1e-5);
    }

    #[test]
    fn jump_velocity_reaches_apex_height() {
        let v = jump_velocity(JUMP_HEIGHT, GRAVITY);
        // v^2 = 2 * g * h
        let apex = v * v / (2.0 * -GRAVITY);
        assert!((apex - JUMP_HEIGHT).abs() < 1e-4);
    }

    #[test]
    fn pull_release_is_idempotent() {
        let mut pull = PullState::default();
        pull.grab(Entity::PLACEHOLDER);
        assert!(pull.active);

        pull.release();
        let after_once = (pull.active, pull.body);
        pull.release();
        assert_eq!((pull.active, pull.body), after_once);
        assert!(!pull.active);
        assert!(pull.body.is_none());
    }

    #[test]
    fn pulling_zeroes_the_lateral_axis() {
        let (dir, speed) = planar_move(&intent(1.0, 0.0, false, true));
        assert_eq!(dir.x, 0.0);
        assert_eq!(dir, Vec3::ZERO);
        assert_eq!(speed, PULL_SPEED);

        // Forward/backward input survives the restriction.
        let (dir, _) = planar_move(&intent(0.0, -1.0, false, true));
        assert_eq!(dir, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn sprint_selects_speed_tier() {
        let (_, walking) = planar_move(&intent(0.0, 1.0, false, false));
        let (_, sprinting) = planar_move(&intent(0.0, 1.0, true, false));
        assert_eq!(walking, WALK_SPEED);
        assert_eq!(sprinting, SPRINT_SPEED);
    }

    #[test]
    fn push_classification_by_facing() {
        let forward = Vec3::NEG_Z;
        // 0.6 alignment: an actual push.
        let shove = Vec3::new(-0.8, 0.0, -0.6).normalize();
        assert!(shove.dot(forward) > 0.5);
        assert!(is_active_push(shove, forward));

        // 0.4 alignment: brushing past.
        let brush = Vec3::new(-0.917, 0.0, -0.4).normalize();
        assert!(brush.dot(forward) < 0.5);
        assert!(!is_active_push(brush, forward));
    }

    #[test]
    fn push_direction_is_horizontal_and_normalized() {
        let dir = horizontal_push_dir(Vec3::new(0.0, 0.85, 0.0), Vec3::new(3.0, 0.5, 4.0)).unwrap();
        assert_eq!(dir.y, 0.0);
        assert!((dir.length() - 1.0).abs() < 1e-5);

        // Standing exactly on top of the body: no usable direction.
        assert!(horizontal_push_dir(Vec3::new(1.0, 2.0, 1.0), Vec3::new(1.0, 0.5, 1.0)).is_none());
    }

    #[test]
    fn facing_rotation_points_forward_along_dir() {
        let dir = Vec3::new(1.0, 0.0, 0.0);
        let faced = facing_rotation(dir) * Vec3::NEG_Z;
        assert!((faced - dir).length() < 1e-5);
    }

    #[test]
    fn pull_target_sits_behind_player_at_body_height() {
        let target = pull_target(Vec3::new(0.0, 0.85, 0.0), Vec3::NEG_Z, 0.5);
        assert!((target - Vec3::new(0.0, 0.5, PULL_MIN_DISTANCE)).length() < 1e-5);
    }

    #[test]
    fn damped_speed_approaches_target_without_overshoot() {
        let mut speed = 0.0;
        for _ in 0..200 {
            speed = damp(speed, 1.0, 10.0, 0.016);
        }
        assert!(speed > 0.99 && speed <= 1.0);

        // Oversized steps clamp instead of overshooting.
        assert_eq!(damp(0.0, 1.0, 10.0, 1.0), 1.0);
    }
}
