use bevy::prelude::*;

use crate::assets::MyStates;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, follow_target.run_if(in_state(MyStates::Next)));
    }
}

/// Marks the transform the rig eases toward.
#[derive(Component)]
pub struct CameraTarget;

/// Cinematic rig: drifts toward the target plus a fixed offset while easing
/// the orientation to a designer-set angle. It never turns to look at the
/// target itself.
#[derive(Component)]
pub struct CameraRig {
    pub offset: Vec3,
    pub position_smoothing: f32,
    pub rotation_smoothing: f32,
    /// Fixed angle as (pitch, yaw, roll) radians.
    pub fixed_angle: Vec3,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 5.0, 10.0),
            position_smoothing: 5.0,
            rotation_smoothing: 5.0,
            // Side view with a slight downward tilt
            fixed_angle: Vec3::new(-20f32.to_radians(), 30f32.to_radians(), 0.0),
        }
    }
}

impl CameraRig {
    pub fn fixed_rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.fixed_angle.y,
            self.fixed_angle.x,
            self.fixed_angle.z,
        )
    }
}

fn follow_target(
    mut cameras: Query<(&mut Transform, &CameraRig)>,
    targets: Query<&Transform, (With<CameraTarget>, Without<CameraRig>)>,
    time: Res<Time>,
) {
    let Ok((mut camera, rig)) = cameras.single_mut() else {
        return;
    };

    let target = targets.single().map(|t| t.translation).ok();
    let (translation, rotation) = rig_step(
        camera.translation,
        camera.rotation,
        target,
        rig,
        time.delta_secs(),
    );
    camera.translation = translation;
    camera.rotation = rotation;
}

/// One tick of the rig. Without a target the camera stays put. The blend
/// factors are deliberately left unclamped; a large enough `smoothing * dt`
/// overshoots, which is the tuning knob the scene was built around.
fn rig_step(
    translation: Vec3,
    rotation: Quat,
    target: Option<Vec3>,
    rig: &CameraRig,
    dt: f32,
) -> (Vec3, Quat) {
    let Some(target) = target else {
        return (translation, rotation);
    };

    let desired = target + rig.offset;
    (
        translation.lerp(desired, rig.position_smoothing * dt),
        rotation.slerp(rig.fixed_rotation(), rig.rotation_smoothing * dt),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_a_target_the_rig_never_moves() {
        let rig = CameraRig::default();
        let start = (Vec3::new(4.0, 5.0, 6.0), Quat::from_rotation_y(1.2));

        let mut pose = start;
        for _ in 0..100 {
            pose = rig_step(pose.0, pose.1, None, &rig, 0.016);
        }
        assert_eq!(pose, start);
    }

    #[test]
    fn eases_toward_offset_target_position() {
        let rig = CameraRig::default();
        let target = Vec3::new(1.0, 0.85, -2.0);
        let desired = target + rig.offset;

        let mut pose = (Vec3::ZERO, Quat::IDENTITY);
        let mut last_distance = pose.0.distance(desired);
        for _ in 0..300 {
            pose = rig_step(pose.0, pose.1, Some(target), &rig, 0.016);
            let distance = pose.0.distance(desired);
            assert!(distance <= last_distance);
            last_distance = distance;
        }
        assert!(last_distance < 0.01);
    }

    #[test]
    fn settles_on_the_fixed_angle() {
        let rig = CameraRig::default();
        let mut pose = (Vec3::ZERO, Quat::from_rotation_x(1.0));
        for _ in 0..300 {
            pose = rig_step(pose.0, pose.1, Some(Vec3::ZERO), &rig, 0.016);
        }
        assert!(pose.1.angle_between(rig.fixed_rotation()) < 0.01);
    }
}
