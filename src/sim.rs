use bevy_ecs::prelude::*;
use follow::{PoseSample, Transform, reproject_pose};
use glam::{EulerRot, Quat, Vec3};

/// Simulated time since the start.
#[derive(Default, Resource)]
pub struct SimClock {
    pub elapsed: f32,
}

/// Noise free motion of a tracked device over time.
#[derive(Clone, Debug)]
pub enum Motion {
    Still(PoseSample),
    /// Moving in a straight line while turning around the vertical axis.
    Drift {
        origin: Vec3,
        velocity: Vec3,
        /// Radians per second.
        yaw_rate: f32,
    },
    /// Circling around `center` in the horizontal plane.
    Orbit {
        center: Vec3,
        radius: f32,
        /// Radians per second.
        angular_speed: f32,
    },
    /// `local` motion carried along by `carrier`, like a hand on a moving platform.
    Carried {
        carrier: Box<Motion>,
        local: Box<Motion>,
    },
}

impl Motion {
    pub fn pose_at(&self, time: f32) -> PoseSample {
        match self {
            Motion::Still(pose) => *pose,
            Motion::Drift {
                origin,
                velocity,
                yaw_rate,
            } => PoseSample::new(
                *origin + *velocity * time,
                Quat::from_rotation_y(yaw_rate * time),
            ),
            Motion::Orbit {
                center,
                radius,
                angular_speed,
            } => {
                let angle = angular_speed * time;
                PoseSample::new(
                    *center + Vec3::new(angle.cos(), 0.0, angle.sin()) * *radius,
                    Quat::from_rotation_y(-angle),
                )
            }
            Motion::Carried { carrier, local } => {
                reproject_pose(local.pose_at(time), &carrier.pose_at(time))
            }
        }
    }
}

/// Repeatable tracking noise.
#[derive(Clone, Copy, Debug, Default)]
pub struct Jitter {
    /// Largest position offset in meters. Rotations wobble by the same amount in radians.
    pub amplitude: f32,
    /// Decorrelates devices from each other.
    pub seed: f32,
}

impl Jitter {
    pub fn offset_at(&self, time: f32) -> (Vec3, Quat) {
        let wobble = |frequency: f32, phase: f32| (time * frequency + self.seed * phase).sin();

        // Each axis is bounded by 1.5 before scaling.
        let position = Vec3::new(
            wobble(37.0, 1.3) + 0.5 * wobble(91.0, 2.9),
            wobble(43.0, 0.7) + 0.5 * wobble(83.0, 3.1),
            wobble(53.0, 2.2) + 0.5 * wobble(71.0, 1.7),
        ) * (self.amplitude / 1.5);

        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            wobble(47.0, 0.4) * self.amplitude,
            wobble(59.0, 1.1) * self.amplitude,
            wobble(67.0, 2.5) * self.amplitude,
        );

        (position, rotation)
    }
}

/// An entity whose [Transform] is driven like a noisy tracker.
#[derive(Component)]
#[require(Transform)]
pub struct TrackedDevice {
    pub motion: Motion,
    pub jitter: Jitter,
}

impl TrackedDevice {
    pub fn pose_at(&self, time: f32) -> PoseSample {
        let pose = self.motion.pose_at(time);
        let (position_offset, rotation_offset) = self.jitter.offset_at(time);

        PoseSample::new(
            pose.position + position_offset,
            (rotation_offset * pose.rotation).normalize(),
        )
    }
}

pub fn update_tracked_devices(
    clock: Res<SimClock>,
    mut devices: Query<(&TrackedDevice, &mut Transform)>,
) {
    for (device, mut transform) in devices.iter_mut() {
        transform.set_pose(device.pose_at(clock.elapsed));
    }
}
