use glam::Vec3;

use crate::pose::PoseSample;

/// Read access to the live pose of some entity that is used as a coordinate frame.
///
/// Frames are only observed, never owned. Rotations are expected to be unit quaternions.
pub trait FrameReference {
    /// The world space pose of the frame.
    fn current_pose(&self) -> PoseSample;

    /// Transform a world space point into the frame's local space.
    fn to_local(&self, world_point: Vec3) -> Vec3;

    /// Transform a point in the frame's local space into world space.
    fn to_world(&self, local_point: Vec3) -> Vec3;
}

/// A bare pose is a rigid frame without scale.
impl FrameReference for PoseSample {
    #[inline]
    fn current_pose(&self) -> PoseSample {
        *self
    }

    #[inline]
    fn to_local(&self, world_point: Vec3) -> Vec3 {
        self.rotation.inverse() * (world_point - self.position)
    }

    #[inline]
    fn to_world(&self, local_point: Vec3) -> Vec3 {
        self.position + self.rotation * local_point
    }
}

impl<T: FrameReference + ?Sized> FrameReference for &T {
    #[inline]
    fn current_pose(&self) -> PoseSample {
        (**self).current_pose()
    }

    #[inline]
    fn to_local(&self, world_point: Vec3) -> Vec3 {
        (**self).to_local(world_point)
    }

    #[inline]
    fn to_world(&self, local_point: Vec3) -> Vec3 {
        (**self).to_world(local_point)
    }
}

/// Express a world space pose relative to `basis`.
pub fn relative_pose(source: PoseSample, basis: &impl FrameReference) -> PoseSample {
    PoseSample {
        position: basis.to_local(source.position),
        rotation: basis.current_pose().rotation.inverse() * source.rotation,
    }
}

/// Re-express a pose that is relative to some frame in world space, using `target` as that
/// frame. `reproject_pose(relative_pose(p, f), f)` gives back `p`.
pub fn reproject_pose(relative: PoseSample, target: &impl FrameReference) -> PoseSample {
    PoseSample {
        position: target.to_world(relative.position),
        rotation: target.current_pose().rotation * relative.rotation,
    }
}

/// Take `source` out of `basis` and put it into `reference`.
#[inline]
pub fn remap_pose(
    source: PoseSample,
    basis: &impl FrameReference,
    reference: &impl FrameReference,
) -> PoseSample {
    reproject_pose(relative_pose(source, basis), reference)
}
