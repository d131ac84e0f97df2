use bevy_ecs::prelude as ecs;
use glam::{Mat4, Quat, Vec3};

use crate::{frame::FrameReference, pose::PoseSample};

/// A translation, rotation and scale of an entity in world space.
#[derive(ecs::Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Create a new transform from a translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_pose(pose: PoseSample) -> Self {
        Self::new(pose.position, pose.rotation)
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    #[inline]
    pub fn pose(&self) -> PoseSample {
        PoseSample::new(self.translation, self.rotation)
    }

    /// Overwrite the translation and rotation, leaving the scale as is.
    #[inline]
    pub fn set_pose(&mut self, pose: PoseSample) {
        self.translation = pose.position;
        self.rotation = pose.rotation;
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Transform a point from this transform's local space into world space.
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * (self.scale * point)
    }

    /// Transform a point from world space into this transform's local space.
    ///
    /// A zero scale component produces non-finite coordinates.
    #[inline]
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        (self.rotation.inverse() * (point - self.translation)) / self.scale
    }
}

impl FrameReference for Transform {
    #[inline]
    fn current_pose(&self) -> PoseSample {
        self.pose()
    }

    #[inline]
    fn to_local(&self, world_point: Vec3) -> Vec3 {
        self.inverse_transform_point(world_point)
    }

    #[inline]
    fn to_world(&self, local_point: Vec3) -> Vec3 {
        self.transform_point(local_point)
    }
}
