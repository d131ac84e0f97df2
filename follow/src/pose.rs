use glam::{Quat, Vec3};

/// Rotations with a squared norm below this can not be normalized reliably.
const MIN_ROTATION_LENGTH_SQUARED: f32 = 1e-6;

/// A position and orientation snapshot of an entity in 3D space.
///
/// `rotation` is expected to be a unit quaternion. Producers normalize, nothing downstream
/// renormalizes implicitly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseSample {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for PoseSample {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PoseSample {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    #[inline]
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Returns true if blending towards this pose would corrupt a filter: a non-finite
    /// position, or a rotation that is non-finite or too close to zero length.
    pub fn is_degenerate(&self) -> bool {
        !self.position.is_finite()
            || !self.rotation.is_finite()
            || self.rotation.length_squared() < MIN_ROTATION_LENGTH_SQUARED
    }

    /// Straight line distance between the two positions.
    #[inline]
    pub fn distance(&self, other: &PoseSample) -> f32 {
        self.position.distance(other.position)
    }

    /// Angle in radians of the rotation taking `self` to `other`.
    #[inline]
    pub fn angle_between(&self, other: &PoseSample) -> f32 {
        self.rotation.angle_between(other.rotation)
    }

    /// Compare two poses within a tolerance. Rotations `q` and `-q` are the same orientation
    /// and compare equal.
    pub fn abs_diff_eq(&self, other: &PoseSample, max_abs_diff: f32) -> bool {
        self.position.abs_diff_eq(other.position, max_abs_diff)
            && (self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
                || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_not_degenerate() {
        assert!(!PoseSample::IDENTITY.is_degenerate());
        assert!(!PoseSample::from_position(Vec3::new(1.0, -2.0, 3.0)).is_degenerate());
    }

    #[test]
    fn non_finite_values_are_degenerate() {
        let nan_position = PoseSample::from_position(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(nan_position.is_degenerate());

        let inf_position = PoseSample::from_position(Vec3::new(0.0, f32::INFINITY, 0.0));
        assert!(inf_position.is_degenerate());

        let nan_rotation = PoseSample::new(Vec3::ZERO, Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0));
        assert!(nan_rotation.is_degenerate());
    }

    #[test]
    fn zero_rotation_is_degenerate() {
        let pose = PoseSample::new(Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));
        assert!(pose.is_degenerate());
    }

    #[test]
    fn abs_diff_eq_ignores_quaternion_sign() {
        let rotation = Quat::from_rotation_y(1.0);
        let a = PoseSample::new(Vec3::ONE, rotation);
        let b = PoseSample::new(Vec3::ONE, -rotation);
        assert!(a.abs_diff_eq(&b, 1e-6));

        let c = PoseSample::new(Vec3::ONE, Quat::from_rotation_y(1.1));
        assert!(!a.abs_diff_eq(&c, 1e-3));
    }
}
