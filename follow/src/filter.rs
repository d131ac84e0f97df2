use glam::Quat;

use crate::pose::PoseSample;

/// How a smoothing rate and a tick duration turn into a blend factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BlendCurve {
    /// `1 - exp(-rate * dt)`. Convergence speed only depends on the rate, not on the tick
    /// frequency.
    #[default]
    Exponential,
    /// `rate * dt`, clamped. Depends on the tick frequency; only useful to match tuning that
    /// was done against a fixed frame rate.
    Linear,
}

impl BlendCurve {
    /// The fraction of the distance to the target to cover in a tick of `dt` seconds. Always in
    /// `[0, 1]`.
    pub fn blend_factor(self, rate: f32, dt: f32) -> f32 {
        let dt = sanitize_delta_time(dt);
        let factor = match self {
            BlendCurve::Exponential => 1.0 - (-rate * dt).exp(),
            BlendCurve::Linear => rate * dt,
        };

        // `0 * inf` for an infinite rate on an empty tick.
        if factor.is_nan() {
            return 0.0;
        }

        factor.clamp(0.0, 1.0)
    }
}

/// Exponential blend factor, `1 - exp(-rate * dt)` clamped to `[0, 1]`.
#[inline]
pub fn blend_factor(rate: f32, dt: f32) -> f32 {
    BlendCurve::Exponential.blend_factor(rate, dt)
}

/// Negative and non-finite tick durations count as an empty tick.
#[inline]
pub fn sanitize_delta_time(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 { dt } else { 0.0 }
}

/// Spherical interpolation along the shortest arc.
fn slerp_shortest(from: Quat, to: Quat, t: f32) -> Quat {
    if t <= 0.0 {
        return from;
    }

    // `to` and `-to` are the same orientation, blend towards the closer one.
    let to = if from.dot(to) < 0.0 { -to } else { to };
    from.slerp(to, t)
}

/// Per-tick low-pass filter over a pose. Position is blended linearly and rotation along the
/// shortest arc, each with its own rate.
#[derive(Clone, Debug)]
pub struct ExponentialPoseFilter {
    current: PoseSample,
    curve: BlendCurve,
}

impl ExponentialPoseFilter {
    pub fn new(initial: PoseSample) -> Self {
        Self {
            current: initial,
            curve: BlendCurve::default(),
        }
    }

    pub fn with_curve(mut self, curve: BlendCurve) -> Self {
        self.curve = curve;
        self
    }

    #[inline]
    pub fn current(&self) -> PoseSample {
        self.current
    }

    #[inline]
    pub fn curve(&self) -> BlendCurve {
        self.curve
    }

    /// Snap the filter to `pose`, dropping any history.
    pub fn reset(&mut self, pose: PoseSample) {
        self.current = pose;
    }

    /// Move the current pose towards `target` for a tick of `dt` seconds and return it.
    ///
    /// A degenerate target leaves the current pose untouched.
    pub fn advance(
        &mut self,
        target: PoseSample,
        dt: f32,
        position_rate: f32,
        rotation_rate: f32,
    ) -> PoseSample {
        if target.is_degenerate() {
            return self.current;
        }

        let position_factor = self.curve.blend_factor(position_rate, dt);
        let rotation_factor = self.curve.blend_factor(rotation_rate, dt);

        self.current = PoseSample {
            position: self.current.position.lerp(target.position, position_factor),
            rotation: slerp_shortest(self.current.rotation, target.rotation, rotation_factor),
        };

        self.current
    }
}
