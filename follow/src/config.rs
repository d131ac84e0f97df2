use std::ops::RangeInclusive;

use bevy_ecs::entity::Entity;

use crate::{filter::BlendCurve, pose::PoseSample};

/// Rates in this range cover everything from very smooth to snappy. Values outside of it are
/// accepted, but are probably a tuning mistake.
pub const RECOMMENDED_RATE_RANGE: RangeInclusive<f32> = 0.0..=20.0;

/// Rate used for both position and rotation when nothing else is configured.
pub const DEFAULT_RATE: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RateKind {
    Position,
    Rotation,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("A source frame is required")]
    MissingSource,
    #[error(
        "Basis and reference frames must be set together (basis set: {basis}, reference set: {reference})"
    )]
    IncompleteRemap { basis: bool, reference: bool },
    #[error("Invalid {which} rate ({value}), it must be finite and not negative")]
    InvalidRate { which: RateKind, value: f32 },
}

fn validate_rate(which: RateKind, value: f32) -> Result<f32, ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidRate { which, value });
    }

    if !RECOMMENDED_RATE_RANGE.contains(&value) {
        tracing::warn!(
            "The {which} rate ({value}) is outside of the recommended range {RECOMMENDED_RATE_RANGE:?}."
        );
    }

    Ok(value)
}

/// How fast a follower moves towards its target, in reciprocal seconds. Higher is snappier,
/// lower is smoother but lags more.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothingConfig {
    position_rate: f32,
    rotation_rate: f32,
    curve: BlendCurve,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            position_rate: DEFAULT_RATE,
            rotation_rate: DEFAULT_RATE,
            curve: BlendCurve::default(),
        }
    }
}

impl SmoothingConfig {
    pub fn new(position_rate: f32, rotation_rate: f32) -> Result<Self, ConfigError> {
        Ok(Self {
            position_rate: validate_rate(RateKind::Position, position_rate)?,
            rotation_rate: validate_rate(RateKind::Rotation, rotation_rate)?,
            curve: BlendCurve::default(),
        })
    }

    pub fn with_curve(mut self, curve: BlendCurve) -> Self {
        self.curve = curve;
        self
    }

    #[inline]
    pub fn position_rate(&self) -> f32 {
        self.position_rate
    }

    #[inline]
    pub fn rotation_rate(&self) -> f32 {
        self.rotation_rate
    }

    #[inline]
    pub fn curve(&self) -> BlendCurve {
        self.curve
    }
}

/// The two frames used to move a pose from where it was tracked to where it should be shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRemap {
    /// The source pose is expressed relative to this frame...
    pub basis: Entity,
    /// ...and then put back into world space relative to this one.
    pub reference: Entity,
}

/// Everything a [crate::PoseFollower] needs to know, validated once up front.
#[derive(Clone, Debug, PartialEq)]
pub struct FollowerConfig {
    source: Entity,
    remap: Option<FrameRemap>,
    smoothing: SmoothingConfig,
    initial_pose: Option<PoseSample>,
}

impl FollowerConfig {
    /// Follow the world pose of `source`.
    pub fn absolute(source: Entity, smoothing: SmoothingConfig) -> Self {
        Self {
            source,
            remap: None,
            smoothing,
            initial_pose: None,
        }
    }

    /// Follow the pose of `source` relative to `basis`, re-expressed relative to `reference`.
    pub fn relative(
        source: Entity,
        basis: Entity,
        reference: Entity,
        smoothing: SmoothingConfig,
    ) -> Self {
        Self {
            source,
            remap: Some(FrameRemap { basis, reference }),
            smoothing,
            initial_pose: None,
        }
    }

    /// Build a config from individually assigned frame slots, where any of them might not have
    /// been filled in.
    pub fn from_parts(
        source: Option<Entity>,
        basis: Option<Entity>,
        reference: Option<Entity>,
        smoothing: SmoothingConfig,
    ) -> Result<Self, ConfigError> {
        let source = source.ok_or(ConfigError::MissingSource)?;

        match (basis, reference) {
            (None, None) => Ok(Self::absolute(source, smoothing)),
            (Some(basis), Some(reference)) => {
                Ok(Self::relative(source, basis, reference, smoothing))
            }
            (basis, reference) => Err(ConfigError::IncompleteRemap {
                basis: basis.is_some(),
                reference: reference.is_some(),
            }),
        }
    }

    /// Start smoothing from `pose` instead of snapping to the first target.
    pub fn with_initial_pose(mut self, pose: PoseSample) -> Self {
        if pose.is_degenerate() {
            tracing::warn!("Ignoring degenerate initial pose {pose:?}.");
            return self;
        }
        self.initial_pose = Some(pose);
        self
    }

    #[inline]
    pub fn source(&self) -> Entity {
        self.source
    }

    #[inline]
    pub fn remap(&self) -> Option<FrameRemap> {
        self.remap
    }

    #[inline]
    pub fn is_relative(&self) -> bool {
        self.remap.is_some()
    }

    #[inline]
    pub fn smoothing(&self) -> &SmoothingConfig {
        &self.smoothing
    }

    #[inline]
    pub fn initial_pose(&self) -> Option<PoseSample> {
        self.initial_pose
    }

    /// All the frames this config reads from.
    pub fn frames(&self) -> impl Iterator<Item = Entity> + '_ {
        std::iter::once(self.source).chain(
            self.remap
                .iter()
                .flat_map(|remap| [remap.basis, remap.reference]),
        )
    }
}
