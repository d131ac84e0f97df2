use std::fmt;

use bevy_ecs::prelude as ecs;

use crate::{
    config::FollowerConfig,
    filter::ExponentialPoseFilter,
    frame::{FrameReference, remap_pose},
    pose::PoseSample,
    transform::Transform,
};

bitflags::bitflags! {
    /// Frame references that could not be resolved during a tick.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MissingFrames: u8 {
        const SOURCE = 1 << 0;
        const BASIS = 1 << 1;
        const REFERENCE = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowerState {
    /// Some frame references could not be resolved on the last tick. A follower that has never
    /// ticked reports no missing frames.
    Unconfigured(MissingFrames),
    /// All frames resolved on the last tick.
    Active,
}

/// Something a host should know about. Each one is only raised once for as long as the
/// condition lasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// Frame references are not available, nothing is updated until they are.
    ConfigurationMissing(MissingFrames),
    /// The target pose contains NaN, infinite or zero length values. The last good pose is held.
    NumericDegenerate,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ConfigurationMissing(missing) => {
                write!(f, "missing frame references:")?;
                for (name, _) in missing.iter_names() {
                    write!(f, " {}", name.to_lowercase())?;
                }
                Ok(())
            }
            Notice::NumericDegenerate => write!(f, "degenerate target pose, holding last pose"),
        }
    }
}

/// Result of a single [PoseFollower::tick].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tick {
    /// The new smoothed pose, if the follower should be moved this tick.
    pub pose: Option<PoseSample>,
    pub notice: Option<Notice>,
}

/// Smooths the pose of a source frame onto the entity it is attached to, optionally moving it
/// from one anchor frame to another first.
#[derive(ecs::Component, Debug)]
#[require(Transform)]
pub struct PoseFollower {
    config: FollowerConfig,
    /// Created from the first valid target, or the configured initial pose.
    filter: Option<ExponentialPoseFilter>,
    state: FollowerState,
    /// A [Notice::ConfigurationMissing] was raised for the current unconfigured stretch.
    missing_reported: bool,
    /// The last target was degenerate.
    holding: bool,
}

impl PoseFollower {
    pub fn new(config: FollowerConfig) -> Self {
        Self {
            config,
            filter: None,
            state: FollowerState::Unconfigured(MissingFrames::empty()),
            missing_reported: false,
            holding: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &FollowerConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> FollowerState {
        self.state
    }

    /// The last smoothed pose, if the follower has produced one.
    #[inline]
    pub fn current_pose(&self) -> Option<PoseSample> {
        self.filter.as_ref().map(ExponentialPoseFilter::current)
    }

    /// Forget the smoothing history. The next valid target is used as is.
    pub fn reset(&mut self) {
        self.filter = None;
    }

    /// Run one tick of `dt` seconds. `resolve` looks up the live frame for a handle, or `None`
    /// if the frame is not available (anymore).
    ///
    /// Must be called after all the frames for the tick have been updated, otherwise the
    /// follower lags a tick behind.
    pub fn tick<F, R>(&mut self, dt: f32, resolve: R) -> Tick
    where
        F: FrameReference,
        R: Fn(ecs::Entity) -> Option<F>,
    {
        let source = resolve(self.config.source());
        let remap = self
            .config
            .remap()
            .map(|remap| (resolve(remap.basis), resolve(remap.reference)));

        let target = match (source, remap) {
            (Some(source), None) => source.current_pose(),
            (Some(source), Some((Some(basis), Some(reference)))) => {
                remap_pose(source.current_pose(), &basis, &reference)
            }
            (source, remap) => {
                let mut missing = MissingFrames::empty();
                missing.set(MissingFrames::SOURCE, source.is_none());
                if let Some((basis, reference)) = remap {
                    missing.set(MissingFrames::BASIS, basis.is_none());
                    missing.set(MissingFrames::REFERENCE, reference.is_none());
                }
                return self.unconfigured(missing);
            }
        };

        self.state = FollowerState::Active;
        self.missing_reported = false;

        if target.is_degenerate() {
            let notice = (!self.holding).then_some(Notice::NumericDegenerate);
            self.holding = true;
            return Tick { pose: None, notice };
        }
        self.holding = false;

        let smoothing = *self.config.smoothing();
        let pose = if let Some(filter) = self.filter.as_mut() {
            filter.advance(
                target,
                dt,
                smoothing.position_rate(),
                smoothing.rotation_rate(),
            )
        } else if let Some(initial_pose) = self.config.initial_pose() {
            self.filter
                .insert(ExponentialPoseFilter::new(initial_pose).with_curve(smoothing.curve()))
                .advance(
                    target,
                    dt,
                    smoothing.position_rate(),
                    smoothing.rotation_rate(),
                )
        } else {
            self.filter =
                Some(ExponentialPoseFilter::new(target).with_curve(smoothing.curve()));
            target
        };

        Tick {
            pose: Some(pose),
            notice: None,
        }
    }

    fn unconfigured(&mut self, missing: MissingFrames) -> Tick {
        self.state = FollowerState::Unconfigured(missing);

        let notice = (!self.missing_reported).then_some(Notice::ConfigurationMissing(missing));
        self.missing_reported = true;

        Tick { pose: None, notice }
    }
}
