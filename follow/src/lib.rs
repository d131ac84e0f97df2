//! Smoothing of tracked poses for rendering.
//!
//! A [PoseFollower] takes the live pose of a tracked frame, optionally moves it from the frame
//! it was tracked against into another one, and eases its own [Transform] towards the result
//! with a frame rate independent exponential filter.
//!
//! Hosts register everything with [setup_ecs] and put whatever writes the tracked poses in
//! [PoseSet::Tracking].

mod config;
mod filter;
mod follower;
mod frame;
mod pose;
mod systems;
mod transform;

pub use config::{
    ConfigError, DEFAULT_RATE, FollowerConfig, FrameRemap, RECOMMENDED_RATE_RANGE, RateKind,
    SmoothingConfig,
};
pub use filter::{BlendCurve, ExponentialPoseFilter, blend_factor, sanitize_delta_time};
pub use follower::{FollowerState, MissingFrames, Notice, PoseFollower, Tick};
pub use frame::{FrameReference, relative_pose, remap_pose, reproject_pose};
pub use pose::PoseSample;
pub use systems::{FollowerDiagnostic, PoseSet, Time, follow_tracked_poses, setup_ecs};
pub use transform::Transform;
