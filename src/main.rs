use std::process::ExitCode;

use bevy_ecs::{prelude::*, schedule::ScheduleLabel};
use clap::Parser;
use follow::{
    BlendCurve, FollowerConfig, PoseFollower, PoseSample, PoseSet, SmoothingConfig, Time,
    Transform,
};
use glam::Vec3;
use tracing::{error, info, warn};

use crate::sim::{Jitter, Motion, SimClock, TrackedDevice};

mod sim;

#[derive(Clone, Copy, Debug, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum Scenario {
    /// Smooth a hand tracker in world space.
    Absolute,
    /// Smooth a hand tracker riding a moving platform, with the platform motion removed.
    Platform,
    /// Re-anchor the hand tracker onto a smoothed copy of the platform it rides on.
    Anchor,
}

#[derive(clap::Parser)]
struct Opts {
    /// The follower setup to simulate.
    #[arg(long, value_enum, default_value_t = Scenario::Platform)]
    scenario: Scenario,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Simulated ticks per second.
    #[arg(long, default_value_t = 90.0)]
    fps: f32,
    /// Position smoothing rate, higher is snappier.
    #[arg(long, default_value_t = follow::DEFAULT_RATE)]
    position_rate: f32,
    /// Rotation smoothing rate, higher is snappier.
    #[arg(long, default_value_t = follow::DEFAULT_RATE)]
    rotation_rate: f32,
    /// Amplitude of the tracking noise in meters.
    #[arg(long, default_value_t = 0.01)]
    jitter: f32,
    /// Use the frame rate dependent linear blend instead of the exponential one.
    #[arg(long)]
    linear: bool,
    /// Log the follower every this many ticks, 0 to only log the summary.
    #[arg(long, default_value_t = 45)]
    log_every: u32,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, ScheduleLabel)]
struct TickSchedule;

/// The follower to report on and where it would be without any tracking noise.
struct Watched {
    follower: Entity,
    ideal: Motion,
}

fn spawn_scenario(
    world: &mut World,
    scenario: Scenario,
    smoothing: SmoothingConfig,
    jitter: f32,
) -> Watched {
    let platform = Motion::Drift {
        origin: Vec3::ZERO,
        velocity: Vec3::new(0.5, 0.0, 0.2),
        yaw_rate: 0.3,
    };
    let hand = Motion::Orbit {
        center: Vec3::new(0.0, 1.2, 0.4),
        radius: 0.3,
        angular_speed: 2.0,
    };
    let hand_on_platform = Motion::Carried {
        carrier: Box::new(platform.clone()),
        local: Box::new(hand.clone()),
    };

    let noise = |seed: f32| Jitter {
        amplitude: jitter,
        seed,
    };

    match scenario {
        Scenario::Absolute => {
            let hand_tracker = world
                .spawn(TrackedDevice {
                    motion: hand.clone(),
                    jitter: noise(1.0),
                })
                .id();

            let follower = world
                .spawn(PoseFollower::new(FollowerConfig::absolute(
                    hand_tracker,
                    smoothing,
                )))
                .id();

            Watched {
                follower,
                ideal: hand,
            }
        }

        Scenario::Platform => {
            let platform_tracker = world
                .spawn(TrackedDevice {
                    motion: platform,
                    jitter: noise(2.0),
                })
                .id();
            let hand_tracker = world
                .spawn(TrackedDevice {
                    motion: hand_on_platform,
                    jitter: noise(3.0),
                })
                .id();
            let origin = world
                .spawn(TrackedDevice {
                    motion: Motion::Still(PoseSample::IDENTITY),
                    jitter: Jitter::default(),
                })
                .id();

            let follower = world
                .spawn(PoseFollower::new(FollowerConfig::relative(
                    hand_tracker,
                    platform_tracker,
                    origin,
                    smoothing,
                )))
                .id();

            Watched {
                follower,
                ideal: hand,
            }
        }

        Scenario::Anchor => {
            let platform_tracker = world
                .spawn(TrackedDevice {
                    motion: platform,
                    jitter: noise(4.0),
                })
                .id();
            let hand_tracker = world
                .spawn(TrackedDevice {
                    motion: hand_on_platform.clone(),
                    jitter: noise(5.0),
                })
                .id();

            let smoothed_platform = world
                .spawn(PoseFollower::new(FollowerConfig::absolute(
                    platform_tracker,
                    smoothing,
                )))
                .id();
            let follower = world
                .spawn(PoseFollower::new(FollowerConfig::relative(
                    hand_tracker,
                    platform_tracker,
                    smoothed_platform,
                    smoothing,
                )))
                .id();

            Watched {
                follower,
                ideal: hand_on_platform,
            }
        }
    }
}

/// The pose the follower would snap to without smoothing.
fn raw_target(world: &World, config: &FollowerConfig) -> Option<PoseSample> {
    let frame = |entity| world.get::<Transform>(entity).copied();

    let source = frame(config.source())?.pose();
    match config.remap() {
        None => Some(source),
        Some(remap) => Some(follow::remap_pose(
            source,
            &frame(remap.basis)?,
            &frame(remap.reference)?,
        )),
    }
}

#[derive(Default)]
struct ErrorStats {
    raw: f32,
    smoothed: f32,
    /// Sum of distances between consecutive poses, noise shows up as extra path length.
    raw_path: f32,
    smoothed_path: f32,
    samples: u32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().init();

    let opts = Opts::parse();

    let smoothing = match SmoothingConfig::new(opts.position_rate, opts.rotation_rate) {
        Ok(smoothing) => smoothing.with_curve(if opts.linear {
            BlendCurve::Linear
        } else {
            BlendCurve::Exponential
        }),
        Err(err) => {
            error!("Invalid smoothing settings! - {}", err);
            return ExitCode::FAILURE;
        }
    };

    if !opts.fps.is_finite() || opts.fps <= 0.0 {
        error!("Ticks per second must be a positive number! ({})", opts.fps);
        return ExitCode::FAILURE;
    }
    let delta_time = 1.0 / opts.fps;

    let mut world = World::new();
    let mut schedule = Schedule::new(TickSchedule);

    follow::setup_ecs(&mut world, &mut schedule);
    world.init_resource::<SimClock>();
    schedule.add_systems(sim::update_tracked_devices.in_set(PoseSet::Tracking));

    let watched = spawn_scenario(&mut world, opts.scenario, smoothing, opts.jitter);

    info!(
        "Simulating {} ticks of the {} scenario at {} ticks per second ({} blend).",
        opts.ticks,
        opts.scenario,
        opts.fps,
        smoothing.curve()
    );

    let mut stats = ErrorStats::default();
    let mut previous: Option<(PoseSample, PoseSample)> = None;

    for tick in 0..opts.ticks {
        world.resource_mut::<Time>().delta_time = delta_time;
        world.resource_mut::<SimClock>().elapsed += delta_time;

        schedule.run(&mut world);

        let Some(follower) = world.get::<PoseFollower>(watched.follower) else {
            warn!("The watched follower is gone.");
            break;
        };
        let (Some(raw), Some(smoothed)) = (
            raw_target(&world, follower.config()),
            follower.current_pose(),
        ) else {
            continue;
        };

        let ideal = watched.ideal.pose_at(world.resource::<SimClock>().elapsed);
        let raw_error = raw.distance(&ideal);
        let smoothed_error = smoothed.distance(&ideal);

        stats.raw += raw_error;
        stats.smoothed += smoothed_error;
        stats.samples += 1;
        if let Some((previous_raw, previous_smoothed)) = previous {
            stats.raw_path += raw.distance(&previous_raw);
            stats.smoothed_path += smoothed.distance(&previous_smoothed);
        }
        previous = Some((raw, smoothed));

        if opts.log_every > 0 && tick % opts.log_every == 0 {
            info!(
                "tick {:>5}: smoothed ({:.3}, {:.3}, {:.3}), raw error {:.4} m, smoothed error {:.4} m",
                tick,
                smoothed.position.x,
                smoothed.position.y,
                smoothed.position.z,
                raw_error,
                smoothed_error,
            );
        }
    }

    if stats.samples == 0 {
        warn!("The follower never produced a pose.");
        return ExitCode::FAILURE;
    }

    let samples = stats.samples as f32;
    info!(
        "Mean error raw {:.4} m, smoothed {:.4} m. Path length raw {:.3} m, smoothed {:.3} m.",
        stats.raw / samples,
        stats.smoothed / samples,
        stats.raw_path,
        stats.smoothed_path,
    );

    ExitCode::SUCCESS
}
