use ahash::{HashMap, HashSet};
use bevy_ecs::{message::Messages, prelude::*};

use crate::{
    follower::{FollowerState, Notice, PoseFollower},
    transform::Transform,
};

/// Duration of the current tick, written by the host before running the schedule.
#[derive(Default, Resource)]
pub struct Time {
    /// Seconds since the previous tick.
    pub delta_time: f32,
}

/// Phases of a tick. Systems that write tracked poses go in [PoseSet::Tracking], followers
/// run in [PoseSet::Follow], strictly after.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoseSet {
    Tracking,
    Follow,
}

/// Raised when a follower hits a [Notice].
#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct FollowerDiagnostic {
    pub entity: Entity,
    pub notice: Notice,
}

/// Register the follower resources and systems with a world and the schedule that runs every
/// tick.
pub fn setup_ecs(world: &mut World, schedule: &mut Schedule) {
    world.init_resource::<Time>();
    world.init_resource::<Messages<FollowerDiagnostic>>();

    schedule.configure_sets((PoseSet::Tracking, PoseSet::Follow).chain());
    schedule.add_systems((
        update_diagnostics.before(PoseSet::Tracking),
        follow_tracked_poses.in_set(PoseSet::Follow),
    ));
}

/// Diagnostics are readable for the tick they were written in and the one after, then dropped.
fn update_diagnostics(mut diagnostics: ResMut<Messages<FollowerDiagnostic>>) {
    diagnostics.update();
}

type FollowersQuery<'world, 'state, 'a> = Query<'world, 'state, (Entity, &'a mut PoseFollower)>;

/// Move every [PoseFollower] towards its target and write the result to its [Transform].
pub fn follow_tracked_poses(
    mut followers: FollowersQuery,
    mut transforms: Query<&mut Transform>,
    time: Res<Time>,
    mut diagnostics: MessageWriter<FollowerDiagnostic>,
) {
    for entity in follow_order(&followers) {
        let Ok((_, mut follower)) = followers.get_mut(entity) else {
            continue;
        };

        let was_active = follower.state() == FollowerState::Active;

        let tick = follower.tick(time.delta_time, |frame| transforms.get(frame).ok().copied());

        if let Some(notice) = tick.notice {
            tracing::warn!("Follower {entity}: {notice}");
            diagnostics.write(FollowerDiagnostic { entity, notice });
        } else if !was_active && follower.state() == FollowerState::Active {
            tracing::info!("Follower {entity} is active.");
        }

        if let Some(pose) = tick.pose
            && let Ok(mut transform) = transforms.get_mut(entity)
        {
            transform.set_pose(pose);
        }
    }
}

/// Followers sorted so that a follower that reads another follower's pose runs after it.
fn follow_order(followers: &FollowersQuery) -> Vec<Entity> {
    let mut depths = HashMap::default();
    let mut visiting = HashSet::default();

    let mut order = followers
        .iter()
        .map(|(entity, _)| {
            (
                follow_depth(entity, followers, &mut depths, &mut visiting),
                entity,
            )
        })
        .collect::<Vec<_>>();
    order.sort_unstable();

    order.into_iter().map(|(_, entity)| entity).collect()
}

/// Number of followers between `entity` and plain tracked frames.
fn follow_depth(
    entity: Entity,
    followers: &FollowersQuery,
    depths: &mut HashMap<Entity, u32>,
    visiting: &mut HashSet<Entity>,
) -> u32 {
    if let Some(&depth) = depths.get(&entity) {
        return depth;
    }

    let Ok((_, follower)) = followers.get(entity) else {
        return 0;
    };

    if !visiting.insert(entity) {
        tracing::debug!("Followers reference each other in a cycle through {entity}.");
        return 0;
    }

    let depth = follower
        .config()
        .frames()
        .filter(|&frame| frame != entity && followers.contains(frame))
        .map(|frame| follow_depth(frame, followers, depths, visiting) + 1)
        .max()
        .unwrap_or(0);

    visiting.remove(&entity);
    depths.insert(entity, depth);

    depth
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use crate::{
        config::{FollowerConfig, SmoothingConfig},
        follower::MissingFrames,
        pose::PoseSample,
    };

    const DT: f32 = 1.0 / 60.0;

    /// Moves every [Transform] with a [Scripted] component to its next position.
    #[derive(Component)]
    struct Scripted(Vec<Vec3>);

    #[derive(Default, Resource)]
    struct TickCount(usize);

    fn play_scripts(mut scripted: Query<(&Scripted, &mut Transform)>, ticks: Res<TickCount>) {
        for (script, mut transform) in scripted.iter_mut() {
            if let Some(position) = script.0.get(ticks.0) {
                transform.translation = *position;
            }
        }
    }

    fn setup() -> (World, Schedule) {
        let mut world = World::new();
        let mut schedule = Schedule::default();

        setup_ecs(&mut world, &mut schedule);
        world.init_resource::<TickCount>();
        world.resource_mut::<Time>().delta_time = DT;

        (world, schedule)
    }

    fn run(world: &mut World, schedule: &mut Schedule) {
        schedule.run(world);
        world.resource_mut::<TickCount>().0 += 1;
    }

    fn drain_diagnostics(world: &mut World) -> Vec<FollowerDiagnostic> {
        world
            .resource_mut::<Messages<FollowerDiagnostic>>()
            .drain()
            .collect()
    }

    #[test]
    fn follows_tracking_updates_from_the_same_tick() {
        let (mut world, mut schedule) = setup();
        schedule.add_systems(play_scripts.in_set(PoseSet::Tracking));

        let tracker = world
            .spawn((
                Transform::IDENTITY,
                Scripted(vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)]),
            ))
            .id();
        let config = FollowerConfig::absolute(tracker, SmoothingConfig::default());
        let follower = world.spawn(PoseFollower::new(config)).id();

        // The first tick snaps to the target, which must be this tick's tracked position.
        run(&mut world, &mut schedule);
        assert_eq!(
            world.get::<Transform>(follower).unwrap().translation,
            Vec3::new(1.0, 0.0, 0.0)
        );

        run(&mut world, &mut schedule);
        let expected = Vec3::new(1.0, 0.0, 0.0).lerp(
            Vec3::new(2.0, 0.0, 0.0),
            crate::filter::blend_factor(SmoothingConfig::default().position_rate(), DT),
        );
        assert!(
            world
                .get::<Transform>(follower)
                .unwrap()
                .translation
                .abs_diff_eq(expected, 1e-5)
        );
    }

    #[test]
    fn keeps_follower_scale() {
        let (mut world, mut schedule) = setup();

        let tracker = world
            .spawn(Transform::new(Vec3::splat(3.0), Quat::from_rotation_z(0.4)))
            .id();
        let follower = world
            .spawn((
                PoseFollower::new(FollowerConfig::absolute(tracker, Default::default())),
                Transform::IDENTITY.with_scale(Vec3::splat(0.5)),
            ))
            .id();

        run(&mut world, &mut schedule);

        let transform = world.get::<Transform>(follower).unwrap();
        assert_eq!(transform.translation, Vec3::splat(3.0));
        assert_eq!(transform.scale, Vec3::splat(0.5));
    }

    #[test]
    fn despawned_frame_regresses_to_unconfigured() {
        let (mut world, mut schedule) = setup();

        let tracker = world.spawn(Transform::from_translation(Vec3::X)).id();
        let basis = world.spawn(Transform::IDENTITY).id();
        let reference = world.spawn(Transform::IDENTITY).id();
        let follower = world
            .spawn(PoseFollower::new(FollowerConfig::relative(
                tracker,
                basis,
                reference,
                Default::default(),
            )))
            .id();

        run(&mut world, &mut schedule);
        assert_eq!(
            world.get::<PoseFollower>(follower).unwrap().state(),
            FollowerState::Active
        );
        assert!(drain_diagnostics(&mut world).is_empty());

        world.despawn(basis);
        world.get_mut::<Transform>(tracker).unwrap().translation = Vec3::new(0.0, 7.0, 0.0);

        run(&mut world, &mut schedule);
        assert_eq!(
            drain_diagnostics(&mut world),
            vec![FollowerDiagnostic {
                entity: follower,
                notice: Notice::ConfigurationMissing(MissingFrames::BASIS),
            }]
        );

        for _ in 0..10 {
            run(&mut world, &mut schedule);
        }

        assert_eq!(
            world.get::<PoseFollower>(follower).unwrap().state(),
            FollowerState::Unconfigured(MissingFrames::BASIS)
        );
        assert_eq!(world.get::<Transform>(follower).unwrap().translation, Vec3::X);
        assert!(drain_diagnostics(&mut world).is_empty());
    }

    #[test]
    fn degenerate_source_is_reported_once_and_held() {
        let (mut world, mut schedule) = setup();

        let tracker = world.spawn(Transform::from_translation(Vec3::Y)).id();
        let follower = world
            .spawn(PoseFollower::new(FollowerConfig::absolute(
                tracker,
                Default::default(),
            )))
            .id();

        run(&mut world, &mut schedule);

        world.get_mut::<Transform>(tracker).unwrap().rotation = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
        run(&mut world, &mut schedule);
        assert_eq!(
            drain_diagnostics(&mut world),
            vec![FollowerDiagnostic {
                entity: follower,
                notice: Notice::NumericDegenerate,
            }]
        );

        for _ in 0..5 {
            run(&mut world, &mut schedule);
        }

        assert_eq!(
            world.get::<Transform>(follower).unwrap().pose(),
            PoseSample::from_position(Vec3::Y)
        );
        assert!(drain_diagnostics(&mut world).is_empty());
    }

    #[test]
    fn unread_diagnostics_are_dropped() {
        let (mut world, mut schedule) = setup();

        let tracker = world.spawn(Transform::from_translation(Vec3::X)).id();
        world.spawn(PoseFollower::new(FollowerConfig::absolute(
            tracker,
            Default::default(),
        )));

        // A tracker dropping out every other tick raises a new notice every time.
        for tick in 0..2000 {
            world.get_mut::<Transform>(tracker).unwrap().translation = if tick % 2 == 0 {
                Vec3::splat(f32::NAN)
            } else {
                Vec3::X
            };
            run(&mut world, &mut schedule);

            assert!(world.resource::<Messages<FollowerDiagnostic>>().len() <= 2);
        }

        assert!(!world.resource::<Messages<FollowerDiagnostic>>().is_empty());
    }

    #[test]
    fn chained_followers_read_upstream_output_from_the_same_tick() {
        let (mut world, mut schedule) = setup();

        let raw_pelvis = world.spawn(Transform::from_translation(Vec3::new(2.0, 0.0, 0.0))).id();
        let raw_hand = world.spawn(Transform::from_translation(Vec3::new(3.0, 0.0, 0.0))).id();

        // Spawn the hand before the pelvis it depends on, so plain iteration order would read
        // the smoothed pelvis before it was updated.
        let smoothed_pelvis = world.spawn_empty().id();
        let smoothed_hand = world
            .spawn(PoseFollower::new(FollowerConfig::relative(
                raw_hand,
                raw_pelvis,
                smoothed_pelvis,
                Default::default(),
            )))
            .id();
        world
            .entity_mut(smoothed_pelvis)
            .insert(PoseFollower::new(FollowerConfig::absolute(
                raw_pelvis,
                Default::default(),
            )));

        run(&mut world, &mut schedule);

        assert_eq!(
            world.get::<Transform>(smoothed_pelvis).unwrap().translation,
            Vec3::new(2.0, 0.0, 0.0)
        );
        assert!(
            world
                .get::<Transform>(smoothed_hand)
                .unwrap()
                .translation
                .abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-5)
        );
    }

    #[test]
    fn follower_cycles_do_not_stall() {
        let (mut world, mut schedule) = setup();

        let a = world.spawn_empty().id();
        let b = world
            .spawn(PoseFollower::new(FollowerConfig::absolute(a, Default::default())))
            .id();
        world
            .entity_mut(a)
            .insert(PoseFollower::new(FollowerConfig::absolute(b, Default::default())));

        for _ in 0..3 {
            run(&mut world, &mut schedule);
        }

        assert_eq!(
            world.get::<PoseFollower>(a).unwrap().state(),
            FollowerState::Active
        );
        assert_eq!(
            world.get::<PoseFollower>(b).unwrap().state(),
            FollowerState::Active
        );
    }
}
