use approx::assert_relative_eq;
use prometheus_auto::behaviors::clock::RoutineClock;
use prometheus_auto::common::diagnostics::MemorySink;
use prometheus_auto::common::field::{FieldGeometry, FlipType, SideChannels};
use prometheus_auto::common::types::pose;
use prometheus_auto::control::controllers::ProportionalController;
use prometheus_auto::control::follower::TrajectoryFollower;
use prometheus_auto::control::trajectory::{DifferentialSample, SwerveSample, TrajectorySample};
use prometheus_auto::{AutoConfig, Condition, ConditionExt, LifecycleNode, Trajectory};
use proptest::prelude::*;
use std::f64::consts::PI;
use std::sync::Arc;

fn field(flip_type: FlipType, swap: bool) -> FieldGeometry {
    let channels = if swap {
        SideChannels::Swap
    } else {
        SideChannels::Keep
    };
    FieldGeometry::new(16.541, 8.211, flip_type, channels)
}

fn flip_type() -> impl Strategy<Value = FlipType> {
    prop_oneof![Just(FlipType::Mirrored), Just(FlipType::Rotated)]
}

prop_compose! {
    fn swerve_sample()(
        t in 0.0..15.0f64,
        x in 0.0..16.5f64,
        y in 0.0..8.2f64,
        heading in -PI..PI,
        v in prop::array::uniform3(-5.0..5.0f64),
        forces in prop::array::uniform4(-50.0..50.0f64),
    ) -> SwerveSample {
        SwerveSample {
            vx: v[0],
            vy: v[1],
            omega: v[2],
            ax: v[1],
            ay: v[2],
            alpha: v[0],
            module_forces_x: forces,
            module_forces_y: [forces[3], forces[2], forces[1], forces[0]],
            ..SwerveSample::at_pose(t, x, y, heading)
        }
    }
}

/// Strictly increasing timestamps starting at `start`
fn trajectory() -> impl Strategy<Value = Trajectory<SwerveSample>> {
    (0.0..2.0f64, prop::collection::vec((0.01..1.0f64, 0.0..10.0f64), 2..20)).prop_map(
        |(start, steps)| {
            let mut t = start;
            let samples = steps
                .into_iter()
                .map(|(dt, x)| {
                    let s = SwerveSample::at_pose(t, x, 1.0, 0.0);
                    t += dt;
                    s
                })
                .collect();
            Trajectory::from_samples("generated", samples).unwrap()
        },
    )
}

proptest! {
    #[test]
    fn sampling_clamps_outside_the_time_range(traj in trajectory(), before in 0.0..100.0f64, after in 0.0..100.0f64) {
        let first = traj.samples()[0];
        let last = traj.samples()[traj.samples().len() - 1];
        prop_assert_eq!(traj.sample_at(first.timestamp - before - 1e-9, None), Some(first));
        prop_assert_eq!(traj.sample_at(traj.total_time() + after, None), Some(last));
    }

    #[test]
    fn sampling_is_exact_at_knots(traj in trajectory()) {
        for s in traj.samples() {
            let sampled = traj.sample_at(s.timestamp, None).unwrap();
            prop_assert!((sampled.x - s.x).abs() < 1e-9);
            prop_assert!((sampled.timestamp - s.timestamp).abs() < 1e-9);
        }
    }

    #[test]
    fn swerve_mirror_is_an_involution(s in swerve_sample(), flip in flip_type(), swap in any::<bool>()) {
        let field = field(flip, swap);
        let back = s.mirror(&field).mirror(&field);
        prop_assert!((back.x - s.x).abs() < 1e-9);
        prop_assert!((back.y - s.y).abs() < 1e-9);
        prop_assert!(back.pose().rotation.angle_to(&s.pose().rotation).abs() < 1e-9);
        prop_assert!((back.vx - s.vx).abs() < 1e-9);
        prop_assert!((back.omega - s.omega).abs() < 1e-9);
        prop_assert_eq!(back.module_forces_x, s.module_forces_x);
        prop_assert_eq!(back.module_forces_y, s.module_forces_y);
    }

    #[test]
    fn differential_mirror_is_an_involution(
        x in 0.0..16.5f64,
        y in 0.0..8.2f64,
        heading in -PI..PI,
        vl in -4.0..4.0f64,
        vr in -4.0..4.0f64,
        flip in flip_type(),
        swap in any::<bool>(),
    ) {
        let field = field(flip, swap);
        let s = DifferentialSample { vl, vr, fl: vl * 10.0, ..DifferentialSample::at_pose(0.5, x, y, heading) };
        let back = s.mirror(&field).mirror(&field);
        prop_assert!((back.x - s.x).abs() < 1e-9);
        prop_assert!((back.y - s.y).abs() < 1e-9);
        prop_assert!(back.pose().rotation.angle_to(&s.pose().rotation).abs() < 1e-9);
        prop_assert!((back.vl - s.vl).abs() < 1e-12);
        prop_assert!((back.fl - s.fl).abs() < 1e-12);
    }

    #[test]
    fn time_pulse_fires_exactly_once(threshold in 0.0..4.0f64) {
        let fired = pulse_polls(threshold, 0.1, 45);
        prop_assert_eq!(fired.len(), 1);
    }

    #[test]
    fn completion_latch_fires_after_requested_delay(delay in 0u32..20) {
        let (completed, fired) = latch_polls(delay);
        prop_assert_eq!(fired, vec![completed + u64::from(delay.max(1))]);
    }
}

fn four_second_follower(sink: &Arc<MemorySink>) -> TrajectoryFollower<SwerveSample> {
    let samples = (0..=4)
        .map(|i| SwerveSample::at_pose(i as f64, i as f64, 0.0, 0.0))
        .collect();
    let traj = Arc::new(Trajectory::from_samples("four", samples).unwrap());
    let config = AutoConfig::new(FieldGeometry::frc_2024(SideChannels::Swap));
    TrajectoryFollower::new(traj, ProportionalController::new(), config, sink.clone())
}

/// Poll counts at which `at_time(threshold)` fired over a run
fn pulse_polls(threshold: f64, dt: f64, polls: u64) -> Vec<u64> {
    let sink = Arc::new(MemorySink::new());
    let mut follower = four_second_follower(&sink);
    let mut pulse = follower.at_time(threshold);
    let mut clock = RoutineClock::new();
    clock.set_active(true);
    follower.on_initialize(&mut clock).unwrap();

    let mut fired = Vec::new();
    for _ in 0..polls {
        let ctx = clock.snapshot(pose(0.0, 0.0, 0.0), Some(false));
        if pulse.poll(&ctx) {
            fired.push(ctx.poll_count);
        }
        clock.tick(dt);
    }
    fired
}

/// Completion poll and the polls at which `done(delay)` fired
fn latch_polls(delay: u32) -> (u64, Vec<u64>) {
    let sink = Arc::new(MemorySink::new());
    let mut follower = four_second_follower(&sink);
    let mut done = follower.done(delay);
    let mut clock = RoutineClock::new();
    clock.set_active(true);
    follower.on_initialize(&mut clock).unwrap();

    let mut completed = None;
    let mut fired = Vec::new();
    for _ in 0..100 {
        clock.tick(0.25);
        let ctx = clock.snapshot(pose(0.0, 0.0, 0.0), Some(false));
        if done.poll(&ctx) {
            fired.push(ctx.poll_count);
        }
        if follower.state().is_running() {
            follower.on_execute(&ctx).unwrap();
            if follower.is_finished(&ctx) {
                follower.on_end(&ctx, false).unwrap();
                completed = Some(ctx.poll_count);
            }
        }
    }
    (completed.unwrap_or_default(), fired)
}

#[test]
fn pulse_over_four_seconds_at_ten_hertz() {
    // 40 polls from elapsed 0.0; exactly one lands on the crossing
    assert_eq!(pulse_polls(2.0, 0.1, 40).len(), 1);
}

#[test]
fn done_three_fires_only_three_polls_later() {
    let (completed, fired) = latch_polls(3);
    assert_eq!(completed, 17);
    assert_eq!(fired, vec![20]);
}

#[test]
fn empty_trajectory_is_absent_for_every_query() {
    let empty = Trajectory::<SwerveSample>::empty("empty");
    assert!(empty.sample_at(1.0, None).is_none());
    assert!(empty.initial_pose(None).is_none());
    assert!(empty.final_pose(None).is_none());
    assert_relative_eq!(empty.total_time(), 0.0);
}

#[test]
fn shared_latch_stays_quiet_after_a_reset() {
    let sink = Arc::new(MemorySink::new());
    let mut follower = four_second_follower(&sink);
    let mut done = follower.done(2).shared();
    let mut clock = RoutineClock::new();
    clock.set_active(true);
    follower.on_initialize(&mut clock).unwrap();

    let mut fired = Vec::new();
    for _ in 0..2 {
        for _ in 0..30 {
            clock.tick(0.25);
            let ctx = clock.snapshot(pose(0.0, 0.0, 0.0), Some(false));
            if done.poll(&ctx) {
                fired.push((ctx.run, ctx.poll_count));
            }
            if follower.state().is_running() {
                follower.on_execute(&ctx).unwrap();
                if follower.is_finished(&ctx) {
                    follower.on_end(&ctx, false).unwrap();
                }
            }
        }
        // the follower is not restarted in the second run
        clock.reset();
    }
    assert_eq!(fired, vec![(0, 19)]);
}
