use prometheus_auto::common::field::FixedAlliance;
use prometheus_auto::control::controllers::ProportionalController;
use prometheus_auto::control::trajectory::{EventMarker, InMemoryLoader, SwerveSample};
use prometheus_auto::perception::localization::Localizer;
use prometheus_auto::{
    Alliance, AutoConfig, AutoRoutine, FieldGeometry, LifecycleNode, MemorySink, SideChannels,
    Trajectory, TrajectoryCache,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    First,
    Second,
    Marker,
    Finished,
}

fn main() {
    println!("Initializing Prometheus autonomous core...");

    let samples: Vec<SwerveSample> = (0..=20)
        .map(|i| SwerveSample::at_pose(i as f64 * 0.1, 1.0 + i as f64 * 0.1, 2.0, 0.0))
        .collect();
    let trajectory = match Trajectory::new(
        "demo",
        samples,
        vec![0, 10],
        vec![EventMarker::new("marker", 0.5)],
    ) {
        Ok(t) => t,
        Err(e) => {
            println!("Failed to build trajectory: {}", e);
            return;
        }
    };

    let sink = Arc::new(MemorySink::new());
    let cache = TrajectoryCache::with_diagnostics(InMemoryLoader::new().with(trajectory), sink.clone());
    let config = AutoConfig::new(FieldGeometry::frc_2024(SideChannels::Swap));
    let localizer = Localizer::new();

    let mut routine = AutoRoutine::new("demo", config, localizer.clone(), FixedAlliance(Some(Alliance::Blue)))
        .with_diagnostics(sink.clone());

    let (Some(first), Some(second)) = (cache.load_split("demo", 0), cache.load_split("demo", 1)) else {
        println!("Failed to split trajectory");
        return;
    };
    routine.bind_event("marker", Step::Marker);
    let mut first = routine
        .trajectory(first, ProportionalController::new())
        .with_logger(|t: &Trajectory<SwerveSample>, starting: bool| {
            println!("{} {}", if starting { "starting" } else { "finished" }, t.name());
        });
    let mut second = routine.trajectory(second, ProportionalController::new());

    routine.on_true(routine.enabled(), Step::First);
    routine.on_true(first.done(2), Step::Second);
    routine.on_true(second.done_default(), Step::Finished);
    // reported to the sink, never fires
    let _ = first.at_time(5.0);

    routine.activate();
    for _ in 0..200 {
        for step in routine.poll(config.loop_period) {
            println!("poll {:>3}: {:?}", routine.clock().poll_count(), step);
            let result = match step {
                Step::First => routine.start(&mut first),
                Step::Second => routine.start(&mut second),
                Step::Marker => Ok(()),
                Step::Finished => {
                    routine.kill();
                    Ok(())
                }
            };
            if let Err(e) = result {
                println!("Failed to start trajectory: {}", e);
                return;
            }
        }
        for follower in [&mut first, &mut second] {
            if follower.state().is_running() {
                if let Err(e) = routine.step(&mut *follower) {
                    println!("Trajectory step failed: {}", e);
                    return;
                }
                if let Some(cmd) = follower.command() {
                    localizer.integrate(cmd.vx, cmd.vy, cmd.omega, config.loop_period);
                }
            }
        }
        if !routine.is_active() {
            break;
        }
    }

    let pose = localizer.get_pose();
    println!(
        "Final pose: x={:.3}, y={:.3}, heading={:.3}",
        pose.translation.x,
        pose.translation.y,
        pose.rotation.angle()
    );
    for diagnostic in sink.entries() {
        println!("{:?}: {}", diagnostic.severity, diagnostic.message);
    }
}
