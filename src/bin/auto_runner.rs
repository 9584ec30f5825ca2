//! Runs a two-piece routine against a simulated drivetrain at the configured
//! loop period.
//!
//! `RUST_LOG=prometheus_auto=debug cargo run --bin auto_runner`

use anyhow::{bail, Result};
use prometheus_auto::common::field::FixedAlliance;
use prometheus_auto::control::controllers::ProportionalController;
use prometheus_auto::control::trajectory::{EventMarker, InMemoryLoader, SwerveSample};
use prometheus_auto::perception::localization::Localizer;
use prometheus_auto::{
    Alliance, AutoConfig, AutoRoutine, ConditionExt, FieldGeometry, LifecycleNode, SideChannels,
    Trajectory, TrajectoryCache,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Drive,
    Intake,
    Score,
}

/// Straight drive out and back up the field with an intake stop halfway
fn two_piece() -> Result<Trajectory<SwerveSample>> {
    let samples = (0..=30)
        .map(|i| {
            let t = i as f64 * 0.1;
            SwerveSample {
                vx: 1.5,
                ..SwerveSample::at_pose(t, 1.5 + 1.5 * t, 5.5, 0.0)
            }
        })
        .collect();
    let events = vec![EventMarker::new("intake", 1.5)];
    Ok(Trajectory::new("two_piece", samples, vec![0, 15], events)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = AutoConfig::new(FieldGeometry::frc_2024(SideChannels::Swap));
    let mut params = HashMap::new();
    params.insert("loop_period".to_string(), 0.02);
    params.insert("default_tolerance".to_string(), 0.1);
    config.configure(&params)?;

    let cache = TrajectoryCache::new(InMemoryLoader::new().with(two_piece()?));
    let localizer = Localizer::new();
    let mut routine = AutoRoutine::new(
        "two_piece",
        config,
        localizer.clone(),
        FixedAlliance(Some(Alliance::Red)),
    );
    let mut follower = routine
        .trajectory_named(&cache, "two_piece", ProportionalController::new())
        .with_logger(|t: &Trajectory<SwerveSample>, starting: bool| {
            tracing::debug!(trajectory = t.name(), starting, total = t.total_time(), "trajectory log");
        });

    routine.on_true(routine.enabled().and(routine.alliance_known_or_ignored()), Action::Drive);
    routine.on_true(follower.at_time_and_pose("intake", 0.5), Action::Intake);
    routine.on_true(follower.done_default(), Action::Score);

    let max_polls = ((follower.trajectory().total_time() + 1.0) / config.loop_period) as u64;
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(config.loop_period));
    routine.activate();

    while routine.is_active() {
        ticker.tick().await;
        for action in routine.poll(config.loop_period) {
            match action {
                Action::Drive => {
                    if let Some(start) = follower.initial_pose(routine.flip()) {
                        localizer.reset(start);
                    }
                    routine.start(&mut follower)?;
                }
                Action::Intake => tracing::info!(pose = ?localizer.get_pose().translation.vector, "intaking"),
                Action::Score => {
                    tracing::info!(polls = routine.clock().poll_count(), "scoring");
                    routine.kill();
                }
            }
        }

        if follower.state().is_running() {
            routine.step(&mut follower)?;
            if let Some(cmd) = follower.command() {
                localizer.integrate(cmd.vx, cmd.vy, cmd.omega, config.loop_period);
            }
        }

        if routine.clock().poll_count() > max_polls {
            bail!("routine did not finish within {} polls", max_polls);
        }
    }

    tracing::info!(state = ?follower.state(), "routine finished");
    Ok(())
}
