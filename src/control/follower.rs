//! Trajectory following under host control
//!
//! A [`TrajectoryFollower`] plays one trajectory through a controller while
//! the host drives its lifecycle, and hands out conditions that react to its
//! progress. The follower and its conditions share a small [`FollowStatus`]
//! cell; nothing crosses threads.

use super::controllers::TrajectoryController;
use super::trajectory::{Trajectory, TrajectorySample};
use crate::behaviors::clock::{PollContext, RoutineClock, Timer};
use crate::behaviors::triggers::{AtPose, AtTime, CompletionLatch};
use crate::behaviors::{condition, never, AnyOf, BoxedCondition, ConditionExt};
use crate::common::diagnostics::DiagnosticsSink;
use crate::common::error::LifecycleError;
use crate::common::field::FieldGeometry;
use crate::common::types::{ChassisSpeeds, Pose2D};
use crate::config::AutoConfig;
use crate::lifecycle::{Lifecycle, LifecycleNode, State};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// Progress of a follower as seen by its conditions
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FollowStatus {
    pub state: State,
    pub timer: Timer,
    /// Poll in which the last run completed without interruption
    pub completed_poll: Option<u64>,
    /// Routine run that `completed_poll` belongs to
    pub completed_run: u32,
}

impl FollowStatus {
    pub fn is_active(&self) -> bool {
        self.state.is_running()
    }

    pub fn is_completed(&self) -> bool {
        self.state == State::Completed
    }
}

/// Handle shared between a follower and the conditions it created
pub type StatusHandle = Rc<Cell<FollowStatus>>;

/// Told about every trajectory a follower starts and ends
pub trait TrajectoryLogger<S> {
    fn log(&mut self, trajectory: &Trajectory<S>, starting: bool);
}

impl<S, F> TrajectoryLogger<S> for F
where
    F: FnMut(&Trajectory<S>, bool),
{
    fn log(&mut self, trajectory: &Trajectory<S>, starting: bool) {
        self(trajectory, starting)
    }
}

/// Follows one trajectory and exposes triggers on its progress
pub struct TrajectoryFollower<S> {
    lifecycle: Lifecycle,
    trajectory: Arc<Trajectory<S>>,
    controller: Box<dyn TrajectoryController<S>>,
    config: AutoConfig,
    diagnostics: Arc<dyn DiagnosticsSink>,
    status: StatusHandle,
    logger: Option<Box<dyn TrajectoryLogger<S>>>,
    last_sample: Option<S>,
    command: Option<ChassisSpeeds>,
}

impl<S: TrajectorySample + 'static> TrajectoryFollower<S> {
    pub fn new<C>(
        trajectory: Arc<Trajectory<S>>,
        controller: C,
        config: AutoConfig,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self
    where
        C: TrajectoryController<S> + 'static,
    {
        TrajectoryFollower {
            lifecycle: Lifecycle::new(trajectory.name()),
            trajectory,
            controller: Box::new(controller),
            config,
            diagnostics,
            status: Rc::new(Cell::new(FollowStatus::default())),
            logger: None,
            last_sample: None,
            command: None,
        }
    }

    /// Report starts and ends to `logger` as well as `tracing`
    pub fn with_logger<L: TrajectoryLogger<S> + 'static>(mut self, logger: L) -> Self {
        self.set_logger(logger);
        self
    }

    pub fn set_logger<L: TrajectoryLogger<S> + 'static>(&mut self, logger: L) {
        self.logger = Some(Box::new(logger));
    }

    pub fn name(&self) -> &str {
        self.trajectory.name()
    }

    pub fn trajectory(&self) -> &Arc<Trajectory<S>> {
        &self.trajectory
    }

    pub fn status(&self) -> FollowStatus {
        self.status.get()
    }

    /// Seconds on this follower's timer at the poll's routine time
    pub fn elapsed(&self, ctx: &PollContext) -> f64 {
        self.status.get().timer.elapsed(ctx.timestamp).unwrap_or(0.0)
    }

    /// Most recent sample handed to the controller
    pub fn last_sample(&self) -> Option<&S> {
        self.last_sample.as_ref()
    }

    /// Most recent controller output, for the host to apply
    pub fn command(&self) -> Option<ChassisSpeeds> {
        self.command
    }

    fn field(&self, flip: bool) -> Option<&FieldGeometry> {
        flip.then_some(&self.config.field)
    }

    /// Starting pose for the current side; `None` while the side is unknown
    /// or the trajectory is empty
    pub fn initial_pose(&self, flip: Option<bool>) -> Option<Pose2D> {
        self.trajectory.initial_pose(self.field(flip?))
    }

    /// Final pose for the current side; `None` while the side is unknown
    /// or the trajectory is empty
    pub fn final_pose(&self, flip: Option<bool>) -> Option<Pose2D> {
        self.trajectory.final_pose(self.field(flip?))
    }

    fn update_status(&self, f: impl FnOnce(&mut FollowStatus)) {
        let mut status = self.status.get();
        f(&mut status);
        self.status.set(status);
    }

    /// Sample at the current timer value and feed the controller
    fn feed(&mut self, ctx: &PollContext) {
        // sampling waits until the operating side is known
        let Some(flip) = ctx.flip else {
            return;
        };
        let elapsed = self.elapsed(ctx);
        let Some(sample) = self
            .trajectory
            .sample_at(elapsed, flip.then_some(&self.config.field))
        else {
            return;
        };
        self.command = Some(self.controller.compute(&ctx.robot_pose, &sample));
        self.last_sample = Some(sample);
    }

    /// True while this follower is running inside an active routine
    pub fn active(&self) -> BoxedCondition {
        let status = Rc::clone(&self.status);
        condition(move |ctx: &PollContext| status.get().is_active() && ctx.routine_active).boxed()
    }

    /// Same as `active().negate()`
    pub fn inactive(&self) -> BoxedCondition {
        self.active().negate().boxed()
    }

    /// Fires once, `cycles_to_delay` polls after the trajectory completes.
    /// Never fires for an interrupted run.
    ///
    /// The delay is at least one poll, so `done(0)` and `done(1)` fire on the
    /// same poll.
    pub fn done(&self, cycles_to_delay: u32) -> BoxedCondition {
        CompletionLatch::new(cycles_to_delay, Rc::clone(&self.status)).boxed()
    }

    /// Fires on the poll after completion, same as `done(1)`
    pub fn done_default(&self) -> BoxedCondition {
        self.done(0)
    }

    /// Fires for one poll when the trajectory timer reaches `time_since_start`.
    /// Times outside the trajectory are reported and give a condition that
    /// never fires.
    pub fn at_time(&self, time_since_start: f64) -> BoxedCondition {
        if time_since_start < 0.0 {
            self.diagnostics.warn(&format!(
                "trigger time cannot be negative for {}",
                self.name()
            ));
            return never();
        }
        if time_since_start > self.trajectory.total_time() {
            self.diagnostics.warn(&format!(
                "trigger time cannot be greater than total trajectory time for {}",
                self.name()
            ));
            return never();
        }
        AtTime::new(time_since_start, Rc::clone(&self.status)).boxed()
    }

    /// Fires at the time of every marker named `event_name`
    pub fn at_time_event(&self, event_name: &str) -> BoxedCondition {
        let conditions = self
            .trajectory
            .events_named(event_name)
            .map(|e| self.at_time(e.timestamp))
            .collect();
        self.any_event(event_name, conditions)
    }

    /// True while the robot is within `tolerance` meters of `pose`, given for
    /// the unflipped side
    pub fn at_pose(&self, pose: Option<Pose2D>, tolerance: f64) -> BoxedCondition {
        AtPose::new(pose, tolerance, self.config.field).boxed()
    }

    /// True while the robot is near the pose of any marker named `event_name`
    pub fn at_pose_event(&self, event_name: &str, tolerance: f64) -> BoxedCondition {
        let conditions = self
            .trajectory
            .events_named(event_name)
            // unflipped here; AtPose mirrors per poll
            .filter_map(|e| self.trajectory.sample_at(e.timestamp, None))
            .map(|s| self.at_pose(Some(s.pose()), tolerance))
            .collect();
        self.any_event(event_name, conditions)
    }

    pub fn at_pose_event_default(&self, event_name: &str) -> BoxedCondition {
        self.at_pose_event(event_name, self.config.default_tolerance)
    }

    /// The event's time has been reached and the robot is near its pose
    pub fn at_time_and_pose(&self, event_name: &str, tolerance: f64) -> BoxedCondition {
        self.at_time_event(event_name)
            .and(self.at_pose_event(event_name, tolerance))
            .boxed()
    }

    /// Timestamps of every marker named `event_name`
    pub fn collect_event_times(&self, event_name: &str) -> Vec<f64> {
        self.trajectory
            .events_named(event_name)
            .map(|e| e.timestamp)
            .collect()
    }

    /// Unflipped poses of every marker named `event_name`
    pub fn collect_event_poses(&self, event_name: &str) -> Vec<Pose2D> {
        self.collect_event_times(event_name)
            .into_iter()
            .filter_map(|t| self.trajectory.sample_at(t, None))
            .map(|s| s.pose())
            .collect()
    }

    fn notify_logger(&mut self, starting: bool) {
        if let Some(logger) = self.logger.as_mut() {
            logger.log(&self.trajectory, starting);
        }
    }

    fn any_event(&self, event_name: &str, conditions: Vec<BoxedCondition>) -> BoxedCondition {
        if conditions.is_empty() {
            self.diagnostics.warn(&format!(
                "event {:?} not found for {}",
                event_name,
                self.name()
            ));
            return never();
        }
        AnyOf(conditions).boxed()
    }
}

impl<S: TrajectorySample + 'static> LifecycleNode for TrajectoryFollower<S> {
    fn on_initialize(&mut self, clock: &mut RoutineClock) -> Result<(), LifecycleError> {
        self.lifecycle.start()?;
        clock.begin_phase();
        let now = clock.timestamp();
        self.update_status(|s| {
            s.state = State::Running;
            s.timer.restart(now);
        });
        self.last_sample = None;
        self.command = None;
        if self.trajectory.is_empty() {
            self.diagnostics
                .error(&format!("trajectory {} has no samples", self.name()));
        }
        tracing::info!(trajectory = self.name(), at = now, "trajectory started");
        self.notify_logger(true);
        Ok(())
    }

    fn on_execute(&mut self, ctx: &PollContext) -> Result<(), LifecycleError> {
        self.lifecycle.require_running("execute")?;
        self.feed(ctx);
        Ok(())
    }

    fn on_end(&mut self, ctx: &PollContext, interrupted: bool) -> Result<(), LifecycleError> {
        let state = self.lifecycle.stop(interrupted)?;
        let counts_as_done = !interrupted && !self.trajectory.is_empty();
        self.update_status(|s| {
            s.timer.stop(ctx.timestamp);
            s.state = state;
            s.completed_poll = counts_as_done.then_some(ctx.poll_count);
            s.completed_run = ctx.run;
        });
        // hand the controller the final sample
        self.feed(ctx);
        tracing::info!(trajectory = self.name(), ?state, poll = ctx.poll_count, "trajectory ended");
        self.notify_logger(false);
        Ok(())
    }

    fn is_finished(&self, ctx: &PollContext) -> bool {
        self.trajectory.is_empty()
            || self.elapsed(ctx) > self.trajectory.total_time()
            || !ctx.routine_active
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::Condition;
    use crate::common::diagnostics::MemorySink;
    use crate::common::field::SideChannels;
    use crate::common::types::pose;
    use crate::control::controllers::ProportionalController;
    use crate::control::trajectory::{EventMarker, SwerveSample};
    use approx::assert_relative_eq;
    use std::cell::RefCell;

    fn config() -> AutoConfig {
        AutoConfig::new(FieldGeometry::frc_2024(SideChannels::Swap))
    }

    fn line() -> Arc<Trajectory<SwerveSample>> {
        let samples = (0..=4)
            .map(|i| SwerveSample::at_pose(i as f64, i as f64, 1.0, 0.0))
            .collect();
        let events = vec![
            EventMarker::new("intake", 1.0),
            EventMarker::new("intake", 3.0),
        ];
        Arc::new(Trajectory::new("line", samples, Vec::new(), events).unwrap())
    }

    fn follower(sink: &Arc<MemorySink>) -> TrajectoryFollower<SwerveSample> {
        TrajectoryFollower::new(line(), ProportionalController::new(), config(), sink.clone())
    }

    /// Advance the clock and snapshot with the robot sitting at `x`
    fn step(clock: &mut RoutineClock, x: f64) -> PollContext {
        clock.tick(0.5);
        clock.snapshot(pose(x, 1.0, 0.0), Some(false))
    }

    #[test]
    fn lifecycle_and_commands() {
        let sink = Arc::new(MemorySink::new());
        let mut f = follower(&sink);
        let mut clock = RoutineClock::new();
        clock.set_active(true);

        assert!(f.on_execute(&clock.snapshot(pose(0.0, 0.0, 0.0), Some(false))).is_err());

        f.on_initialize(&mut clock).unwrap();
        assert_eq!(f.state(), State::Running);
        let ctx = step(&mut clock, 0.5);
        f.on_execute(&ctx).unwrap();
        assert_relative_eq!(f.last_sample().unwrap().x, 0.5, epsilon = 1e-9);
        assert!(f.command().is_some());
        assert!(!f.is_finished(&ctx));

        let mut ctx = ctx;
        for _ in 0..8 {
            ctx = step(&mut clock, 4.0);
        }
        assert!(f.is_finished(&ctx));
        f.on_end(&ctx, false).unwrap();
        assert_eq!(f.state(), State::Completed);
        assert_eq!(f.status().completed_poll, Some(ctx.poll_count));
        assert_relative_eq!(f.last_sample().unwrap().x, 4.0);
    }

    #[test]
    fn unknown_side_blocks_sampling_and_poses() {
        let sink = Arc::new(MemorySink::new());
        let mut f = follower(&sink);
        let mut clock = RoutineClock::new();
        f.on_initialize(&mut clock).unwrap();
        clock.tick(0.5);
        f.on_execute(&clock.snapshot(pose(0.0, 0.0, 0.0), None)).unwrap();
        assert!(f.last_sample().is_none());
        assert!(f.initial_pose(None).is_none());

        let flipped = f.final_pose(Some(true)).unwrap();
        assert_relative_eq!(flipped.translation.x, 16.541 - 4.0, epsilon = 1e-9);
    }

    #[test]
    fn invalid_trigger_times_warn_and_never_fire() {
        let sink = Arc::new(MemorySink::new());
        let f = follower(&sink);
        let mut early = f.at_time(-1.0);
        let mut late = f.at_time(4.5);
        assert_eq!(sink.warnings(), 2);
        let ctx = PollContext::default();
        assert!(!early.poll(&ctx));
        assert!(!late.poll(&ctx));
    }

    #[test]
    fn missing_event_warns_once() {
        let sink = Arc::new(MemorySink::new());
        let f = follower(&sink);
        let mut missing = f.at_time_event("nonexistent");
        assert_eq!(sink.warnings(), 1);
        assert!(!missing.poll(&PollContext::default()));
        assert!(!f.at_pose_event_default("nonexistent").poll(&PollContext::default()));
        assert_eq!(sink.warnings(), 2);
    }

    #[test]
    fn repeated_event_fires_at_each_marker() {
        let sink = Arc::new(MemorySink::new());
        let mut f = follower(&sink);
        let mut intake = f.at_time_event("intake");
        let mut clock = RoutineClock::new();
        clock.set_active(true);
        f.on_initialize(&mut clock).unwrap();

        let mut fired = Vec::new();
        for _ in 0..8 {
            let ctx = step(&mut clock, 0.0);
            if intake.poll(&ctx) {
                fired.push(f.elapsed(&ctx));
            }
        }
        assert_eq!(fired, vec![1.0, 3.0]);
        assert_eq!(f.collect_event_times("intake"), vec![1.0, 3.0]);
        assert_relative_eq!(f.collect_event_poses("intake")[1].translation.x, 3.0);
    }

    #[test]
    fn event_pose_trigger_tracks_robot() {
        let sink = Arc::new(MemorySink::new());
        let f = follower(&sink);
        let mut near = f.at_pose_event("intake", 0.25);
        let mut ctx = PollContext::default();
        ctx.robot_pose = pose(3.1, 1.0, 0.0);
        assert!(near.poll(&ctx));
        ctx.robot_pose = pose(2.0, 1.0, 0.0);
        assert!(!near.poll(&ctx));
    }

    #[test]
    fn logger_sees_start_and_end() {
        let sink = Arc::new(MemorySink::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let mut f = follower(&sink).with_logger(move |t: &Trajectory<SwerveSample>, starting: bool| {
            log.borrow_mut().push((t.name().to_string(), starting));
        });
        let mut clock = RoutineClock::new();
        clock.set_active(true);

        f.on_initialize(&mut clock).unwrap();
        let ctx = step(&mut clock, 0.0);
        f.on_end(&ctx, true).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![("line".to_string(), true), ("line".to_string(), false)]
        );
    }

    #[test]
    fn empty_trajectory_finishes_without_done() {
        let sink = Arc::new(MemorySink::new());
        let empty = Arc::new(Trajectory::<SwerveSample>::from_samples("empty", Vec::new()).unwrap());
        let mut f = TrajectoryFollower::new(empty, ProportionalController::new(), config(), sink.clone());
        let mut done = f.done(0);
        let mut clock = RoutineClock::new();
        clock.set_active(true);

        f.on_initialize(&mut clock).unwrap();
        assert_eq!(sink.errors(), 1);
        let ctx = step(&mut clock, 0.0);
        assert!(f.is_finished(&ctx));
        f.on_end(&ctx, false).unwrap();
        assert!(f.last_sample().is_none());
        for _ in 0..3 {
            assert!(!done.poll(&step(&mut clock, 0.0)));
        }
    }
}
