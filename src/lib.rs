pub mod behaviors;
pub mod common;
pub mod config;
pub mod control;
pub mod lifecycle;
pub mod perception;

pub use crate::behaviors::clock::{PollContext, RoutineClock};
pub use crate::behaviors::event_loop::{Edge, EventLoop};
pub use crate::behaviors::{BoxedCondition, Condition, ConditionExt};
pub use crate::common::diagnostics::{DiagnosticsSink, MemorySink, TracingSink};
pub use crate::common::field::{Alliance, AllianceSource, FieldGeometry, FlipType, SideChannels};
pub use crate::config::AutoConfig;
pub use crate::control::follower::{TrajectoryFollower, TrajectoryLogger};
pub use crate::control::trajectory::{Trajectory, TrajectoryCache, TrajectorySample};
pub use crate::lifecycle::{LifecycleNode, State};

use crate::behaviors::condition;
use crate::common::error::LifecycleError;
use crate::common::field::flip_decision;
use crate::control::controllers::TrajectoryController;
use crate::perception::PoseSource;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One autonomous routine: its clock, its bindings, and the followers it builds
///
/// The host calls [`AutoRoutine::poll`] exactly once per control cycle and
/// schedules the actions it returns. Followers are driven with
/// [`AutoRoutine::start`], [`AutoRoutine::step`] and [`AutoRoutine::interrupt`]
/// against the same poll's snapshot.
pub struct AutoRoutine<A> {
    name: String,
    clock: RoutineClock,
    bindings: EventLoop<A>,
    /// Actions wired to every follower whose trajectory has the named event
    event_bindings: BTreeMap<String, A>,
    pose_source: Box<dyn PoseSource>,
    alliance: Box<dyn AllianceSource>,
    config: AutoConfig,
    diagnostics: Arc<dyn DiagnosticsSink>,
    last: PollContext,
}

impl<A: Clone> AutoRoutine<A> {
    /// Create a new routine, inactive until [`AutoRoutine::activate`]
    pub fn new<P, L>(name: &str, config: AutoConfig, pose_source: P, alliance: L) -> Self
    where
        P: PoseSource + 'static,
        L: AllianceSource + 'static,
    {
        let clock = RoutineClock::new();
        AutoRoutine {
            name: name.to_string(),
            last: clock.snapshot(pose_source.pose(), None),
            clock,
            bindings: EventLoop::new(),
            event_bindings: BTreeMap::new(),
            pose_source: Box::new(pose_source),
            alliance: Box::new(alliance),
            config,
            diagnostics: Arc::new(TracingSink),
        }
    }

    /// Report anomalies to `diagnostics` instead of `tracing`
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AutoConfig {
        &self.config
    }

    pub fn clock(&self) -> &RoutineClock {
        &self.clock
    }

    pub fn is_active(&self) -> bool {
        self.clock.is_active()
    }

    /// Mirror decision right now; `None` while the alliance is unknown
    pub fn flip(&self) -> Option<bool> {
        flip_decision(self.config.use_alliance_flipping, self.alliance.alliance())
    }

    /// Snapshot of the current poll without advancing the clock
    pub fn snapshot(&self) -> PollContext {
        self.clock.snapshot(self.pose_source.pose(), self.flip())
    }

    /// Snapshot taken by the most recent poll
    pub fn context(&self) -> &PollContext {
        &self.last
    }

    pub fn activate(&mut self) {
        tracing::info!(routine = %self.name, "activated");
        self.clock.set_active(true);
    }

    /// Stop the routine. Running followers finish as interrupted on their
    /// next [`AutoRoutine::step`].
    pub fn kill(&mut self) {
        tracing::info!(routine = %self.name, polls = self.clock.poll_count(), "killed");
        self.clock.set_active(false);
        self.last.routine_active = false;
    }

    /// Start a new run: time and poll count go back to zero and every
    /// binding fires afresh
    pub fn reset(&mut self) {
        tracing::debug!(routine = %self.name, "reset");
        self.clock.reset();
        self.bindings.rearm();
        self.last = self.snapshot();
    }

    /// Advance one control cycle of `dt` seconds and return the actions whose
    /// bindings fired. Does nothing while the routine is inactive.
    pub fn poll(&mut self, dt: f64) -> Vec<A> {
        if !self.clock.is_active() {
            return Vec::new();
        }
        self.clock.tick(dt);
        self.last = self.snapshot();
        let fired = self.bindings.poll(&self.last);
        if !fired.is_empty() {
            tracing::trace!(routine = %self.name, poll = self.last.poll_count, fired = fired.len(), "bindings fired");
        }
        fired
    }

    /// True while the routine is active
    pub fn enabled(&self) -> BoxedCondition {
        condition(|ctx: &PollContext| ctx.routine_active).boxed()
    }

    /// True once the operating side is known, or always when flipping is off
    pub fn alliance_known_or_ignored(&self) -> BoxedCondition {
        condition(|ctx: &PollContext| ctx.flip.is_some()).boxed()
    }

    /// Fire `action` whenever a running follower reaches a marker named
    /// `event_name`. Applies to followers built after this call; a later
    /// binding for the same name replaces the earlier one.
    pub fn bind_event(&mut self, event_name: &str, action: A) {
        self.event_bindings.insert(event_name.to_string(), action);
    }

    /// Build a follower sharing this routine's configuration and diagnostics,
    /// with the routine's event bindings wired to its markers
    pub fn trajectory<S, C>(&mut self, trajectory: Arc<Trajectory<S>>, controller: C) -> TrajectoryFollower<S>
    where
        S: TrajectorySample + 'static,
        C: TrajectoryController<S> + 'static,
    {
        let follower = TrajectoryFollower::new(
            trajectory,
            controller,
            self.config,
            Arc::clone(&self.diagnostics),
        );
        for (event, action) in &self.event_bindings {
            // events the trajectory lacks are not an error here
            if follower.trajectory().events_named(event).next().is_none() {
                continue;
            }
            self.bindings.on_true(
                follower.active().and(follower.at_time_event(event)),
                action.clone(),
            );
        }
        follower
    }

    /// Build a follower for a cached trajectory. A trajectory that cannot be
    /// loaded becomes an empty one, which finishes immediately.
    pub fn trajectory_named<S, C>(
        &mut self,
        cache: &TrajectoryCache<S>,
        name: &str,
        controller: C,
    ) -> TrajectoryFollower<S>
    where
        S: TrajectorySample + 'static,
        C: TrajectoryController<S> + 'static,
    {
        let trajectory = cache
            .load(name)
            .unwrap_or_else(|| Arc::new(Trajectory::empty(name)));
        self.trajectory(trajectory, controller)
    }

    pub fn bind<C: Condition + 'static>(&mut self, condition: C, edge: Edge, action: A) {
        self.bindings.bind(condition, edge, action);
    }

    pub fn on_true<C: Condition + 'static>(&mut self, condition: C, action: A) {
        self.bindings.on_true(condition, action);
    }

    pub fn on_false<C: Condition + 'static>(&mut self, condition: C, action: A) {
        self.bindings.on_false(condition, action);
    }

    pub fn while_true<C: Condition + 'static>(&mut self, condition: C, action: A) {
        self.bindings.while_true(condition, action);
    }

    pub fn on_true_with<C, S>(&mut self, condition: C, selector: S, if_true: A, if_false: A)
    where
        C: Condition + 'static,
        S: Condition + 'static,
    {
        self.bindings.on_true_with(condition, selector, if_true, if_false);
    }

    /// Initialize a node at the current routine time
    pub fn start(&mut self, node: &mut dyn LifecycleNode) -> Result<(), LifecycleError> {
        node.on_initialize(&mut self.clock)?;
        self.last.elapsed = self.clock.elapsed();
        Ok(())
    }

    /// Run one cycle of a node and end it once it is finished. Returns true
    /// when the node ended during this call.
    pub fn step(&mut self, node: &mut dyn LifecycleNode) -> Result<bool, LifecycleError> {
        let ctx = self.last;
        if ctx.routine_active {
            node.on_execute(&ctx)?;
        }
        if node.is_finished(&ctx) {
            node.on_end(&ctx, !ctx.routine_active)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// End a running node early
    pub fn interrupt(&mut self, node: &mut dyn LifecycleNode) -> Result<(), LifecycleError> {
        node.on_end(&self.last, true)
    }
}
