//! Per-run clock and poll snapshot
//!
//! The host advances the [`RoutineClock`] exactly once per control cycle.
//! Conditions never read the clock directly; they receive a [`PollContext`]
//! captured at the start of the poll.

use crate::common::types::Pose2D;
use nalgebra::Isometry2;

/// Counters for one autonomous run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutineClock {
    timestamp: f64,
    phase_start: f64,
    poll_count: u64,
    /// Bumped by every reset
    run: u32,
    active: bool,
}

impl Default for RoutineClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutineClock {
    pub fn new() -> Self {
        RoutineClock {
            timestamp: 0.0,
            phase_start: 0.0,
            poll_count: 0,
            run: 0,
            active: false,
        }
    }

    /// Advance one control cycle of `dt` seconds. Negative steps are ignored
    /// so time stays monotonic.
    pub fn tick(&mut self, dt: f64) {
        self.poll_count += 1;
        if dt > 0.0 {
            self.timestamp += dt;
        }
    }

    /// Restart the phase timer; the poll count keeps running
    pub fn begin_phase(&mut self) {
        self.phase_start = self.timestamp;
    }

    /// Seconds since the current phase began
    pub fn elapsed(&self) -> f64 {
        self.timestamp - self.phase_start
    }

    /// Seconds since the run began
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    /// Number of resets so far. Poll counts are only comparable within a run.
    pub fn run(&self) -> u32 {
        self.run
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Start a new run from zero
    pub fn reset(&mut self) {
        *self = RoutineClock {
            run: self.run.wrapping_add(1),
            active: self.active,
            ..RoutineClock::new()
        };
    }

    /// Capture everything a condition may look at during this poll
    pub fn snapshot(&self, robot_pose: Pose2D, flip: Option<bool>) -> PollContext {
        PollContext {
            run: self.run,
            poll_count: self.poll_count,
            timestamp: self.timestamp,
            elapsed: self.elapsed(),
            routine_active: self.active,
            flip,
            robot_pose,
        }
    }
}

/// Read-only view of the routine for a single poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollContext {
    /// Routine run this poll belongs to
    pub run: u32,
    pub poll_count: u64,
    /// Seconds since the run began
    pub timestamp: f64,
    /// Seconds since the current phase began
    pub elapsed: f64,
    pub routine_active: bool,
    /// Mirror decision for this poll; `None` while the operating side is unknown
    pub flip: Option<bool>,
    pub robot_pose: Pose2D,
}

impl Default for PollContext {
    fn default() -> Self {
        PollContext {
            run: 0,
            poll_count: 0,
            timestamp: 0.0,
            elapsed: 0.0,
            routine_active: true,
            flip: Some(false),
            robot_pose: Isometry2::identity(),
        }
    }
}

/// Stopwatch over routine time. Each restart begins a new run so edge
/// detectors can tell a restart from time simply standing still.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timer {
    started_at: Option<f64>,
    stopped_at: Option<f64>,
    run: u32,
}

impl Timer {
    pub fn restart(&mut self, now: f64) {
        self.started_at = Some(now);
        self.stopped_at = None;
        self.run = self.run.wrapping_add(1);
    }

    pub fn stop(&mut self, now: f64) {
        if self.started_at.is_some() && self.stopped_at.is_none() {
            self.stopped_at = Some(now);
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_none()
    }

    /// Seconds on the stopwatch at routine time `now`; `None` if never started
    pub fn elapsed(&self, now: f64) -> Option<f64> {
        let start = self.started_at?;
        let end = self.stopped_at.unwrap_or(now);
        Some((end - start).max(0.0))
    }

    /// Number of times the timer has been restarted
    pub fn run(&self) -> u32 {
        self.run
    }
}
