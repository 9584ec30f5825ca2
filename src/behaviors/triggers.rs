//! Stateful triggers derived from trajectory progress

use super::clock::PollContext;
use super::Condition;
use crate::common::field::{optional_flipped, FieldGeometry};
use crate::common::types::{distance, Pose2D};
use crate::control::follower::StatusHandle;

/// Fires for exactly one poll when the follower's timer crosses `threshold`.
///
/// The crossing test is `previous < threshold <= now` between consecutive
/// observations of the same timer run. The first observation of a running
/// timer counts as coming from before the start. Restarting the timer re-arms
/// the pulse.
#[derive(Debug)]
pub struct AtTime {
    threshold: f64,
    status: StatusHandle,
    last: Option<(u32, f64)>,
}

impl AtTime {
    pub fn new(threshold: f64, status: StatusHandle) -> Self {
        AtTime {
            threshold,
            status,
            last: None,
        }
    }
}

impl Condition for AtTime {
    fn poll(&mut self, ctx: &PollContext) -> bool {
        let status = self.status.get();
        let Some(now) = status.timer.elapsed(ctx.timestamp) else {
            self.last = None;
            return false;
        };
        let run = status.timer.run();
        let previous = match self.last {
            Some((last_run, t)) if last_run == run => Some(t),
            _ => None,
        };
        self.last = Some((run, now));

        match previous {
            Some(prev) => prev < self.threshold && self.threshold <= now,
            None => status.timer.is_running() && self.threshold <= now,
        }
    }
}

/// Fires once, `cycles_to_delay` polls after the follower completes.
///
/// The follower records the run and poll in which it completed. The latch
/// fires on poll `completed + max(cycles_to_delay, 1)` of that same run: even
/// a zero delay lands on the next poll, so a consumer never reacts in the same
/// cycle as the producer. It stays false while the follower is active, after
/// an interruption, after firing until the next completion, and for a
/// completion left over from before a routine reset.
#[derive(Debug)]
pub struct CompletionLatch {
    cycles_to_delay: u32,
    status: StatusHandle,
    /// Completion `(run, poll)` seen last and the poll to fire on
    armed: Option<((u32, u64), u64)>,
}

impl CompletionLatch {
    pub fn new(cycles_to_delay: u32, status: StatusHandle) -> Self {
        CompletionLatch {
            cycles_to_delay,
            status,
            armed: None,
        }
    }
}

impl Condition for CompletionLatch {
    fn poll(&mut self, ctx: &PollContext) -> bool {
        let status = self.status.get();
        let active = status.is_active() && ctx.routine_active;
        let completed = match status.completed_poll {
            Some(poll) if !active && status.is_completed() && status.completed_run == ctx.run => {
                (status.completed_run, poll)
            }
            _ => {
                self.armed = None;
                return false;
            }
        };

        let target = match self.armed {
            Some((seen, target)) if seen == completed => target,
            _ => {
                let target = completed.1 + u64::from(self.cycles_to_delay.max(1));
                self.armed = Some((completed, target));
                target
            }
        };
        ctx.poll_count == target
    }
}

/// True while the robot is within `tolerance` meters of a target pose.
///
/// The target is given for the unflipped side and mirrored per poll. While
/// the operating side is unknown, or the target itself is unknown, the
/// condition is false.
#[derive(Debug, Clone)]
pub struct AtPose {
    target: Option<Pose2D>,
    tolerance: f64,
    field: FieldGeometry,
}

impl AtPose {
    pub fn new(target: Option<Pose2D>, tolerance: f64, field: FieldGeometry) -> Self {
        AtPose {
            target,
            tolerance,
            field,
        }
    }
}

impl Condition for AtPose {
    fn poll(&mut self, ctx: &PollContext) -> bool {
        optional_flipped(self.target, ctx.flip, &self.field)
            .map(|target| distance(&ctx.robot_pose, &target) < self.tolerance)
            .unwrap_or(false)
    }
}
