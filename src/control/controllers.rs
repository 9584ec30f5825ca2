//! Controllers that turn a trajectory sample into a velocity command

use crate::common::normalize_angle;
use crate::common::types::{ChassisSpeeds, Pose2D};
use crate::control::trajectory::{DifferentialSample, SwerveSample};

/// Consumes the sampled state each cycle and produces a chassis command
pub trait TrajectoryController<S> {
    fn compute(&mut self, current_pose: &Pose2D, sample: &S) -> ChassisSpeeds;
}

impl<S, F> TrajectoryController<S> for F
where
    F: FnMut(&Pose2D, &S) -> ChassisSpeeds,
{
    fn compute(&mut self, current_pose: &Pose2D, sample: &S) -> ChassisSpeeds {
        self(current_pose, sample)
    }
}

/// Feedforward from the sample plus proportional correction of pose error
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProportionalController {
    linear_gain: f64,
    angular_gain: f64,
    /// Only used for differential samples
    track_width: f64,
}

impl Default for ProportionalController {
    fn default() -> Self {
        Self::new()
    }
}

impl ProportionalController {
    /// Create a new controller
    pub fn new() -> Self {
        ProportionalController {
            linear_gain: 0.5,
            angular_gain: 1.0,
            track_width: 0.6,
        }
    }

    pub fn with_gains(linear_gain: f64, angular_gain: f64) -> Self {
        ProportionalController {
            linear_gain,
            angular_gain,
            ..Self::new()
        }
    }

    pub fn with_track_width(mut self, track_width: f64) -> Self {
        self.track_width = track_width;
        self
    }

    fn heading_error(current_pose: &Pose2D, target_heading: f64) -> f64 {
        normalize_angle(target_heading - current_pose.rotation.angle())
    }
}

impl TrajectoryController<SwerveSample> for ProportionalController {
    /// Field-relative command
    fn compute(&mut self, current_pose: &Pose2D, sample: &SwerveSample) -> ChassisSpeeds {
        let dx = sample.x - current_pose.translation.x;
        let dy = sample.y - current_pose.translation.y;
        ChassisSpeeds::new(
            sample.vx + self.linear_gain * dx,
            sample.vy + self.linear_gain * dy,
            sample.omega + self.angular_gain * Self::heading_error(current_pose, sample.heading),
        )
    }
}

impl TrajectoryController<DifferentialSample> for ProportionalController {
    /// Robot-relative command
    fn compute(&mut self, current_pose: &Pose2D, sample: &DifferentialSample) -> ChassisSpeeds {
        let feedforward = sample.chassis_speeds(self.track_width);
        let heading = current_pose.rotation.angle();
        let dx = sample.x - current_pose.translation.x;
        let dy = sample.y - current_pose.translation.y;
        // error along the robot's forward axis
        let along = dx * heading.cos() + dy * heading.sin();

        ChassisSpeeds::new(
            feedforward.vx + self.linear_gain * along,
            0.0,
            feedforward.omega + self.angular_gain * Self::heading_error(current_pose, sample.heading),
        )
    }
}
