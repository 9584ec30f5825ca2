//! Localization module

use super::PoseSource;
use crate::common::types::Pose2D;
use nalgebra::{Isometry2, Vector2};
use std::cell::Cell;
use std::rc::Rc;

/// Dead-reckoning localizer for the robot
///
/// Clones share the same estimate, so one handle can be given to a routine as
/// its pose source while the drive loop keeps updating another.
#[derive(Debug, Clone)]
pub struct Localizer {
    pose: Rc<Cell<Pose2D>>,
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Localizer {
    /// Create a new localizer at the origin
    pub fn new() -> Self {
        Self::at(Isometry2::identity())
    }

    pub fn at(pose: Pose2D) -> Self {
        Localizer {
            pose: Rc::new(Cell::new(pose)),
        }
    }

    /// Overwrite the estimate, e.g. with a trajectory's starting pose
    pub fn reset(&self, pose: Pose2D) {
        self.pose.set(pose);
    }

    /// Update the pose estimate from a robot-relative odometry delta
    pub fn update(&self, dx: f64, dy: f64, dtheta: f64) {
        let current = self.pose.get();
        self.pose
            .set(current * Isometry2::new(Vector2::new(dx, dy), dtheta));
    }

    /// Integrate field-relative velocities over `dt` seconds
    pub fn integrate(&self, vx: f64, vy: f64, omega: f64, dt: f64) {
        let current = self.pose.get();
        let translation = current.translation.vector + Vector2::new(vx, vy) * dt;
        self.pose.set(Isometry2::new(
            translation,
            current.rotation.angle() + omega * dt,
        ));
    }

    /// Get the current pose estimate
    pub fn get_pose(&self) -> Pose2D {
        self.pose.get()
    }
}

impl PoseSource for Localizer {
    fn pose(&self) -> Pose2D {
        self.get_pose()
    }
}
