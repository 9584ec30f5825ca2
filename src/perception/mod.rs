//! Perception module: where the robot thinks it is
pub mod localization;

use crate::common::types::Pose2D;

/// Anything that can report the robot's current field-relative pose
pub trait PoseSource {
    fn pose(&self) -> Pose2D;
}

impl<F> PoseSource for F
where
    F: Fn() -> Pose2D,
{
    fn pose(&self) -> Pose2D {
        self()
    }
}
