//! Common utilities and types for Prometheus autonomous routines
pub mod diagnostics;
pub mod error;
pub mod field;

/// Common types and utilities used across the codebase
pub mod types {
    use nalgebra::{Isometry2, Vector2};

    /// A field-relative pose: translation in meters, heading as a unit complex rotation
    pub type Pose2D = Isometry2<f64>;

    /// Build a pose from `x`, `y` and a heading in radians
    pub fn pose(x: f64, y: f64, heading: f64) -> Pose2D {
        Isometry2::new(Vector2::new(x, y), heading)
    }

    /// Straight-line distance between the translations of two poses
    pub fn distance(a: &Pose2D, b: &Pose2D) -> f64 {
        (a.translation.vector - b.translation.vector).norm()
    }

    /// Robot-relative chassis velocity
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    pub struct ChassisSpeeds {
        pub vx: f64,
        pub vy: f64,
        pub omega: f64,
    }

    impl ChassisSpeeds {
        pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
            ChassisSpeeds { vx, vy, omega }
        }
    }
}

/// Linear interpolation between two scalars
pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Normalize an angle to (-pi, pi]
pub(crate) fn normalize_angle(angle: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut wrapped = angle.rem_euclid(two_pi);
    if wrapped > std::f64::consts::PI {
        wrapped -= two_pi;
    }
    wrapped
}
