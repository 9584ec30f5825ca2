//! Kinematic samples
//!
//! A sample is one instant of a precomputed trajectory. Every operation is
//! value-semantic: interpolating, mirroring or shifting returns a new sample.

use crate::common::field::FieldGeometry;
use crate::common::lerp;
use crate::common::types::{pose, ChassisSpeeds, Pose2D};
use nalgebra::Isometry2;

/// Capabilities shared by every drivetrain's sample type
pub trait TrajectorySample: Clone + std::fmt::Debug {
    /// Seconds from the start of the trajectory
    fn timestamp(&self) -> f64;

    /// Field-relative pose
    fn pose(&self) -> Pose2D;

    /// State at time `t` between `self` and `end`.
    ///
    /// Callers must ensure `end.timestamp() > self.timestamp()`; zero-length
    /// intervals are handled by the trajectory before getting here.
    fn interpolate(&self, end: &Self, t: f64) -> Self;

    /// The same state as seen from the opposite side of the field
    fn mirror(&self, field: &FieldGeometry) -> Self;

    /// A copy with the timestamp shifted by `delta` seconds
    fn offset_by(&self, delta: f64) -> Self;
}

fn scale_between(start: f64, end: f64, t: f64) -> f64 {
    (t - start) / (end - start)
}

/// Linear in translation, shortest arc in heading
fn interpolate_pose(start: &Pose2D, end: &Pose2D, scale: f64) -> Pose2D {
    let translation = start
        .translation
        .vector
        .lerp(&end.translation.vector, scale);
    let swept = start.rotation.rotation_to(&end.rotation).angle();
    Isometry2::new(translation, start.rotation.angle() + swept * scale)
}

/// Sample for a holonomic (swerve) drivetrain.
///
/// Module arrays are ordered front-left, front-right, back-left, back-right.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SwerveSample {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
    pub ax: f64,
    pub ay: f64,
    pub alpha: f64,
    pub module_forces_x: [f64; 4],
    pub module_forces_y: [f64; 4],
}

impl SwerveSample {
    /// Sample at rest at the given pose
    pub fn at_pose(timestamp: f64, x: f64, y: f64, heading: f64) -> Self {
        SwerveSample {
            timestamp,
            x,
            y,
            heading,
            ..SwerveSample::default()
        }
    }

    /// Field-relative velocity
    pub fn chassis_speeds(&self) -> ChassisSpeeds {
        ChassisSpeeds::new(self.vx, self.vy, self.omega)
    }
}

/// Front-left/front-right and back-left/back-right trade places
fn swap_columns(forces: [f64; 4]) -> [f64; 4] {
    [forces[1], forces[0], forces[3], forces[2]]
}

impl TrajectorySample for SwerveSample {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn pose(&self) -> Pose2D {
        pose(self.x, self.y, self.heading)
    }

    fn interpolate(&self, end: &Self, t: f64) -> Self {
        let scale = scale_between(self.timestamp, end.timestamp, t);
        let p = interpolate_pose(&self.pose(), &end.pose(), scale);
        let mut fx = [0.0; 4];
        let mut fy = [0.0; 4];
        for i in 0..4 {
            fx[i] = lerp(self.module_forces_x[i], end.module_forces_x[i], scale);
            fy[i] = lerp(self.module_forces_y[i], end.module_forces_y[i], scale);
        }
        SwerveSample {
            timestamp: lerp(self.timestamp, end.timestamp, scale),
            x: p.translation.x,
            y: p.translation.y,
            heading: p.rotation.angle(),
            vx: lerp(self.vx, end.vx, scale),
            vy: lerp(self.vy, end.vy, scale),
            omega: lerp(self.omega, end.omega, scale),
            ax: lerp(self.ax, end.ax, scale),
            ay: lerp(self.ay, end.ay, scale),
            alpha: lerp(self.alpha, end.alpha, scale),
            module_forces_x: fx,
            module_forces_y: fy,
        }
    }

    fn mirror(&self, field: &FieldGeometry) -> Self {
        let (vx, vy) = field.flip_vector(self.vx, self.vy);
        let (ax, ay) = field.flip_vector(self.ax, self.ay);
        let mut fx = [0.0; 4];
        let mut fy = [0.0; 4];
        for i in 0..4 {
            (fx[i], fy[i]) = field.flip_vector(self.module_forces_x[i], self.module_forces_y[i]);
        }
        if field.swaps_sides() {
            fx = swap_columns(fx);
            fy = swap_columns(fy);
        }
        SwerveSample {
            timestamp: self.timestamp,
            x: field.flip_x(self.x),
            y: field.flip_y(self.y),
            heading: field.flip_heading(self.heading),
            vx,
            vy,
            omega: field.flip_angular(self.omega),
            ax,
            ay,
            alpha: field.flip_angular(self.alpha),
            module_forces_x: fx,
            module_forces_y: fy,
        }
    }

    fn offset_by(&self, delta: f64) -> Self {
        SwerveSample {
            timestamp: self.timestamp + delta,
            ..*self
        }
    }
}

/// Sample for a differential (tank) drivetrain
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DifferentialSample {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    /// Left side velocity (m/s)
    pub vl: f64,
    /// Right side velocity (m/s)
    pub vr: f64,
    pub al: f64,
    pub ar: f64,
    /// Left side force (N)
    pub fl: f64,
    /// Right side force (N)
    pub fr: f64,
}

impl DifferentialSample {
    pub fn at_pose(timestamp: f64, x: f64, y: f64, heading: f64) -> Self {
        DifferentialSample {
            timestamp,
            x,
            y,
            heading,
            ..DifferentialSample::default()
        }
    }

    /// Robot-relative velocity for a drivetrain with the given track width
    pub fn chassis_speeds(&self, track_width: f64) -> ChassisSpeeds {
        ChassisSpeeds::new(
            (self.vl + self.vr) / 2.0,
            0.0,
            (self.vr - self.vl) / track_width,
        )
    }
}

impl TrajectorySample for DifferentialSample {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn pose(&self) -> Pose2D {
        pose(self.x, self.y, self.heading)
    }

    fn interpolate(&self, end: &Self, t: f64) -> Self {
        let scale = scale_between(self.timestamp, end.timestamp, t);
        let p = interpolate_pose(&self.pose(), &end.pose(), scale);
        DifferentialSample {
            timestamp: lerp(self.timestamp, end.timestamp, scale),
            x: p.translation.x,
            y: p.translation.y,
            heading: p.rotation.angle(),
            vl: lerp(self.vl, end.vl, scale),
            vr: lerp(self.vr, end.vr, scale),
            al: lerp(self.al, end.al, scale),
            ar: lerp(self.ar, end.ar, scale),
            fl: lerp(self.fl, end.fl, scale),
            fr: lerp(self.fr, end.fr, scale),
        }
    }

    fn mirror(&self, field: &FieldGeometry) -> Self {
        let mut mirrored = DifferentialSample {
            x: field.flip_x(self.x),
            y: field.flip_y(self.y),
            heading: field.flip_heading(self.heading),
            ..*self
        };
        if field.swaps_sides() {
            mirrored.vl = self.vr;
            mirrored.vr = self.vl;
            mirrored.al = self.ar;
            mirrored.ar = self.al;
            mirrored.fl = self.fr;
            mirrored.fr = self.fl;
        }
        mirrored
    }

    fn offset_by(&self, delta: f64) -> Self {
        DifferentialSample {
            timestamp: self.timestamp + delta,
            ..*self
        }
    }
}
