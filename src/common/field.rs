//! Field geometry and alliance mirroring
//!
//! Trajectories are authored for one side of the field. When the robot runs
//! from the opposite side every pose and velocity is reflected through the
//! field's symmetry, either across the vertical midline ([`FlipType::Mirrored`])
//! or by a half turn about the field center ([`FlipType::Rotated`]).

use super::normalize_angle;
use super::types::{pose, Pose2D};
use std::f64::consts::PI;

/// How the field is symmetric between the two operating sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipType {
    /// Reflection across the line `x = length / 2`
    Mirrored,
    /// Half turn about the field center
    Rotated,
}

/// Whether per-side kinematic channels (left/right wheels or module columns)
/// trade places under a mirror. This depends on the drivetrain and has to be
/// chosen by whoever builds the [`FieldGeometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideChannels {
    Swap,
    Keep,
}

/// Operating side reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alliance {
    Blue,
    Red,
}

/// Source of the operating side. `None` means not yet known.
pub trait AllianceSource {
    fn alliance(&self) -> Option<Alliance>;
}

impl<F> AllianceSource for F
where
    F: Fn() -> Option<Alliance>,
{
    fn alliance(&self) -> Option<Alliance> {
        self()
    }
}

/// Alliance source for hosts that already know their side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAlliance(pub Option<Alliance>);

impl AllianceSource for FixedAlliance {
    fn alliance(&self) -> Option<Alliance> {
        self.0
    }
}

/// Field dimensions and symmetry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldGeometry {
    pub length: f64,
    pub width: f64,
    pub flip_type: FlipType,
    pub side_channels: SideChannels,
}

impl FieldGeometry {
    pub fn new(length: f64, width: f64, flip_type: FlipType, side_channels: SideChannels) -> Self {
        FieldGeometry {
            length,
            width,
            flip_type,
            side_channels,
        }
    }

    /// The 2024 competition field, mirrored across its midline
    pub fn frc_2024(side_channels: SideChannels) -> Self {
        Self::new(16.541, 8.211, FlipType::Mirrored, side_channels)
    }

    pub fn flip_x(&self, x: f64) -> f64 {
        self.length - x
    }

    pub fn flip_y(&self, y: f64) -> f64 {
        match self.flip_type {
            FlipType::Mirrored => y,
            FlipType::Rotated => self.width - y,
        }
    }

    pub fn flip_heading(&self, heading: f64) -> f64 {
        match self.flip_type {
            FlipType::Mirrored => normalize_angle(PI - heading),
            FlipType::Rotated => normalize_angle(heading + PI),
        }
    }

    /// Transform a field-frame vector (velocity, acceleration, force)
    pub fn flip_vector(&self, x: f64, y: f64) -> (f64, f64) {
        match self.flip_type {
            FlipType::Mirrored => (-x, y),
            FlipType::Rotated => (-x, -y),
        }
    }

    /// Transform an angular rate or angular acceleration
    pub fn flip_angular(&self, rate: f64) -> f64 {
        match self.flip_type {
            FlipType::Mirrored => -rate,
            FlipType::Rotated => rate,
        }
    }

    /// True when left and right channels trade places under this flip.
    /// A half turn preserves handedness so it never swaps.
    pub fn swaps_sides(&self) -> bool {
        self.flip_type == FlipType::Mirrored && self.side_channels == SideChannels::Swap
    }

    pub fn flip_pose(&self, p: &Pose2D) -> Pose2D {
        pose(
            self.flip_x(p.translation.x),
            self.flip_y(p.translation.y),
            self.flip_heading(p.rotation.angle()),
        )
    }
}

/// Decide whether to mirror given the flipping setting and the alliance.
/// Returns `None` while flipping is enabled and the alliance is still unknown.
pub fn flip_decision(use_alliance_flipping: bool, alliance: Option<Alliance>) -> Option<bool> {
    if !use_alliance_flipping {
        return Some(false);
    }
    alliance.map(|a| a == Alliance::Red)
}

/// Resolve a pose for the current side: flipped, unflipped, or not yet known
pub fn optional_flipped(
    pose: Option<Pose2D>,
    flip: Option<bool>,
    field: &FieldGeometry,
) -> Option<Pose2D> {
    let p = pose?;
    match flip? {
        true => Some(field.flip_pose(&p)),
        false => Some(p),
    }
}
