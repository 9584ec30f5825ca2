//! Precomputed trajectories
//!
//! A [`Trajectory`] is built once, fully populated, and never mutated.
//! Mirrored and split trajectories are new instances.

pub mod cache;
pub mod event;
pub mod sample;

pub use self::cache::{InMemoryLoader, TrajectoryCache, TrajectoryLoader};
pub use self::event::EventMarker;
pub use self::sample::{DifferentialSample, SwerveSample, TrajectorySample};

use crate::common::error::TrajectoryError;
use crate::common::field::FieldGeometry;
use crate::common::types::Pose2D;

/// Adjacent samples closer than this are treated as the same instant
const DEGENERATE_INTERVAL: f64 = 1e-6;

/// An immutable, time-ordered sequence of samples with split points and
/// named events
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<S> {
    name: String,
    samples: Vec<S>,
    splits: Vec<usize>,
    events: Vec<EventMarker>,
}

impl<S: TrajectorySample> Trajectory<S> {
    /// Assemble a trajectory, checking sample order and split indices
    pub fn new(
        name: impl Into<String>,
        samples: Vec<S>,
        splits: Vec<usize>,
        events: Vec<EventMarker>,
    ) -> Result<Self, TrajectoryError> {
        for (index, pair) in samples.windows(2).enumerate() {
            if pair[1].timestamp() < pair[0].timestamp() {
                return Err(TrajectoryError::UnsortedSamples {
                    index: index + 1,
                    timestamp: pair[1].timestamp(),
                    previous: pair[0].timestamp(),
                });
            }
        }
        for (i, &index) in splits.iter().enumerate() {
            if index >= samples.len() {
                return Err(TrajectoryError::SplitOutOfBounds {
                    index,
                    len: samples.len(),
                });
            }
            if i > 0 && splits[i - 1] >= index {
                return Err(TrajectoryError::UnsortedSplits {
                    previous: splits[i - 1],
                    index,
                });
            }
        }
        Ok(Trajectory {
            name: name.into(),
            samples,
            splits,
            events,
        })
    }

    /// A trajectory with no splits and no events
    pub fn from_samples(name: impl Into<String>, samples: Vec<S>) -> Result<Self, TrajectoryError> {
        Self::new(name, samples, Vec::new(), Vec::new())
    }

    /// A trajectory without samples, used in place of one that failed to load
    pub fn empty(name: impl Into<String>) -> Self {
        Trajectory {
            name: name.into(),
            samples: Vec::new(),
            splits: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[S] {
        &self.samples
    }

    pub fn splits(&self) -> &[usize] {
        &self.splits
    }

    pub fn split_count(&self) -> usize {
        self.splits.len()
    }

    pub fn events(&self) -> &[EventMarker] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the last sample, or 0 for an empty trajectory
    pub fn total_time(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.timestamp())
    }

    pub fn initial_sample(&self, mirror: Option<&FieldGeometry>) -> Option<S> {
        self.samples.first().map(|s| mirrored(s.clone(), mirror))
    }

    pub fn final_sample(&self, mirror: Option<&FieldGeometry>) -> Option<S> {
        self.samples.last().map(|s| mirrored(s.clone(), mirror))
    }

    pub fn initial_pose(&self, mirror: Option<&FieldGeometry>) -> Option<Pose2D> {
        self.initial_sample(mirror).map(|s| s.pose())
    }

    pub fn final_pose(&self, mirror: Option<&FieldGeometry>) -> Option<Pose2D> {
        self.final_sample(mirror).map(|s| s.pose())
    }

    /// Poses of every sample, unmirrored
    pub fn poses(&self) -> Vec<Pose2D> {
        self.samples.iter().map(|s| s.pose()).collect()
    }

    /// State at `timestamp` seconds from the start, mirrored across `mirror`
    /// when given. Times before the first sample or at/after the last one
    /// clamp to those samples. `None` only for an empty trajectory.
    pub fn sample_at(&self, timestamp: f64, mirror: Option<&FieldGeometry>) -> Option<S> {
        let state = match self.samples.len() {
            0 => return None,
            1 => self.samples[0].clone(),
            _ => self.sample_internal(timestamp),
        };
        Some(mirrored(state, mirror))
    }

    fn sample_internal(&self, timestamp: f64) -> S {
        let first = &self.samples[0];
        if timestamp < first.timestamp() {
            return first.clone();
        }
        let last = &self.samples[self.samples.len() - 1];
        if timestamp >= last.timestamp() {
            return last.clone();
        }

        // lower bound: first sample at or after `timestamp`
        let index = self
            .samples
            .partition_point(|s| s.timestamp() < timestamp);
        if index == 0 {
            return first.clone();
        }

        let behind = &self.samples[index - 1];
        let ahead = &self.samples[index];
        if ahead.timestamp() - behind.timestamp() < DEGENERATE_INTERVAL {
            return ahead.clone();
        }
        behind.interpolate(ahead, timestamp)
    }

    /// Every sample mirrored; name, splits and events unchanged
    pub fn flipped(&self, field: &FieldGeometry) -> Self {
        Trajectory {
            name: self.name.clone(),
            samples: self.samples.iter().map(|s| s.mirror(field)).collect(),
            splits: self.splits.clone(),
            events: self.events.clone(),
        }
    }

    /// All markers named `name`, in stored order
    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a EventMarker> + 'a {
        self.events.iter().filter(move |e| e.name == name)
    }

    /// The sub-trajectory starting at split `index`.
    ///
    /// It runs through the first sample of the next split so consecutive
    /// segments share a boundary sample, or to the end for the last split.
    /// Samples and in-range events are shifted to start at zero. Splits are
    /// not carried over.
    pub fn split(&self, index: usize) -> Option<Self> {
        let start = *self.splits.get(index)?;
        let end = match self.splits.get(index + 1) {
            Some(&next) => next + 1,
            None => self.samples.len(),
        };
        let segment = &self.samples[start..end];
        let start_time = segment.first()?.timestamp();
        let end_time = segment.last()?.timestamp();

        Some(Trajectory {
            name: format!("{}[{}]", self.name, index),
            samples: segment.iter().map(|s| s.offset_by(-start_time)).collect(),
            splits: Vec::new(),
            events: self
                .events
                .iter()
                .filter(|e| e.timestamp >= start_time && e.timestamp <= end_time)
                .map(|e| e.offset_by(-start_time))
                .collect(),
        })
    }
}

fn mirrored<S: TrajectorySample>(sample: S, mirror: Option<&FieldGeometry>) -> S {
    match mirror {
        Some(field) => sample.mirror(field),
        None => sample,
    }
}
