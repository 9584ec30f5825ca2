//! Trajectory cache
//!
//! Maps trajectory names (and `name.:.split` keys for split segments) to
//! shared, immutable trajectories. Parsing stays with the injected
//! [`TrajectoryLoader`]; the cache only remembers what it has seen.

use super::{EventMarker, Trajectory, TrajectorySample};
use crate::common::diagnostics::{DiagnosticsSink, TracingSink};
use crate::common::error::LoadError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Produces trajectories by name
pub trait TrajectoryLoader<S>: Send + Sync {
    fn load(&self, name: &str) -> Result<Trajectory<S>, LoadError>;
}

/// Loader serving trajectories that were parsed ahead of time
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader<S> {
    trajectories: HashMap<String, Trajectory<S>>,
}

impl<S: TrajectorySample> InMemoryLoader<S> {
    pub fn new() -> Self {
        InMemoryLoader {
            trajectories: HashMap::new(),
        }
    }

    /// Register a trajectory under its own name
    pub fn insert(&mut self, trajectory: Trajectory<S>) {
        self.trajectories
            .insert(trajectory.name().to_string(), trajectory);
    }

    pub fn with(mut self, trajectory: Trajectory<S>) -> Self {
        self.insert(trajectory);
        self
    }

    /// Assemble a trajectory from raw parts and register it. Nothing is
    /// registered if the parts do not form a valid trajectory.
    pub fn insert_parts(
        &mut self,
        name: &str,
        samples: Vec<S>,
        splits: Vec<usize>,
        events: Vec<EventMarker>,
    ) -> Result<(), LoadError> {
        self.insert(Trajectory::new(name, samples, splits, events)?);
        Ok(())
    }
}

impl<S: TrajectorySample + Send + Sync> TrajectoryLoader<S> for InMemoryLoader<S> {
    fn load(&self, name: &str) -> Result<Trajectory<S>, LoadError> {
        self.trajectories
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }
}

/// Shared name-to-trajectory store.
///
/// Cloning the cache shares the underlying map.
pub struct TrajectoryCache<S> {
    entries: Arc<RwLock<HashMap<String, Arc<Trajectory<S>>>>>,
    loader: Arc<dyn TrajectoryLoader<S>>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl<S> Clone for TrajectoryCache<S> {
    fn clone(&self) -> Self {
        TrajectoryCache {
            entries: Arc::clone(&self.entries),
            loader: Arc::clone(&self.loader),
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }
}

fn split_key(name: &str, index: usize) -> String {
    // no trajectory file can be named like this
    format!("{}.:.{}", name, index)
}

impl<S: TrajectorySample> TrajectoryCache<S> {
    /// Create a cache backed by `loader`, reporting to `tracing`
    pub fn new<L: TrajectoryLoader<S> + 'static>(loader: L) -> Self {
        Self::with_diagnostics(loader, Arc::new(TracingSink))
    }

    pub fn with_diagnostics<L: TrajectoryLoader<S> + 'static>(
        loader: L,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        TrajectoryCache {
            entries: Arc::new(RwLock::new(HashMap::new())),
            loader: Arc::new(loader),
            diagnostics,
        }
    }

    /// Cached trajectory, loading and caching it on first use
    pub fn load(&self, name: &str) -> Option<Arc<Trajectory<S>>> {
        if let Some(cached) = self.get(name) {
            return Some(cached);
        }
        match self.loader.load(name) {
            Ok(trajectory) => {
                tracing::debug!(trajectory = name, samples = trajectory.samples().len(), "loaded");
                Some(self.insert(name.to_string(), trajectory))
            }
            Err(e) => {
                self.diagnostics
                    .error(&format!("could not load trajectory {:?}: {}", name, e));
                None
            }
        }
    }

    /// Cached split segment, deriving it from the (possibly cached) parent
    pub fn load_split(&self, name: &str, index: usize) -> Option<Arc<Trajectory<S>>> {
        let key = split_key(name, index);
        if let Some(cached) = self.get(&key) {
            return Some(cached);
        }
        let parent = self.load(name)?;
        match parent.split(index) {
            Some(segment) => Some(self.insert(key, segment)),
            None => {
                self.diagnostics.error(&format!(
                    "trajectory {:?} has no split {} ({} splits)",
                    name,
                    index,
                    parent.split_count()
                ));
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read(|entries| entries.contains_key(key))
    }

    pub fn len(&self) -> usize {
        self.read(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut entries) => entries.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn get(&self, key: &str) -> Option<Arc<Trajectory<S>>> {
        self.read(|entries| entries.get(key).cloned())
    }

    fn insert(&self, key: String, trajectory: Trajectory<S>) -> Arc<Trajectory<S>> {
        let shared = Arc::new(trajectory);
        match self.entries.write() {
            Ok(mut entries) => entries.insert(key, Arc::clone(&shared)),
            Err(poisoned) => poisoned.into_inner().insert(key, Arc::clone(&shared)),
        };
        shared
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, Arc<Trajectory<S>>>) -> T) -> T {
        match self.entries.read() {
            Ok(entries) => f(&entries),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::diagnostics::MemorySink;
    use crate::common::error::TrajectoryError;
    use crate::control::trajectory::SwerveSample;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        inner: InMemoryLoader<SwerveSample>,
        loads: Arc<AtomicUsize>,
    }

    impl TrajectoryLoader<SwerveSample> for CountingLoader {
        fn load(&self, name: &str) -> Result<Trajectory<SwerveSample>, LoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(name)
        }
    }

    fn auto() -> Trajectory<SwerveSample> {
        let samples = (0..5)
            .map(|i| SwerveSample::at_pose(i as f64, i as f64, 0.0, 0.0))
            .collect();
        Trajectory::new("auto", samples, vec![0, 2], Vec::new()).unwrap()
    }

    fn cache() -> (TrajectoryCache<SwerveSample>, Arc<AtomicUsize>, Arc<MemorySink>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(MemorySink::new());
        let loader = CountingLoader {
            inner: InMemoryLoader::new().with(auto()),
            loads: Arc::clone(&loads),
        };
        (
            TrajectoryCache::with_diagnostics(loader, sink.clone()),
            loads,
            sink,
        )
    }

    #[test]
    fn loads_once_and_shares() {
        let (cache, loads, _) = cache();
        let a = cache.load("auto").unwrap();
        let b = cache.clone().load("auto").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn split_reuses_parent_and_caches_segment() {
        let (cache, loads, _) = cache();
        let segment = cache.load_split("auto", 1).unwrap();
        assert_eq!(segment.name(), "auto[1]");
        assert!(cache.contains("auto"));
        assert!(cache.contains("auto.:.1"));

        let again = cache.load_split("auto", 1).unwrap();
        assert!(Arc::ptr_eq(&segment, &again));
        cache.load_split("auto", 0).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn failures_are_reported_not_raised() {
        let (cache, _, sink) = cache();
        assert!(cache.load("missing").is_none());
        assert!(cache.load_split("auto", 7).is_none());
        assert_eq!(sink.errors(), 2);
        assert!(!cache.contains("auto.:.7"));
    }

    #[test]
    fn invalid_parts_are_rejected() {
        let mut loader = InMemoryLoader::new();
        let samples = vec![
            SwerveSample::at_pose(1.0, 0.0, 0.0, 0.0),
            SwerveSample::at_pose(0.5, 1.0, 0.0, 0.0),
        ];
        let err = loader
            .insert_parts("backwards", samples, Vec::new(), Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Invalid(TrajectoryError::UnsortedSamples { index: 1, .. })
        ));
        assert!(matches!(loader.load("backwards"), Err(LoadError::NotFound(_))));

        let samples = vec![SwerveSample::at_pose(0.0, 0.0, 0.0, 0.0)];
        loader.insert_parts("still", samples, vec![0], Vec::new()).unwrap();
        assert_eq!(loader.load("still").unwrap().split_count(), 1);
    }

    #[test]
    fn clear_forgets_everything() {
        let (cache, loads, _) = cache();
        cache.load("auto").unwrap();
        cache.clear();
        assert!(cache.is_empty());
        cache.load("auto").unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
