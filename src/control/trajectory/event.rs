//! Named event markers

/// A named point in time along a trajectory. Several markers may share a name.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMarker {
    pub name: String,
    /// Seconds from the start of the trajectory
    pub timestamp: f64,
}

impl EventMarker {
    pub fn new(name: impl Into<String>, timestamp: f64) -> Self {
        EventMarker {
            name: name.into(),
            timestamp,
        }
    }

    pub fn offset_by(&self, delta: f64) -> Self {
        EventMarker {
            name: self.name.clone(),
            timestamp: self.timestamp + delta,
        }
    }
}
