//! Diagnostics sink for non-fatal anomalies
//!
//! Missing named events, invalid trigger times and bad split indices are
//! reported here and never stop the control loop.

use std::sync::Mutex;

const TARGET: &str = "prometheus_auto::diagnostics";

/// One-way sink for warnings and errors raised by the routine layer
pub trait DiagnosticsSink: Send + Sync {
    fn warn(&self, message: &str);

    fn error(&self, message: &str);
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn warn(&self, message: &str) {
        tracing::warn!(target: TARGET, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: TARGET, "{}", message);
    }
}

/// Severity of a recorded diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A diagnostic captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Records diagnostics so a host can surface them on its own dashboard.
/// Each entry is also forwarded to `tracing`.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn entries(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    fn count(&self, severity: Severity) -> usize {
        self.entries()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn record(&self, severity: Severity, message: &str) {
        let entry = Diagnostic {
            severity,
            message: message.to_string(),
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

impl DiagnosticsSink for MemorySink {
    fn warn(&self, message: &str) {
        TracingSink.warn(message);
        self.record(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        TracingSink.error(message);
        self.record(Severity::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_counts_by_severity() {
        let sink = MemorySink::new();
        sink.warn("event \"intake\" not found");
        sink.warn("trigger time cannot be negative");
        sink.error("trajectory has no samples");

        assert_eq!(sink.warnings(), 2);
        assert_eq!(sink.errors(), 1);
        assert_eq!(sink.entries()[2].message, "trajectory has no samples");
    }
}
