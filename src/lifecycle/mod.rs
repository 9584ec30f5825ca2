//! Lifecycle management for host-scheduled components
//!
//! The host's scheduler decides when a component starts, runs, and stops.
//! Components only expose the entry points and track which state they are in.

use crate::behaviors::clock::{PollContext, RoutineClock};
use crate::common::error::LifecycleError;

/// Trait for components driven by the host scheduler
pub trait LifecycleNode {
    /// Start (or restart) the component
    fn on_initialize(&mut self, clock: &mut RoutineClock) -> Result<(), LifecycleError>;

    /// Run one control cycle
    fn on_execute(&mut self, ctx: &PollContext) -> Result<(), LifecycleError>;

    /// Stop the component; `interrupted` is true when the host cancelled it
    fn on_end(&mut self, ctx: &PollContext, interrupted: bool) -> Result<(), LifecycleError>;

    /// Whether the component wants to stop
    fn is_finished(&self, ctx: &PollContext) -> bool;

    /// Get the current state
    fn state(&self) -> State;
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Idle,
    Running,
    Completed,
    Interrupted,
}

impl State {
    pub fn is_running(self) -> bool {
        self == State::Running
    }
}

/// Base implementation of the state transitions
#[derive(Debug, Clone)]
pub struct Lifecycle {
    pub name: String,
    state: State,
}

impl Lifecycle {
    /// Create a new lifecycle in the idle state
    pub fn new(name: &str) -> Self {
        Lifecycle {
            name: name.to_string(),
            state: State::Idle,
        }
    }

    /// Get the current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Enter `Running`. Allowed from any state except `Running`.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        if self.state.is_running() {
            return Err(self.reject("start"));
        }
        tracing::debug!(node = %self.name, from = ?self.state, "starting");
        self.state = State::Running;
        Ok(())
    }

    /// Leave `Running` for `Completed` or `Interrupted`
    pub fn stop(&mut self, interrupted: bool) -> Result<State, LifecycleError> {
        if !self.state.is_running() {
            return Err(self.reject("stop"));
        }
        self.state = if interrupted {
            State::Interrupted
        } else {
            State::Completed
        };
        tracing::debug!(node = %self.name, to = ?self.state, "stopped");
        Ok(self.state)
    }

    /// Guard for callbacks that only make sense while running
    pub fn require_running(&self, action: &'static str) -> Result<(), LifecycleError> {
        if self.state.is_running() {
            Ok(())
        } else {
            Err(self.reject(action))
        }
    }

    fn reject(&self, action: &'static str) -> LifecycleError {
        LifecycleError {
            action,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_through_completion() {
        let mut lifecycle = Lifecycle::new("path");
        assert_eq!(lifecycle.state(), State::Idle);
        lifecycle.start().unwrap();
        assert_eq!(lifecycle.stop(false).unwrap(), State::Completed);
        lifecycle.start().unwrap();
        assert_eq!(lifecycle.stop(true).unwrap(), State::Interrupted);
    }

    #[test]
    fn rejects_illegal_transitions() {
        let mut lifecycle = Lifecycle::new("path");
        let err = lifecycle.stop(false).unwrap_err();
        assert_eq!(err.state, State::Idle);
        assert_eq!(err.action, "stop");

        lifecycle.start().unwrap();
        assert!(lifecycle.start().is_err());
        assert!(lifecycle.require_running("execute").is_ok());
    }
}
