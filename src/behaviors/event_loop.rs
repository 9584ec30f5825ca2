//! Binds conditions to host actions
//!
//! The loop does not run anything itself. Each poll returns the actions whose
//! bindings fired, in registration order, and the host schedules them.

use super::clock::PollContext;
use super::{BoxedCondition, Condition};

/// Which part of a condition's signal fires a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Rising edge
    OnTrue,
    /// Falling edge
    OnFalse,
    /// Every poll the condition is true
    WhileTrue,
    /// Every poll the condition is false
    WhileFalse,
}

impl Edge {
    fn fires(self, previous: bool, current: bool) -> bool {
        match self {
            Edge::OnTrue => !previous && current,
            Edge::OnFalse => previous && !current,
            Edge::WhileTrue => current,
            Edge::WhileFalse => !current,
        }
    }
}

struct Binding<A> {
    condition: BoxedCondition,
    kind: BindingKind<A>,
    previous: bool,
}

enum BindingKind<A> {
    Edge(Edge, A),
    /// On the rising edge pick one action by a second condition
    Choose {
        selector: BoxedCondition,
        if_true: A,
        if_false: A,
    },
}

/// Ordered list of condition bindings polled once per control cycle
pub struct EventLoop<A> {
    bindings: Vec<Binding<A>>,
}

impl<A> Default for EventLoop<A> {
    fn default() -> Self {
        EventLoop {
            bindings: Vec::new(),
        }
    }
}

impl<A: Clone> EventLoop<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind<C: Condition + 'static>(&mut self, condition: C, edge: Edge, action: A) {
        self.bindings.push(Binding {
            condition: Box::new(condition),
            kind: BindingKind::Edge(edge, action),
            previous: false,
        });
    }

    pub fn on_true<C: Condition + 'static>(&mut self, condition: C, action: A) {
        self.bind(condition, Edge::OnTrue, action);
    }

    pub fn on_false<C: Condition + 'static>(&mut self, condition: C, action: A) {
        self.bind(condition, Edge::OnFalse, action);
    }

    pub fn while_true<C: Condition + 'static>(&mut self, condition: C, action: A) {
        self.bind(condition, Edge::WhileTrue, action);
    }

    /// On the rising edge of `condition`, fire `if_true` when `selector` holds
    /// and `if_false` otherwise. `selector` is only polled on the rising edge.
    pub fn on_true_with<C, S>(&mut self, condition: C, selector: S, if_true: A, if_false: A)
    where
        C: Condition + 'static,
        S: Condition + 'static,
    {
        self.bindings.push(Binding {
            condition: Box::new(condition),
            kind: BindingKind::Choose {
                selector: Box::new(selector),
                if_true,
                if_false,
            },
            previous: false,
        });
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Forget edge history so a condition that is already true fires again
    pub fn rearm(&mut self) {
        for binding in &mut self.bindings {
            binding.previous = false;
        }
    }

    /// Poll every binding once and collect the actions that fired
    pub fn poll(&mut self, ctx: &PollContext) -> Vec<A> {
        let mut fired = Vec::new();
        for binding in &mut self.bindings {
            let current = binding.condition.poll(ctx);
            let previous = std::mem::replace(&mut binding.previous, current);
            match &mut binding.kind {
                BindingKind::Edge(edge, action) => {
                    if edge.fires(previous, current) {
                        fired.push(action.clone());
                    }
                }
                BindingKind::Choose {
                    selector,
                    if_true,
                    if_false,
                } => {
                    if Edge::OnTrue.fires(previous, current) {
                        let action = if selector.poll(ctx) { if_true } else { if_false };
                        fired.push(action.clone());
                    }
                }
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::condition;

    fn ctx(poll_count: u64) -> PollContext {
        PollContext {
            poll_count,
            ..PollContext::default()
        }
    }

    /// Reads the poll count as the signal: true on the listed polls
    fn on_polls(polls: &'static [u64]) -> impl Condition {
        condition(move |ctx: &PollContext| polls.contains(&ctx.poll_count))
    }

    fn run(event_loop: &mut EventLoop<&'static str>, polls: u64) -> Vec<(u64, &'static str)> {
        (1..=polls)
            .flat_map(|p| event_loop.poll(&ctx(p)).into_iter().map(move |a| (p, a)))
            .collect()
    }

    #[test]
    fn edges_fire_on_transitions_only() {
        let mut event_loop = EventLoop::new();
        event_loop.on_true(on_polls(&[2, 3]), "rise");
        event_loop.on_false(on_polls(&[2, 3]), "fall");
        event_loop.while_true(on_polls(&[2, 3]), "hold");

        assert_eq!(
            run(&mut event_loop, 5),
            vec![(2, "rise"), (2, "hold"), (3, "hold"), (4, "fall")]
        );
    }

    #[test]
    fn on_true_with_selects_branch() {
        let mut event_loop = EventLoop::new();
        event_loop.on_true_with(on_polls(&[2, 5]), on_polls(&[5]), "shoot", "intake");
        assert_eq!(run(&mut event_loop, 6), vec![(2, "intake"), (5, "shoot")]);
        assert_eq!(event_loop.len(), 1);
    }

    #[test]
    fn rearm_refires_a_held_condition() {
        let mut event_loop = EventLoop::new();
        event_loop.on_true(condition(|_: &PollContext| true), "go");
        assert_eq!(event_loop.poll(&ctx(1)), vec!["go"]);
        assert!(event_loop.poll(&ctx(2)).is_empty());
        event_loop.rearm();
        assert_eq!(event_loop.poll(&ctx(3)), vec!["go"]);
    }
}
