//! Behaviors module: polled conditions for sequencing autonomous routines
//!
//! A [`Condition`] is evaluated once per control-loop poll against a
//! [`PollContext`]. Plain conditions have no memory; the stateful ones in
//! [`triggers`] keep their edge history in named fields.
//!
//! Combinators evaluate their operands at the current poll and do not cache.
//! To reference one stateful condition from several places, wrap it with
//! [`ConditionExt::shared`] and clone the handle instead of building a second
//! instance.

pub mod clock;
pub mod event_loop;
pub mod triggers;

use self::clock::PollContext;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A boolean signal sampled once per poll
pub trait Condition {
    fn poll(&mut self, ctx: &PollContext) -> bool;
}

impl<C: Condition + ?Sized> Condition for Box<C> {
    fn poll(&mut self, ctx: &PollContext) -> bool {
        (**self).poll(ctx)
    }
}

/// Boxed condition for heterogeneous collections
pub type BoxedCondition = Box<dyn Condition>;

/// Always the same value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant(pub bool);

impl Condition for Constant {
    fn poll(&mut self, _ctx: &PollContext) -> bool {
        self.0
    }
}

/// The condition that never fires
pub fn never() -> BoxedCondition {
    Box::new(Constant(false))
}

/// Wraps a closure into a condition
pub struct Predicate<F>(pub F);

impl<F> Condition for Predicate<F>
where
    F: FnMut(&PollContext) -> bool,
{
    fn poll(&mut self, ctx: &PollContext) -> bool {
        (self.0)(ctx)
    }
}

impl<F> fmt::Debug for Predicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate")
    }
}

/// Build a condition from a closure
pub fn condition<F>(f: F) -> Predicate<F>
where
    F: FnMut(&PollContext) -> bool,
{
    Predicate(f)
}

/// Both operands; the right side is skipped when the left is false
#[derive(Debug)]
pub struct And<A, B>(pub A, pub B);

impl<A: Condition, B: Condition> Condition for And<A, B> {
    fn poll(&mut self, ctx: &PollContext) -> bool {
        self.0.poll(ctx) && self.1.poll(ctx)
    }
}

/// Either operand; the right side is skipped when the left is true
#[derive(Debug)]
pub struct Or<A, B>(pub A, pub B);

impl<A: Condition, B: Condition> Condition for Or<A, B> {
    fn poll(&mut self, ctx: &PollContext) -> bool {
        self.0.poll(ctx) || self.1.poll(ctx)
    }
}

#[derive(Debug)]
pub struct Not<A>(pub A);

impl<A: Condition> Condition for Not<A> {
    fn poll(&mut self, ctx: &PollContext) -> bool {
        !self.0.poll(ctx)
    }
}

/// True if any of the conditions is true. Every member is polled each time so
/// stateful members keep their history current.
#[derive(Default)]
pub struct AnyOf(pub Vec<BoxedCondition>);

impl Condition for AnyOf {
    fn poll(&mut self, ctx: &PollContext) -> bool {
        self.0
            .iter_mut()
            .fold(false, |fired, c| c.poll(ctx) | fired)
    }
}

/// Shared handle to a single condition instance.
///
/// Cloning the handle does not clone the condition. If the same handle is
/// polled more than once within one poll of one run, the later calls return the
/// value computed by the first, so an edge detector referenced twice in an
/// expression sees each poll exactly once.
pub struct SharedCondition {
    inner: Rc<RefCell<SharedState>>,
}

struct SharedState {
    condition: BoxedCondition,
    /// Result for the `(run, poll_count)` it was computed in
    last: Option<((u32, u64), bool)>,
}

impl SharedCondition {
    pub fn new<C: Condition + 'static>(condition: C) -> Self {
        SharedCondition {
            inner: Rc::new(RefCell::new(SharedState {
                condition: Box::new(condition),
                last: None,
            })),
        }
    }

    /// True when both handles point at the same instance
    pub fn ptr_eq(&self, other: &SharedCondition) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Clone for SharedCondition {
    fn clone(&self) -> Self {
        SharedCondition {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for SharedCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCondition")
            .field("handles", &Rc::strong_count(&self.inner))
            .finish()
    }
}

impl Condition for SharedCondition {
    fn poll(&mut self, ctx: &PollContext) -> bool {
        let key = (ctx.run, ctx.poll_count);
        let mut state = self.inner.borrow_mut();
        if let Some((seen, value)) = state.last {
            if seen == key {
                return value;
            }
        }
        let value = state.condition.poll(ctx);
        state.last = Some((key, value));
        value
    }
}

/// Combinator methods for every condition
pub trait ConditionExt: Condition + Sized {
    fn and<B: Condition>(self, other: B) -> And<Self, B> {
        And(self, other)
    }

    fn or<B: Condition>(self, other: B) -> Or<Self, B> {
        Or(self, other)
    }

    fn negate(self) -> Not<Self> {
        Not(self)
    }

    fn boxed(self) -> BoxedCondition
    where
        Self: 'static,
    {
        Box::new(self)
    }

    fn shared(self) -> SharedCondition
    where
        Self: 'static,
    {
        SharedCondition::new(self)
    }
}

impl<C: Condition> ConditionExt for C {}
