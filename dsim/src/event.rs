//! One-shot events that processes suspend on.
//!
//! An [`Event`] moves through three states and never back:
//!
//! - **pending**: nothing happened yet;
//! - **triggered**: its value is fixed and an entry sits in the calendar;
//! - **processed**: the calendar reached the entry, callbacks ran and every
//!   process waiting on it was resumed.
//!
//! [`Event::is_triggered`] answers true for both of the last two states. That
//! is what a process checks after waking from an [`Event::any_of`] to learn
//! which branch fired, and what lets it keep the losing branch around and look
//! at it again later instead of cancelling it.
//!
//! Events are reference counted handles: cloning one does not create a new
//! event, and the kernel frees an event once neither the calendar nor any
//! process holds it.

use std::{
    any::Any,
    cell::RefCell,
    fmt::Debug,
    rc::{Rc, Weak},
};

use crate::{ProcessId, global, time::VirtualTime};

/// Identifier of an event, unique within a simulation run. Used for tracing.
pub type EventId = usize;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum EventState {
    Pending,
    Triggered,
    Processed,
}

pub(crate) enum Callback {
    Resume(ProcessId),
    Check(Weak<RefCell<EventInner>>),
}

enum Condition {
    Any(Vec<Event>),
    All(Vec<Event>),
}

impl Condition {
    // Children count as fired once processed, the same moment their own
    // waiters would be resumed.
    fn satisfied(&self) -> Option<Vec<Event>> {
        let (children, need_all) = match self {
            Condition::Any(children) => (children, false),
            Condition::All(children) => (children, true),
        };
        let fired: Vec<Event> = children
            .iter()
            .filter(|child| child.is_processed())
            .cloned()
            .collect();
        let done = if need_all {
            fired.len() == children.len()
        } else {
            !fired.is_empty() || children.is_empty()
        };
        done.then_some(fired)
    }

    fn children(&self) -> &[Event] {
        match self {
            Condition::Any(children) | Condition::All(children) => children,
        }
    }
}

pub(crate) struct EventInner {
    id: EventId,
    state: EventState,
    scheduled: bool,
    value: Option<Rc<dyn Any>>,
    callbacks: Vec<Callback>,
    condition: Option<Condition>,
}

/// Handle to a one-shot simulation event.
///
/// # Examples
///
/// ```rust
/// use dsim::{Event, SimulationBuilder};
///
/// let _sim = SimulationBuilder::default().build();
///
/// let done = Event::new();
/// assert!(!done.is_triggered());
///
/// done.succeed_with(42u32);
/// assert!(done.is_triggered());
/// assert_eq!(done.value::<u32>(), Some(42));
/// ```
#[derive(Clone)]
pub struct Event(Rc<RefCell<EventInner>>);

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl Event {
    /// Creates a pending event that fires only when someone calls
    /// [`succeed`](Event::succeed) or [`succeed_with`](Event::succeed_with).
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(EventInner {
            id: global::global_unique_id(),
            state: EventState::Pending,
            scheduled: false,
            value: None,
            callbacks: Vec::new(),
            condition: None,
        })))
    }

    /// Fires as soon as one of `events` has fired. The value is a
    /// [`ConditionValue`] listing the children fired at that moment.
    pub fn any_of(events: &[Event]) -> Event {
        Self::with_condition(Condition::Any(events.to_vec()))
    }

    /// Fires once every one of `events` has fired.
    pub fn all_of(events: &[Event]) -> Event {
        Self::with_condition(Condition::All(events.to_vec()))
    }

    pub fn id(&self) -> EventId {
        self.0.borrow().id
    }

    pub fn is_triggered(&self) -> bool {
        self.0.borrow().state != EventState::Pending
    }

    pub fn is_processed(&self) -> bool {
        self.0.borrow().state == EventState::Processed
    }

    /// Triggers the event without a value. It is processed at the current
    /// virtual time, after everything already scheduled for that time.
    ///
    /// # Panics
    ///
    /// If the event was already triggered or is a timeout.
    pub fn succeed(&self) {
        self.trigger(None);
    }

    /// Triggers the event carrying `value`.
    ///
    /// # Panics
    ///
    /// If the event was already triggered or is a timeout.
    pub fn succeed_with<T: 'static>(&self, value: T) {
        self.trigger(Some(Rc::new(value)));
    }

    /// Returns the value the event fired with, if it has one of type `T`.
    pub fn value_as<T: 'static>(&self) -> Option<Rc<T>> {
        let value = self.0.borrow().value.clone()?;
        value.downcast::<T>().ok()
    }

    /// Same as [`value_as`](Event::value_as), cloned out of the event.
    pub fn value<T: Clone + 'static>(&self) -> Option<T> {
        self.value_as::<T>().map(|value| (*value).clone())
    }

    pub fn ptr_eq(&self, other: &Event) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Event {
    fn with_condition(condition: Condition) -> Event {
        let event = Event::new();
        let weak = Rc::downgrade(&event.0);
        for child in condition.children() {
            if !child.is_processed() {
                child.add_callback(Callback::Check(weak.clone()));
            }
        }
        event.0.borrow_mut().condition = Some(condition);
        event.check_condition();
        event
    }

    fn trigger(&self, value: Option<Rc<dyn Any>>) {
        {
            let mut inner = self.0.borrow_mut();
            assert!(
                inner.state == EventState::Pending && !inner.scheduled,
                "Event {} triggered twice",
                inner.id
            );
            inner.state = EventState::Triggered;
            inner.value = value;
        }
        global::schedule_now(self.clone());
    }

    // Timeouts stay pending while they sit in the calendar: they become
    // triggered and processed in the same step, when the deadline is reached.
    pub(crate) fn schedule_after(&self, delay: VirtualTime) {
        {
            let mut inner = self.0.borrow_mut();
            assert!(
                inner.state == EventState::Pending && !inner.scheduled,
                "Event {} scheduled twice",
                inner.id
            );
            inner.scheduled = true;
        }
        global::schedule_at(self.clone(), global::now() + delay);
    }

    pub(crate) fn add_callback(&self, callback: Callback) {
        let mut inner = self.0.borrow_mut();
        // Conditions dropped while this event stayed pending.
        inner
            .callbacks
            .retain(|callback| !matches!(callback, Callback::Check(weak) if weak.strong_count() == 0));
        inner.callbacks.push(callback);
    }

    pub(crate) fn process(&self) -> Vec<Callback> {
        let mut inner = self.0.borrow_mut();
        inner.state = EventState::Processed;
        std::mem::take(&mut inner.callbacks)
    }

    pub(crate) fn check_condition(&self) {
        let fired = {
            let inner = self.0.borrow();
            if inner.state != EventState::Pending {
                return;
            }
            match &inner.condition {
                Some(condition) => condition.satisfied(),
                None => None,
            }
        };
        if let Some(fired) = fired {
            self.succeed_with(ConditionValue(fired));
        }
    }

    pub(crate) fn from_weak(weak: &Weak<RefCell<EventInner>>) -> Option<Event> {
        weak.upgrade().map(Event)
    }
}

impl Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.borrow();
        write!(f, "Event#{}({:?})", inner.id, inner.state)
    }
}

/// Value of a fired [`Event::any_of`] / [`Event::all_of`]: the children that
/// had fired when the condition was satisfied.
#[derive(Clone)]
pub struct ConditionValue(Vec<Event>);

impl ConditionValue {
    pub fn contains(&self, event: &Event) -> bool {
        self.0.iter().any(|fired| fired.ptr_eq(event))
    }

    pub fn events(&self) -> &[Event] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulationBuilder;

    #[test]
    fn succeed_carries_value() {
        let _sim = SimulationBuilder::default().build();
        let event = Event::new();
        assert!(!event.is_triggered());
        event.succeed_with(String::from("payload"));
        assert!(event.is_triggered());
        assert!(!event.is_processed());
        assert_eq!(event.value::<String>().as_deref(), Some("payload"));
        assert!(event.value::<u64>().is_none());
    }

    #[test]
    #[should_panic(expected = "triggered twice")]
    fn double_trigger_panics() {
        let _sim = SimulationBuilder::default().build();
        let event = Event::new();
        event.succeed();
        event.succeed();
    }

    #[test]
    fn clones_share_state() {
        let _sim = SimulationBuilder::default().build();
        let event = Event::new();
        let alias = event.clone();
        alias.succeed();
        assert!(event.is_triggered());
        assert!(event.ptr_eq(&alias));
        assert_eq!(event.id(), alias.id());
    }

    #[test]
    fn empty_conditions_fire_immediately() {
        let _sim = SimulationBuilder::default().build();
        assert!(Event::any_of(&[]).is_triggered());
        assert!(Event::all_of(&[]).is_triggered());
    }

    #[test]
    fn condition_waits_for_processing_of_children() {
        let _sim = SimulationBuilder::default().build();
        let child = Event::new();
        let any = Event::any_of(&[child.clone()]);
        child.succeed();
        // Triggered but not processed yet: the condition is still pending.
        assert!(!any.is_triggered());
    }
}
