//! Virtual-time ordered event calendar.
//!
//! Entries are keyed by `(fire time, sequence number)`. The sequence number is
//! handed out at scheduling time and only grows, so entries sharing a fire time
//! come out in the order they were scheduled. Determinism of a whole run rests
//! on this tie-break.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

use log::debug;

use crate::{event::Event, time::VirtualTime};

struct Entry {
    at: VirtualTime,
    seq: u64,
    event: Event,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

pub(crate) struct Calendar {
    entries: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl Calendar {
    pub(crate) fn new() -> Self {
        Self {
            entries: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn schedule(&mut self, event: Event, at: VirtualTime) {
        let seq = self.next_seq;
        self.next_seq += 1;
        debug!("Scheduling {event:?} at {at} (seq {seq})");
        self.entries.push(Reverse(Entry { at, seq, event }));
    }

    pub(crate) fn peek_time(&self) -> Option<VirtualTime> {
        self.entries.peek().map(|entry| entry.0.at)
    }

    pub(crate) fn pop(&mut self) -> Option<(VirtualTime, Event)> {
        self.entries.pop().map(|entry| (entry.0.at, entry.0.event))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut calendar = Calendar::new();
        let late = Event::new();
        let early = Event::new();
        calendar.schedule(late.clone(), VirtualTime(10.0));
        calendar.schedule(early.clone(), VirtualTime(2.0));

        assert_eq!(calendar.peek_time(), Some(VirtualTime(2.0)));
        let (at, event) = calendar.pop().unwrap();
        assert_eq!(at, VirtualTime(2.0));
        assert_eq!(event.id(), early.id());
        let (at, event) = calendar.pop().unwrap();
        assert_eq!(at, VirtualTime(10.0));
        assert_eq!(event.id(), late.id());
        assert!(calendar.pop().is_none());
    }

    #[test]
    fn equal_times_fire_in_scheduling_order() {
        let mut calendar = Calendar::new();
        let events: Vec<Event> = (0..16).map(|_| Event::new()).collect();
        for event in &events {
            calendar.schedule(event.clone(), VirtualTime(5.0));
        }
        assert_eq!(calendar.len(), 16);

        let popped: Vec<_> = std::iter::from_fn(|| calendar.pop())
            .map(|(_, event)| event.id())
            .collect();
        let expected: Vec<_> = events.iter().map(Event::id).collect();
        assert_eq!(popped, expected);
    }
}
