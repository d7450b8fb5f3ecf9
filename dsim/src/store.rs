//! FIFO buffer shared between processes.
//!
//! [`Store::put`] and [`Store::get`] return events instead of blocking. A put
//! fires once the item is inside the store; a get fires carrying the item it
//! took. Both are served strictly in request order.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::Event;

struct StoreInner<T> {
    items: VecDeque<T>,
    capacity: Option<usize>,
    getters: VecDeque<Event>,
    putters: VecDeque<(Event, T)>,
}

impl<T: 'static> StoreInner<T> {
    fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.items.len() >= capacity)
    }

    // Moves waiting puts in while there is room and hands items to waiting
    // gets, until neither side can make progress.
    fn settle(&mut self) {
        loop {
            let mut progressed = false;

            while !self.is_full() {
                let Some((event, item)) = self.putters.pop_front() else {
                    break;
                };
                self.items.push_back(item);
                event.succeed();
                progressed = true;
            }

            while !self.items.is_empty() {
                let Some(event) = self.getters.pop_front() else {
                    break;
                };
                if let Some(item) = self.items.pop_front() {
                    event.succeed_with(item);
                    progressed = true;
                }
            }

            if !progressed {
                break;
            }
        }
    }
}

/// Handle to a FIFO store. Clones share the same buffer.
///
/// Items taken by a get are delivered as the event value: read them with
/// [`Event::value_as`] or [`Event::value`].
pub struct Store<T> {
    inner: Rc<RefCell<StoreInner<T>>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Store<T> {
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                items: VecDeque::new(),
                capacity,
                getters: VecDeque::new(),
                putters: VecDeque::new(),
            })),
        }
    }

    /// Requests to put `item`. The returned event fires once it is stored.
    pub fn put(&self, item: T) -> Event {
        let event = Event::new();
        let mut inner = self.inner.borrow_mut();
        inner.putters.push_back((event.clone(), item));
        inner.settle();
        event
    }

    /// Requests the oldest item. The returned event fires carrying it.
    pub fn get(&self) -> Event {
        let event = Event::new();
        let mut inner = self.inner.borrow_mut();
        inner.getters.push_back(event.clone());
        inner.settle();
        event
    }

    /// Number of items currently stored, not counting pending puts.
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.inner.borrow().is_full()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.inner.borrow().capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulationBuilder;

    #[test]
    fn get_after_put_takes_item() {
        let _sim = SimulationBuilder::default().build();
        let store = Store::unbounded();
        let put = store.put(7u32);
        assert!(put.is_triggered());
        assert_eq!(store.len(), 1);

        let get = store.get();
        assert!(get.is_triggered());
        assert_eq!(get.value::<u32>(), Some(7));
        assert!(store.is_empty());
    }

    #[test]
    fn pending_get_served_by_later_put() {
        let _sim = SimulationBuilder::default().build();
        let store = Store::unbounded();
        let first = store.get();
        let second = store.get();
        assert!(!first.is_triggered());

        store.put("a");
        store.put("b");
        assert_eq!(first.value::<&str>(), Some("a"));
        assert_eq!(second.value::<&str>(), Some("b"));
        assert!(store.is_empty());
    }

    #[test]
    fn bounded_put_waits_for_room() {
        let _sim = SimulationBuilder::default().build();
        let store = Store::bounded(1);
        assert_eq!(store.capacity(), Some(1));

        assert!(store.put(1u8).is_triggered());
        let blocked = store.put(2u8);
        assert!(!blocked.is_triggered());
        assert!(store.is_full());

        assert_eq!(store.get().value::<u8>(), Some(1));
        assert!(blocked.is_triggered());
        assert_eq!(store.get().value::<u8>(), Some(2));
    }

    #[test]
    fn clones_share_buffer() {
        let _sim = SimulationBuilder::default().build();
        let store = Store::unbounded();
        let alias = store.clone();
        alias.put(1i32);
        assert_eq!(store.len(), 1);
    }
}
