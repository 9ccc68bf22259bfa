//! Event system for simulation callbacks
//!
//! Key principles:
//! - Typed payloads (one `Event<T>` per kind of notification)
//! - Synchronous delivery in subscription order
//! - Handlers may subscribe, unsubscribe, or touch unrelated simulation state
//!   while the event is being fired
//!
//! Events are single-threaded by construction (`Rc`/`RefCell` world), which
//! matches the cooperative frame loop that drives the simulation.

use std::cell::{Cell, RefCell};
use std::fmt;

type Handler<T> = Box<dyn FnMut(&T)>;

/// Identifies one subscription so it can be removed later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A list of callbacks fired with a payload of type `T`
pub struct Event<T> {
    handlers: RefCell<Vec<(SubscriptionId, Handler<T>)>>,
    /// Unsubscriptions requested while a fire was in progress
    pending_removals: RefCell<Vec<SubscriptionId>>,
    next_id: Cell<u64>,
    firing: Cell<bool>,
    /// Ids of handlers parked by every fire in progress, innermost last
    in_flight: RefCell<Vec<SubscriptionId>>,
}

impl<T> Event<T> {
    /// Create an event with no subscribers
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            pending_removals: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            firing: Cell::new(false),
            in_flight: RefCell::new(Vec::new()),
        }
    }

    /// Register a handler; it is called on every subsequent fire
    pub fn subscribe(&self, handler: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        if let Some(index) = handlers.iter().position(|(existing, _)| *existing == id) {
            handlers.remove(index);
            return true;
        }
        drop(handlers);
        if !self.in_flight.borrow().contains(&id) {
            return false;
        }
        let mut pending = self.pending_removals.borrow_mut();
        if pending.contains(&id) {
            return false;
        }
        pending.push(id);
        true
    }

    /// Number of live handlers
    pub fn subscriber_count(&self) -> usize {
        let handlers = self.handlers.borrow().len();
        if self.firing.get() {
            // Handlers are parked outside the list during a fire
            handlers + self.in_flight_count()
        } else {
            handlers
        }
    }

    /// Call every handler with `payload`
    ///
    /// A nested fire of the same event from inside one of its own handlers
    /// reaches only handlers added during the outer fire.
    pub fn fire(&self, payload: &T) {
        let mut in_flight = std::mem::take(&mut *self.handlers.borrow_mut());
        if in_flight.is_empty() {
            return;
        }
        let was_firing = self.firing.replace(true);
        let outer = self.in_flight.borrow().len();
        self.in_flight.borrow_mut().extend(in_flight.iter().map(|(id, _)| *id));

        for (_, handler) in &mut in_flight {
            handler(payload);
        }

        self.firing.set(was_firing);
        self.in_flight.borrow_mut().truncate(outer);

        {
            let mut pending = self.pending_removals.borrow_mut();
            pending.retain(|id| match in_flight.iter().position(|(kept, _)| kept == id) {
                Some(index) => {
                    in_flight.remove(index);
                    false
                }
                // Belongs to an outer fire of this event
                None => true,
            });
            if !was_firing {
                pending.clear();
            }
        }

        let mut handlers = self.handlers.borrow_mut();
        let added = std::mem::replace(&mut *handlers, in_flight);
        handlers.extend(added);
    }

    fn in_flight_count(&self) -> usize {
        self.in_flight.borrow().len() - self.pending_removals.borrow().len()
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_fire_in_subscription_order() {
        let event = Event::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&log);
        event.subscribe(move |value| first.borrow_mut().push(("first", *value)));
        let second = Rc::clone(&log);
        event.subscribe(move |value| second.borrow_mut().push(("second", *value)));

        event.fire(&7);
        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let event = Event::<()>::new();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let id = event.subscribe(move |()| counter.set(counter.get() + 1));

        event.fire(&());
        assert!(event.unsubscribe(id));
        assert!(!event.unsubscribe(id));
        event.fire(&());

        assert_eq!(count.get(), 1);
        assert_eq!(event.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_and_unsubscribe_while_firing() {
        let event = Rc::new(Event::<()>::new());
        let count = Rc::new(Cell::new(0));

        let inner_event = Rc::clone(&event);
        let inner_count = Rc::clone(&count);
        let own_id = Rc::new(Cell::new(None));
        let own_id_handle = Rc::clone(&own_id);
        let id = event.subscribe(move |()| {
            let counter = Rc::clone(&inner_count);
            inner_event.subscribe(move |()| counter.set(counter.get() + 10));
            if let Some(id) = own_id_handle.get() {
                inner_event.unsubscribe(id);
            }
        });
        own_id.set(Some(id));

        event.fire(&());
        assert_eq!(count.get(), 0);
        assert_eq!(event.subscriber_count(), 1);

        event.fire(&());
        assert_eq!(count.get(), 10);
    }

    #[test]
    fn test_unsubscribe_twice_while_firing() {
        let event = Rc::new(Event::<()>::new());
        let results = Rc::new(RefCell::new(Vec::new()));

        let quiet = event.subscribe(|()| {});
        let inner_event = Rc::clone(&event);
        let sink = Rc::clone(&results);
        event.subscribe(move |()| {
            let mut sink = sink.borrow_mut();
            sink.push(inner_event.unsubscribe(quiet));
            sink.push(inner_event.unsubscribe(quiet));
            // Never handed out
            sink.push(inner_event.unsubscribe(SubscriptionId(99)));
        });

        event.fire(&());
        assert_eq!(*results.borrow(), vec![true, false, false]);
        assert_eq!(event.subscriber_count(), 1);
        assert!(!event.unsubscribe(quiet));
    }
}
