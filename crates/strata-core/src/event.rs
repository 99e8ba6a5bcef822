//! Synchronous multi-subscriber event registries.
//!
//! Spatial maps publish add/move/remove notifications through
//! [`EventRegistry`]: an ordered callback list delivering events in-line
//! with the triggering mutation, so a handler completes before the map
//! operation that raised it returns.

use std::fmt;

/// Identifies a registered subscriber for later removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberHandle(u64);

/// An ordered, synchronous, multi-subscriber callback registry.
///
/// Handlers run on the calling thread in subscription order. A handler
/// that calls back into the publishing map is caller error; the registry
/// does not guard against reentrancy.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use strata_core::EventRegistry;
///
/// let mut reg: EventRegistry<u32> = EventRegistry::new();
/// let total = Rc::new(Cell::new(0));
/// let t = Rc::clone(&total);
/// let handle = reg.subscribe(Box::new(move |v: &u32| t.set(t.get() + *v)));
/// reg.emit(&5);
/// assert_eq!(total.get(), 5);
/// assert!(reg.unsubscribe(handle));
/// ```
pub struct EventRegistry<E> {
    subscribers: Vec<(SubscriberHandle, Box<dyn FnMut(&E)>)>,
    next_handle: u64,
}

impl<E> EventRegistry<E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_handle: 1,
        }
    }

    /// Register a handler, returning a handle for removal.
    pub fn subscribe(&mut self, handler: Box<dyn FnMut(&E)>) -> SubscriberHandle {
        let handle = SubscriberHandle(self.next_handle);
        self.next_handle += 1;
        self.subscribers.push((handle, handler));
        handle
    }

    /// Remove a handler. Returns `false` if the handle is unknown.
    pub fn unsubscribe(&mut self, handle: SubscriberHandle) -> bool {
        match self.subscribers.iter().position(|(h, _)| *h == handle) {
            Some(idx) => {
                self.subscribers.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every subscriber, in subscription order.
    pub fn emit(&mut self, event: &E) {
        for (_, handler) in &mut self.subscribers {
            handler(event);
        }
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
