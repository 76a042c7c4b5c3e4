//! Resize observation for chart surfaces.
//!
//! The host publishes content-box size changes on a bus; a view subscribes
//! with a callback and holds the returned guard for as long as it lives.
//! Dropping the guard detaches the callback unconditionally, whichever way
//! teardown happens. Everything runs on the single UI thread.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback = Box<dyn FnMut(u32, u32)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<(u64, Callback)>,
    /// True while a publish is iterating the (taken-out) subscriber list
    publishing: bool,
    /// Ids unsubscribed during the in-flight publish
    removed: Vec<u64>,
}

/// Fan-out of surface resize notifications. Clones share one registry.
#[derive(Default, Clone)]
pub struct ResizeBus {
    registry: Rc<RefCell<Registry>>,
}

impl ResizeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it fires on every publish until the returned
    /// guard is dropped
    pub fn subscribe(&self, callback: impl FnMut(u32, u32) + 'static) -> ResizeSubscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push((id, Box::new(callback)));

        ResizeSubscription {
            registry: Rc::downgrade(&self.registry),
            id,
        }
    }

    /// Notify all live subscribers of a new surface size.
    ///
    /// Callbacks may drop subscription guards or subscribe new ones, so
    /// the registry borrow must not be held while they run: the list is
    /// taken out for iteration and merged back afterwards, honoring any
    /// removals recorded in between.
    pub fn publish(&self, width: u32, height: u32) {
        let mut active = {
            let mut registry = self.registry.borrow_mut();
            registry.publishing = true;
            std::mem::take(&mut registry.subscribers)
        };

        for (id, callback) in active.iter_mut() {
            if self.registry.borrow().removed.contains(id) {
                continue;
            }
            callback(width, height);
        }

        let mut registry = self.registry.borrow_mut();
        registry.publishing = false;
        let removed = std::mem::take(&mut registry.removed);
        active.retain(|(id, _)| !removed.contains(id));
        // Subscriptions made during the callbacks land behind the survivors
        active.append(&mut registry.subscribers);
        registry.subscribers = active;
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().subscribers.len()
    }
}

/// Scoped subscription handle; dropping it detaches the callback
pub struct ResizeSubscription {
    registry: Weak<RefCell<Registry>>,
    id: u64,
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.borrow_mut();
            registry.subscribers.retain(|(id, _)| *id != self.id);
            // During a publish this entry lives in the taken-out list; the
            // publish loop filters it out by id instead
            if registry.publishing {
                registry.removed.push(self.id);
            }
        }
    }
}
