//! The change tracker carried by every instance of a woven type.
//!
//! A tracker reports "about to change" notifications for its owner object. Instrumented
//! setters call [`ChangeTracker::before_target_property_change`] before overwriting a field,
//! which notifies the owner's subscribers and moves a forwarding subscription from the old
//! value's tracker to the new value's tracker. Changes deep inside an object graph therefore
//! bubble up to every object that currently references the changed object through an
//! instrumented property.
//!
//! # Subscriptions
//!
//! The subscriber list is an ordered multicast list:
//! - [`Subscriber::Listener`] entries are user callbacks receiving the owner of the tracker
//! - [`Subscriber::Forward`] entries are parent trackers, held weakly so that a child object
//!   never keeps its former parents alive
//!
//! Removal is by identity and removes the most recently added matching entry, so adding a
//! callback twice requires removing it twice.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//! use dotweave::emulation::{EmValue, HeapRef};
//! use dotweave::runtime::{ChangeTracker, NoTrackers};
//!
//! let tracker = ChangeTracker::new(HeapRef::new(1));
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = calls.clone();
//! tracker.subscribe(Arc::new(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! tracker.before_target_property_change(&EmValue::Null, &EmValue::from("ivan"), &NoTrackers);
//! tracker.before_target_property_change(&EmValue::from("ivan"), &EmValue::from("ivan"), &NoTrackers);
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! ```

use std::{
    fmt,
    sync::{Arc, Mutex, Weak},
};

use crate::emulation::{EmValue, HeapRef};

/// A user callback receiving the object that is about to change
pub type Listener = Arc<dyn Fn(HeapRef) + Send + Sync>;

/// Discovery of the tracking capability of a runtime value.
///
/// A value exposes the capability when it is an instance of a type implementing the
/// trackable interface and carries an initialized tracker.
pub trait TrackerLookup {
    /// The tracker of `value`, if it exposes one
    fn tracker_of(&self, value: &EmValue) -> Option<Arc<ChangeTracker>>;
}

/// Lookup for contexts where no value exposes a tracker
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTrackers;

impl TrackerLookup for NoTrackers {
    fn tracker_of(&self, _value: &EmValue) -> Option<Arc<ChangeTracker>> {
        None
    }
}

/// One entry of a tracker's subscriber list.
#[derive(Clone)]
pub enum Subscriber {
    /// A user callback
    Listener(Listener),
    /// A parent tracker that re-raises the notification for its own owner
    Forward(Weak<ChangeTracker>),
}

impl Subscriber {
    fn is_listener(&self, listener: &Listener) -> bool {
        matches!(self, Subscriber::Listener(l) if Arc::ptr_eq(l, listener))
    }

    fn is_forward_to(&self, parent: &Weak<ChangeTracker>) -> bool {
        matches!(self, Subscriber::Forward(p) if Weak::ptr_eq(p, parent))
    }
}

/// The per-instance runtime tracker.
pub struct ChangeTracker {
    target: HeapRef,
    this: Weak<ChangeTracker>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl ChangeTracker {
    /// Create the tracker of `target`
    pub fn new(target: HeapRef) -> Arc<ChangeTracker> {
        Arc::new_cyclic(|this| ChangeTracker {
            target,
            this: this.clone(),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// The object this tracker reports changes for
    pub fn target(&self) -> HeapRef {
        self.target
    }

    /// Add a user callback to the end of the subscriber list
    pub fn subscribe(&self, listener: Listener) {
        lock!(self.subscribers).push(Subscriber::Listener(listener));
    }

    /// Remove the most recently added occurrence of `listener`
    ///
    /// Returns false if the listener was not subscribed.
    pub fn unsubscribe(&self, listener: &Listener) -> bool {
        let mut subscribers = lock!(self.subscribers);
        match subscribers.iter().rposition(|s| s.is_listener(listener)) {
            Some(index) => {
                subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of registered subscribers, forwarding entries included
    pub fn subscriber_count(&self) -> usize {
        lock!(self.subscribers).len()
    }

    /// Number of forwarding entries pointing at `parent`
    pub fn forwards_to(&self, parent: &Arc<ChangeTracker>) -> usize {
        let parent = Arc::downgrade(parent);
        lock!(self.subscribers)
            .iter()
            .filter(|s| s.is_forward_to(&parent))
            .count()
    }

    /// Invoke every subscriber with the owner of this tracker, in registration order.
    ///
    /// The list is copied before the first callback runs, so callbacks may subscribe or
    /// unsubscribe freely; such changes take effect from the next notification on.
    pub fn notify_before_change(&self, _sender: HeapRef) {
        let snapshot: Vec<Subscriber> = lock!(self.subscribers).clone();
        for subscriber in snapshot {
            match subscriber {
                Subscriber::Listener(listener) => listener(self.target),
                Subscriber::Forward(parent) => {
                    if let Some(parent) = parent.upgrade() {
                        parent.notify_before_change(self.target);
                    }
                }
            }
        }
    }

    /// Called by an instrumented setter right before it overwrites `old_value` with
    /// `new_value`.
    ///
    /// Does nothing when either value is a tracker or both are equal. Otherwise notifies
    /// the owner's subscribers, then detaches this tracker from the old value and attaches
    /// it to the new value, for values exposing the tracking capability.
    pub fn before_target_property_change(
        &self,
        old_value: &EmValue,
        new_value: &EmValue,
        lookup: &dyn TrackerLookup,
    ) {
        if old_value.is_tracker() || new_value.is_tracker() || old_value == new_value {
            return;
        }
        self.notify_before_change(self.target);

        if let Some(old_tracker) = lookup.tracker_of(old_value) {
            old_tracker.remove_forward(&self.this);
        }
        if let Some(new_tracker) = lookup.tracker_of(new_value) {
            lock!(new_tracker.subscribers).push(Subscriber::Forward(self.this.clone()));
        }
    }

    /// Drop every subscription of this tracker
    pub fn detach_all(&self) {
        lock!(self.subscribers).clear();
    }

    fn remove_forward(&self, parent: &Weak<ChangeTracker>) {
        let mut subscribers = lock!(self.subscribers);
        if let Some(index) = subscribers.iter().rposition(|s| s.is_forward_to(parent)) {
            subscribers.remove(index);
        }
    }
}

impl fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("target", &self.target)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
