// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw position fan-out, independent of hit testing.

use core::cell::Cell;
use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use kurbo::Point;

use crate::types::Channel;

/// Receives every accepted sample position.
///
/// Called on the sampling thread; implementations should return quickly.
pub trait PositionListener: Send + Sync {
    /// A sample arrived at screen-space `position` on `channel`.
    fn position_changed(&self, position: Point, channel: Channel);
}

impl<F: Fn(Point, Channel) + Send + Sync> PositionListener for F {
    fn position_changed(&self, position: Point, channel: Channel) {
        self(position, channel);
    }
}

/// Handle returned on registration, used to remove the listener again.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
struct Entry {
    id: ListenerId,
    listener: Arc<dyn PositionListener>,
}

/// Copy-on-write listener list: notification reads a snapshot without locking.
pub(crate) struct ListenerSet {
    entries: ArcSwap<Vec<Entry>>,
    next_id: AtomicU64,
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn add(&self, listener: Arc<dyn PositionListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Entry { id, listener };
        self.entries.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(entry.clone());
            Arc::new(next)
        });
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let removed = Cell::new(false);
        self.entries.rcu(|current| {
            if current.iter().any(|e| e.id == id) {
                removed.set(true);
                Arc::new(current.iter().filter(|e| e.id != id).cloned().collect())
            } else {
                removed.set(false);
                Arc::clone(current)
            }
        });
        removed.get()
    }

    pub(crate) fn notify(&self, position: Point, channel: Channel) {
        for entry in self.entries.load().iter() {
            entry.listener.position_changed(position, channel);
        }
    }

    pub(crate) fn clear(&self) {
        self.entries.store(Arc::new(Vec::new()));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.load().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn add_notify_remove() {
        let set = ListenerSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = set.add(Arc::new(move |p: Point, c: Channel| sink.lock().push((p, c))));
        assert_eq!(set.len(), 1);

        set.notify(Point::new(1.0, 2.0), Channel::Gaze);
        assert_eq!(*seen.lock(), vec![(Point::new(1.0, 2.0), Channel::Gaze)]);

        assert!(set.remove(id));
        assert!(!set.remove(id), "second removal finds nothing");
        set.notify(Point::new(3.0, 4.0), Channel::Mouse);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn ids_are_distinct_and_clear_empties() {
        let set = ListenerSet::new();
        let a = set.add(Arc::new(|_: Point, _: Channel| {}));
        let b = set.add(Arc::new(|_: Point, _: Channel| {}));
        assert_ne!(a, b);
        set.clear();
        assert_eq!(set.len(), 0);
        assert!(!set.remove(a));
    }
}
