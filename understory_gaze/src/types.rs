// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for gaze dispatch: channels, the event contract, timestamps, and collaborators.
//!
//! ## Overview
//!
//! These types describe what the dispatcher consumes and what it emits.
//! The scene graph that owns targets is reached only through [`TargetScene`];
//! the dispatcher never creates, destroys, or measures targets itself.

use core::fmt::Debug;
use core::hash::Hash;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use kurbo::Point;

/// Milliseconds since the Unix epoch, as produced by a [`Clock`].
pub type Timestamp = u64;

/// Input source of a position sample.
///
/// Hover state is tracked independently per channel, so a target can be
/// hovered by the mouse while the gaze is elsewhere.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Channel {
    /// Samples derived from an eye tracker.
    Gaze,
    /// Samples derived from the mouse pointer.
    Mouse,
}

/// Kind of a [`GazeEvent`].
///
/// Consumers key their behavior off this value, so its variants are stable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GazeEventKind {
    /// The channel started hovering the target.
    Entered,
    /// The channel keeps hovering the target.
    Moved,
    /// The channel stopped hovering the target (or the target was removed while hovered).
    Exited,
}

/// Notification delivered to a target.
///
/// `timestamp` is the instant the current hover began for [`Entered`](GazeEventKind::Entered)
/// and [`Moved`](GazeEventKind::Moved). It is `None` for an ordinary
/// [`Exited`](GazeEventKind::Exited), and the removal instant for the exit
/// synthesized when a hovered target is unregistered.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GazeEvent {
    /// What happened.
    pub kind: GazeEventKind,
    /// Start of the hover, or `None` once the hover ended.
    pub timestamp: Option<Timestamp>,
    /// Sample position in the target's local coordinates.
    pub local: Point,
}

impl GazeEvent {
    /// An [`Entered`](GazeEventKind::Entered) event stamped with the hover start.
    pub const fn entered(timestamp: Timestamp, local: Point) -> Self {
        Self {
            kind: GazeEventKind::Entered,
            timestamp: Some(timestamp),
            local,
        }
    }

    /// A [`Moved`](GazeEventKind::Moved) event carrying the original hover start.
    pub const fn moved(timestamp: Option<Timestamp>, local: Point) -> Self {
        Self {
            kind: GazeEventKind::Moved,
            timestamp,
            local,
        }
    }

    /// An [`Exited`](GazeEventKind::Exited) event.
    pub const fn exited(timestamp: Option<Timestamp>, local: Point) -> Self {
        Self {
            kind: GazeEventKind::Exited,
            timestamp,
            local,
        }
    }

    /// Local x coordinate.
    pub fn local_x(&self) -> f64 {
        self.local.x
    }

    /// Local y coordinate.
    pub fn local_y(&self) -> f64 {
        self.local.y
    }
}

/// Identity of a target as issued by the scene graph.
///
/// Identity is by key, never by geometry: two targets with identical shapes
/// have different keys.
pub trait TargetKey: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T: Copy + Eq + Hash + Debug + Send + Sync + 'static> TargetKey for T {}

/// The scene graph collaborator that owns targets, their geometry, and their order.
///
/// Every query may answer "unavailable" (`None` or `false`), for example for a
/// key the scene no longer knows or a window that is not laid out yet. The
/// dispatcher treats unavailable geometry as "does not contain the point".
pub trait TargetScene<K> {
    /// Map a screen-space point into the target's local space.
    fn screen_to_local(&self, target: &K, screen: Point) -> Option<Point>;

    /// Map a point in the target's local space back to screen space.
    fn local_to_screen(&self, target: &K, local: Point) -> Option<Point>;

    /// Hit test a local-space point against the target's geometry.
    fn contains_local(&self, target: &K, local: Point) -> bool;

    /// Stacking rank; higher is nearer to the user.
    fn z_order(&self, target: &K) -> i32;

    /// Disabled targets never transition or receive events.
    fn is_enabled(&self, target: &K) -> bool;

    /// Append every descendant of `target` (depth-first, pre-order) to `out`.
    ///
    /// Leaf targets keep the default, which appends nothing.
    fn descendants(&self, target: &K, out: &mut Vec<K>) {
        let _ = (target, out);
    }
}

impl<K, T: TargetScene<K> + ?Sized> TargetScene<K> for Arc<T> {
    fn screen_to_local(&self, target: &K, screen: Point) -> Option<Point> {
        (**self).screen_to_local(target, screen)
    }

    fn local_to_screen(&self, target: &K, local: Point) -> Option<Point> {
        (**self).local_to_screen(target, local)
    }

    fn contains_local(&self, target: &K, local: Point) -> bool {
        (**self).contains_local(target, local)
    }

    fn z_order(&self, target: &K) -> i32 {
        (**self).z_order(target)
    }

    fn is_enabled(&self, target: &K) -> bool {
        (**self).is_enabled(target)
    }

    fn descendants(&self, target: &K, out: &mut Vec<K>) {
        (**self).descendants(target, out);
    }
}

/// Source of timestamps for hover transitions.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time since the Unix epoch.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Timestamp::try_from(d.as_millis()).unwrap_or(Timestamp::MAX))
            .unwrap_or(0)
    }
}

impl<F: Fn() -> Timestamp + Send + Sync> Clock for F {
    fn now(&self) -> Timestamp {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_constructors_set_kind_and_stamp() {
        let p = Point::new(3.0, 4.0);
        let e = GazeEvent::entered(10, p);
        assert_eq!(e.kind, GazeEventKind::Entered);
        assert_eq!(e.timestamp, Some(10));
        assert_eq!((e.local_x(), e.local_y()), (3.0, 4.0));

        let m = GazeEvent::moved(Some(10), p);
        assert_eq!(m.kind, GazeEventKind::Moved);
        assert_eq!(m.timestamp, Some(10));

        let x = GazeEvent::exited(None, p);
        assert_eq!(x.kind, GazeEventKind::Exited);
        assert_eq!(x.timestamp, None);
    }

    #[test]
    fn closure_clock_and_system_clock() {
        let fixed = || 42_u64;
        assert_eq!(Clock::now(&fixed), 42);
        // Any real clock is well past 2020-01-01.
        assert!(SystemClock.now() > 1_577_836_800_000, "system clock too early");
    }

    #[test]
    fn arc_scene_forwards_queries() {
        struct Unit;
        impl TargetScene<u32> for Unit {
            fn screen_to_local(&self, _t: &u32, p: Point) -> Option<Point> {
                Some(p)
            }
            fn local_to_screen(&self, _t: &u32, p: Point) -> Option<Point> {
                Some(p)
            }
            fn contains_local(&self, _t: &u32, p: Point) -> bool {
                p.x >= 0.0
            }
            fn z_order(&self, t: &u32) -> i32 {
                i32::try_from(*t).unwrap_or(0)
            }
            fn is_enabled(&self, _t: &u32) -> bool {
                true
            }
        }

        let scene = Arc::new(Unit);
        assert!(scene.contains_local(&1, Point::new(1.0, 0.0)));
        assert!(!scene.contains_local(&1, Point::new(-1.0, 0.0)));
        assert_eq!(scene.z_order(&7), 7);
        let mut out = Vec::new();
        scene.descendants(&1, &mut out);
        assert!(out.is_empty());
    }
}
