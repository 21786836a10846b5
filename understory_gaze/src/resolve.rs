// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlap resolution: which target is on top at a sample position.
//!
//! ## Overview
//!
//! Each candidate is first [probed](Probe::at): the sample is mapped into the
//! candidate's local space and hit-tested there. A failed transform is a miss.
//!
//! Among the candidates that contain the point, a candidate wins when no other
//! containing candidate has a strictly greater z-order. Equal z-orders are
//! broken by enumeration order: the first one found wins.
//!
//! [`wins_at`] states that rule pairwise, one candidate against all others.
//! [`topmost`] computes the same winner in a single pass, which is what the
//! dispatcher uses every cycle.
//!
//! ```
//! use core::cmp::Ordering;
//! use kurbo::Point;
//! use understory_gaze::resolve::{Probe, topmost, wins_at};
//!
//! let at = Some(Point::ZERO);
//! let probes = [
//!     Probe { target: (1, 5), local: at, contains: true },
//!     Probe { target: (2, 9), local: at, contains: true },
//!     Probe { target: (3, 9), local: at, contains: true },
//!     Probe { target: (4, 20), local: at, contains: false },
//! ];
//! // Keys carry their z-order in this example.
//! let z = |a: &(u32, i32), b: &(u32, i32)| a.1.cmp(&b.1);
//! assert_eq!(topmost(&probes, z), Some((2, 9)));
//! assert!(wins_at(&(2, 9), &probes, z));
//! assert!(!wins_at(&(1, 5), &probes, z));
//! ```

use core::cmp::Ordering;

use kurbo::Point;
use tracing::trace;

use crate::types::TargetScene;

/// Result of hit-testing one candidate against one sample.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Probe<K> {
    /// The candidate.
    pub target: K,
    /// Sample in the candidate's local space, if the transform was available.
    pub local: Option<Point>,
    /// Whether the candidate's geometry contains the sample.
    pub contains: bool,
}

impl<K: Copy + core::fmt::Debug> Probe<K> {
    /// Probe `target` at the screen-space `position`.
    pub fn at<S: TargetScene<K> + ?Sized>(scene: &S, target: K, position: Point) -> Self {
        let local = scene.screen_to_local(&target, position);
        if local.is_none() {
            trace!(?target, "screen-to-local unavailable; treated as a miss");
        }
        let contains = local.is_some_and(|p| scene.contains_local(&target, p));
        Self {
            target,
            local,
            contains,
        }
    }
}

/// The winning candidate among `probes`, if any contains the point.
///
/// Returns the first containing candidate whose z-order is maximal among the
/// containing candidates.
pub fn topmost<K: Copy>(
    probes: &[Probe<K>],
    mut z_cmp: impl FnMut(&K, &K) -> Ordering,
) -> Option<K> {
    let mut best: Option<K> = None;
    for probe in probes.iter().filter(|p| p.contains) {
        match best {
            Some(b) if z_cmp(&probe.target, &b) != Ordering::Greater => {}
            _ => best = Some(probe.target),
        }
    }
    best
}

/// Whether `target` wins among `probes`: it contains the point and no other
/// containing candidate ranks strictly above it.
///
/// This is the reference form of the overlap rule. Hosts that resolve
/// overlap themselves (for example to explain why a target lost) can check a
/// single candidate with it. On equal z-order several candidates satisfy
/// this; [`topmost`] then picks the first one enumerated, and the dispatcher
/// always uses [`topmost`].
pub fn wins_at<K: Copy + PartialEq>(
    target: &K,
    probes: &[Probe<K>],
    mut z_cmp: impl FnMut(&K, &K) -> Ordering,
) -> bool {
    let Some(own) = probes.iter().find(|p| p.target == *target) else {
        return false;
    };
    own.contains
        && probes
            .iter()
            .filter(|p| p.contains && p.target != *target)
            .all(|other| z_cmp(&other.target, target) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keys are (id, z).
    type Key = (u32, i32);

    fn z(a: &Key, b: &Key) -> Ordering {
        a.1.cmp(&b.1)
    }

    fn probe(id: u32, z: i32, contains: bool) -> Probe<Key> {
        Probe {
            target: (id, z),
            local: Some(Point::ZERO),
            contains,
        }
    }

    #[test]
    fn none_when_nothing_contains() {
        let probes = [probe(1, 0, false), probe(2, 3, false)];
        assert_eq!(topmost(&probes, z), None);
        assert!(topmost::<Key>(&[], z).is_none());
    }

    #[test]
    fn higher_z_wins_regardless_of_order() {
        let a = [probe(1, 1, true), probe(2, 2, true)];
        let b = [probe(2, 2, true), probe(1, 1, true)];
        assert_eq!(topmost(&a, z), Some((2, 2)));
        assert_eq!(topmost(&b, z), Some((2, 2)));
    }

    #[test]
    fn non_containing_higher_z_does_not_occlude() {
        let probes = [probe(1, 1, true), probe(2, 10, false)];
        assert_eq!(topmost(&probes, z), Some((1, 1)));
        assert!(wins_at(&(1, 1), &probes, z));
    }

    #[test]
    fn equal_z_first_enumerated_wins() {
        let probes = [probe(3, 4, true), probe(1, 4, true), probe(2, 4, true)];
        assert_eq!(topmost(&probes, z), Some((3, 4)));
        // Pairwise every tie qualifies; the single pass keeps the first.
        assert!(probes.iter().all(|p| wins_at(&p.target, &probes, z)));
    }

    #[test]
    fn unknown_target_never_wins() {
        let probes = [probe(1, 1, true)];
        assert!(!wins_at(&(9, 9), &probes, z));
    }

    // The single-pass winner is always the first candidate that wins pairwise.
    #[test]
    fn single_pass_matches_pairwise_rule() {
        let layouts: [&[(u32, i32, bool)]; 5] = [
            &[(1, 0, true), (2, 0, true), (3, 1, false)],
            &[(1, 5, false), (2, 1, true), (3, 2, true), (4, 2, true)],
            &[(1, -3, true), (2, -1, true), (3, -2, true)],
            &[(1, 7, true)],
            &[(1, 2, true), (2, 9, true), (3, 9, false), (4, 1, true)],
        ];
        for layout in layouts {
            let probes: Vec<_> = layout.iter().map(|&(i, zz, c)| probe(i, zz, c)).collect();
            let pairwise_first = probes
                .iter()
                .map(|p| p.target)
                .find(|t| wins_at(t, &probes, z));
            assert_eq!(topmost(&probes, z), pairwise_first, "layout {layout:?}");
        }
    }

    #[test]
    fn probe_treats_missing_transform_as_miss() {
        struct Half;
        impl TargetScene<u32> for Half {
            fn screen_to_local(&self, t: &u32, p: Point) -> Option<Point> {
                (*t != 0).then_some(p)
            }
            fn local_to_screen(&self, _t: &u32, p: Point) -> Option<Point> {
                Some(p)
            }
            fn contains_local(&self, _t: &u32, _p: Point) -> bool {
                true
            }
            fn z_order(&self, _t: &u32) -> i32 {
                0
            }
            fn is_enabled(&self, _t: &u32) -> bool {
                true
            }
        }

        let miss = Probe::at(&Half, 0, Point::new(1.0, 1.0));
        assert!(!miss.contains);
        assert!(miss.local.is_none());
        let hit = Probe::at(&Half, 1, Point::new(1.0, 1.0));
        assert!(hit.contains);
        assert_eq!(hit.local, Some(Point::new(1.0, 1.0)));
    }
}
