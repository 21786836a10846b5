// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-target hover state machine.
//!
//! Each registered target owns one [`InteractionState`]. Every dispatch cycle
//! drives it once with whether the target won the sample, and it answers with
//! at most one [`GazeEvent`] to deliver.
//!
//! ## Transitions
//!
//! Per channel, a target is either [`Idle`](HoverPhase::Idle) or
//! [`Hovering`](HoverPhase::Hovering):
//!
//! | phase | won the sample | result |
//! |---|---|---|
//! | Idle | yes | Hovering, stamp `now`, emit `Entered(now)` |
//! | Hovering | yes | stay, emit `Moved(stamp)` (the entry stamp is kept) |
//! | Hovering | no | Idle, clear the stamp, emit `Exited(None)` if a local position exists |
//! | Idle | no | nothing |
//!
//! ## Minimal example
//!
//! ```
//! use kurbo::Point;
//! use understory_gaze::state::{HoverPhase, InteractionState};
//! use understory_gaze::types::{Channel, GazeEventKind};
//!
//! let mut s = InteractionState::new(1_u32);
//! let p = Some(Point::new(2.0, 2.0));
//! assert_eq!(s.step(Channel::Gaze, p, true, 100).unwrap().kind, GazeEventKind::Entered);
//! assert_eq!(s.step(Channel::Gaze, p, true, 150).unwrap().timestamp, Some(100));
//! assert_eq!(s.step(Channel::Gaze, p, false, 200).unwrap().kind, GazeEventKind::Exited);
//! assert_eq!(s.phase(Channel::Gaze), HoverPhase::Idle);
//! ```

use kurbo::Point;

use crate::types::{Channel, GazeEvent, Timestamp};

/// Hover phase of one target on one channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HoverPhase {
    /// Not hovered.
    Idle,
    /// Hovered since the last recorded transition.
    Hovering,
}

/// Interaction history of a single target.
///
/// The flags are the only record of "was this target already hovered", which a
/// single instantaneous sample cannot tell. The transition stamp is shared by
/// both channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionState<K> {
    target: K,
    on_gaze: bool,
    on_mouse: bool,
    last_transition: Option<Timestamp>,
}

impl<K: Copy> InteractionState<K> {
    /// Fresh state: idle on both channels.
    pub fn new(target: K) -> Self {
        Self {
            target,
            on_gaze: false,
            on_mouse: false,
            last_transition: None,
        }
    }

    /// The target this state belongs to.
    pub fn target(&self) -> K {
        self.target
    }

    /// Phase on `channel`.
    pub fn phase(&self, channel: Channel) -> HoverPhase {
        if self.flag(channel) {
            HoverPhase::Hovering
        } else {
            HoverPhase::Idle
        }
    }

    /// True when either channel is hovering.
    pub fn is_hovered(&self) -> bool {
        self.on_gaze || self.on_mouse
    }

    /// Stamp of the last `Idle → Hovering` transition, cleared on exit.
    pub fn last_transition(&self) -> Option<Timestamp> {
        self.last_transition
    }

    /// Advance the machine for one sample on `channel`.
    ///
    /// `local` is the sample in the target's local space, `None` when the
    /// transform is unavailable. `topmost` says whether the target won the
    /// sample; a win without a local position counts as a miss.
    pub fn step(
        &mut self,
        channel: Channel,
        local: Option<Point>,
        topmost: bool,
        now: Timestamp,
    ) -> Option<GazeEvent> {
        let hovering = self.flag(channel);
        match (hovering, local.filter(|_| topmost)) {
            (false, Some(p)) => {
                *self.flag_mut(channel) = true;
                self.last_transition = Some(now);
                Some(GazeEvent::entered(now, p))
            }
            (true, Some(p)) => Some(GazeEvent::moved(self.last_transition, p)),
            (true, None) => {
                *self.flag_mut(channel) = false;
                self.last_transition = None;
                local.map(|p| GazeEvent::exited(None, p))
            }
            (false, None) => None,
        }
    }

    /// The final exit owed to consumers when this target is removed.
    ///
    /// Exactly one event, even if both channels were hovering; the channel
    /// reported is gaze when the gaze was hovering.
    pub fn exit_on_removal(&self, now: Timestamp) -> Option<(Channel, GazeEvent)> {
        let channel = if self.on_gaze {
            Channel::Gaze
        } else if self.on_mouse {
            Channel::Mouse
        } else {
            return None;
        };
        Some((channel, GazeEvent::exited(Some(now), Point::ZERO)))
    }

    fn flag(&self, channel: Channel) -> bool {
        match channel {
            Channel::Gaze => self.on_gaze,
            Channel::Mouse => self.on_mouse,
        }
    }

    fn flag_mut(&mut self, channel: Channel) -> &mut bool {
        match channel {
            Channel::Gaze => &mut self.on_gaze,
            Channel::Mouse => &mut self.on_mouse,
        }
    }
}
