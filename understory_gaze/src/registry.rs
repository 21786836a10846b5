// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Target registry and the pending mutation queues that feed it.
//!
//! Registration calls may come from any thread; they only append to a
//! pending queue. The registry itself is mutated inside the dispatch cycle,
//! under the dispatcher's lock, when the queues are drained.
//!
//! A drain swaps the whole queue out in one step, so entries appended while a
//! drain is in progress land in the fresh queue and are applied next cycle.

use core::mem;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::present::PresentationTask;
use crate::state::InteractionState;
use crate::types::{TargetKey, Timestamp};

/// Additions and removals waiting for the next dispatch cycle.
#[derive(Debug)]
pub(crate) struct PendingQueues<K> {
    to_add: Mutex<Vec<K>>,
    to_remove: Mutex<Vec<K>>,
}

impl<K> PendingQueues<K> {
    pub(crate) fn new() -> Self {
        Self {
            to_add: Mutex::new(Vec::new()),
            to_remove: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push_add(&self, target: K) {
        self.to_add.lock().push(target);
    }

    pub(crate) fn push_removes(&self, targets: impl IntoIterator<Item = K>) {
        self.to_remove.lock().extend(targets);
    }

    pub(crate) fn take_adds(&self) -> Vec<K> {
        mem::take(&mut *self.to_add.lock())
    }

    pub(crate) fn take_removes(&self) -> Vec<K> {
        mem::take(&mut *self.to_remove.lock())
    }

    /// `(additions, removals)` still queued.
    pub(crate) fn counts(&self) -> (usize, usize) {
        (self.to_add.lock().len(), self.to_remove.lock().len())
    }

    pub(crate) fn clear(&self) {
        self.to_add.lock().clear();
        self.to_remove.lock().clear();
    }
}

/// Live interaction state for every registered target.
#[derive(Debug)]
pub(crate) struct Registry<K: TargetKey> {
    /// Filter targets in registration order; this order breaks z-order ties.
    filters: IndexMap<K, InteractionState<K>>,
    /// Handler targets, registered synchronously and not dispatched to.
    handlers: hashbrown::HashMap<K, InteractionState<K>>,
    background: Option<InteractionState<K>>,
}

impl<K: TargetKey> Registry<K> {
    pub(crate) fn new() -> Self {
        Self {
            filters: IndexMap::new(),
            handlers: hashbrown::HashMap::new(),
            background: None,
        }
    }

    /// Move drained additions into the registry.
    ///
    /// Adding a key that is already registered keeps its existing state.
    pub(crate) fn apply_adds(&mut self, adds: Vec<K>) {
        for target in adds {
            if self.filters.contains_key(&target) {
                debug!(?target, "filter target already registered");
                continue;
            }
            self.filters.insert(target, InteractionState::new(target));
        }
    }

    /// Move drained removals out of the registry, owing a final exit to any
    /// target that was still hovered.
    pub(crate) fn apply_removes(
        &mut self,
        removes: Vec<K>,
        now: Timestamp,
        out: &mut Vec<PresentationTask<K>>,
    ) {
        for target in removes {
            match self.filters.shift_remove(&target) {
                Some(state) => {
                    if let Some((channel, event)) = state.exit_on_removal(now) {
                        out.push(PresentationTask::Deliver {
                            target,
                            channel,
                            event,
                        });
                    }
                }
                None => warn!(?target, "filter target to remove not found"),
            }
        }
    }

    pub(crate) fn filter_keys(&self) -> impl Iterator<Item = K> + '_ {
        self.filters.keys().copied()
    }

    pub(crate) fn filter(&self, target: &K) -> Option<&InteractionState<K>> {
        self.filters.get(target)
    }

    pub(crate) fn filter_mut(&mut self, target: &K) -> Option<&mut InteractionState<K>> {
        self.filters.get_mut(target)
    }

    pub(crate) fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub(crate) fn insert_handler(&mut self, target: K) {
        self.handlers
            .entry(target)
            .or_insert_with(|| InteractionState::new(target));
    }

    /// Returns false (and warns) when the handler was not registered.
    pub(crate) fn remove_handler(&mut self, target: &K) -> bool {
        if self.handlers.remove(target).is_some() {
            true
        } else {
            warn!(?target, "handler target to remove not found");
            false
        }
    }

    pub(crate) fn has_handler(&self, target: &K) -> bool {
        self.handlers.contains_key(target)
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub(crate) fn background_key(&self) -> Option<K> {
        self.background.as_ref().map(InteractionState::target)
    }

    pub(crate) fn background(&self) -> Option<&InteractionState<K>> {
        self.background.as_ref()
    }

    pub(crate) fn background_mut(&mut self) -> Option<&mut InteractionState<K>> {
        self.background.as_mut()
    }

    /// Replace the background target.
    ///
    /// A hovered predecessor is owed an exit, and so is a hovered filter
    /// target promoted to background: its filter state is reset because it is
    /// skipped during candidate iteration from now on.
    pub(crate) fn set_background(
        &mut self,
        target: Option<K>,
        now: Timestamp,
        out: &mut Vec<PresentationTask<K>>,
    ) {
        if self.background_key() == target {
            return;
        }
        let previous = mem::replace(&mut self.background, target.map(InteractionState::new));
        if let Some(state) = previous {
            Self::owe_exit(&state, now, out);
        }
        if let Some(key) = target
            && let Some(filter) = self.filters.get_mut(&key)
        {
            Self::owe_exit(filter, now, out);
            *filter = InteractionState::new(key);
        }
    }

    fn owe_exit(state: &InteractionState<K>, now: Timestamp, out: &mut Vec<PresentationTask<K>>) {
        if let Some((channel, event)) = state.exit_on_removal(now) {
            out.push(PresentationTask::Deliver {
                target: state.target(),
                channel,
                event,
            });
        }
    }

    pub(crate) fn clear(&mut self) {
        self.filters.clear();
        self.handlers.clear();
        self.background = None;
    }
}
