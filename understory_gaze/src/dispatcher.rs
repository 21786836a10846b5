// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dispatch loop: turn position samples into per-target enter/move/exit events.
//!
//! ## Cycle
//!
//! [`GazeDispatcher::on_sample`] runs one cycle per sample:
//!
//! 1. If gaze drives the cursor, schedule a pointer move.
//! 2. Notify position listeners.
//! 3. Drain pending registrations, then pending removals (owing a final exit to
//!    any removed target that was hovered).
//! 4. Probe every registered target except the background, pick the
//!    [topmost](crate::resolve::topmost) one, and step every enabled target's
//!    state machine with whether it won.
//! 5. Step the background target against its own geometry only.
//!
//! Steps 3 to 5 run under one lock, so a cycle sees a consistent registry.
//! Deliveries are posted to the [`Presenter`] after the lock is released.
//!
//! ## Minimal example
//!
//! ```
//! use kurbo::{Point, Rect};
//! use understory_gaze::dispatcher::GazeDispatcher;
//! use understory_gaze::present::{self, PresentationTask};
//! use understory_gaze::scene::{SceneTree, TargetNode};
//! use understory_gaze::shape::TargetShape;
//! use understory_gaze::types::{Channel, GazeEventKind};
//!
//! let mut scene = SceneTree::new();
//! let button = scene.insert(
//!     None,
//!     TargetNode::new(TargetShape::Rect(Rect::new(0.0, 0.0, 50.0, 20.0))),
//! );
//!
//! let (tx, rx) = present::channel();
//! let dispatcher = GazeDispatcher::new(scene, tx);
//! dispatcher.register_filter_target(button);
//!
//! dispatcher.on_sample(Point::new(10.0, 10.0), Channel::Gaze);
//! dispatcher.on_sample(Point::new(90.0, 10.0), Channel::Gaze);
//!
//! let mut tasks = Vec::new();
//! rx.run_pending(&mut tasks);
//! let kinds: Vec<_> = tasks
//!     .iter()
//!     .filter_map(|t| match t {
//!         PresentationTask::Deliver { event, .. } => Some(event.kind),
//!         PresentationTask::MoveCursor { .. } => None,
//!     })
//!     .collect();
//! assert_eq!(kinds, [GazeEventKind::Entered, GazeEventKind::Exited]);
//! ```

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use kurbo::Point;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::DispatchConfig;
use crate::listeners::{ListenerId, ListenerSet, PositionListener};
use crate::present::{PresentationTask, Presenter};
use crate::registry::{PendingQueues, Registry};
use crate::resolve::{Probe, topmost};
use crate::state::HoverPhase;
use crate::types::{Channel, Clock, SystemClock, TargetKey, TargetScene, Timestamp};

/// Gaze-to-target event dispatcher.
///
/// Share it as `Arc<GazeDispatcher<..>>`: registration methods may be called
/// from any thread, while one producer thread feeds samples.
pub struct GazeDispatcher<K: TargetKey, S, P> {
    scene: S,
    presenter: P,
    clock: Box<dyn Clock>,
    config: ArcSwap<DispatchConfig>,
    registry: Mutex<Registry<K>>,
    pending: PendingQueues<K>,
    listeners: ListenerSet,
    destroyed: AtomicBool,
}

impl<K: TargetKey, S, P> fmt::Debug for GazeDispatcher<K, S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("GazeDispatcher")
            .field("filters", &registry.filter_count())
            .field("handlers", &registry.handler_count())
            .field("background", &registry.background_key())
            .field("pending", &self.pending.counts())
            .field("listeners", &self.listeners.len())
            .field("config", &**self.config.load())
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<K, S, P> GazeDispatcher<K, S, P>
where
    K: TargetKey,
    S: TargetScene<K>,
    P: Presenter<K>,
{
    /// Create a dispatcher over `scene` that posts deliveries to `presenter`.
    ///
    /// Uses the [`SystemClock`] and the default [`DispatchConfig`].
    pub fn new(scene: S, presenter: P) -> Self {
        Self {
            scene,
            presenter,
            clock: Box::new(SystemClock),
            config: ArcSwap::from_pointee(DispatchConfig::default()),
            registry: Mutex::new(Registry::new()),
            pending: PendingQueues::new(),
            listeners: ListenerSet::new(),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Replace the clock used to stamp transitions.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Start with `config` instead of the default.
    pub fn with_config(self, config: DispatchConfig) -> Self {
        self.config.store(Arc::new(config));
        self
    }

    /// The scene collaborator.
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Current configuration.
    pub fn config(&self) -> DispatchConfig {
        **self.config.load()
    }

    /// Swap the configuration; takes effect on the next sample.
    pub fn set_config(&self, config: DispatchConfig) {
        self.config.store(Arc::new(config));
    }

    /// Queue `target` for registration at the start of the next cycle.
    pub fn register_filter_target(&self, target: K) {
        trace!(?target, "queue filter target");
        self.pending.push_add(target);
    }

    /// Queue `target` and every descendant the scene reports for removal.
    ///
    /// Removal happens at the start of the next cycle; a removed target that
    /// was hovered receives one final exit.
    pub fn unregister_filter_target(&self, target: K) {
        let mut doomed = vec![target];
        self.scene.descendants(&target, &mut doomed);
        trace!(?target, count = doomed.len(), "queue filter target removal");
        self.pending.push_removes(doomed);
    }

    /// Register a handler target immediately.
    pub fn register_handler_target(&self, target: K) {
        self.registry.lock().insert_handler(target);
    }

    /// Remove a handler target immediately.
    ///
    /// Returns false, and logs a warning, if it was not registered.
    pub fn unregister_handler_target(&self, target: K) -> bool {
        self.registry.lock().remove_handler(&target)
    }

    /// Set or clear the background target.
    ///
    /// Replacing a hovered background delivers its final exit. Promoting a
    /// hovered filter target does the same for its filter state, which is no
    /// longer stepped while it is the background.
    pub fn set_background_target(&self, target: Option<K>) {
        let now = self.clock.now();
        let mut out = Vec::new();
        self.registry.lock().set_background(target, now, &mut out);
        self.post_all(out);
    }

    /// The background target, if set.
    pub fn background_target(&self) -> Option<K> {
        self.registry.lock().background_key()
    }

    /// Subscribe to raw sample positions.
    pub fn add_position_listener(&self, listener: impl PositionListener + 'static) -> ListenerId {
        self.listeners.add(Arc::new(listener))
    }

    /// Unsubscribe; returns whether the listener was registered.
    pub fn remove_position_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Dispatch one screen-space sample on `channel`.
    pub fn on_sample(&self, position: Point, channel: Channel) {
        if self.destroyed.load(Ordering::Acquire) {
            debug!("sample after destroy ignored");
            return;
        }

        if self.config.load().moves_cursor_for(channel) {
            self.post(PresentationTask::MoveCursor { position });
        }
        self.listeners.notify(position, channel);

        let now = self.clock.now();
        let mut out = Vec::new();
        {
            let mut registry = self.registry.lock();
            // Teardown may have won the lock after the check above.
            if self.destroyed.load(Ordering::Acquire) {
                return;
            }
            self.drain_pending(&mut registry, now, &mut out);
            self.step_targets(&mut registry, position, channel, now, &mut out);
        }
        self.post_all(out);
    }

    /// Dispatch a sample recorded relative to the background target.
    ///
    /// The position is mapped to the screen through the background's
    /// transform. Without a background, or while its transform is
    /// unavailable, the sample is dropped silently.
    pub fn on_replay_sample(&self, scene_position: Point, channel: Channel) {
        let Some(background) = self.background_target() else {
            trace!("replay sample without background target");
            return;
        };
        let Some(screen) = self.scene.local_to_screen(&background, scene_position) else {
            trace!(?background, "replay sample before background is laid out");
            return;
        };
        self.on_sample(screen, channel);
    }

    /// Drop every target, pending mutation, and listener.
    ///
    /// Tasks already posted may still run; nothing new is delivered for the
    /// cleared targets.
    pub fn clear(&self) {
        // Queues are only drained under the registry lock; hold it across both.
        let mut registry = self.registry.lock();
        self.pending.clear();
        registry.clear();
        drop(registry);
        self.listeners.clear();
        debug!("gaze dispatcher cleared");
    }

    /// [`clear`](Self::clear) and ignore every later sample.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        self.clear();
    }

    /// Whether [`destroy`](Self::destroy) was called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Whether `target` is in the registry (pending additions excluded).
    pub fn is_registered(&self, target: &K) -> bool {
        self.registry.lock().filter(target).is_some()
    }

    /// Number of registered filter targets.
    pub fn filter_count(&self) -> usize {
        self.registry.lock().filter_count()
    }

    /// Whether `target` is a registered handler target.
    pub fn is_handler_registered(&self, target: &K) -> bool {
        self.registry.lock().has_handler(target)
    }

    /// Number of registered handler targets.
    pub fn handler_count(&self) -> usize {
        self.registry.lock().handler_count()
    }

    /// `(additions, removals)` waiting for the next cycle.
    pub fn pending_counts(&self) -> (usize, usize) {
        self.pending.counts()
    }

    /// Hover phase of a registered target (or the background) on `channel`.
    ///
    /// A key that is both a filter target and the background reports its
    /// background state, the one that is stepped.
    pub fn hover_phase(&self, target: &K, channel: Channel) -> Option<HoverPhase> {
        let registry = self.registry.lock();
        registry
            .background()
            .filter(|b| b.target() == *target)
            .or_else(|| registry.filter(target))
            .map(|s| s.phase(channel))
    }

    fn drain_pending(
        &self,
        registry: &mut Registry<K>,
        now: Timestamp,
        out: &mut Vec<PresentationTask<K>>,
    ) {
        let adds = self.pending.take_adds();
        let removes = self.pending.take_removes();
        if !adds.is_empty() || !removes.is_empty() {
            debug!(adds = adds.len(), removes = removes.len(), "drain pending");
        }
        registry.apply_adds(adds);
        registry.apply_removes(removes, now, out);
    }

    fn step_targets(
        &self,
        registry: &mut Registry<K>,
        position: Point,
        channel: Channel,
        now: Timestamp,
        out: &mut Vec<PresentationTask<K>>,
    ) {
        let background = registry.background_key();
        let probes: SmallVec<[Probe<K>; 8]> = registry
            .filter_keys()
            .filter(|k| Some(*k) != background)
            .map(|k| Probe::at(&self.scene, k, position))
            .collect();
        let winner = topmost(&probes, |a, b| {
            self.scene.z_order(a).cmp(&self.scene.z_order(b))
        });
        trace!(?winner, candidates = probes.len(), ?channel, "resolved sample");

        for probe in &probes {
            if !self.scene.is_enabled(&probe.target) {
                continue;
            }
            let Some(state) = registry.filter_mut(&probe.target) else {
                continue;
            };
            let won = winner == Some(probe.target);
            if let Some(event) = state.step(channel, probe.local, won, now) {
                out.push(PresentationTask::Deliver {
                    target: probe.target,
                    channel,
                    event,
                });
            }
        }

        if let Some(key) = background
            && self.scene.is_enabled(&key)
            && let Some(state) = registry.background_mut()
        {
            let probe = Probe::at(&self.scene, key, position);
            if let Some(event) = state.step(channel, probe.local, probe.contains, now) {
                out.push(PresentationTask::Deliver {
                    target: key,
                    channel,
                    event,
                });
            }
        }
    }

    fn post(&self, task: PresentationTask<K>) {
        if let Err(err) = self.presenter.post(task) {
            debug!(%err, "presentation task dropped");
        }
    }

    fn post_all(&self, tasks: Vec<PresentationTask<K>>) {
        for task in tasks {
            self.post(task);
        }
    }
}
