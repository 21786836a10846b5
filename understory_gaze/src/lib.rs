// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Gaze: turn a stream of eye-tracker or mouse samples into per-target
//! enter, move, and exit events.
//!
//! ## Overview
//!
//! A host registers interactive targets with a [`GazeDispatcher`](crate::dispatcher::GazeDispatcher)
//! and feeds it screen-space position samples tagged with a [`Channel`](crate::types::Channel).
//! On every sample the dispatcher finds the topmost registered target under the position,
//! advances a small per-target state machine, and schedules
//! [`GazeEvent`](crate::types::GazeEvent)s for delivery on the host's presentation thread.
//!
//! The crate does not own a scene graph. Hit testing goes through the
//! [`TargetScene`](crate::types::TargetScene) trait, which converts screen points to a
//! target's local space and answers containment, stacking order, and enablement.
//! The [`scene`] module provides a reference implementation on top of [`kurbo`] shapes.
//!
//! ## Ordering
//!
//! Among targets that contain a sample, the one with the highest z-order wins.
//! Ties go to the target registered first. Disabled targets never receive events but
//! still occlude what is beneath them. A background target, if set, is judged by its own
//! geometry alone and is never occluded.
//!
//! ## Workflow
//!
//! 1) Implement [`TargetScene`](crate::types::TargetScene) for your scene, or build a
//!    [`SceneTree`](crate::scene::SceneTree).
//! 2) Create a presentation queue with [`present::channel`] and hand the sender to the
//!    dispatcher. Run the receiver on your UI thread with a
//!    [`PresentationSink`](crate::present::PresentationSink).
//! 3) Register targets. Registration is safe from any thread and takes effect at the
//!    start of the next sample.
//! 4) Call [`on_sample`](crate::dispatcher::GazeDispatcher::on_sample) for live input, or
//!    [`on_replay_sample`](crate::dispatcher::GazeDispatcher::on_replay_sample) to replay a
//!    recording in the background target's coordinates.
//!
//! ## Events
//!
//! Each target tracks one hover phase per channel. Entering the winning region emits
//! `Entered`, staying emits `Moved`, and leaving emits `Exited` with no timestamp.
//! Unregistering a hovered target emits a final `Exited` at local `(0, 0)`.
//!
//! ## Logging
//!
//! Diagnostics go through [`tracing`]. Removing an unknown target logs at `warn`,
//! unavailable transforms and dropped deliveries log at `trace` and `debug`.
//! Install any subscriber to see them.
//!
//! This crate requires `std`.

pub mod config;
pub mod dispatcher;
pub mod listeners;
pub mod present;
pub mod resolve;
pub mod scene;
pub mod shape;
pub mod state;
pub mod types;

mod registry;
