// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlapping targets under a simulated gaze sweep.
//!
//! This example shows how to combine:
//! - a shared [`SceneTree`] with nested, overlapping, and disabled targets,
//! - a [`GazeDispatcher`] fed from a sampling thread,
//! - a presentation thread draining the queue into a logging sink.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_gaze_demos --example gaze_overlap`

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use kurbo::{Affine, Circle, Point, Rect, RoundedRect};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use understory_gaze::config::DispatchConfig;
use understory_gaze::dispatcher::GazeDispatcher;
use understory_gaze::present::{self, PresentationSink};
use understory_gaze::scene::{SceneTree, SharedScene, TargetId, TargetNode};
use understory_gaze::shape::TargetShape;
use understory_gaze::types::{Channel, GazeEvent};

/// Presentation-thread sink that logs what a toolkit would act on.
struct LogSink {
    names: Vec<(TargetId, &'static str)>,
}

impl LogSink {
    fn name(&self, target: TargetId) -> &'static str {
        self.names
            .iter()
            .find(|(id, _)| *id == target)
            .map_or("?", |(_, n)| *n)
    }
}

impl PresentationSink<TargetId> for LogSink {
    fn deliver(&mut self, target: TargetId, channel: Channel, event: GazeEvent) {
        info!(
            node = self.name(target),
            ?channel,
            kind = ?event.kind,
            since = ?event.timestamp,
            x = event.local_x(),
            y = event.local_y(),
            "gaze event"
        );
    }

    fn move_cursor(&mut self, position: Point) {
        debug!(x = position.x, y = position.y, "move cursor");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // A panel at (100, 100) holding a card and a round badge that overlaps it.
    let mut tree = SceneTree::new();
    let panel = tree.insert(
        None,
        TargetNode {
            local_transform: Affine::translate((100.0, 100.0)),
            ..TargetNode::new(Rect::new(0.0, 0.0, 400.0, 200.0).into())
        },
    );
    let card = tree.insert(
        Some(panel),
        TargetNode {
            z_index: 1,
            ..TargetNode::new(TargetShape::RoundedRect(RoundedRect::new(
                20.0, 20.0, 220.0, 160.0, 12.0,
            )))
        },
    );
    let badge = tree.insert(
        Some(panel),
        TargetNode {
            z_index: 2,
            hit_tolerance: 4.0,
            ..TargetNode::new(Circle::new((220.0, 40.0), 24.0).into())
        },
    );
    // Disabled, but still covers the right end of the panel.
    let shade = tree.insert(
        Some(panel),
        TargetNode {
            z_index: 3,
            ..TargetNode::new(Rect::new(300.0, 0.0, 400.0, 200.0).into())
        },
    );
    tree.set_enabled(shade, false);

    let scene = Arc::new(SharedScene::new(tree));
    let (tx, rx) = present::channel();
    let dispatcher = GazeDispatcher::new(Arc::clone(&scene), tx).with_config(DispatchConfig {
        gaze_drives_cursor: true,
        mouse_free: false,
    });

    let samples = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&samples);
    dispatcher.add_position_listener(move |_: Point, _: Channel| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    for target in [panel, card, badge, shade] {
        dispatcher.register_filter_target(target);
    }

    let mut sink = LogSink {
        names: vec![
            (panel, "panel"),
            (card, "card"),
            (badge, "badge"),
            (shade, "shade"),
        ],
    };
    let presenter = thread::spawn(move || {
        let mut delivered = 0;
        loop {
            let ran = rx.run_for(Duration::from_millis(20), &mut sink);
            delivered += ran;
            if ran == 0 && rx.is_disconnected() {
                break delivered;
            }
        }
    });

    // Sweep left to right along y = 140 (panel-local y = 40).
    for step in 0..=45 {
        let x = 90.0 + f64::from(step) * 10.0;
        dispatcher.on_sample(Point::new(x, 140.0), Channel::Gaze);
        thread::sleep(Duration::from_millis(5));
    }

    // Move the badge away mid-session; the next sample sees the new geometry.
    scene
        .write()
        .set_local_transform(badge, Affine::translate((0.0, 120.0)));
    dispatcher.on_sample(Point::new(320.0, 140.0), Channel::Gaze);

    // Hand control back to the mouse and remove the card subtree.
    dispatcher.set_config(DispatchConfig {
        mouse_free: true,
        ..dispatcher.config()
    });
    dispatcher.on_sample(Point::new(150.0, 150.0), Channel::Mouse);
    dispatcher.unregister_filter_target(card);
    dispatcher.on_sample(Point::new(150.0, 150.0), Channel::Mouse);

    info!(
        samples = samples.load(Ordering::Relaxed),
        registered = dispatcher.filter_count(),
        "sweep finished"
    );
    dispatcher.destroy();
    drop(dispatcher);

    match presenter.join() {
        Ok(delivered) => info!(delivered, "presentation thread done"),
        Err(_) => tracing::error!("presentation thread panicked"),
    }
}
