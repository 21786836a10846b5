// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replaying a recorded gaze session against a moved window.
//!
//! Recorded samples are stored relative to the background target (the game
//! area). Replay maps them back through the background's current transform,
//! so a recording made with the window at one place still lands on the same
//! targets after the window moves.
//!
//! Run:
//! - `cargo run -p understory_gaze_demos --example gaze_replay`

use kurbo::{Affine, Point, Rect};
use tracing::info;
use tracing_subscriber::EnvFilter;
use understory_gaze::dispatcher::GazeDispatcher;
use understory_gaze::present::{self, PresentationTask};
use understory_gaze::scene::{SceneTree, SharedScene, TargetId, TargetNode};
use understory_gaze::types::{Channel, GazeEventKind};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut tree = SceneTree::new();
    let game = tree.insert(
        None,
        TargetNode {
            local_transform: Affine::translate((640.0, 360.0)),
            ..TargetNode::new(Rect::new(0.0, 0.0, 800.0, 600.0).into())
        },
    );
    let left = tree.insert(
        Some(game),
        TargetNode {
            z_index: 1,
            ..TargetNode::new(Rect::new(50.0, 200.0, 250.0, 400.0).into())
        },
    );
    let right = tree.insert(
        Some(game),
        TargetNode {
            z_index: 1,
            ..TargetNode::new(Rect::new(550.0, 200.0, 750.0, 400.0).into())
        },
    );

    // Samples in game-area coordinates: a fixation on each card, with a saccade between.
    let recording = [
        Point::new(150.0, 300.0),
        Point::new(152.0, 305.0),
        Point::new(149.0, 298.0),
        Point::new(400.0, 300.0),
        Point::new(650.0, 300.0),
        Point::new(648.0, 302.0),
        Point::new(400.0, 700.0),
    ];

    let (tx, rx) = present::channel();
    let dispatcher = GazeDispatcher::new(SharedScene::new(tree), tx);
    dispatcher.set_background_target(Some(game));
    dispatcher.register_filter_target(left);
    dispatcher.register_filter_target(right);

    let (first, second) = recording.split_at(3);
    for sample in first {
        dispatcher.on_replay_sample(*sample, Channel::Gaze);
    }
    // The window moves; replayed samples follow it.
    dispatcher
        .scene()
        .write()
        .set_local_transform(game, Affine::translate((40.0, 30.0)));
    for sample in second {
        dispatcher.on_replay_sample(*sample, Channel::Gaze);
    }

    let mut tasks: Vec<PresentationTask<_>> = Vec::new();
    rx.run_pending(&mut tasks);
    for task in &tasks {
        if let PresentationTask::Deliver {
            target,
            channel,
            event,
        } = task
        {
            let name = match *target {
                t if t == game => "game",
                t if t == left => "left",
                t if t == right => "right",
                _ => "?",
            };
            info!(
                node = name,
                ?channel,
                kind = ?event.kind,
                x = event.local_x(),
                y = event.local_y(),
                "replayed"
            );
        }
    }

    let dwell = |who: TargetId| {
        tasks
            .iter()
            .filter(|t| {
                matches!(t, PresentationTask::Deliver { target, event, .. }
                    if *target == who && event.kind != GazeEventKind::Exited)
            })
            .count()
    };
    info!(
        left = dwell(left),
        right = dwell(right),
        game = dwell(game),
        "samples on target"
    );
}
