// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hand-off of deliveries to the presentation thread.
//!
//! The dispatch loop never calls into targets. It flips hover state
//! synchronously and posts a [`PresentationTask`] to a [`Presenter`]; the
//! presentation (UI) thread later runs those tasks against its own
//! [`PresentationSink`]. This keeps consumer logic off the sampling thread.
//!
//! [`channel`] builds an unbounded queue for this purpose: the
//! [`PresentationSender`] goes to the dispatcher and the
//! [`PresentationReceiver`] stays with the presentation thread.
//!
//! ```
//! use kurbo::Point;
//! use understory_gaze::present::{self, PresentationTask, Presenter};
//! use understory_gaze::types::{Channel, GazeEvent};
//!
//! let (tx, rx) = present::channel::<u32>();
//! tx.post(PresentationTask::Deliver {
//!     target: 7,
//!     channel: Channel::Gaze,
//!     event: GazeEvent::entered(1, Point::ZERO),
//! })
//! .unwrap();
//!
//! // On the presentation thread:
//! let mut seen: Vec<PresentationTask<u32>> = Vec::new();
//! assert_eq!(rx.run_pending(&mut seen), 1);
//! assert!(matches!(seen[0], PresentationTask::Deliver { target: 7, .. }));
//! ```

use std::sync::Arc;
use std::time::Duration;

use kurbo::Point;

use crate::types::{Channel, GazeEvent};

/// Work scheduled for the presentation thread.
#[derive(Clone, Debug, PartialEq)]
pub enum PresentationTask<K> {
    /// Deliver `event` to `target`.
    Deliver {
        /// Receiving target.
        target: K,
        /// Channel that produced the event.
        channel: Channel,
        /// The notification itself.
        event: GazeEvent,
    },
    /// Move the OS pointer to a screen position (gaze drives the cursor).
    MoveCursor {
        /// Raw screen position of the sample.
        position: Point,
    },
}

impl<K> PresentationTask<K> {
    /// Execute this task against `sink`.
    pub fn run(self, sink: &mut (impl PresentationSink<K> + ?Sized)) {
        match self {
            Self::Deliver {
                target,
                channel,
                event,
            } => sink.deliver(target, channel, event),
            Self::MoveCursor { position } => sink.move_cursor(position),
        }
    }
}

/// Failure to schedule a task.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    /// The presentation side is gone; the task was dropped.
    #[error("presentation queue is disconnected")]
    Disconnected,
}

/// Schedules tasks on the presentation thread without blocking the caller.
pub trait Presenter<K>: Send + Sync {
    /// Schedule `task`. Must not block.
    fn post(&self, task: PresentationTask<K>) -> Result<(), ScheduleError>;
}

impl<K, P: Presenter<K> + ?Sized> Presenter<K> for Arc<P> {
    fn post(&self, task: PresentationTask<K>) -> Result<(), ScheduleError> {
        (**self).post(task)
    }
}

/// Presentation-thread side that executes tasks.
pub trait PresentationSink<K> {
    /// Deliver an event to a target.
    fn deliver(&mut self, target: K, channel: Channel, event: GazeEvent);

    /// Move the OS pointer. The default ignores the request.
    fn move_cursor(&mut self, position: Point) {
        let _ = position;
    }
}

/// Records every task, in order.
impl<K> PresentationSink<K> for Vec<PresentationTask<K>> {
    fn deliver(&mut self, target: K, channel: Channel, event: GazeEvent) {
        self.push(PresentationTask::Deliver {
            target,
            channel,
            event,
        });
    }

    fn move_cursor(&mut self, position: Point) {
        self.push(PresentationTask::MoveCursor { position });
    }
}

/// Create an unbounded presentation queue.
pub fn channel<K>() -> (PresentationSender<K>, PresentationReceiver<K>) {
    let (tx, rx) = flume::unbounded();
    (PresentationSender { tx }, PresentationReceiver { rx })
}

/// Posting half of a presentation queue; implements [`Presenter`].
#[derive(Debug)]
pub struct PresentationSender<K> {
    tx: flume::Sender<PresentationTask<K>>,
}

impl<K> Clone for PresentationSender<K> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<K: Send> Presenter<K> for PresentationSender<K> {
    fn post(&self, task: PresentationTask<K>) -> Result<(), ScheduleError> {
        self.tx.send(task).map_err(|_| ScheduleError::Disconnected)
    }
}

/// Executing half of a presentation queue, owned by the presentation thread.
#[derive(Debug)]
pub struct PresentationReceiver<K> {
    rx: flume::Receiver<PresentationTask<K>>,
}

impl<K> PresentationReceiver<K> {
    /// Run every task queued so far without blocking. Returns how many ran.
    pub fn run_pending(&self, sink: &mut (impl PresentationSink<K> + ?Sized)) -> usize {
        let mut ran = 0;
        for task in self.rx.try_iter() {
            task.run(sink);
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for a first task, then run everything queued.
    ///
    /// Returns 0 on timeout or when every sender is gone and the queue is empty.
    pub fn run_for(
        &self,
        timeout: Duration,
        sink: &mut (impl PresentationSink<K> + ?Sized),
    ) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task.run(sink);
                1 + self.run_pending(sink)
            }
            Err(_) => 0,
        }
    }

    /// Take the next queued task, if any.
    pub fn try_next(&self) -> Option<PresentationTask<K>> {
        self.rx.try_recv().ok()
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True when no task is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// True once every sender has been dropped.
    pub fn is_disconnected(&self) -> bool {
        self.rx.is_disconnected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GazeEventKind;

    fn deliver(target: u32, kind: GazeEventKind) -> PresentationTask<u32> {
        PresentationTask::Deliver {
            target,
            channel: Channel::Mouse,
            event: GazeEvent {
                kind,
                timestamp: None,
                local: Point::ZERO,
            },
        }
    }

    #[test]
    fn tasks_run_in_posting_order() {
        let (tx, rx) = channel::<u32>();
        tx.post(deliver(1, GazeEventKind::Entered)).unwrap();
        tx.post(PresentationTask::MoveCursor {
            position: Point::new(5.0, 6.0),
        })
        .unwrap();
        tx.post(deliver(1, GazeEventKind::Moved)).unwrap();
        assert_eq!(rx.len(), 3);

        let mut seen = Vec::new();
        assert_eq!(rx.run_pending(&mut seen), 3);
        assert!(rx.is_empty());
        assert_eq!(
            seen,
            vec![
                deliver(1, GazeEventKind::Entered),
                PresentationTask::MoveCursor {
                    position: Point::new(5.0, 6.0)
                },
                deliver(1, GazeEventKind::Moved),
            ]
        );
    }

    #[test]
    fn post_after_receiver_drop_reports_disconnect() {
        let (tx, rx) = channel::<u32>();
        drop(rx);
        assert_eq!(
            tx.post(deliver(2, GazeEventKind::Exited)),
            Err(ScheduleError::Disconnected)
        );
    }

    #[test]
    fn run_for_times_out_on_empty_queue() {
        let (tx, rx) = channel::<u32>();
        let mut seen = Vec::new();
        assert_eq!(rx.run_for(Duration::from_millis(5), &mut seen), 0);
        drop(tx);
        assert!(rx.is_disconnected());
        assert!(rx.try_next().is_none());
    }

    #[test]
    fn cross_thread_delivery() {
        let (tx, rx) = channel::<u32>();
        let producer = std::thread::spawn(move || {
            for i in 0..10 {
                tx.post(deliver(i, GazeEventKind::Moved)).unwrap();
            }
        });
        producer.join().unwrap();
        let mut seen = Vec::new();
        assert_eq!(rx.run_for(Duration::from_secs(1), &mut seen), 10);
        let targets: Vec<u32> = seen
            .iter()
            .filter_map(|t| match t {
                PresentationTask::Deliver { target, .. } => Some(*target),
                PresentationTask::MoveCursor { .. } => None,
            })
            .collect();
        assert_eq!(targets, (0..10).collect::<Vec<_>>());
    }
}
