//! Frame queue between the sampler and stitching threads.
//!
//! Single producer, single consumer, strict FIFO: frames are always stitched
//! in capture order even when capture order differs from raster order. The
//! capacity bound and overflow policy come from [`QueueConfig`]; the default
//! is an unbounded channel where a push never blocks.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded, unbounded};
use std::time::Duration;

use crate::config::{OverflowPolicy, QueueConfig};
use crate::core::types::Frame;

/// Create the producer and consumer ends of the frame queue.
pub fn frame_channel(config: &QueueConfig) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = match config.capacity {
        Some(capacity) => bounded(capacity),
        None => unbounded(),
    };
    let sender = FrameSender {
        tx,
        drain: rx.clone(),
        policy: config.policy,
        bounded: config.capacity.is_some(),
    };
    (sender, FrameReceiver { rx })
}

/// Producer end, held by the sampler thread.
pub struct FrameSender {
    tx: Sender<Frame>,
    // Second receiver handle onto the same channel, used to discard the head
    // under the drop-oldest policy.
    drain: Receiver<Frame>,
    policy: OverflowPolicy,
    bounded: bool,
}

impl FrameSender {
    /// Enqueue a captured frame.
    ///
    /// Unbounded queue: never blocks. Bounded queue: blocks until space under
    /// [`OverflowPolicy::Block`]; under [`OverflowPolicy::DropOldest`] the
    /// oldest unprocessed frame is discarded instead and the push returns
    /// immediately.
    pub fn push(&self, frame: Frame) {
        if !self.bounded || self.policy == OverflowPolicy::Block {
            // send only fails when the consumer is gone, which means shutdown
            self.tx.send(frame).ok();
            return;
        }

        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if self.drain.try_recv().is_ok() {
                        log::warn!("frame queue full, dropping oldest unprocessed frame");
                    }
                    frame = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Consumer end, held by the stitching thread.
pub struct FrameReceiver {
    rx: Receiver<Frame>,
}

impl FrameReceiver {
    /// Block for the next frame, up to `timeout`.
    ///
    /// The timeout exists so the consumer loop can honor its shutdown flag.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Frame, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
