use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;

use crate::shared::frame::Frame;
use crate::video::domain::video_reader::VideoReader;

pub const DEFAULT_PREFETCH: usize = 8;
/// Queue depth for live cameras, where a backlog only adds latency.
pub const LIVE_PREFETCH: usize = 1;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Decodes frames on a dedicated thread and hands them over through a
/// bounded channel, so decoding overlaps the kiosk cycle.
///
/// The kiosk cycle itself stays on the consuming thread.
pub struct ThreadedFrameSource {
    rx: Receiver<Result<Frame, SendError>>,
    handle: JoinHandle<()>,
    dropped: usize,
}

impl ThreadedFrameSource {
    pub fn spawn(
        mut reader: Box<dyn VideoReader>,
        capacity: usize,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<Result<Frame, SendError>>(capacity.max(1));
        let handle = std::thread::spawn(move || {
            for frame_result in reader.frames() {
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }
                let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
                if tx.send(mapped).is_err() {
                    break;
                }
            }
            reader.close();
        });
        Self {
            rx,
            handle,
            dropped: 0,
        }
    }

    /// Frames decoded but not yet consumed.
    pub fn queue_depth(&self) -> usize {
        self.rx.len()
    }

    /// Frames skipped by [`next_latest`](Self::next_latest) so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Blocks for a frame, then discards everything older than the newest
    /// queued one. A queued error is returned as soon as it is seen.
    pub fn next_latest(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut latest = self.rx.recv().ok()?;
        while latest.is_ok() {
            match self.rx.try_recv() {
                Ok(newer) => {
                    self.dropped += 1;
                    latest = newer;
                }
                Err(_) => break,
            }
        }
        Some(latest.map_err(|e| -> Box<dyn std::error::Error> { e.to_string().into() }))
    }

    /// Stops the reader thread (if still running) and waits for it.
    pub fn finish(self) -> Result<(), Box<dyn std::error::Error>> {
        let Self { rx, handle, .. } = self;
        // A blocked send fails once the receiver is gone.
        drop(rx);
        handle.join().map_err(|_| "Reader thread panicked".into())
    }
}

impl Iterator for ThreadedFrameSource {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        let received = self.rx.recv().ok()?;
        Some(received.map_err(|e| -> Box<dyn std::error::Error> { e.to_string().into() }))
    }
}
