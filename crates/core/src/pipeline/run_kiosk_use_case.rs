use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::frame_clock::FrameClock;
use crate::pipeline::infrastructure::threaded_frame_source::{
    ThreadedFrameSource, DEFAULT_PREFETCH, LIVE_PREFETCH,
};
use crate::pipeline::kiosk_engine::KioskEngine;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::recognition::domain::gallery_store::GalleryStore;
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::video_reader::VideoReader;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub detection_cycles: usize,
    pub identities_seen: usize,
    pub registrations_committed: usize,
}

/// Runs the kiosk over an opened frame source until it ends, the
/// `cancelled` flag is raised, or `max_frames` is reached.
///
/// Collaborators are built once by the caller and live for the whole run.
/// Single-use: `execute` consumes the reader.
///
/// With a live clock only the newest decoded frame is processed; frames
/// that queued up behind a slow cycle are skipped.
pub struct RunKioskUseCase {
    reader: Option<Box<dyn VideoReader>>,
    detector: Box<dyn FaceDetector>,
    gallery: Box<dyn GalleryStore>,
    engine: KioskEngine,
    renderer: Box<dyn OverlayRenderer>,
    sink: Box<dyn FrameSink>,
    logger: Box<dyn PipelineLogger>,
    clock: FrameClock,
    total_frames: usize,
    max_frames: Option<usize>,
    on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    cancelled: Arc<AtomicBool>,
}

impl RunKioskUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: Box<dyn VideoReader>,
        detector: Box<dyn FaceDetector>,
        gallery: Box<dyn GalleryStore>,
        engine: KioskEngine,
        renderer: Box<dyn OverlayRenderer>,
        sink: Box<dyn FrameSink>,
        logger: Box<dyn PipelineLogger>,
        clock: FrameClock,
        total_frames: usize,
        max_frames: Option<usize>,
        on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            reader: Some(reader),
            detector,
            gallery,
            engine,
            renderer,
            sink,
            logger,
            clock,
            total_frames,
            max_frames,
            on_progress,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn execute(&mut self) -> Result<RunSummary, Box<dyn std::error::Error>> {
        let reader = self.reader.take().ok_or("Kiosk already ran")?;
        let prefetch = if self.clock.is_live() {
            LIVE_PREFETCH
        } else {
            DEFAULT_PREFETCH
        };
        let mut source = ThreadedFrameSource::spawn(reader, prefetch, self.cancelled.clone());

        let outcome = self.run_loop(&mut source);
        let joined = source.finish();
        let flushed = self.sink.finish();

        let frames = outcome?;
        joined?;
        flushed?;

        self.logger.summary();
        Ok(RunSummary {
            frames,
            detection_cycles: self.engine.detection_cycles(),
            identities_seen: self.engine.identities_seen(),
            registrations_committed: self.engine.registrations_committed(),
        })
    }

    fn run_loop(
        &mut self,
        source: &mut ThreadedFrameSource,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let mut frames = 0;
        let mut headline: Option<&'static str> = None;
        let live = self.clock.is_live();

        loop {
            let next = if live {
                source.next_latest()
            } else {
                source.next()
            };
            let Some(frame_result) = next else {
                break;
            };
            if self.cancelled.load(Ordering::Relaxed) {
                self.logger.info("Stop requested");
                break;
            }
            if self.max_frames.is_some_and(|max| frames >= max) {
                break;
            }
            let mut frame = frame_result?;
            self.logger.metric("reader_queue_depth", source.queue_depth() as f64);
            if live {
                self.logger.metric("dropped_frames", source.dropped() as f64);
            }

            let now = self.clock.now(&frame);
            let cycle =
                self.engine
                    .process_frame(&frame, now, &mut *self.detector, &mut *self.gallery);

            if cycle.view.detection_ran {
                self.logger.timing("detect", cycle.detect_ms);
                self.logger.timing("match", cycle.match_ms);
                self.logger.metric("detections", cycle.detections as f64);
            }
            self.logger.timing("track", cycle.track_ms);
            self.logger
                .metric("tracked_faces", cycle.view.faces.len() as f64);
            for identity in &cycle.committed {
                self.logger.commit(*identity);
            }

            let message = cycle.view.headline();
            if headline != Some(message) {
                self.logger.info(message);
                headline = Some(message);
            }

            let t0 = Instant::now();
            self.renderer.render(&mut frame, &cycle.view)?;
            self.logger
                .timing("render", t0.elapsed().as_secs_f64() * 1000.0);

            let t0 = Instant::now();
            self.sink.write(&frame)?;
            self.logger
                .timing("sink", t0.elapsed().as_secs_f64() * 1000.0);

            frames += 1;
            self.logger.progress(frames, self.total_frames);
            if let Some(ref callback) = self.on_progress {
                if !callback(frames, self.total_frames) {
                    self.logger.info("Stopped by progress callback");
                    break;
                }
            }
        }

        Ok(frames)
    }
}
