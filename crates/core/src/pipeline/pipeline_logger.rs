use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting observer for kiosk run events.
///
/// Keeps the run loop free of any particular output mechanism; the binary
/// reports through the `log` crate, tests discard everything.
pub trait PipelineLogger: Send {
    /// Report frame-level progress. `total` is 0 for live sources.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. tracked faces, detections).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// A registration was written to the gallery.
    fn commit(&mut self, _identity: u32) {}

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Count, sum and peak of a stream of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl RunningStat {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.count.max(1) as f64
    }
}

/// CLI logger: per-stage timings, metric averages and a commit count,
/// summarised when the run ends.
///
/// Samples are folded into a [`RunningStat`] per name, so memory stays flat
/// however long the kiosk runs. Progress is reported every
/// `throttle_frames` frames.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, RunningStat>,
    metrics: HashMap<String, RunningStat>,
    start_time: Instant,
    frames_seen: usize,
    commits: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
            commits: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() && self.commits == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames_seen;
        let mut lines = vec![format!(
            "Kiosk summary ({frames} frames, {:.1}s, {} registrations):",
            elapsed_ms / 1000.0,
            self.commits
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stat = &self.timings[stage];
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  total {:7.0}ms  ({} samples)",
                stat.mean(),
                stat.sum,
                stat.count
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let stat = &self.metrics[name];
            lines.push(format!("  {name}: avg {:.1}  max {:.0}", stat.mean(), stat.max));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&RunningStat> {
        self.timings.get(stage)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&RunningStat> {
        self.metrics.get(name)
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(300)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = current;
        if current % self.throttle_frames != 0 && current != total {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processed {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Processed {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        match self.timings.get_mut(stage) {
            Some(stat) => stat.record(duration_ms),
            None => {
                let mut stat = RunningStat::default();
                stat.record(duration_ms);
                self.timings.insert(stage.to_string(), stat);
            }
        }
    }

    fn metric(&mut self, name: &str, value: f64) {
        match self.metrics.get_mut(name) {
            Some(stat) => stat.record(value),
            None => {
                let mut stat = RunningStat::default();
                stat.record(value);
                self.metrics.insert(name.to_string(), stat);
            }
        }
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn commit(&mut self, _identity: u32) {
        self.commits += 1;
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("detect", 5.0);
        logger.metric("tracked_faces", 3.0);
        logger.info("hello");
        logger.commit(1);
        logger.summary();
    }

    #[test]
    fn test_timing_records_values_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("render", 5.0);

        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.sum, 50.0);
        assert_relative_eq!(detect.max, 30.0);
        assert_eq!(logger.timings_for("render").unwrap().count, 1);
        assert!(logger.timings_for("sink").is_none());
    }

    #[test]
    fn test_summary_lists_stages_metrics_and_commits() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(10, 0);
        logger.timing("detect", 20.0);
        logger.timing("track", 1.0);
        logger.metric("tracked_faces", 1.0);
        logger.metric("tracked_faces", 2.0);
        logger.commit(4);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Kiosk summary (10 frames"));
        assert!(summary.contains("1 registrations"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("track"));
        assert!(summary.contains("tracked_faces: avg 1.5  max 2"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_metric_average() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("detections", 3.0);
        logger.metric("detections", 4.0);

        assert_relative_eq!(logger.metrics_for("detections").unwrap().mean(), 3.5);
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_commit_counts() {
        let mut logger = StdoutPipelineLogger::default();
        logger.commit(1);
        logger.commit(2);
        assert_eq!(logger.commits(), 2);
    }

    #[test]
    fn test_progress_tracks_frames_for_live_sources() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 1..=25 {
            logger.progress(i, 0);
        }
        assert_eq!(logger.frames_seen, 25);
    }

    #[test]
    fn test_hour_of_samples_keeps_one_entry_per_name() {
        let mut logger = StdoutPipelineLogger::new(300);
        // One hour at 30 fps.
        for i in 0..108_000 {
            logger.timing("track", 2.0);
            logger.timing("render", if i == 500 { 40.0 } else { 1.0 });
            logger.metric("tracked_faces", (i % 3) as f64);
            logger.info("Registering... Please remain still");
            logger.progress(i + 1, 0);
        }

        assert_eq!(logger.timings.len(), 2);
        assert_eq!(logger.metrics.len(), 1);

        let track = logger.timings_for("track").unwrap();
        assert_eq!(track.count, 108_000);
        assert_relative_eq!(track.mean(), 2.0);
        assert_relative_eq!(logger.timings_for("render").unwrap().max, 40.0);
        let faces = logger.metrics_for("tracked_faces").unwrap();
        assert_relative_eq!(faces.mean(), 1.0);
        assert_relative_eq!(faces.max, 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("108000 frames"));
        assert!(summary.contains("(108000 samples)"));
        assert!(summary.contains("tracked_faces: avg 1.0  max 2"));
    }

    #[test]
    fn test_running_stat_max_of_negative_samples() {
        let mut stat = RunningStat::default();
        stat.record(-3.0);
        stat.record(-1.0);
        assert_relative_eq!(stat.max, -1.0);
        assert_relative_eq!(stat.mean(), -2.0);
    }

    #[test]
    fn test_running_stat_empty_mean_is_zero() {
        assert_relative_eq!(RunningStat::default().mean(), 0.0);
    }

    #[test]
    fn test_default_throttle() {
        assert_eq!(StdoutPipelineLogger::default().throttle_frames, 300);
    }
}
