use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for detection run events.
///
/// The use case reports progress, per-frame stage timings and metrics here;
/// the CLI decides how they are shown.
pub trait PipelineLogger: Send {
    /// Report that `current` of `total` frames have been written.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a per-frame metric (e.g. persons detected).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Count, sum and peak of a recorded series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub total: f64,
    pub max: f64,
}

impl SeriesStats {
    fn record(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Log-based reporter for non-interactive runs.
///
/// Progress lines go through `log::info!` every `throttle_frames` frames;
/// timings and metrics are aggregated into a summary at the end of the run.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, SeriesStats>,
    metrics: BTreeMap<String, SeriesStats>,
    start_time: Instant,
    frames_done: usize,
    total_frames: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_done: 0,
            total_frames: 0,
        }
    }

    /// Progress line for `current` of `total`, if this frame should be
    /// reported.
    fn progress_line(&self, current: usize, total: usize) -> Option<String> {
        if total > 0 && (current % self.throttle_frames == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            Some(format!("Processing: {current}/{total} frames ({pct:.1}%)"))
        } else if total == 0 && current % self.throttle_frames == 0 {
            Some(format!("Processing: {current} frames"))
        } else {
            None
        }
    }

    /// Formatted end-of-run report, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let elapsed_ms = elapsed_s * 1000.0;
        let mut lines = vec![format!(
            "Run summary ({}/{} frames, {elapsed_s:.1}s):",
            self.frames_done, self.total_frames
        )];

        for (stage, stats) in &self.timings {
            let pct = if elapsed_ms > 0.0 {
                stats.total / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms  ({pct:4.1}%)",
                stats.mean(),
                stats.max,
                stats.total
            ));
        }

        for (name, stats) in &self.metrics {
            lines.push(format!(
                "  {name}: avg {:.1}  max {:.0}  total {:.0}",
                stats.mean(),
                stats.max,
                stats.total
            ));
        }

        if self.frames_done > 0 && elapsed_s > 0.0 {
            let fps = self.frames_done as f64 / elapsed_s;
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<SeriesStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<SeriesStats> {
        self.metrics.get(name).copied()
    }

    pub fn frames_done(&self) -> usize {
        self.frames_done
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_done = current;
        self.total_frames = total;
        if let Some(line) = self.progress_line(current, total) {
            log::info!("{line}");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
