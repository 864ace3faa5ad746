use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use human_detect_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use human_detect_core::shared::asset_resolver::ProgressFn;

const BAR_TEMPLATE: &str =
    "{spinner} [{elapsed_precise}] {wide_bar} {pos}/{len} frames ({per_sec}, eta {eta})";
const SPINNER_TEMPLATE: &str = "{spinner} [{elapsed_precise}] {pos} frames ({per_sec})";
const DOWNLOAD_TEMPLATE: &str =
    "{msg} {wide_bar} {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})";
const DOWNLOAD_SPINNER_TEMPLATE: &str = "{spinner} {msg} {bytes} ({bytes_per_sec})";

/// Byte progress bar for an asset download, fed by the resolver callback.
///
/// Shows a byte counter while the server has not sent a length.
pub fn download_progress(message: &'static str) -> (ProgressBar, ProgressFn) {
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());

    // Nothing is drawn until the first callback, so a cache hit stays silent.
    let handle = bar.clone();
    let callback: ProgressFn = Box::new(move |downloaded, total| {
        if handle.message().is_empty() {
            let style = ProgressStyle::with_template(DOWNLOAD_SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            handle.set_style(style);
            handle.set_message(message);
        }
        if total > 0 && handle.length() != Some(total) {
            handle.set_length(total);
            let style = ProgressStyle::with_template(DOWNLOAD_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            handle.set_style(style);
        }
        handle.set_position(downloaded);
        if total > 0 && downloaded >= total {
            handle.finish_and_clear();
        }
    });
    (bar, callback)
}

/// Interactive progress bar on stderr.
///
/// Timings and metrics are still aggregated by an inner
/// `StdoutPipelineLogger`, which prints the end-of-run summary.
pub struct IndicatifPipelineLogger {
    bar: Option<ProgressBar>,
    stats: StdoutPipelineLogger,
}

impl IndicatifPipelineLogger {
    pub fn new() -> Self {
        Self {
            bar: None,
            // Only the final frame is logged; the bar shows the rest.
            stats: StdoutPipelineLogger::new(usize::MAX),
        }
    }

    fn bar(&mut self, total: usize) -> &ProgressBar {
        self.bar.get_or_insert_with(|| {
            let (bar, template) = if total > 0 {
                (ProgressBar::new(total as u64), BAR_TEMPLATE)
            } else {
                (ProgressBar::new_spinner(), SPINNER_TEMPLATE)
            };
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar
        })
    }
}

impl Default for IndicatifPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for IndicatifPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.bar(total).set_position(current as u64);
        self.stats.progress(current, total);
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stats.timing(stage, duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.stats.metric(name, value);
    }

    fn info(&mut self, message: &str) {
        match &self.bar {
            Some(bar) => bar.suspend(|| log::info!("{message}")),
            None => log::info!("{message}"),
        }
    }

    fn summary(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
        self.stats.summary();
    }
}
