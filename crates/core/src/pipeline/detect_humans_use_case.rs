use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::detection::domain::class_filter::ClassFilter;
use crate::detection::domain::object_detector::{DetectorLoader, ObjectDetector};
use crate::detection::infrastructure::detection_stream::detect;
use crate::rendering::domain::frame_renderer::FrameRenderer;
use crate::shared::error::DetectHumansError;
use crate::shared::output_format::validate_output_path;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::pipeline_logger::PipelineLogger;

/// Input and output paths of one detection run.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl DetectionRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Runs the whole detect, render and write pipeline for one video.
///
/// Single-use: `execute` consumes the owned components, so a second call
/// fails with `AlreadyExecuted`. The model is loaded only after the request
/// has been validated and the input probed, and the writer is closed on
/// every path once it has been opened.
pub struct DetectHumansUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    loader: Option<Box<dyn DetectorLoader>>,
    renderer: Option<Box<dyn FrameRenderer>>,
    logger: Box<dyn PipelineLogger>,
    filter: ClassFilter,
}

impl DetectHumansUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        loader: Box<dyn DetectorLoader>,
        renderer: Box<dyn FrameRenderer>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            loader: Some(loader),
            renderer: Some(renderer),
            logger,
            filter: ClassFilter::person(),
        }
    }

    /// Annotates `request.input` and returns the written output path.
    pub fn execute(&mut self, request: &DetectionRequest) -> Result<PathBuf, DetectHumansError> {
        let (Some(mut reader), Some(mut writer), Some(loader), Some(renderer)) = (
            self.reader.take(),
            self.writer.take(),
            self.loader.take(),
            self.renderer.take(),
        ) else {
            return Err(DetectHumansError::AlreadyExecuted);
        };

        validate_request(request)?;

        let metadata = match reader.open(&request.input) {
            Ok(metadata) => metadata,
            Err(source) => {
                reader.close();
                return Err(DetectHumansError::Open {
                    path: request.input.clone(),
                    source,
                });
            }
        };
        log::info!(
            "Probed {}: {}x{} @ {:.2} fps, {} frames, codec {}",
            request.input.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            metadata.source_codec
        );

        let outcome = self.run(
            reader.as_mut(),
            writer.as_mut(),
            loader.as_ref(),
            renderer.as_ref(),
            &metadata,
            &request.output,
        );
        reader.close();
        self.logger.summary();

        outcome.map(|()| request.output.clone())
    }

    fn run(
        &mut self,
        reader: &mut dyn VideoReader,
        writer: &mut dyn VideoWriter,
        loader: &dyn DetectorLoader,
        renderer: &dyn FrameRenderer,
        metadata: &VideoMetadata,
        output: &Path,
    ) -> Result<(), DetectHumansError> {
        let mut detector = loader
            .load()
            .map_err(|source| DetectHumansError::ModelLoad {
                path: loader.model_path().to_path_buf(),
                source,
            })?;
        self.logger
            .info(&format!("Loaded model {}", loader.model_path().display()));

        writer
            .open(output, metadata)
            .map_err(|source| DetectHumansError::Write {
                path: output.to_path_buf(),
                source,
            })?;

        let streamed = self.stream(reader, writer, detector.as_mut(), renderer, metadata, output);
        let closed = writer.close().map_err(|source| DetectHumansError::Write {
            path: output.to_path_buf(),
            source,
        });

        if let Err(e) = &closed {
            if streamed.is_err() {
                log::warn!("Closing output after failure also failed: {e}");
            }
        }
        streamed?;
        closed
    }

    fn stream(
        &mut self,
        reader: &mut dyn VideoReader,
        writer: &mut dyn VideoWriter,
        detector: &mut dyn ObjectDetector,
        renderer: &dyn FrameRenderer,
        metadata: &VideoMetadata,
        output: &Path,
    ) -> Result<(), DetectHumansError> {
        let labels = detector.labels().clone();
        let total = metadata.total_frames;
        let mut results = detect(reader, detector, self.filter.clone());
        let mut written = 0;

        loop {
            let started = Instant::now();
            let Some(result) = results.next() else {
                break;
            };
            let result = result?;
            self.logger.timing("detect", elapsed_ms(started));
            self.logger
                .metric("persons", result.detections.len() as f64);

            let started = Instant::now();
            let annotated =
                renderer
                    .render(&result, &labels)
                    .map_err(|source| DetectHumansError::Frame {
                        index: result.frame_index(),
                        source,
                    })?;
            self.logger.timing("render", elapsed_ms(started));

            let started = Instant::now();
            writer
                .write(&annotated)
                .map_err(|source| DetectHumansError::Write {
                    path: output.to_path_buf(),
                    source,
                })?;
            self.logger.timing("write", elapsed_ms(started));

            written += 1;
            self.logger.progress(written, total);
        }

        if written != total {
            log::warn!("Wrote {written} frames, probe reported {total}");
        }
        log::debug!("Finished {written} frames into {}", output.display());
        Ok(())
    }
}

/// Checks the request before any decoding or model work.
fn validate_request(request: &DetectionRequest) -> Result<(), DetectHumansError> {
    if !request.input.exists() {
        return Err(DetectHumansError::InputNotFound {
            path: request.input.clone(),
        });
    }
    validate_output_path(&request.output)
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
