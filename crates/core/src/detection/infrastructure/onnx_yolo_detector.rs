//! YOLO object detector using ONNX Runtime via `ort`.
//!
//! Handles letterbox preprocessing, inference, class filtering and
//! class-aware NMS for Ultralytics detection exports (YOLOv8 / YOLO11).

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use ort::session::builder::GraphOptimizationLevel;

use crate::detection::domain::class_filter::ClassFilter;
use crate::detection::domain::class_labels::ClassLabels;
use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::{DetectorLoader, ObjectDetector};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

use super::execution_provider::{platform_execution_providers, platform_provider_name};

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold (Ultralytics `conf`).
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// NMS IoU threshold (Ultralytics `iou`).
const NMS_IOU_THRESH: f64 = 0.7;

/// Upper bound on detections kept per frame after NMS.
const MAX_DETECTIONS: usize = 300;

/// Number of leading box values per candidate row: cx, cy, w, h.
const BOX_VALUES: usize = 4;

/// YOLO detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    labels: ClassLabels,
    filter: ClassFilter,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable. When the
    /// model carries an Ultralytics label map it must agree with `filter`.
    pub fn new(
        model_path: &Path,
        filter: ClassFilter,
        confidence: f64,
        intra_threads: Option<usize>,
    ) -> Result<Self, BoxError> {
        let mut builder = ort::session::Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_execution_providers(platform_execution_providers())?;
        if let Some(threads) = intra_threads {
            builder = builder.with_intra_threads(threads)?;
        }
        let session = builder.commit_from_file(model_path)?;

        // Try to read input size from model metadata (NCHW: [1, 3, H, W])
        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        let labels = session
            .metadata()
            .ok()
            .and_then(|meta| meta.custom("names").ok().flatten())
            .and_then(|raw| ClassLabels::from_model_metadata(&raw));

        let labels = match labels {
            Some(labels) => {
                labels.validate(&filter)?;
                labels
            }
            None => {
                log::warn!(
                    "{} has no label map; assuming COCO class order",
                    model_path.display()
                );
                ClassLabels::coco()
            }
        };

        log::info!(
            "Loaded {} ({} classes, {}px input, {} provider)",
            model_path.display(),
            labels.len(),
            input_size,
            platform_provider_name()
        );

        Ok(Self {
            session,
            labels,
            filter,
            confidence,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, BoxError> {
        let (input_tensor, transform) = letterbox(frame, self.input_size)?;

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let data = tensor
            .as_slice()
            .ok_or("YOLO output tensor is not contiguous")?;

        let candidates = decode_output(
            data,
            tensor.shape(),
            &transform,
            &self.filter,
            self.confidence,
            (frame.width(), frame.height()),
        )?;

        let mut kept = nms(candidates, NMS_IOU_THRESH);
        kept.truncate(MAX_DETECTIONS);
        Ok(kept)
    }

    fn labels(&self) -> &ClassLabels {
        &self.labels
    }
}

/// Loads [`OnnxYoloDetector`] from a weights file when a run asks for it.
pub struct OnnxYoloLoader {
    model_path: PathBuf,
    filter: ClassFilter,
    confidence: f64,
    intra_threads: Option<usize>,
}

impl OnnxYoloLoader {
    pub fn new(model_path: impl Into<PathBuf>, filter: ClassFilter) -> Self {
        Self {
            model_path: model_path.into(),
            filter,
            confidence: DEFAULT_CONFIDENCE,
            intra_threads: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }
}

impl DetectorLoader for OnnxYoloLoader {
    fn load(&self) -> Result<Box<dyn ObjectDetector>, BoxError> {
        if !self.model_path.is_file() {
            return Err(format!("model file not found: {}", self.model_path.display()).into());
        }
        Ok(Box::new(OnnxYoloDetector::new(
            &self.model_path,
            self.filter.clone(),
            self.confidence,
            self.intra_threads,
        )?))
    }

    fn model_path(&self) -> &Path {
        &self.model_path
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Maps letterboxed model coordinates back to source-frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LetterboxTransform {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl LetterboxTransform {
    fn to_source(&self, bbox: BoundingBox) -> BoundingBox {
        let px = self.pad_x as f64;
        let py = self.pad_y as f64;
        BoundingBox::new(
            (bbox.x1 - px) / self.scale,
            (bbox.y1 - py) / self.scale,
            (bbox.x2 - px) / self.scale,
            (bbox.y2 - py) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Resizing is bilinear, matching Ultralytics preprocessing. Returns the
/// NCHW float32 tensor and the transform back to the frame.
fn letterbox(
    frame: &Frame,
    target_size: u32,
) -> Result<(ndarray::Array4<f32>, LetterboxTransform), BoxError> {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).clamp(1, target_size);
    let new_h = ((fh * scale).round() as u32).clamp(1, target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let source = frame.to_rgb_image().ok_or_else(|| {
        format!(
            "frame {} is not {}x{} RGB",
            frame.index(),
            frame.width(),
            frame.height()
        )
    })?;
    let resized = Frame::from_rgb_image(
        image::imageops::resize(&source, new_w, new_h, FilterType::Triangle),
        frame.index(),
    );
    let src = resized.as_ndarray()?; // [H, W, C] u8

    // Padded with 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);
    let (px, py) = (pad_x as usize, pad_y as usize);
    for ((y, x, c), &value) in src.indexed_iter() {
        tensor[[0, c, py + y, px + x]] = value as f32 / 255.0;
    }

    Ok((
        tensor,
        LetterboxTransform {
            scale,
            pad_x,
            pad_y,
        },
    ))
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Decodes a raw YOLO detection tensor into frame-space detections.
///
/// Accepts `[1, 4 + nc, N]` (Ultralytics default) and `[1, N, 4 + nc]`.
/// Each candidate takes its best-scoring class; candidates below
/// `confidence` or outside `filter` are dropped here, before NMS.
fn decode_output(
    data: &[f32],
    shape: &[usize],
    transform: &LetterboxTransform,
    filter: &ClassFilter,
    confidence: f64,
    frame_size: (u32, u32),
) -> Result<Vec<Detection>, BoxError> {
    if shape.len() != 3 || shape[0] != 1 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }

    // Fewer features than candidates means the features are on axis 1
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats <= BOX_VALUES {
        return Err(format!("YOLO output has no class scores: {shape:?}").into());
    }
    if data.len() < num_dets * num_feats {
        return Err("YOLO output is shorter than its shape".into());
    }

    let value = |det: usize, feat: usize| -> f32 {
        if transposed {
            data[feat * num_dets + det]
        } else {
            data[det * num_feats + feat]
        }
    };

    let mut detections = Vec::new();
    for i in 0..num_dets {
        let (class_id, score) = (BOX_VALUES..num_feats)
            .map(|f| (f - BOX_VALUES, value(i, f)))
            .fold((0, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });

        let score = score as f64;
        if score < confidence || !filter.accepts(class_id) {
            continue;
        }

        let letterboxed = BoundingBox::from_center(
            value(i, 0) as f64,
            value(i, 1) as f64,
            value(i, 2) as f64,
            value(i, 3) as f64,
        );
        let bbox = transform
            .to_source(letterboxed)
            .clamp(frame_size.0, frame_size.1);

        detections.push(Detection {
            class_id,
            confidence: score,
            bbox,
        });
    }
    Ok(detections)
}

/// Greedy class-aware NMS: sort by confidence descending and suppress
/// same-class boxes that overlap a kept one.
fn nms(mut dets: Vec<Detection>, iou_thresh: f64) -> Vec<Detection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    for det in dets {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == det.class_id && k.bbox.iou(&det.bbox) > iou_thresh);
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
