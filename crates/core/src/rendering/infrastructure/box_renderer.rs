use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::detection::domain::class_labels::ClassLabels;
use crate::detection::domain::detection::{Detection, DetectionResult};
use crate::rendering::domain::frame_renderer::FrameRenderer;
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

use super::palette::class_color;

const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const MIN_LINE_WIDTH: u32 = 2;
const MIN_FONT_PX: f32 = 12.0;

/// Draws detection boxes with `"<name> <confidence>"` labels.
///
/// Without a font only the box outlines are drawn.
pub struct BoxRenderer {
    font: Option<FontVec>,
}

impl BoxRenderer {
    pub fn new(font: Option<FontVec>) -> Self {
        Self { font }
    }

    /// Loads a TrueType/OpenType font for the labels.
    pub fn from_font_file(path: &Path) -> Result<Self, BoxError> {
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| format!("invalid font {}: {e}", path.display()))?;
        Ok(Self::new(Some(font)))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn draw_detection(&self, image: &mut RgbImage, detection: &Detection, labels: &ClassLabels) {
        let (width, height) = image.dimensions();
        let color = class_color(detection.class_id);
        let (x, y, w, h) = detection.bbox.clamp(width, height).to_pixel_rect();

        for i in 0..line_width(width, height) {
            let inset = 2 * i;
            if w <= inset || h <= inset {
                break;
            }
            let rect = Rect::at(x + i as i32, y + i as i32).of_size(w - inset, h - inset);
            draw_hollow_rect_mut(image, rect, color);
        }

        let Some(font) = &self.font else {
            return;
        };
        let label = label_text(detection, labels);
        let scale = PxScale::from(font_size(width, height));
        let (text_w, text_h) = text_size(scale, font, &label);
        let (text_w, text_h) = (text_w.max(1), text_h.max(1));

        // Above the box when it fits, otherwise just inside its top edge.
        let label_y = if y >= text_h as i32 {
            y - text_h as i32
        } else {
            y
        };
        draw_filled_rect_mut(
            image,
            Rect::at(x, label_y).of_size(text_w, text_h),
            color,
        );
        draw_text_mut(image, LABEL_TEXT_COLOR, x, label_y, scale, font, &label);
    }
}

impl FrameRenderer for BoxRenderer {
    fn render(&self, result: &DetectionResult, labels: &ClassLabels) -> Result<Frame, BoxError> {
        let frame = &result.frame;
        let mut image = frame.to_rgb_image().ok_or_else(|| {
            format!(
                "cannot render frame {}: expected 3-channel RGB, got {} channels",
                frame.index(),
                frame.channels()
            )
        })?;

        for detection in &result.detections {
            self.draw_detection(&mut image, detection, labels);
        }

        Ok(Frame::from_rgb_image(image, frame.index()))
    }
}

/// Caption drawn above a box, e.g. `person 0.87`.
pub fn label_text(detection: &Detection, labels: &ClassLabels) -> String {
    format!(
        "{} {:.2}",
        labels.name(detection.class_id),
        detection.confidence
    )
}

/// Box outline thickness for a frame size.
pub fn line_width(width: u32, height: u32) -> u32 {
    let scaled = ((width + height) as f64 / 2.0 * 0.003).round() as u32;
    scaled.max(MIN_LINE_WIDTH)
}

fn font_size(width: u32, height: u32) -> f32 {
    ((width + height) as f32 / 2.0 * 0.035)
        .round()
        .max(MIN_FONT_PX)
}
