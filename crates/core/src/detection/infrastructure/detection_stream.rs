use crate::detection::domain::class_filter::ClassFilter;
use crate::detection::domain::detection::DetectionResult;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::error::{BoxError, DetectHumansError};
use crate::shared::frame::Frame;
use crate::video::domain::video_reader::VideoReader;

/// Runs `detector` over every frame of an opened `reader`.
///
/// The returned stream is lazy: one frame is decoded and detected per
/// `next()` call.
pub fn detect<'a>(
    reader: &'a mut dyn VideoReader,
    detector: &'a mut dyn ObjectDetector,
    filter: ClassFilter,
) -> DetectionStream<'a> {
    DetectionStream {
        frames: reader.frames(),
        detector,
        filter,
        next_index: 0,
        finished: false,
    }
}

/// Finite, non-restartable sequence of per-frame detection results in
/// source order.
///
/// Yields `None` once the video is exhausted. A decode or inference error
/// is yielded once, after which the stream is finished.
pub struct DetectionStream<'a> {
    frames: Box<dyn Iterator<Item = Result<Frame, BoxError>> + 'a>,
    detector: &'a mut dyn ObjectDetector,
    filter: ClassFilter,
    next_index: usize,
    finished: bool,
}

impl DetectionStream<'_> {
    /// Whether the end of the sequence (or an error) has been reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn fail(&mut self, index: usize, source: BoxError) -> DetectHumansError {
        self.finished = true;
        DetectHumansError::Frame { index, source }
    }
}

impl Iterator for DetectionStream<'_> {
    type Item = Result<DetectionResult, DetectHumansError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let frame = match self.frames.next() {
            None => {
                self.finished = true;
                return None;
            }
            Some(Err(e)) => return Some(Err(self.fail(self.next_index, e))),
            Some(Ok(frame)) => frame,
        };
        self.next_index = frame.index() + 1;

        match self.detector.detect(&frame) {
            Ok(mut detections) => {
                self.filter.retain(&mut detections);
                Some(Ok(DetectionResult::new(frame, detections)))
            }
            Err(e) => Some(Err(self.fail(frame.index(), e))),
        }
    }
}

impl std::iter::FusedIterator for DetectionStream<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::class_labels::ClassLabels;
    use crate::detection::domain::detection::Detection;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::video_metadata::VideoMetadata;
    use std::path::Path;

    struct StubReader {
        frames: Vec<Result<Frame, BoxError>>,
    }

    impl StubReader {
        fn with_frames(count: usize) -> Self {
            Self {
                frames: (0..count).map(|i| Ok(frame(i))).collect(),
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, BoxError> {
            Err("not used".into())
        }

        fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, BoxError>> + '_> {
            Box::new(self.frames.drain(..))
        }

        fn close(&mut self) {}
    }

    /// Reports a person and a car on every frame; fails on `fail_at`.
    struct MixedDetector {
        labels: ClassLabels,
        fail_at: Option<usize>,
    }

    impl MixedDetector {
        fn new(fail_at: Option<usize>) -> Self {
            Self {
                labels: ClassLabels::coco(),
                fail_at,
            }
        }
    }

    impl ObjectDetector for MixedDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, BoxError> {
            if self.fail_at == Some(frame.index()) {
                return Err("inference failed".into());
            }
            let bbox = BoundingBox::new(1.0, 1.0, 4.0, 4.0);
            Ok(vec![
                Detection {
                    class_id: 2,
                    confidence: 0.9,
                    bbox,
                },
                Detection {
                    class_id: 0,
                    confidence: 0.8,
                    bbox,
                },
            ])
        }

        fn labels(&self) -> &ClassLabels {
            &self.labels
        }
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 8 * 8 * 3], 8, 8, 3, index)
    }

    #[test]
    fn test_one_result_per_frame_in_order() {
        let mut reader = StubReader::with_frames(10);
        let mut detector = MixedDetector::new(None);

        let results: Vec<_> = detect(&mut reader, &mut detector, ClassFilter::person())
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(results.len(), 10);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.frame_index(), i);
        }
    }

    #[test]
    fn test_only_target_classes_are_yielded() {
        let mut reader = StubReader::with_frames(3);
        let mut detector = MixedDetector::new(None);

        for result in detect(&mut reader, &mut detector, ClassFilter::person()) {
            let result = result.unwrap();
            assert_eq!(result.detections.len(), 1);
            assert!(result.detections.iter().all(|d| d.class_id == 0));
        }
    }

    #[test]
    fn test_detector_error_ends_stream() {
        let mut reader = StubReader::with_frames(5);
        let mut detector = MixedDetector::new(Some(2));

        let mut stream = detect(&mut reader, &mut detector, ClassFilter::person());
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_ok());
        match stream.next() {
            Some(Err(DetectHumansError::Frame { index, .. })) => assert_eq!(index, 2),
            other => panic!("expected frame error, got {other:?}"),
        }
        assert!(stream.is_finished());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_decode_error_reports_next_index() {
        let mut reader = StubReader {
            frames: vec![Ok(frame(0)), Err("corrupt packet".into()), Ok(frame(2))],
        };
        let mut detector = MixedDetector::new(None);

        let items: Vec<_> = detect(&mut reader, &mut detector, ClassFilter::person()).collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[1],
            Err(DetectHumansError::Frame { index: 1, .. })
        ));
    }

    #[test]
    fn test_empty_video_ends_immediately() {
        let mut reader = StubReader::with_frames(0);
        let mut detector = MixedDetector::new(None);

        let mut stream = detect(&mut reader, &mut detector, ClassFilter::person());
        assert!(stream.next().is_none());
        assert!(stream.is_finished());
    }
}
