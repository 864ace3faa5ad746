use std::path::PathBuf;

use thiserror::Error;

/// Adapter-level error type, shared by every port in the crate.
pub type BoxError = Box<dyn std::error::Error>;

/// Failures surfaced by a detection run.
///
/// Every variant is fatal; the run never resumes after one of these.
#[derive(Error, Debug)]
pub enum DetectHumansError {
    #[error("input video not found: {}", .path.display())]
    InputNotFound { path: PathBuf },
    #[error("output file must have .{expected} extension: {}", .path.display())]
    UnsupportedOutputFormat {
        path: PathBuf,
        expected: &'static str,
    },
    #[error("cannot open video file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("failed to load model {}: {source}", .path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("processing failed at frame {index}: {source}")]
    Frame {
        index: usize,
        #[source]
        source: BoxError,
    },
    #[error("failed to write output video {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("pipeline already executed")]
    AlreadyExecuted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages_name_the_path() {
        let err = DetectHumansError::InputNotFound {
            path: PathBuf::from("missing.mp4"),
        };
        assert_eq!(err.to_string(), "input video not found: missing.mp4");

        let err = DetectHumansError::UnsupportedOutputFormat {
            path: PathBuf::from("out.mp4"),
            expected: "avi",
        };
        assert_eq!(
            err.to_string(),
            "output file must have .avi extension: out.mp4"
        );
    }

    #[test]
    fn test_source_is_preserved() {
        let err = DetectHumansError::Open {
            path: PathBuf::from("broken.avi"),
            source: "Invalid data found when processing input".into(),
        };
        assert!(err.to_string().contains("broken.avi"));
        assert_eq!(
            err.source().unwrap().to_string(),
            "Invalid data found when processing input"
        );
    }
}
