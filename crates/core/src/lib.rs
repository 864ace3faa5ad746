//! Person detection and video annotation.
//!
//! Decodes a video with FFmpeg, runs a YOLO ONNX model over every frame,
//! keeps person detections, draws labelled boxes and re-encodes the result
//! into an AVI file.

pub mod shared {
    pub mod asset_resolver;
    pub mod bounding_box;
    pub mod constants;
    pub mod error;
    pub mod frame;
    pub mod output_format;
    pub mod video_metadata;
}

pub mod video {
    pub mod domain {
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure {
        mod codec_status;
        pub mod ffmpeg_reader;
        pub mod ffmpeg_writer;
        #[cfg(test)]
        pub(crate) mod test_video;
    }
}

pub mod detection {
    pub mod domain {
        pub mod class_filter;
        pub mod class_labels;
        pub mod detection;
        pub mod object_detector;
    }
    pub mod infrastructure;
}

pub mod rendering {
    pub mod domain {
        pub mod frame_renderer;
    }
    pub mod infrastructure {
        pub mod box_renderer;
        pub mod palette;
    }
}

pub mod pipeline {
    pub mod detect_humans_use_case;
    pub mod pipeline_logger;
}
