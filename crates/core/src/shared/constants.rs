pub const DEFAULT_MODEL_PATH: &str = "yolo11n.onnx";
pub const DEFAULT_OUTPUT_PATH: &str = "output.avi";

/// The only container the writer produces.
pub const OUTPUT_EXTENSION: &str = "avi";
/// FourCC of the re-encoding codec (MPEG-4 Part 2, XviD tag).
pub const OUTPUT_CODEC_FOURCC: &str = "XVID";

/// "person" in the COCO label space the YOLO exports are trained on.
pub const PERSON_CLASS_ID: usize = 0;
pub const PERSON_CLASS_NAME: &str = "person";

pub const LABEL_FONT_NAME: &str = "Arial.ttf";
pub const LABEL_FONT_URL: &str =
    "https://github.com/ultralytics/assets/releases/download/v0.0.0/Arial.ttf";

/// Directory name under the platform cache dir for downloaded assets.
pub const ASSET_CACHE_APP_DIR: &str = "Human Detection";
