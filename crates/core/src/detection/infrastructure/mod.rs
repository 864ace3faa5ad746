pub mod detection_stream;
pub mod execution_provider;
pub mod onnx_yolo_detector;
