// src/backend/mod.rs
//
// Native collaborators: OpenCV decoding and drawing, ONNX Runtime YOLO-seg
// inference. Compiled only with the `backend-opencv` feature.

mod annotate;
mod video_processor;
mod yolo_seg;

pub use annotate::annotate_potholes;
pub use video_processor::{load_image, VideoFileSource};
pub use yolo_seg::YoloSegDetector;
