// src/backend/video_processor.rs

use crate::detection::FrameSource;
use crate::error::AnalysisError;
use crate::types::{Frame, VideoInfo};
use anyhow::Result;
use opencv::{
    core::Mat,
    imgcodecs, imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst},
};
use std::path::Path;
use tracing::info;

fn path_str(path: &Path) -> Result<&str, AnalysisError> {
    path.to_str()
        .ok_or_else(|| AnalysisError::input_unavailable(path, "path is not valid UTF-8"))
}

/// Decode a BGR OpenCV matrix into an RGB frame.
fn mat_to_frame(mat: &Mat, index: u64) -> Result<Frame> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(mat, &mut rgb, imgproc::COLOR_BGR2RGB)?;

    Ok(Frame {
        data: rgb.data_bytes()?.to_vec(),
        width: rgb.cols() as usize,
        height: rgb.rows() as usize,
        index,
    })
}

/// Read a still image as frame 1.
pub fn load_image(path: &Path) -> Result<Frame, AnalysisError> {
    let mat = imgcodecs::imread(path_str(path)?, imgcodecs::IMREAD_COLOR)
        .map_err(|e| AnalysisError::input_unavailable(path, e.to_string()))?;

    if mat.empty() {
        return Err(AnalysisError::input_unavailable(path, "image could not be decoded"));
    }

    let frame =
        mat_to_frame(&mat, 1).map_err(|e| AnalysisError::input_unavailable(path, e.to_string()))?;
    info!(
        "Loaded image {}: {}x{}",
        path.display(),
        frame.width,
        frame.height
    );
    Ok(frame)
}

pub struct VideoFileSource {
    cap: VideoCapture,
    info: VideoInfo,
    current_frame: u64,
}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self, AnalysisError> {
        info!("Opening video: {}", path.display());

        let unavailable = |e: opencv::Error| AnalysisError::input_unavailable(path, e.to_string());
        let cap = VideoCapture::from_file(path_str(path)?, videoio::CAP_ANY).map_err(unavailable)?;

        if !cap.is_opened().map_err(unavailable)? {
            return Err(AnalysisError::input_unavailable(
                path,
                "could not open video file",
            ));
        }

        let fps = cap.get(videoio::CAP_PROP_FPS).map_err(unavailable)?;
        let total_frames = cap.get(videoio::CAP_PROP_FRAME_COUNT).map_err(unavailable)?;
        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(unavailable)?;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(unavailable)?;

        let info = VideoInfo {
            fps,
            total_frames: total_frames.max(0.0) as u64,
            width: width.max(0.0) as usize,
            height: height.max(0.0) as usize,
        };

        Ok(Self {
            cap,
            info,
            current_frame: 0,
        })
    }
}

impl FrameSource for VideoFileSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();

        if !self.cap.read(&mut mat)? || mat.empty() {
            return Ok(None);
        }

        self.current_frame += 1;
        Ok(Some(mat_to_frame(&mat, self.current_frame)?))
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        let _ = self.cap.release();
    }
}
