// src/backend/yolo_seg.rs
//
// YOLOv8 detector on ONNX Runtime. Works with plain detection exports
// (one output, boxes only) and segmentation exports (second output holds
// mask prototypes; masks are projected back onto the source frame).
//
// Output layout:
//   output0: [1, 4 + classes (+ 32 coeffs), N]   cx, cy, w, h, class scores, mask coeffs
//   output1: [1, 32, mh, mw]                     mask prototypes (seg only)

use crate::detection::Detector;
use crate::types::{BoundingBox, Detection, DetectionClass, Frame, Mask, ModelConfig};
use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, info};

const MASK_COEFFS: usize = 32;
const LETTERBOX_FILL: u8 = 114;

/// Letterbox geometry from source frame to model input.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }

    fn to_input(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.pad_x, y * self.scale + self.pad_y)
    }
}

struct Candidate {
    bbox: BoundingBox,
    confidence: f32,
    coeffs: Option<[f32; MASK_COEFFS]>,
}

struct Prototypes {
    data: Vec<f32>,
    height: usize,
    width: usize,
}

pub struct YoloSegDetector {
    session: Session,
    class: DetectionClass,
    input_size: usize,
    num_classes: usize,
    nms_iou_threshold: f32,
}

impl YoloSegDetector {
    pub fn new(model_path: &str, config: &ModelConfig, class: DetectionClass) -> Result<Self> {
        info!("Loading {:?} model: {}", class, model_path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?
            .with_inter_threads(1)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load model {}", model_path))?;

        info!("✓ {:?} detector initialized", class);
        Ok(Self {
            session,
            class,
            input_size: config.input_size,
            num_classes: config.num_classes.max(1),
            nms_iou_threshold: config.nms_iou_threshold,
        })
    }

    fn preprocess(&self, frame: &Frame) -> Result<(Vec<f32>, Letterbox)> {
        let target = self.input_size;
        let (src_w, src_h) = (frame.width, frame.height);
        if src_w == 0 || src_h == 0 || frame.data.len() < src_w * src_h * 3 {
            anyhow::bail!("frame {} has no pixel data", frame.index);
        }

        let scale = (target as f32 / src_w as f32).min(target as f32 / src_h as f32);
        let scaled_w = ((src_w as f32 * scale) as usize).clamp(1, target);
        let scaled_h = ((src_h as f32 * scale) as usize).clamp(1, target);
        let pad_x = (target - scaled_w) as f32 / 2.0;
        let pad_y = (target - scaled_h) as f32 / 2.0;

        let resized = resize_rgb(frame, scaled_w, scaled_h)?;

        let mut canvas = vec![LETTERBOX_FILL; target * target * 3];
        for y in 0..scaled_h {
            for x in 0..scaled_w {
                let src_idx = (y * scaled_w + x) * 3;
                let dst_idx = ((y + pad_y as usize) * target + x + pad_x as usize) * 3;
                canvas[dst_idx..dst_idx + 3].copy_from_slice(&resized[src_idx..src_idx + 3]);
            }
        }

        // [0, 255] HWC → [0, 1] CHW
        let plane = target * target;
        let mut input = vec![0.0f32; 3 * plane];
        for (i, px) in canvas.chunks_exact(3).enumerate() {
            for c in 0..3 {
                input[c * plane + i] = px[c] as f32 / 255.0;
            }
        }

        Ok((
            input,
            Letterbox {
                scale,
                pad_x,
                pad_y,
            },
        ))
    }

    fn infer(&mut self, input: Vec<f32>) -> Result<(Vec<f32>, Vec<usize>, Option<Prototypes>)> {
        let shape = [1, 3, self.input_size, self.input_size];
        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs!["images" => input_value])?;

        let (shape0, data0) = outputs[0].try_extract_tensor::<f32>()?;
        let dims0: Vec<usize> = shape0.iter().map(|&d| d.max(0) as usize).collect();
        let predictions = data0.to_vec();

        let prototypes = if outputs.len() > 1 {
            let (shape1, data1) = outputs[1].try_extract_tensor::<f32>()?;
            let dims1: Vec<usize> = shape1.iter().map(|&d| d.max(0) as usize).collect();
            match dims1.as_slice() {
                [_, c, h, w] if *c == MASK_COEFFS => Some(Prototypes {
                    data: data1.to_vec(),
                    height: *h,
                    width: *w,
                }),
                _ => None,
            }
        } else {
            None
        };

        Ok((predictions, dims0, prototypes))
    }

    fn decode(
        &self,
        predictions: &[f32],
        dims: &[usize],
        has_masks: bool,
        letterbox: Letterbox,
        frame: &Frame,
        conf_thresh: f32,
    ) -> Result<Vec<Candidate>> {
        let (channels, count) = match dims {
            [_, c, n] => (*c, *n),
            _ => anyhow::bail!("unexpected prediction shape {:?}", dims),
        };
        let expected = 4 + self.num_classes + if has_masks { MASK_COEFFS } else { 0 };
        if channels < expected || predictions.len() < channels * count {
            anyhow::bail!(
                "prediction tensor has {} channels, expected at least {}",
                channels,
                expected
            );
        }

        let at = |channel: usize, i: usize| predictions[channel * count + i];
        let (w_max, h_max) = (frame.width as f32, frame.height as f32);
        let mut candidates = Vec::new();

        for i in 0..count {
            let confidence = (0..self.num_classes)
                .map(|c| at(4 + c, i))
                .fold(0.0f32, f32::max);
            if confidence < conf_thresh {
                continue;
            }

            let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
            let (x1, y1) = letterbox.to_source(cx - w / 2.0, cy - h / 2.0);
            let (x2, y2) = letterbox.to_source(cx + w / 2.0, cy + h / 2.0);
            let bbox = BoundingBox::new(
                x1.clamp(0.0, w_max),
                y1.clamp(0.0, h_max),
                x2.clamp(0.0, w_max),
                y2.clamp(0.0, h_max),
            );
            if bbox.area() <= 0.0 {
                continue;
            }

            let coeffs = has_masks.then(|| {
                let mut coeffs = [0.0f32; MASK_COEFFS];
                for (k, coeff) in coeffs.iter_mut().enumerate() {
                    *coeff = at(4 + self.num_classes + k, i);
                }
                coeffs
            });

            candidates.push(Candidate {
                bbox,
                confidence,
                coeffs,
            });
        }

        Ok(nms(candidates, self.nms_iou_threshold))
    }

    /// Project prototype masks onto the frame, cropped to the detection box.
    fn build_mask(
        &self,
        candidate: &Candidate,
        coeffs: &[f32; MASK_COEFFS],
        protos: &Prototypes,
        letterbox: Letterbox,
        frame: &Frame,
    ) -> Mask {
        let (ph, pw) = (protos.height, protos.width);
        let plane = ph * pw;

        let mut proto_probs = vec![0.0f32; plane];
        for (idx, prob) in proto_probs.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (c, coeff) in coeffs.iter().enumerate() {
                sum += coeff * protos.data[c * plane + idx];
            }
            *prob = 1.0 / (1.0 + (-sum).exp());
        }

        let mut values = vec![0.0f32; frame.width * frame.height];
        let to_proto_x = pw as f32 / self.input_size as f32;
        let to_proto_y = ph as f32 / self.input_size as f32;

        let bbox = candidate.bbox;
        let (x_start, x_end) = (bbox.x1 as usize, (bbox.x2.ceil() as usize).min(frame.width));
        let (y_start, y_end) = (bbox.y1 as usize, (bbox.y2.ceil() as usize).min(frame.height));

        for y in y_start..y_end {
            for x in x_start..x_end {
                let (ix, iy) = letterbox.to_input(x as f32 + 0.5, y as f32 + 0.5);
                let px = ((ix * to_proto_x) as usize).min(pw - 1);
                let py = ((iy * to_proto_y) as usize).min(ph - 1);
                values[y * frame.width + x] = proto_probs[py * pw + px];
            }
        }

        Mask {
            width: frame.width,
            height: frame.height,
            values,
        }
    }
}

impl Detector for YoloSegDetector {
    fn detect(&mut self, frame: &Frame, confidence: f32) -> Result<Vec<Detection>> {
        let (input, letterbox) = self.preprocess(frame)?;
        let (predictions, dims, protos) = self.infer(input)?;
        let candidates = self.decode(
            &predictions,
            &dims,
            protos.is_some(),
            letterbox,
            frame,
            confidence,
        )?;

        let detections: Vec<Detection> = candidates
            .iter()
            .map(|candidate| {
                let det = Detection::from_box(candidate.bbox)
                    .with_confidence(candidate.confidence)
                    .with_class(self.class);
                match (&candidate.coeffs, &protos) {
                    (Some(coeffs), Some(protos)) if protos.width > 0 && protos.height > 0 => {
                        det.with_mask(self.build_mask(candidate, coeffs, protos, letterbox, frame))
                    }
                    _ => det,
                }
            })
            .collect();

        debug!(
            "{:?}: {} detections on frame {}",
            self.class,
            detections.len(),
            frame.index
        );
        Ok(detections)
    }
}

fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep
            .iter()
            .all(|kept| kept.bbox.iou(&candidate.bbox) < iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

/// Bilinear resize of packed RGB8 pixels through OpenCV.
fn resize_rgb(frame: &Frame, dst_w: usize, dst_h: usize) -> Result<Vec<u8>> {
    let pixels = &frame.data[..frame.width * frame.height * 3];
    let src = Mat::from_slice(pixels)?;
    let src = src.reshape(3, frame.height as i32)?;

    let mut dst = Mat::default();
    imgproc::resize(
        &src,
        &mut dst,
        core::Size::new(dst_w as i32, dst_h as i32),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    Ok(dst.data_bytes()?.to_vec())
}
