/// BlazeFace face inference using ONNX Runtime via `ort`.
///
/// A lightweight short-range detector that provides face boxes and a score
/// per face, which is exactly what the proctoring classifier consumes.
use std::path::{Path, PathBuf};

use crate::detection::domain::face_detection::{BoundingBox, FaceDetection, RawConfidence};
use crate::detection::domain::face_inference::{FaceInference, InferenceError};
use crate::detection::domain::model_loader::{ModelLoadError, ModelLoader};
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Default score threshold. Kept below the poor-lighting cutoff so dim but
/// present faces still surface and get flagged instead of disappearing.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

pub struct OnnxBlazefaceInference {
    session: ort::session::Session,
    score_threshold: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceInference {
    pub fn new(model_path: &Path, score_threshold: f64) -> Result<Self, ModelLoadError> {
        let runtime_err =
            |e: &dyn std::fmt::Display| ModelLoadError::Runtime(format!("{}: {e}", model_path.display()));
        let builder = ort::session::Session::builder().map_err(|e| runtime_err(&e))?;
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| runtime_err(&e))?;
        Ok(Self {
            session,
            score_threshold,
            anchors: generate_anchors(),
        })
    }

    fn run(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>> {
        let fw = frame.width();
        let fh = frame.height();
        if fw == 0 || fh == 0 {
            return Err("empty frame".into());
        }

        let input_value = ort::value::Tensor::from_array(preprocess(frame, INPUT_SIZE)?)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16] (box deltas + keypoints)
        // classificators: [1, 896, 1] (raw logits)
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        let mut raw_dets = Vec::new();
        let num_anchors = self.anchors.len().min(NUM_ANCHORS);

        for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
            let score = sigmoid(raw_score);
            if (score as f64) < self.score_threshold {
                continue;
            }

            let reg_offset = i * 16;
            if reg_offset + 4 > reg_data.len() {
                break;
            }
            let anchor = &self.anchors[i];

            let cx = anchor[0] + reg_data[reg_offset] / INPUT_SIZE as f32;
            let cy = anchor[1] + reg_data[reg_offset + 1] / INPUT_SIZE as f32;
            let w = reg_data[reg_offset + 2] / INPUT_SIZE as f32;
            let h = reg_data[reg_offset + 3] / INPUT_SIZE as f32;

            raw_dets.push(RawDet {
                bbox: BoundingBox::new(
                    ((cx - w / 2.0) * fw as f32).max(0.0) as f64,
                    ((cy - h / 2.0) * fh as f32).max(0.0) as f64,
                    ((cx + w / 2.0) * fw as f32).min(fw as f32) as f64,
                    ((cy + h / 2.0) * fh as f32).min(fh as f32) as f64,
                ),
                score: score as f64,
            });
        }

        Ok(nms(&mut raw_dets, NMS_IOU_THRESH)
            .into_iter()
            .map(|d| FaceDetection::new(d.bbox, RawConfidence::Scalar(d.score)))
            .collect())
    }
}

impl FaceInference for OnnxBlazefaceInference {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, InferenceError> {
        self.run(frame).map_err(|e| InferenceError::new(e.to_string()))
    }
}

/// Loads [`OnnxBlazefaceInference`] from a model file on first use.
pub struct BlazefaceModelLoader {
    model_path: PathBuf,
    score_threshold: f64,
}

impl BlazefaceModelLoader {
    pub fn new(model_path: PathBuf, score_threshold: f64) -> Self {
        Self {
            model_path,
            score_threshold,
        }
    }
}

impl ModelLoader for BlazefaceModelLoader {
    fn load(&self) -> Result<Box<dyn FaceInference>, ModelLoadError> {
        if !self.model_path.exists() {
            return Err(ModelLoadError::Runtime(format!(
                "model file not found: {}",
                self.model_path.display()
            )));
        }
        Ok(Box::new(OnnxBlazefaceInference::new(
            &self.model_path,
            self.score_threshold,
        )?))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
///
/// Grayscale frames are replicated across the three input planes; an alpha
/// channel is ignored.
fn preprocess(frame: &Frame, size: u32) -> Result<ndarray::Array4<f32>, String> {
    let channel_map: [usize; 3] = match frame.channels() {
        1 => [0, 0, 0],
        3 | 4 => [0, 1, 2],
        n => return Err(format!("expected a 1, 3 or 4 channel frame, got {n}")),
    };
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for (c, &src_c) in channel_map.iter().enumerate() {
                tensor[[0, c, y, x]] = src[[src_y, src_x, src_c]] as f32 / 255.0;
            }
        }
    }

    Ok(tensor)
}

// ---------------------------------------------------------------------------
// Anchors and NMS
// ---------------------------------------------------------------------------

/// Short-range anchors: a 16×16 grid with 2 anchors per cell and an 8×8 grid
/// with 6 anchors per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

#[derive(Clone, Debug)]
struct RawDet {
    bbox: BoundingBox,
    score: f64,
}

fn nms(dets: &mut [RawDet], iou_thresh: f64) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDet> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| iou(&k.bbox, &det.bbox) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    if inter == 0.0 {
        return 0.0;
    }
    let union = a.width() * a.height() + b.width() * b.height() - inter;
    inter / union
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
