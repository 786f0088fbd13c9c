//! Dense face landmarks from a MediaPipe-style face-mesh ONNX model.
//!
//! The mesh model expects a tight square face crop and outputs 468 points
//! in crop pixel space plus a face-presence logit. Without a separate
//! detector the first crop is a centered square; after every hit the next
//! crop follows the face (bounding square of the last landmarks, enlarged),
//! and a miss resets it to the center.

use std::path::Path;

use ndarray::Array4;

use crate::landmarks::domain::face_landmarks::FaceLandmarks;
use crate::landmarks::domain::landmark_provider::LandmarkProvider;
use crate::shared::constants::FACE_MESH_LANDMARK_COUNT;
use crate::shared::frame::Frame;

/// Input resolution when the model does not declare one.
const DEFAULT_INPUT_SIZE: usize = 192;

/// Default face-presence probability below which a frame has no face.
pub const DEFAULT_MIN_FACE_SCORE: f32 = 0.5;

/// Scale applied to the landmark bounding square when tracking.
const TRACK_CROP_SCALE: f64 = 1.5;

/// Below this edge length (pixels) a tracked crop is abandoned.
const MIN_CROP_SIZE: f64 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLayout {
    Nchw,
    Nhwc,
}

/// Pixel normalization the model was trained with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InputRange {
    /// `[0, 1]`
    #[default]
    Unit,
    /// `[-1, 1]`
    Symmetric,
}

impl InputRange {
    fn normalize(self, v: u8) -> f32 {
        let unit = v as f32 / 255.0;
        match self {
            InputRange::Unit => unit,
            InputRange::Symmetric => unit * 2.0 - 1.0,
        }
    }
}

/// Square crop in frame pixel coordinates. May extend past the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crop {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl Crop {
    /// Largest centered square that fits the frame.
    pub fn centered(width: u32, height: u32) -> Self {
        let size = width.min(height) as f64;
        Self {
            x: (width as f64 - size) / 2.0,
            y: (height as f64 - size) / 2.0,
            size,
        }
    }

    /// Square around normalized `points`, scaled by `scale`. `None` when
    /// the points are degenerate or the square is too small to track.
    pub fn around(points: &[(f64, f64)], width: u32, height: u32, scale: f64) -> Option<Self> {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in points.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
            let (px, py) = (x * width as f64, y * height as f64);
            min_x = min_x.min(px);
            max_x = max_x.max(px);
            min_y = min_y.min(py);
            max_y = max_y.max(py);
        }
        if !min_x.is_finite() {
            return None;
        }

        let size = (max_x - min_x).max(max_y - min_y) * scale;
        if size < MIN_CROP_SIZE {
            return None;
        }
        let cx = (min_x + max_x) / 2.0;
        let cy = (min_y + max_y) / 2.0;
        Some(Self {
            x: cx - size / 2.0,
            y: cy - size / 2.0,
            size,
        })
    }

    /// Maps a point in model-input pixels back to normalized frame coordinates.
    pub fn to_frame(&self, px: f64, py: f64, input_size: usize, width: u32, height: u32) -> (f64, f64) {
        let s = self.size / input_size as f64;
        ((self.x + px * s) / width as f64, (self.y + py * s) / height as f64)
    }
}

pub struct OnnxFaceMeshProvider {
    session: ort::session::Session,
    input_size: usize,
    layout: TensorLayout,
    range: InputRange,
    min_face_score: f32,
    crop: Option<Crop>,
}

impl OnnxFaceMeshProvider {
    /// Loads a face-mesh model. Input size and layout are read from the
    /// model's first input (`[1, 3, H, W]` or `[1, H, W, 3]`).
    pub fn new(model_path: &Path, min_face_score: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let shape: Option<Vec<i64>> = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                Some(shape.iter().copied().collect())
            } else {
                None
            }
        });
        let (layout, input_size) = shape
            .as_deref()
            .map(infer_input_geometry)
            .unwrap_or((TensorLayout::Nchw, DEFAULT_INPUT_SIZE));
        log::info!(
            "Loaded face mesh {} ({input_size}x{input_size}, {layout:?})",
            model_path.display()
        );

        Ok(Self {
            session,
            input_size,
            layout,
            range: InputRange::default(),
            min_face_score,
            crop: None,
        })
    }

    pub fn with_input_range(mut self, range: InputRange) -> Self {
        self.range = range;
        self
    }

    fn run(&mut self, tensor: Array4<f32>) -> Result<(Vec<f32>, Option<f32>), Box<dyn std::error::Error>> {
        let input = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input])?;

        let mut points = None;
        let mut score = None;
        for i in 0..outputs.len() {
            let array = outputs[i].try_extract_array::<f32>()?;
            if points.is_none() && array.len() >= FACE_MESH_LANDMARK_COUNT * 3 {
                points = Some(array.iter().copied().collect::<Vec<f32>>());
            } else if score.is_none() && array.len() == 1 {
                score = array.iter().next().copied();
            }
        }
        let points = points.ok_or("Face mesh model produced no landmark tensor")?;
        Ok((points, score))
    }
}

impl LandmarkProvider for OnnxFaceMeshProvider {
    fn locate(&mut self, frame: &Frame) -> Result<Option<FaceLandmarks>, Box<dyn std::error::Error>> {
        let (w, h) = (frame.width(), frame.height());
        let crop = self.crop.unwrap_or_else(|| Crop::centered(w, h));

        let tensor = preprocess(frame, &crop, self.input_size, self.layout, self.range);
        let (raw, logit) = self.run(tensor)?;

        // Models exported without the presence head always count as a hit.
        let score = logit.map(sigmoid).unwrap_or(1.0);
        if score < self.min_face_score {
            log::trace!("Frame {}: face score {score:.3} below threshold", frame.index());
            self.crop = None;
            return Ok(None);
        }

        let points = decode_landmarks(&raw, &crop, self.input_size, w, h);
        self.crop = Crop::around(&points, w, h, TRACK_CROP_SCALE);
        Ok(Some(FaceLandmarks::new(points)))
    }
}

fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[allow(unused_mut)]
    let mut providers = Vec::new();
    #[cfg(target_os = "macos")]
    providers.push(ort::execution_providers::CoreMLExecutionProvider::default().build());
    #[cfg(target_os = "windows")]
    providers.push(ort::execution_providers::DirectMLExecutionProvider::default().build());
    providers
}

/// Layout and edge length from a declared input shape. Dynamic dims are
/// negative and fall back to the default size.
fn infer_input_geometry(shape: &[i64]) -> (TensorLayout, usize) {
    match shape {
        [_, h, _, 3] => (TensorLayout::Nhwc, positive_or_default(*h)),
        [_, _, h, _] => (TensorLayout::Nchw, positive_or_default(*h)),
        _ => (TensorLayout::Nchw, DEFAULT_INPUT_SIZE),
    }
}

fn positive_or_default(dim: i64) -> usize {
    if dim > 0 {
        dim as usize
    } else {
        DEFAULT_INPUT_SIZE
    }
}

/// Nearest-neighbour resample of `crop` into a `size x size` tensor.
/// Crop area outside the frame is black.
fn preprocess(frame: &Frame, crop: &Crop, size: usize, layout: TensorLayout, range: InputRange) -> Array4<f32> {
    let src = frame.as_ndarray();
    let (fw, fh) = (frame.width() as f64, frame.height() as f64);
    let step = crop.size / size as f64;
    let black = range.normalize(0);

    let mut tensor = match layout {
        TensorLayout::Nchw => Array4::<f32>::from_elem((1, 3, size, size), black),
        TensorLayout::Nhwc => Array4::<f32>::from_elem((1, size, size, 3), black),
    };

    for y in 0..size {
        let sy = (crop.y + (y as f64 + 0.5) * step).floor();
        if sy < 0.0 || sy >= fh {
            continue;
        }
        for x in 0..size {
            let sx = (crop.x + (x as f64 + 0.5) * step).floor();
            if sx < 0.0 || sx >= fw {
                continue;
            }
            for c in 0..3 {
                let v = range.normalize(src[[sy as usize, sx as usize, c]]);
                match layout {
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = v,
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = v,
                }
            }
        }
    }
    tensor
}

/// First 468 `(x, y, z)` triples of the landmark tensor, in normalized
/// frame coordinates.
fn decode_landmarks(raw: &[f32], crop: &Crop, input_size: usize, width: u32, height: u32) -> Vec<(f64, f64)> {
    raw.chunks_exact(3)
        .take(FACE_MESH_LANDMARK_COUNT)
        .map(|p| crop.to_frame(p[0] as f64, p[1] as f64, input_size, width, height))
        .collect()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
