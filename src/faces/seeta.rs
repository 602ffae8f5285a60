//! SeetaFace frontal face detector via the `rustface` crate.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use rustface::{Detector, ImageData};

use super::batch::{FaceDetector, FaceLocation};
use crate::config::MAX_UPSAMPLE;
use crate::error::TrainsetError;

const MIN_FACE_SIZE: u32 = 20;
const SCORE_THRESHOLD: f64 = 2.0;
const PYRAMID_SCALE_FACTOR: f32 = 0.8;
const SLIDE_WINDOW_STEP: u32 = 4;

pub struct RustfaceDetector {
    detector: Box<dyn Detector>,
    upsample: u32,
}

impl RustfaceDetector {
    /// Loads a SeetaFace model file.
    ///
    /// `upsample` is the number of 2x upscales applied before detection,
    /// which lets the detector find faces smaller than its minimum window.
    pub fn load(model_path: &Path, upsample: u32) -> Result<Self, TrainsetError> {
        let path = model_path.to_str().ok_or_else(|| TrainsetError::Detection {
            message: format!("model path {} is not valid UTF-8", model_path.display()),
        })?;
        let mut detector = rustface::create_detector(path).map_err(|e| TrainsetError::Detection {
            message: format!("failed to load model {}: {e}", model_path.display()),
        })?;

        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE_FACTOR);
        detector.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);

        Ok(Self {
            detector,
            upsample: upsample.min(MAX_UPSAMPLE),
        })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect_single(&mut self, image: &RgbImage) -> Result<Vec<FaceLocation>, TrainsetError> {
        let factor = 1u32 << self.upsample;
        let gray = upscaled_gray(image, factor);
        let (width, height) = gray.dimensions();

        let mut data = ImageData::new(&gray, width, height);
        let faces = self.detector.detect(&mut data);

        let factor = i64::from(factor);
        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                let left = i64::from(bbox.x());
                let top = i64::from(bbox.y());
                let right = left + i64::from(bbox.width());
                let bottom = top + i64::from(bbox.height());
                clamp_location(
                    FaceLocation::new(top / factor, right / factor, bottom / factor, left / factor),
                    image.width(),
                    image.height(),
                )
            })
            .collect())
    }
}

fn upscaled_gray(image: &RgbImage, factor: u32) -> GrayImage {
    let gray = imageops::grayscale(image);
    if factor <= 1 {
        return gray;
    }
    imageops::resize(
        &gray,
        gray.width() * factor,
        gray.height() * factor,
        FilterType::Triangle,
    )
}

/// Detection windows can overhang the image edge; keep boxes inside it.
fn clamp_location(location: FaceLocation, width: u32, height: u32) -> FaceLocation {
    let (width, height) = (i64::from(width), i64::from(height));
    FaceLocation::new(
        location.top.clamp(0, height),
        location.right.clamp(0, width),
        location.bottom.clamp(0, height),
        location.left.clamp(0, width),
    )
}
