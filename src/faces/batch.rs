//! Dimension-keyed batching of decoded images for the face detector.
//!
//! Detectors that accept batches need every image in a batch to share the
//! same dimensions. Images are therefore grouped by `(width, height)` in
//! first-seen order; a group is handed to the detector as soon as it reaches
//! the batch size, and whatever remains is flushed at the end of each
//! manifest.

use image::RgbImage;
use tracing::debug;

use crate::error::TrainsetError;
use crate::ir::{region_to_full, Full, ImageKey, Resized, ScaleRatio, Xywh};

/// A face box as reported by a detector: `(top, right, bottom, left)` in the
/// pixel space of the image that was searched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceLocation {
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    pub left: i64,
}

impl FaceLocation {
    pub fn new(top: i64, right: i64, bottom: i64, left: i64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn to_xywh(&self) -> Xywh<Resized> {
        Xywh::new(
            self.left,
            self.top,
            self.right - self.left,
            self.bottom - self.top,
        )
    }
}

/// A face detection engine.
pub trait FaceDetector {
    /// Detects faces in one image.
    fn detect_single(&mut self, image: &RgbImage) -> Result<Vec<FaceLocation>, TrainsetError>;

    /// Detects faces in a batch of same-dimension images. Results correlate
    /// positionally with `images`.
    fn detect_batch(
        &mut self,
        images: &[&RgbImage],
    ) -> Result<Vec<Vec<FaceLocation>>, TrainsetError> {
        images.iter().map(|image| self.detect_single(image)).collect()
    }
}

/// Where a batched image came from and how it maps back to full resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageMeta {
    pub image_id: ImageKey,
    pub manifest_url: String,
    pub canvas_id: String,
    pub full_width: u32,
    pub full_height: u32,
}

/// A decoded resized image waiting for detection.
#[derive(Clone, Debug)]
pub struct BatchItem {
    pub image: RgbImage,
    pub meta: ImageMeta,
}

impl BatchItem {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Ratio that maps this image's pixels back to full resolution.
    pub fn ratio(&self) -> ScaleRatio {
        let (width, height) = self.dimensions();
        ScaleRatio::resized_to_full(self.meta.full_width, self.meta.full_height, width, height)
    }
}

/// Groups images by dimensions and releases them in capped batches.
#[derive(Debug)]
pub struct FaceBatcher {
    batch_size: usize,
    groups: Vec<((u32, u32), Vec<BatchItem>)>,
}

impl FaceBatcher {
    /// `batch_size` is clamped to at least 1.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            groups: Vec::new(),
        }
    }

    /// Adds an image, returning its group as a batch once it is full.
    pub fn push(&mut self, item: BatchItem) -> Option<Vec<BatchItem>> {
        let dims = item.dimensions();
        let idx = match self.groups.iter().position(|(key, _)| *key == dims) {
            Some(idx) => idx,
            None => {
                self.groups.push((dims, Vec::new()));
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[idx].1;
        group.push(item);
        if group.len() >= self.batch_size {
            debug!(width = dims.0, height = dims.1, size = group.len(), "batch full");
            Some(std::mem::take(group))
        } else {
            None
        }
    }

    /// Releases every non-empty group in first-seen order.
    pub fn drain(&mut self) -> Vec<Vec<BatchItem>> {
        std::mem::take(&mut self.groups)
            .into_iter()
            .map(|(_, items)| items)
            .filter(|items| !items.is_empty())
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.groups.iter().map(|(_, items)| items.len()).sum()
    }
}

/// One detected face, in both pixel spaces.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedFace {
    pub resized: Xywh<Resized>,
    pub full: Xywh<Full>,
    /// Share of the resized image covered by the face.
    pub proportion: f64,
}

impl DetectedFace {
    pub fn from_location(location: &FaceLocation, item: &BatchItem) -> Self {
        let resized = location.to_xywh();
        let (width, height) = item.dimensions();
        let proportion =
            (resized.w as f64 / f64::from(width)) * (resized.h as f64 / f64::from(height));
        Self {
            resized,
            full: region_to_full(&resized, item.ratio()),
            proportion,
        }
    }
}

/// Runs the detector over one batch.
///
/// A batch of one goes through [`FaceDetector::detect_single`], larger ones
/// through a single [`FaceDetector::detect_batch`] call. The result has one
/// entry per input image.
pub fn detect_batch(
    detector: &mut dyn FaceDetector,
    batch: &[BatchItem],
) -> Result<Vec<Vec<DetectedFace>>, TrainsetError> {
    let locations = match batch {
        [] => return Ok(Vec::new()),
        [single] => vec![detector.detect_single(&single.image)?],
        _ => {
            let images: Vec<&RgbImage> = batch.iter().map(|item| &item.image).collect();
            detector.detect_batch(&images)?
        }
    };

    if locations.len() != batch.len() {
        return Err(TrainsetError::Detection {
            message: format!(
                "detector returned {} result(s) for a batch of {}",
                locations.len(),
                batch.len()
            ),
        });
    }

    Ok(batch
        .iter()
        .zip(&locations)
        .map(|(item, faces)| {
            faces
                .iter()
                .map(|location| DetectedFace::from_location(location, item))
                .collect()
        })
        .collect())
}
