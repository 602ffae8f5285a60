//! Face detection over IIIF manifests.
//!
//! Every image of every configured manifest is fetched at a bounded size,
//! batched by dimensions and run through a [`FaceDetector`]. Detected faces
//! are scaled back to full resolution and streamed into an annotation list
//! and a curation document as each batch completes.

mod batch;
mod seeta;

use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use image::{imageops, ImageFormat};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::error::TrainsetError;
use crate::fetch::Fetcher;
use crate::iiif::image_api::{canonical_full_url, fetch_image, full_dimensions, resized_url};
use crate::iiif::{ImageDescriptor, ManifestIndex};
use crate::ir::io_iiif_stream::{
    AnnotationListWriter, CurationMember, CurationWriter, RegionAnnotation,
};
use crate::ir::{Full, ImageKey, Xywh};

pub use seeta::RustfaceDetector;
pub use batch::{
    detect_batch, BatchItem, DetectedFace, FaceBatcher, FaceDetector, FaceLocation, ImageMeta,
};

/// Tag attached to every detected region.
pub const FACE_TAG: &str = "face";

/// Counts accumulated during a faces run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FacesSummary {
    pub manifests: usize,
    pub failed_manifests: usize,
    pub images_queued: usize,
    pub images_skipped: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub faces: usize,
    /// Faces dropped by the minimum proportion filter.
    pub faces_filtered: usize,
    pub clips_saved: usize,
}

impl fmt::Display for FacesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} manifest(s) ({} failed), {} image(s) queued, {} skipped; {} batch(es) ({} failed); {} face(s) written, {} filtered, {} clip(s) saved",
            self.manifests,
            self.failed_manifests,
            self.images_queued,
            self.images_skipped,
            self.batches,
            self.failed_batches,
            self.faces,
            self.faces_filtered,
            self.clips_saved
        )
    }
}

/// Runs face detection over every manifest in `config.source_urls`.
///
/// Writes `face_annotations.json` and `face_curation.json` into the output
/// directory. Both documents are well-formed even if every manifest fails.
pub fn run_faces(
    config: &RunConfig,
    fetcher: &Fetcher,
    detector: &mut dyn FaceDetector,
) -> Result<FacesSummary, TrainsetError> {
    create_dir(&config.output_dir)?;
    let clips_dir = if config.clip_images {
        let dir = config.clips_dir();
        create_dir(&dir)?;
        Some(dir)
    } else {
        None
    };

    let annotations_path = config.face_annotations_path();
    let curation_path = config.face_curation_path();
    let annotations = AnnotationListWriter::new(
        BufWriter::new(File::create(&annotations_path).map_err(TrainsetError::Io)?),
        &annotations_path,
        &config.annotation_list_id,
    )?;
    let curation_id = format!(
        "{}/json/{}",
        config.curation_base_url.trim_end_matches('/'),
        Uuid::new_v4()
    );
    let curation = CurationWriter::new(
        BufWriter::new(File::create(&curation_path).map_err(TrainsetError::Io)?),
        &curation_path,
        &curation_id,
    )?;

    let mut run = FaceRun {
        config,
        fetcher,
        detector,
        annotations,
        curation,
        clips_dir,
        summary: FacesSummary::default(),
    };
    let mut manifests = ManifestIndex::new();

    for manifest_url in &config.source_urls {
        let entry = match manifests.load(fetcher, manifest_url) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(manifest = %manifest_url, error = %err, "skipping manifest");
                run.summary.failed_manifests += 1;
                continue;
            }
        };
        run.summary.manifests += 1;
        info!(
            manifest = %manifest_url,
            label = entry.label.as_deref().unwrap_or(""),
            canvases = entry.canvas_count(),
            "processing manifest"
        );

        run.curation.begin_range(manifest_url, &config.range_label)?;
        let mut batcher = FaceBatcher::new(config.batch_size);

        for (canvas_id, images) in entry.canvases() {
            let selected = if config.harvest_all {
                images
            } else {
                images.last().map(std::slice::from_ref).unwrap_or_default()
            };
            for image in selected {
                let Some(item) = run.prepare(manifest_url, canvas_id, image) else {
                    continue;
                };
                run.summary.images_queued += 1;
                if let Some(full) = batcher.push(item) {
                    run.flush(&full)?;
                }
            }
        }

        for remaining in batcher.drain() {
            run.flush(&remaining)?;
        }
        run.curation.end_range(manifest_url, &config.project_name)?;
    }

    run.annotations.finish()?;
    run.curation.finish()?;
    Ok(run.summary)
}

struct FaceRun<'r, 'f> {
    config: &'r RunConfig,
    fetcher: &'r Fetcher<'f>,
    detector: &'r mut dyn FaceDetector,
    annotations: AnnotationListWriter<BufWriter<File>>,
    curation: CurationWriter<BufWriter<File>>,
    clips_dir: Option<PathBuf>,
    summary: FacesSummary,
}

impl FaceRun<'_, '_> {
    /// Fetches and decodes the resized copy of one image.
    ///
    /// Returns `None` (after logging) when the image cannot be used.
    fn prepare(
        &mut self,
        manifest_url: &str,
        canvas_id: &str,
        image: &ImageDescriptor,
    ) -> Option<BatchItem> {
        let image_id = ImageKey::derive(image.service_url.as_deref().unwrap_or(canvas_id));

        let (full_width, full_height) = match full_dimensions(self.fetcher, image) {
            Ok(dims) => dims,
            Err(err) => {
                warn!(image = %image_id, error = %err, "no usable dimensions, skipping image");
                self.summary.images_skipped += 1;
                return None;
            }
        };

        let full_url = canonical_full_url(image);
        let [max_w, max_h] = self.config.max_resize;
        let url = resized_url(&full_url, max_w, max_h);

        let decoded = match fetch_image(self.fetcher, &url) {
            Ok(decoded) => decoded,
            Err(first) => {
                debug!(url = %url, error = %first, "retrying image fetch");
                thread::sleep(Duration::from_millis(self.config.retry_backoff_ms));
                match fetch_image(self.fetcher, &url) {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        warn!(url = %url, error = %err, "error getting image, skipping");
                        thread::sleep(Duration::from_millis(self.config.skip_cooldown_ms));
                        self.summary.images_skipped += 1;
                        return None;
                    }
                }
            }
        };

        let pixels = decoded.to_rgb8();
        debug!(
            image = %image_id,
            width = pixels.width(),
            height = pixels.height(),
            full_width,
            full_height,
            "queued image"
        );
        Some(BatchItem {
            image: pixels,
            meta: ImageMeta {
                image_id,
                manifest_url: manifest_url.to_string(),
                canvas_id: canvas_id.to_string(),
                full_width,
                full_height,
            },
        })
    }

    /// Runs one batch and streams its faces. Detector failures skip the
    /// batch; write failures are fatal.
    fn flush(&mut self, batch: &[BatchItem]) -> Result<(), TrainsetError> {
        self.summary.batches += 1;
        info!(size = batch.len(), "running detection on batch");

        let results = match detect_batch(&mut *self.detector, batch) {
            Ok(results) => results,
            Err(err) => {
                error!(size = batch.len(), error = %err, "skipping batch");
                self.summary.failed_batches += 1;
                return Ok(());
            }
        };

        for (item, faces) in batch.iter().zip(&results) {
            for face in faces {
                if let Some(min) = self.config.min_face_proportion {
                    if face.proportion < min {
                        self.summary.faces_filtered += 1;
                        continue;
                    }
                }
                self.emit(item, face)?;
            }
        }
        Ok(())
    }

    fn emit(&mut self, item: &BatchItem, face: &DetectedFace) -> Result<(), TrainsetError> {
        let meta = &item.meta;
        debug!(image = %meta.image_id, region = %face.full, proportion = face.proportion, "face");

        self.annotations.push(&RegionAnnotation::new(
            &meta.manifest_url,
            &meta.canvas_id,
            &face.full,
            FACE_TAG,
            Uuid::new_v4(),
        ))?;
        self.curation.push(&CurationMember::new(
            &meta.canvas_id,
            meta.image_id.as_str(),
            &face.full,
            FACE_TAG,
            face.proportion,
        ))?;
        self.summary.faces += 1;

        if let Some(dir) = self.clips_dir.clone() {
            match save_face_clip(&dir, item, face) {
                Ok(Some(path)) => {
                    debug!(path = %path.display(), "saved face clipping");
                    self.summary.clips_saved += 1;
                }
                Ok(None) => {}
                Err(err) => warn!(image = %meta.image_id, error = %err, "failed to save face clipping"),
            }
        }
        Ok(())
    }
}

/// `<image_id>.<full X,Y,W,H>.png`, with `%7C` replaced by `_`.
pub fn face_clip_file_name(image_id: &ImageKey, full: &Xywh<Full>) -> String {
    format!("{image_id}.{full}.png").replace("%7C", "_")
}

/// Crops the face from the resized image it was detected in. Empty boxes
/// produce no file.
fn save_face_clip(
    dir: &Path,
    item: &BatchItem,
    face: &DetectedFace,
) -> Result<Option<PathBuf>, TrainsetError> {
    let region = &face.resized;
    if region.w <= 0 || region.h <= 0 || region.x < 0 || region.y < 0 {
        return Ok(None);
    }
    let (x, y, w, h) = (
        region.x as u32,
        region.y as u32,
        region.w as u32,
        region.h as u32,
    );
    let clip = imageops::crop_imm(&item.image, x, y, w, h).to_image();
    if clip.width() == 0 || clip.height() == 0 {
        return Ok(None);
    }

    let path = dir.join(face_clip_file_name(&item.meta.image_id, &face.full));
    clip.save_with_format(&path, ImageFormat::Png)
        .map_err(|source| TrainsetError::ImageWrite {
            path: path.clone(),
            source,
        })?;
    Ok(Some(path))
}

fn create_dir(path: &Path) -> Result<(), TrainsetError> {
    fs::create_dir_all(path).map_err(|source| TrainsetError::DirectorySetup {
        path: path.to_path_buf(),
        source,
    })
}
