//! Annotation ingestion.
//!
//! Walks IIIF annotation lists, resolves each annotation's canvas through its
//! manifest, materializes a resized copy of the canvas image on first sight
//! and records the annotation's box in that copy's pixel space.
//!
//! Failures are scoped as narrowly as possible: a malformed annotation skips
//! that annotation, an unavailable manifest skips the annotations that point
//! at it, and a malformed list skips that list.

mod report;

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::error::TrainsetError;
use crate::fetch::Fetcher;
use crate::iiif::image_api::{
    fetch_image, full_dimensions, manifest_dimensions, region_url, resized_url, source_full_url,
};
use crate::iiif::{
    parse_annotation_list, AnnotationResource, AnnotationTarget, ImageDescriptor, ManifestIndex,
};
use crate::ir::{
    parse_xywh, reduce_tags, resize_box, AnnotationRecord, Full, ImageKey, ImageRecord,
    RunContext, TagSet, Xywh,
};

pub use report::IngestSummary;

/// What happened to one annotation-list resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Converted,
    /// Not an `oa:Annotation`.
    Ignored,
    /// Its manifest is not on the allow-list.
    Discarded,
}

/// Walks annotation lists into a [`RunContext`].
pub struct Ingestor<'a> {
    fetcher: &'a Fetcher<'a>,
    config: &'a RunConfig,
    manifests: ManifestIndex,
    images_dir: PathBuf,
    clips_dir: Option<PathBuf>,
    summary: IngestSummary,
}

impl<'a> Ingestor<'a> {
    /// Creates the output directories the ingestion writes into.
    pub fn new(fetcher: &'a Fetcher<'a>, config: &'a RunConfig) -> Result<Self, TrainsetError> {
        let images_dir = config.images_dir();
        create_dir(&images_dir)?;

        let clips_dir = if config.clip_images {
            let dir = config.clips_dir();
            create_dir(&dir)?;
            Some(dir)
        } else {
            None
        };

        Ok(Self {
            fetcher,
            config,
            manifests: ManifestIndex::new(),
            images_dir,
            clips_dir,
            summary: IngestSummary::default(),
        })
    }

    pub fn into_summary(self) -> IngestSummary {
        self.summary
    }

    /// Ingests every resource of the annotation list at `url`.
    ///
    /// Only a list that cannot be fetched or parsed is an error; per-resource
    /// failures are logged and counted.
    pub fn ingest_list(&mut self, context: &mut RunContext, url: &str) -> Result<(), TrainsetError> {
        let bytes = self.fetcher.get(url)?;
        let list = parse_annotation_list(&bytes, url)?;
        self.summary.lists += 1;
        info!(url, resources = list.resources.len(), "ingesting annotation list");

        for resource in &list.resources {
            self.summary.annotations_seen += 1;
            match self.ingest_resource(context, resource) {
                Ok(Outcome::Converted) => self.summary.converted += 1,
                Ok(Outcome::Ignored) => self.summary.ignored += 1,
                Ok(Outcome::Discarded) => self.summary.discarded += 1,
                Err(err) => {
                    warn!(error = %err, "skipping annotation");
                    self.summary.skipped += 1;
                }
            }
        }
        Ok(())
    }

    /// Ingests several lists, continuing past lists that fail.
    pub fn ingest_all<S: AsRef<str>>(&mut self, context: &mut RunContext, urls: &[S]) {
        for url in urls {
            let url = url.as_ref();
            if let Err(err) = self.ingest_list(context, url) {
                warn!(url, error = %err, "skipping annotation list");
                self.summary.failed_lists += 1;
            }
        }
    }

    /// Converts one resource of an annotation list.
    pub fn ingest_resource(
        &mut self,
        context: &mut RunContext,
        resource: &AnnotationResource,
    ) -> Result<Outcome, TrainsetError> {
        if !resource.is_annotation() {
            return Ok(Outcome::Ignored);
        }
        let annotation_id = resource.id.as_deref();
        let fail = |message: &str| TrainsetError::annotation(annotation_id, message);

        // Only the first target is used; multi-target annotations are rare.
        let region = match resource.on.first() {
            Some(AnnotationTarget::Region(region)) => region,
            Some(AnnotationTarget::Uri(_)) => {
                return Err(fail("target is a bare URI without a manifest reference"))
            }
            None => return Err(fail("annotation has no target")),
        };
        let manifest_url = region
            .within
            .as_ref()
            .map(|within| within.url())
            .ok_or_else(|| fail("target has no `within` manifest"))?;

        if !self.config.allows_manifest(manifest_url) {
            debug!(manifest = manifest_url, "manifest not on allow-list");
            return Ok(Outcome::Discarded);
        }

        let canvas_id = region
            .full
            .as_deref()
            .ok_or_else(|| fail("target has no canvas (`full`)"))?;
        let fragment = region
            .fragment()
            .ok_or_else(|| fail("target has no xywh selector"))?;
        let full_region = parse_xywh(fragment).map_err(|err| match err {
            TrainsetError::Annotation { message, .. } => fail(&message),
            other => other,
        })?;

        let image = self
            .manifests
            .load(self.fetcher, manifest_url)?
            .primary_image(canvas_id)
            .cloned()
            .ok_or_else(|| fail(&format!("canvas {canvas_id} not found in {manifest_url}")))?;

        let tags: TagSet = resource.tag_values().collect();
        let image_id = ImageKey::derive(canvas_id);
        let (full_w, full_h) = manifest_dimensions(&image)
            .or_else(|_| full_dimensions(self.fetcher, &image))?;
        let full_url = source_full_url(&image);

        let (resized_w, resized_h) = match context.image(&image_id) {
            Some(record) => (record.resized_width, record.resized_height),
            None => {
                let record = self.materialize(&image_id, &full_url, &image)?;
                let record = context.insert_image(record);
                (record.resized_width, record.resized_height)
            }
        };

        let bbox = resize_box(&full_region.to_xyxy(), full_w, full_h, resized_w, resized_h);
        if let Some(clips_dir) = self.clips_dir.clone() {
            self.save_clip(&clips_dir, &image_id, &full_url, &full_region, &tags);
        }

        context.push_annotation(
            &image_id,
            AnnotationRecord {
                tags,
                bbox,
                region: full_region,
            },
        );
        Ok(Outcome::Converted)
    }

    /// Fetches the bounded-size copy of an image and saves it as JPEG.
    fn materialize(
        &mut self,
        image_id: &ImageKey,
        full_url: &str,
        image: &ImageDescriptor,
    ) -> Result<ImageRecord, TrainsetError> {
        let [max_w, max_h] = self.config.max_resize;
        let url = resized_url(full_url, max_w, max_h);
        let decoded = fetch_image(self.fetcher, &url)?.to_rgb8();

        let path = self.images_dir.join(image_id.as_str());
        info!(image = %image_id, canvas = %image.canvas_id, "saving resized image");
        decoded
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|source| TrainsetError::ImageWrite { path, source })?;
        self.summary.images_fetched += 1;

        Ok(ImageRecord::new(
            image_id.clone(),
            decoded.width(),
            decoded.height(),
        ))
    }

    /// Saves a full-resolution crop of an annotated region. Failures are
    /// logged only.
    fn save_clip(
        &mut self,
        clips_dir: &Path,
        image_id: &ImageKey,
        full_url: &str,
        region: &Xywh<Full>,
        tags: &TagSet,
    ) {
        let path = clips_dir.join(clip_file_name(image_id, region, tags));
        let url = region_url(full_url, region);
        let result = fetch_image(self.fetcher, &url).and_then(|clip| {
            clip.to_rgb8()
                .save_with_format(&path, ImageFormat::Jpeg)
                .map_err(|source| TrainsetError::ImageWrite {
                    path: path.clone(),
                    source,
                })
        });
        match result {
            Ok(()) => {
                debug!(path = %path.display(), "saved clipping");
                self.summary.clips_saved += 1;
            }
            Err(err) => warn!(url = %url, error = %err, "failed to save clipping"),
        }
    }
}

/// `<image_id>.<X,Y,W,H>[_<reduced tag>].jpg`
pub fn clip_file_name(image_id: &ImageKey, region: &Xywh<Full>, tags: &TagSet) -> String {
    match reduce_tags(tags) {
        Some(tag) => format!("{image_id}.{region}_{tag}.jpg"),
        None => format!("{image_id}.{region}.jpg"),
    }
}

fn create_dir(path: &Path) -> Result<(), TrainsetError> {
    fs::create_dir_all(path).map_err(|source| TrainsetError::DirectorySetup {
        path: path.to_path_buf(),
        source,
    })
}
