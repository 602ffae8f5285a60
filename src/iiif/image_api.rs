//! IIIF Image API request rewriting and image retrieval.
//!
//! Canvas images are referenced by full-size requests of the form
//! `<service>/full/full/0/default.jpg`. Resized copies and region crops are
//! obtained by rewriting the `full/full` region/size pair.

use image::DynamicImage;
use tracing::warn;

use super::manifest::ImageDescriptor;
use super::ImageInfo;
use crate::error::TrainsetError;
use crate::fetch::Fetcher;
use crate::ir::{Full, Xywh};

const FULL_REGION_SIZE: &str = "full/full";
const FULL_IMAGE_SUFFIX: &str = "/full/full/0/default.jpg";

/// Requests a copy that fits in `max_width` x `max_height`, keeping aspect.
pub fn resized_url(full_url: &str, max_width: u32, max_height: u32) -> String {
    full_url.replacen(
        FULL_REGION_SIZE,
        &format!("full/!{max_width},{max_height}"),
        1,
    )
}

/// Requests a full-resolution crop of `region`.
pub fn region_url(full_url: &str, region: &Xywh<Full>) -> String {
    full_url.replacen(FULL_REGION_SIZE, &format!("{region}/full"), 1)
}

/// The full-size request for an image, as a face run makes it.
///
/// Some manifests give a bare image identifier as the resource `@id`; any
/// `@id` not ending in `/full/full/0/default.jpg` is replaced by the service
/// `@id`, with that suffix appended when it is missing.
pub fn canonical_full_url(image: &ImageDescriptor) -> String {
    if image.source_url.contains(FULL_IMAGE_SUFFIX) {
        return image.source_url.clone();
    }
    match image.service_url.as_deref() {
        Some(service) => service_full_url(service),
        None => image.source_url.clone(),
    }
}

/// The full-size request for an image, as a conversion run makes it.
///
/// The resource `@id` is used unchanged whenever it has a `full/full`
/// region/size pair to rewrite, whatever its quality and format. Only an
/// `@id` without one falls back to the service.
pub fn source_full_url(image: &ImageDescriptor) -> String {
    if image.source_url.contains(FULL_REGION_SIZE) {
        return image.source_url.clone();
    }
    match image.service_url.as_deref() {
        Some(service) => service_full_url(service),
        None => image.source_url.clone(),
    }
}

fn service_full_url(service: &str) -> String {
    if service.contains(FULL_IMAGE_SUFFIX) {
        return service.to_string();
    }
    let expanded = format!("{}{}", service.trim_end_matches('/'), FULL_IMAGE_SUFFIX);
    warn!(id = service, expanded = %expanded, "irregular image ID, expanding");
    expanded
}

pub fn info_url(service_url: &str) -> String {
    format!("{}/info.json", service_url.trim_end_matches('/'))
}

/// Fetches and decodes an image.
pub fn fetch_image(fetcher: &Fetcher, url: &str) -> Result<DynamicImage, TrainsetError> {
    let bytes = fetcher.get(url)?;
    image::load_from_memory(&bytes).map_err(|source| TrainsetError::ImageDecode {
        url: url.to_string(),
        source,
    })
}

/// Full-resolution dimensions of an image.
///
/// The image server's `info.json` is preferred because manifests sometimes
/// misreport sizes; the manifest values are the fallback.
pub fn full_dimensions(
    fetcher: &Fetcher,
    image: &ImageDescriptor,
) -> Result<(u32, u32), TrainsetError> {
    if let Some(service) = image.service_url.as_deref() {
        let url = info_url(service);
        match fetcher.get_json::<ImageInfo>(&url) {
            Ok(info) if info.width > 0 && info.height > 0 => return Ok((info.width, info.height)),
            Ok(_) => warn!(url = %url, "info.json reports an empty image, using manifest dimensions"),
            Err(err) => warn!(url = %url, error = %err, "error getting image info, using manifest dimensions"),
        }
    }
    manifest_dimensions(image)
}

/// Dimensions declared in the manifest.
pub fn manifest_dimensions(image: &ImageDescriptor) -> Result<(u32, u32), TrainsetError> {
    match (image.full_width, image.full_height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => Ok((width, height)),
        _ => Err(TrainsetError::Manifest {
            url: image.canvas_id.clone(),
            message: format!("no usable dimensions for image {}", image.source_url),
        }),
    }
}
