//! Lazily populated index from manifest URL to its canvases and images.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::{label_text, parse_manifest, Manifest};
use crate::error::TrainsetError;
use crate::fetch::Fetcher;

/// One image resource painted on a canvas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub canvas_id: String,
    /// The resource `@id`, usually a full-size Image API request.
    pub source_url: String,
    pub full_width: Option<u32>,
    pub full_height: Option<u32>,
    pub service_url: Option<String>,
}

/// A loaded manifest: canvases in document order, each with all its images.
#[derive(Clone, Debug, Default)]
pub struct ManifestEntry {
    pub label: Option<String>,
    canvases: Vec<(String, Vec<ImageDescriptor>)>,
    index: HashMap<String, usize>,
}

impl ManifestEntry {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut entry = ManifestEntry {
            label: manifest.label.as_ref().and_then(label_text),
            ..Default::default()
        };

        for sequence in &manifest.sequences {
            for canvas in &sequence.canvases {
                let images = canvas.images.iter().map(|image| {
                    let resource = &image.resource;
                    ImageDescriptor {
                        canvas_id: canvas.id.clone(),
                        source_url: resource.id.clone(),
                        full_width: resource.width,
                        full_height: resource.height,
                        service_url: resource
                            .service
                            .as_ref()
                            .and_then(|service| service.first())
                            .map(|service| service.id.clone()),
                    }
                });

                match entry.index.get(&canvas.id) {
                    Some(&idx) => entry.canvases[idx].1.extend(images),
                    None => {
                        entry.index.insert(canvas.id.clone(), entry.canvases.len());
                        entry.canvases.push((canvas.id.clone(), images.collect()));
                    }
                }
            }
        }
        entry
    }

    /// All images of a canvas, in document order.
    pub fn images(&self, canvas_id: &str) -> Option<&[ImageDescriptor]> {
        self.index
            .get(canvas_id)
            .map(|&idx| self.canvases[idx].1.as_slice())
    }

    /// The image used when a canvas is treated as a single picture.
    pub fn primary_image(&self, canvas_id: &str) -> Option<&ImageDescriptor> {
        self.images(canvas_id).and_then(|images| images.last())
    }

    /// `(canvas_id, images)` pairs in document order.
    pub fn canvases(&self) -> impl Iterator<Item = (&str, &[ImageDescriptor])> {
        self.canvases
            .iter()
            .map(|(id, images)| (id.as_str(), images.as_slice()))
    }

    pub fn canvas_count(&self) -> usize {
        self.canvases.len()
    }
}

/// Manifests loaded during a run.
///
/// A manifest that failed to load is remembered and not fetched again.
#[derive(Debug, Default)]
pub struct ManifestIndex {
    entries: HashMap<String, ManifestEntry>,
    failed: HashSet<String>,
}

impl ManifestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, fetcher: &Fetcher, url: &str) -> Result<&ManifestEntry, TrainsetError> {
        if self.failed.contains(url) {
            return Err(TrainsetError::Manifest {
                url: url.to_string(),
                message: "previously failed to load".to_string(),
            });
        }

        if !self.entries.contains_key(url) {
            match fetch_manifest(fetcher, url) {
                Ok(entry) => {
                    debug!(url, canvases = entry.canvas_count(), "loaded manifest");
                    self.entries.insert(url.to_string(), entry);
                }
                Err(err) => {
                    warn!(url, error = %err, "manifest unavailable");
                    self.failed.insert(url.to_string());
                    return Err(err);
                }
            }
        }

        self.entries
            .get(url)
            .ok_or_else(|| TrainsetError::Manifest {
                url: url.to_string(),
                message: "missing from index".to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn fetch_manifest(fetcher: &Fetcher, url: &str) -> Result<ManifestEntry, TrainsetError> {
    let bytes = fetcher.get(url)?;
    let manifest = parse_manifest(&bytes, url)?;
    Ok(ManifestEntry::from_manifest(&manifest))
}
