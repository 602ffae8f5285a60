//! Run configuration.
//!
//! A [`RunConfig`] can be loaded from a YAML or JSON file (chosen by
//! extension) and is then overridden field by field from the command line.
//! Every field has a default, so an empty file is a valid configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TrainsetError;
use crate::ir::ObjectMode;

/// Largest accepted number of 2x upscales before face detection.
pub const MAX_UPSAMPLE: u32 = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Annotation lists (`convert`) or manifests (`faces`).
    pub source_urls: Vec<String>,
    /// When set, only annotations on these manifests are converted.
    pub allowed_manifests: Option<Vec<String>>,
    pub cache_enabled: bool,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub clip_images: bool,
    /// Faces mode: detect on every image of a canvas instead of the last one.
    pub harvest_all: bool,
    pub batch_size: usize,
    pub upsample: u32,
    /// Bounding box requested from the image server as `!W,H`.
    pub max_resize: [u32; 2],
    pub project_name: String,
    pub object_mode: ObjectMode,
    pub min_face_proportion: Option<f64>,
    pub model_path: Option<PathBuf>,
    pub annotation_list_id: String,
    pub curation_base_url: String,
    pub range_label: String,
    pub request_timeout_secs: u64,
    pub retry_backoff_ms: u64,
    pub skip_cooldown_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source_urls: Vec::new(),
            allowed_manifests: None,
            cache_enabled: true,
            cache_dir: PathBuf::from("cache"),
            output_dir: PathBuf::from("."),
            clip_images: false,
            harvest_all: true,
            batch_size: 16,
            upsample: 1,
            max_resize: [1000, 1000],
            project_name: "iiif_trainset".to_string(),
            object_mode: ObjectMode::PerTag,
            min_face_proportion: None,
            model_path: None,
            annotation_list_id: "urn:iiif-trainset:face-annotations".to_string(),
            curation_base_url: "urn:iiif-trainset".to_string(),
            range_label: "Objects detected by face detection".to_string(),
            request_timeout_secs: 60,
            retry_backoff_ms: 1000,
            skip_cooldown_ms: 10_000,
        }
    }
}

impl RunConfig {
    /// Reads a configuration file. `.json` files are parsed as JSON, anything
    /// else as YAML.
    pub fn load(path: &Path) -> Result<Self, TrainsetError> {
        let file = File::open(path).map_err(TrainsetError::Io)?;
        let reader = BufReader::new(file);

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_reader(reader).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_reader(reader).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| TrainsetError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Checks ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), TrainsetError> {
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be at least 1"));
        }
        if self.upsample > MAX_UPSAMPLE {
            return Err(invalid(format!(
                "upsample must be at most {MAX_UPSAMPLE}, got {}",
                self.upsample
            )));
        }
        if self.max_resize.contains(&0) {
            return Err(invalid("max_resize bounds must be positive"));
        }
        if let Some(proportion) = self.min_face_proportion {
            if !(0.0..=1.0).contains(&proportion) {
                return Err(invalid(format!(
                    "min_face_proportion must lie in [0, 1], got {proportion}"
                )));
            }
        }
        for source in &self.source_urls {
            url::Url::parse(source)
                .map_err(|e| invalid(format!("source '{source}' is not a URL: {e}")))?;
        }
        Ok(())
    }

    /// Whether annotations on `manifest_url` should be converted.
    pub fn allows_manifest(&self, manifest_url: &str) -> bool {
        match &self.allowed_manifests {
            Some(allowed) => allowed.iter().any(|m| m == manifest_url),
            None => true,
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join("images")
    }

    pub fn xmls_dir(&self) -> PathBuf {
        self.output_dir.join("annotations").join("xmls")
    }

    pub fn trainval_path(&self) -> PathBuf {
        self.output_dir.join("annotations").join("trainval.txt")
    }

    pub fn label_map_path(&self) -> PathBuf {
        self.output_dir.join("label_map.pbtxt")
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.output_dir.join("output")
    }

    pub fn face_annotations_path(&self) -> PathBuf {
        self.output_dir.join("face_annotations.json")
    }

    pub fn face_curation_path(&self) -> PathBuf {
        self.output_dir.join("face_curation.json")
    }
}

fn invalid(message: impl Into<String>) -> TrainsetError {
    TrainsetError::InvalidConfig {
        message: message.into(),
    }
}
