//! Serde models for the IIIF Presentation 2 documents this crate reads.
//!
//! Only the fields the pipeline consumes are modelled; everything else is
//! ignored. Polymorphic fields (`resource`, `on`, `within`) are resolved into
//! tagged unions here, at the parsing boundary, so the rest of the crate never
//! inspects raw JSON.

pub mod image_api;
pub mod manifest;

use serde::Deserialize;
use serde_json::Value;

use crate::error::TrainsetError;

pub use manifest::{ImageDescriptor, ManifestEntry, ManifestIndex};

/// A JSON field that may hold a single value or an array of them.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.iter().next()
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

// ============================================================================
// Annotation lists
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
pub struct AnnotationList {
    #[serde(default)]
    pub resources: Vec<AnnotationResource>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnnotationResource {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub resource: OneOrMany<AnnotationBody>,
    #[serde(default)]
    pub on: OneOrMany<AnnotationTarget>,
}

impl AnnotationResource {
    pub fn is_annotation(&self) -> bool {
        self.kind.as_deref() == Some("oa:Annotation")
    }

    /// `chars` of every `oa:Tag` body, in document order.
    pub fn tag_values(&self) -> impl Iterator<Item = &str> {
        self.resource
            .iter()
            .filter(|body| body.kind.as_deref() == Some("oa:Tag"))
            .filter_map(|body| body.chars.as_deref())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnnotationBody {
    #[serde(rename = "@type")]
    pub kind: Option<String>,
    pub chars: Option<String>,
}

/// The `on` of an annotation: a structured region or a bare fragment URI.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum AnnotationTarget {
    Region(TargetRegion),
    Uri(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct TargetRegion {
    /// The canvas the region lies on.
    pub full: Option<String>,
    pub selector: Option<Selector>,
    pub within: Option<ManifestReference>,
}

impl TargetRegion {
    /// The `xywh=` fragment: `selector.default.value`, else `selector.value`.
    pub fn fragment(&self) -> Option<&str> {
        let selector = self.selector.as_ref()?;
        selector
            .default
            .as_ref()
            .and_then(|default| default.value.as_deref())
            .or(selector.value.as_deref())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Selector {
    #[serde(rename = "@type")]
    pub kind: Option<String>,
    pub value: Option<String>,
    pub default: Option<Box<Selector>>,
}

/// How an annotation points at its manifest.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ManifestReference {
    Identified {
        #[serde(rename = "@id")]
        id: String,
    },
    Bare(String),
}

impl ManifestReference {
    pub fn url(&self) -> &str {
        match self {
            ManifestReference::Identified { id } => id,
            ManifestReference::Bare(value) => value,
        }
    }
}

/// Parses an annotation list document fetched from `url`.
pub fn parse_annotation_list(bytes: &[u8], url: &str) -> Result<AnnotationList, TrainsetError> {
    serde_json::from_slice(bytes).map_err(|source| TrainsetError::AnnotationList {
        url: url.to_string(),
        source,
    })
}

// ============================================================================
// Manifests
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
pub struct Manifest {
    pub label: Option<Value>,
    pub sequences: Vec<Sequence>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sequence {
    pub canvases: Vec<Canvas>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Canvas {
    #[serde(rename = "@id")]
    pub id: String,
    pub images: Vec<ImageAnnotation>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ImageAnnotation {
    pub resource: ImageResource,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ImageResource {
    #[serde(rename = "@id")]
    pub id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub service: Option<OneOrMany<ImageService>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ImageService {
    #[serde(rename = "@id")]
    pub id: String,
}

/// Parses a manifest document fetched from `url`.
pub fn parse_manifest(bytes: &[u8], url: &str) -> Result<Manifest, TrainsetError> {
    serde_json::from_slice(bytes).map_err(|source| TrainsetError::Manifest {
        url: url.to_string(),
        message: source.to_string(),
    })
}

/// Plain-text form of a Presentation 2 `label`: a string, the first entry of
/// an array, an `@value` object, or the first value of a language map.
pub fn label_text(label: &Value) -> Option<String> {
    match label {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(label_text),
        Value::Object(map) => match map.get("@value") {
            Some(value) => label_text(value),
            None => map.values().find_map(label_text),
        },
        _ => None,
    }
}

/// Dimensions reported by an Image API `info.json`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#"{
        "@type": "sc:AnnotationList",
        "resources": [
            {
                "@id": "a1",
                "@type": "oa:Annotation",
                "resource": [
                    {"@type": "dctypes:Text", "chars": "<p>note</p>"},
                    {"@type": "oa:Tag", "chars": "figure"},
                    {"@type": "oa:Tag", "chars": "animal"}
                ],
                "on": [{
                    "@type": "oa:SpecificResource",
                    "full": "https://example.org/canvas/p1.json",
                    "selector": {"default": {"value": "xywh=1,2,3,4"}},
                    "within": {"@id": "https://example.org/manifest.json", "@type": "sc:Manifest"}
                }]
            },
            {
                "@type": "oa:Annotation",
                "resource": {"@type": "oa:Tag", "chars": "tree"},
                "on": {
                    "full": "https://example.org/canvas/p2.json",
                    "selector": {"value": "xywh=5,6,7,8"},
                    "within": "https://example.org/manifest.json"
                }
            },
            {"@type": "oa:Annotation", "on": "https://example.org/canvas/p3#xywh=0,0,1,1"}
        ]
    }"#;

    #[test]
    fn annotation_list_polymorphic_fields() {
        let list = parse_annotation_list(LIST.as_bytes(), "mem").expect("parse");
        assert_eq!(list.resources.len(), 3);

        let first = &list.resources[0];
        assert!(first.is_annotation());
        assert_eq!(first.tag_values().collect::<Vec<_>>(), vec!["figure", "animal"]);
        let AnnotationTarget::Region(region) = first.on.first().expect("target") else {
            panic!("expected structured region");
        };
        assert_eq!(region.fragment(), Some("xywh=1,2,3,4"));
        assert_eq!(
            region.within.as_ref().map(ManifestReference::url),
            Some("https://example.org/manifest.json")
        );

        let second = &list.resources[1];
        assert_eq!(second.tag_values().collect::<Vec<_>>(), vec!["tree"]);
        let AnnotationTarget::Region(region) = second.on.first().expect("target") else {
            panic!("expected structured region");
        };
        assert_eq!(region.fragment(), Some("xywh=5,6,7,8"));
        assert_eq!(
            region.within,
            Some(ManifestReference::Bare("https://example.org/manifest.json".into()))
        );

        assert!(matches!(
            list.resources[2].on.first(),
            Some(AnnotationTarget::Uri(_))
        ));
    }

    #[test]
    fn malformed_list_is_an_annotation_list_error() {
        let err = parse_annotation_list(b"{\"resources\": 3}", "mem").unwrap_err();
        assert!(matches!(err, TrainsetError::AnnotationList { .. }));
    }

    #[test]
    fn manifest_without_sequences_is_rejected() {
        let err = parse_manifest(br#"{"label": "x"}"#, "mem").unwrap_err();
        assert!(matches!(err, TrainsetError::Manifest { .. }));
    }

    #[test]
    fn label_text_handles_common_shapes() {
        assert_eq!(label_text(&serde_json::json!("Book")).as_deref(), Some("Book"));
        assert_eq!(
            label_text(&serde_json::json!([{"@value": "Livre", "@language": "fr"}])).as_deref(),
            Some("Livre")
        );
        assert_eq!(
            label_text(&serde_json::json!({"en": ["Book"]})).as_deref(),
            Some("Book")
        );
        assert_eq!(label_text(&serde_json::json!(7)), None);
    }
}
