//! Incremental IIIF JSON writers for detected regions.
//!
//! Both the annotation list and the curation document are written while
//! batches are processed, so neither has to be held in memory. The framing is
//! fixed: a header, the first element followed by a newline, every later
//! element prefixed with `,` and followed by a newline, then a footer. The
//! result is always a well-formed JSON document; element bodies are
//! serialized by `serde_json` from typed structs so their key order is stable.
//!
//! Elements are written compactly, with no space after `,` or `:`. Files
//! from older tools that used `", "` and `": "` separators share this
//! framing and parse to the same values, but are not byte-identical.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use super::bbox::Xywh;
use super::space::Full;
use crate::error::TrainsetError;

const PRESENTATION_CONTEXT: &str = "http://iiif.io/api/presentation/2/context.json";
const CURATION_CONTEXT: &str = "http://codh.rois.ac.jp/iiif/curation/1/context.json";
const DOCUMENT_FOOTER: &str = " ] }";

/// A JSON array written one element at a time.
///
/// The stream owns only the element separators; the caller writes whatever
/// surrounds the array.
pub struct JsonArrayStream<W: Write> {
    writer: W,
    is_first: bool,
}

impl<W: Write> JsonArrayStream<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            is_first: true,
        }
    }

    /// Writes literal framing text.
    pub fn write_raw(&mut self, text: &str) -> std::io::Result<()> {
        self.writer.write_all(text.as_bytes())
    }

    /// Serializes one element, prefixing a comma unless it is the first.
    pub fn push<T: Serialize>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        if !self.is_first {
            self.writer
                .write_all(b",")
                .map_err(serde_json::Error::io)?;
        }
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer
            .write_all(b"\n")
            .map_err(serde_json::Error::io)?;
        self.is_first = false;
        Ok(())
    }

    /// Starts a new (nested) array: the next element is first again.
    pub fn restart(&mut self) {
        self.is_first = true;
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Streams an `sc:AnnotationList` document.
pub struct AnnotationListWriter<W: Write> {
    stream: JsonArrayStream<W>,
    path: PathBuf,
}

impl<W: Write> AnnotationListWriter<W> {
    /// Writes the document header. `path` is only used in error messages.
    pub fn new(writer: W, path: &Path, list_id: &str) -> Result<Self, TrainsetError> {
        let mut stream = JsonArrayStream::new(writer);
        let header = format!(
            "{{\"@id\": {}, \"@context\": {}, \"@type\": \"sc:AnnotationList\", \"resources\": [ ",
            json_string(list_id),
            json_string(PRESENTATION_CONTEXT)
        );
        stream.write_raw(&header).map_err(TrainsetError::Io)?;
        Ok(Self {
            stream,
            path: path.to_path_buf(),
        })
    }

    pub fn push(&mut self, annotation: &RegionAnnotation) -> Result<(), TrainsetError> {
        self.stream
            .push(annotation)
            .map_err(|source| TrainsetError::JsonWrite {
                path: self.path.clone(),
                source,
            })
    }

    /// Writes the footer and flushes, returning the underlying writer.
    pub fn finish(mut self) -> Result<W, TrainsetError> {
        self.stream
            .write_raw(DOCUMENT_FOOTER)
            .map_err(TrainsetError::Io)?;
        self.stream.flush().map_err(TrainsetError::Io)?;
        Ok(self.stream.into_inner())
    }
}

/// Streams a `cr:Curation` document with one `sc:Range` per manifest.
pub struct CurationWriter<W: Write> {
    stream: JsonArrayStream<W>,
    path: PathBuf,
    is_first_range: bool,
}

impl<W: Write> CurationWriter<W> {
    /// Writes the document header. `path` is only used in error messages.
    pub fn new(writer: W, path: &Path, curation_id: &str) -> Result<Self, TrainsetError> {
        let mut stream = JsonArrayStream::new(writer);
        let header = format!(
            "{{ \"@context\": [ {}, {} ], \"@type\": \"cr:Curation\", \"@id\": {}, \"label\": \"Curation list\", \"selections\": [ ",
            json_string(PRESENTATION_CONTEXT),
            json_string(CURATION_CONTEXT),
            json_string(curation_id)
        );
        stream.write_raw(&header).map_err(TrainsetError::Io)?;
        Ok(Self {
            stream,
            path: path.to_path_buf(),
            is_first_range: true,
        })
    }

    /// Opens the range collecting selections for `manifest_url`.
    pub fn begin_range(&mut self, manifest_url: &str, label: &str) -> Result<(), TrainsetError> {
        if !self.is_first_range {
            self.stream.write_raw(", ").map_err(TrainsetError::Io)?;
        }
        self.is_first_range = false;

        let header = format!(
            "{{ \"@id\": {}, \"@type\": \"sc:Range\", \"label\": {}, \"members\": [",
            json_string(&format!("{manifest_url}/range/r1")),
            json_string(label)
        );
        self.stream.write_raw(&header).map_err(TrainsetError::Io)?;
        self.stream.restart();
        Ok(())
    }

    pub fn push(&mut self, member: &CurationMember) -> Result<(), TrainsetError> {
        self.stream
            .push(member)
            .map_err(|source| TrainsetError::JsonWrite {
                path: self.path.clone(),
                source,
            })
    }

    /// Closes the current range with its `within` manifest reference.
    pub fn end_range(&mut self, manifest_url: &str, project_label: &str) -> Result<(), TrainsetError> {
        let footer = format!(
            "], \"within\": {{ \"@id\": {}, \"@type\": \"sc:Manifest\", \"label\": {} }} }}",
            json_string(manifest_url),
            json_string(project_label)
        );
        self.stream.write_raw(&footer).map_err(TrainsetError::Io)
    }

    /// Writes the footer and flushes, returning the underlying writer.
    pub fn finish(mut self) -> Result<W, TrainsetError> {
        self.stream
            .write_raw(DOCUMENT_FOOTER)
            .map_err(TrainsetError::Io)?;
        self.stream.flush().map_err(TrainsetError::Io)?;
        Ok(self.stream.into_inner())
    }
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

// ============================================================================
// Element types
// ============================================================================

/// An `oa:Annotation` tagging one region of a canvas.
#[derive(Debug, Serialize)]
pub struct RegionAnnotation {
    #[serde(rename = "@type")]
    kind: &'static str,
    motivation: [&'static str; 2],
    resource: [AnnotationBody; 2],
    on: [AnnotationTarget; 1],
    #[serde(rename = "@context")]
    context: &'static str,
}

#[derive(Debug, Serialize)]
struct AnnotationBody {
    #[serde(rename = "@id")]
    id: &'static str,
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "http://dev.llgc.org.uk/sas/full_text")]
    full_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    chars: String,
}

#[derive(Debug, Serialize)]
struct AnnotationTarget {
    #[serde(rename = "@id")]
    id: &'static str,
    #[serde(rename = "@type")]
    kind: &'static str,
    within: ManifestRef,
    selector: ChoiceSelector,
    full: String,
}

#[derive(Debug, Serialize)]
struct ManifestRef {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChoiceSelector {
    #[serde(rename = "@id")]
    id: &'static str,
    #[serde(rename = "@type")]
    kind: &'static str,
    default: ValueSelector,
    item: ValueSelector,
}

#[derive(Debug, Serialize)]
struct ValueSelector {
    #[serde(rename = "@id")]
    id: &'static str,
    #[serde(rename = "@type")]
    kind: &'static str,
    value: String,
}

impl RegionAnnotation {
    /// Builds the annotation for `region` (full-resolution pixels) on
    /// `canvas_id`, tagged with `tag`. `svg_id` names the SVG rectangle.
    pub fn new(
        manifest_url: &str,
        canvas_id: &str,
        region: &Xywh<Full>,
        tag: &str,
        svg_id: Uuid,
    ) -> Self {
        // `full` must stay the bare canvas ID: importers reject a fragment there.
        Self {
            kind: "oa:Annotation",
            motivation: ["oa:commenting", "oa:tagging"],
            resource: [
                AnnotationBody {
                    id: "_:b2",
                    kind: "dctypes:Text",
                    full_text: String::new(),
                    format: Some("text/html"),
                    chars: String::new(),
                },
                AnnotationBody {
                    id: "_:b3",
                    kind: "oa:Tag",
                    full_text: tag.to_string(),
                    format: None,
                    chars: tag.to_string(),
                },
            ],
            on: [AnnotationTarget {
                id: "_:b0",
                kind: "oa:SpecificResource",
                within: ManifestRef {
                    id: manifest_url.to_string(),
                    kind: "sc:Manifest",
                },
                selector: ChoiceSelector {
                    id: "_:b1",
                    kind: "oa:Choice",
                    default: ValueSelector {
                        id: "_:b4",
                        kind: "oa:FragmentSelector",
                        value: format!("xywh={region}"),
                    },
                    item: ValueSelector {
                        id: "_:b5",
                        kind: "oa:SvgSelector",
                        value: svg_rectangle(region, svg_id),
                    },
                },
                full: canvas_id.to_string(),
            }],
            context: PRESENTATION_CONTEXT,
        }
    }
}

/// One curated canvas region.
#[derive(Debug, Serialize)]
pub struct CurationMember {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    label: String,
    metadata: [MetadataEntry; 2],
}

#[derive(Debug, Serialize)]
struct MetadataEntry {
    label: &'static str,
    value: String,
}

impl CurationMember {
    pub fn new(canvas_id: &str, label: &str, region: &Xywh<Full>, tag: &str, proportion: f64) -> Self {
        Self {
            id: format!("{canvas_id}#xywh={region}"),
            kind: "sc:Canvas",
            label: label.to_string(),
            metadata: [
                MetadataEntry {
                    label: "tag",
                    value: tag.to_string(),
                },
                MetadataEntry {
                    label: "proportion",
                    value: proportion_label(proportion),
                },
            ],
        }
    }
}

/// Renders a region's share of its image: `<.01` for tiny regions, otherwise
/// rounded to two decimals.
///
/// Halves round away from zero, so `0.125` renders as `0.13` rather than the
/// banker's `0.12`.
pub fn proportion_label(proportion: f64) -> String {
    if proportion < 0.01 {
        "<.01".to_string()
    } else {
        float_repr((proportion * 100.0).round() / 100.0)
    }
}

/// SVG rectangle in the shape produced by common IIIF annotation editors:
/// a path starting at the top-left corner drawn in half-width and
/// half-height steps.
pub fn svg_rectangle(region: &Xywh<Full>, svg_id: Uuid) -> String {
    let x = float_repr(region.x as f64);
    let y = float_repr(region.y as f64);
    let half_w = float_repr(region.w as f64 / 2.0);
    let half_h = float_repr(region.h as f64 / 2.0);

    let path = format!(
        "M{x},{y}h{half_w}h{half_w}v{half_h}v{half_h}h-{half_w}h-{half_w}v-{half_h}z"
    );

    format!(
        "<svg xmlns='http://www.w3.org/2000/svg'><path xmlns=\"http://www.w3.org/2000/svg\" d=\"{path}\" \
data-paper-data=\"{{&quot;strokeWidth&quot;:1,&quot;rotation&quot;:0,&quot;deleteIcon&quot;:null,&quot;rotationIcon&quot;:null,&quot;group&quot;:null,&quot;editable&quot;:true,&quot;annotation&quot;:null}}\" \
id=\"rectangle_{svg_id}\" fill-opacity=\"0\" fill=\"#00bfff\" fill-rule=\"nonzero\" stroke=\"#00bfff\" stroke-width=\"1\" \
stroke-linecap=\"butt\" stroke-linejoin=\"miter\" stroke-miterlimit=\"10\" stroke-dasharray=\"\" stroke-dashoffset=\"0\" \
font-family=\"none\" font-weight=\"none\" font-size=\"none\" text-anchor=\"none\" style=\"mix-blend-mode: normal\"/></svg>"
    )
}

/// Float formatting that always shows a fractional part (`12.0`, `6.5`).
fn float_repr(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Xywh<Full> {
        Xywh::new(1557, 1770, 985, 621)
    }

    #[test]
    fn json_array_stream_uses_leading_commas() {
        let mut stream = JsonArrayStream::new(Vec::new());
        stream.write_raw("[").expect("header");
        stream.push(&1).expect("first");
        stream.push(&2).expect("second");
        stream.write_raw("]").expect("footer");

        let text = String::from_utf8(stream.into_inner()).expect("utf8");
        assert_eq!(text, "[1\n,2\n]");
    }

    #[test]
    fn json_array_stream_elements_are_compact() {
        let mut stream = JsonArrayStream::new(Vec::new());
        stream
            .push(&serde_json::json!({ "a": 1, "b": [1, 2] }))
            .expect("element");

        let text = String::from_utf8(stream.into_inner()).expect("utf8");
        assert_eq!(text, "{\"a\":1,\"b\":[1,2]}\n");
    }

    #[test]
    fn annotation_list_is_well_formed() {
        let mut writer =
            AnnotationListWriter::new(Vec::new(), Path::new("mem.json"), "https://example.org/list")
                .expect("header");
        for _ in 0..2 {
            writer
                .push(&RegionAnnotation::new(
                    "https://example.org/manifest.json",
                    "https://example.org/canvas/1",
                    &region(),
                    "face",
                    Uuid::nil(),
                ))
                .expect("push");
        }
        let bytes = writer.finish().expect("finish");
        let text = String::from_utf8(bytes).expect("utf8");
        assert!(text.starts_with("{\"@id\": \"https://example.org/list\", "));
        assert!(text.ends_with("\n ] }"));

        let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        let resources = value["resources"].as_array().expect("resources");
        assert_eq!(resources.len(), 2);
        assert_eq!(
            resources[0]["on"][0]["selector"]["default"]["value"],
            "xywh=1557,1770,985,621"
        );
        assert_eq!(resources[0]["resource"][1]["chars"], "face");
        assert_eq!(resources[0]["on"][0]["full"], "https://example.org/canvas/1");
    }

    #[test]
    fn empty_annotation_list_is_well_formed() {
        let writer = AnnotationListWriter::new(Vec::new(), Path::new("mem.json"), "list")
            .expect("header");
        let text = String::from_utf8(writer.finish().expect("finish")).expect("utf8");
        let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        assert!(value["resources"].as_array().expect("array").is_empty());
    }

    #[test]
    fn curation_nests_one_range_per_manifest() {
        let mut writer =
            CurationWriter::new(Vec::new(), Path::new("mem.json"), "urn:curation/json/1")
                .expect("header");
        for manifest in ["https://a.org/m.json", "https://b.org/m.json"] {
            writer.begin_range(manifest, "Detected").expect("begin");
            writer
                .push(&CurationMember::new("canvas-1", "p1.jpg", &region(), "face", 0.004))
                .expect("push");
            writer
                .push(&CurationMember::new("canvas-2", "p2.jpg", &region(), "face", 0.256))
                .expect("push");
            writer.end_range(manifest, "project").expect("end");
        }
        let text = String::from_utf8(writer.finish().expect("finish")).expect("utf8");

        let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        let selections = value["selections"].as_array().expect("selections");
        assert_eq!(selections.len(), 2);
        assert_eq!(selections[1]["@id"], "https://b.org/m.json/range/r1");
        assert_eq!(selections[1]["within"]["label"], "project");

        let members = selections[0]["members"].as_array().expect("members");
        assert_eq!(members[0]["@id"], "canvas-1#xywh=1557,1770,985,621");
        assert_eq!(members[0]["metadata"][1]["value"], "<.01");
        assert_eq!(members[1]["metadata"][1]["value"], "0.26");
    }

    #[test]
    fn svg_path_walks_half_steps() {
        let svg = svg_rectangle(&region(), Uuid::nil());
        assert!(svg.contains(
            "d=\"M1557.0,1770.0h492.5h492.5v310.5v310.5h-492.5h-492.5v-310.5z\""
        ));
        assert!(svg.contains("id=\"rectangle_00000000-0000-0000-0000-000000000000\""));
    }

    #[test]
    fn proportion_labels() {
        assert_eq!(proportion_label(0.0099), "<.01");
        assert_eq!(proportion_label(0.01), "0.01");
        assert_eq!(proportion_label(0.5), "0.5");
        assert_eq!(proportion_label(1.0), "1.0");
    }

    #[test]
    fn proportion_label_rounds_halves_away_from_zero() {
        assert_eq!(proportion_label(0.125), "0.13");
        assert_eq!(proportion_label(0.375), "0.38");
        assert_eq!(proportion_label(0.124), "0.12");
    }
}
