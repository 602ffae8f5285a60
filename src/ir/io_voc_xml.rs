//! Pascal VOC XML writer.
//!
//! Writes one XML file per materialized image into `annotations/xmls/`, named
//! after the image's base ID. Boxes are already in resized pixel space.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::debug;

use super::model::{ImageEntry, RunContext};
use super::tags::{object_labels, ObjectMode};
use crate::error::TrainsetError;

const VOC_XML_EXTENSION: &str = "xml";

/// Images are always saved as 3-channel JPEGs.
const IMAGE_DEPTH: u32 = 3;

/// Write one VOC XML file per image in `context` into `xmls_dir`.
///
/// `folder` is written verbatim into each `<folder>` element. Returns the
/// number of files written.
pub fn write_voc_xmls(
    xmls_dir: &Path,
    context: &RunContext,
    mode: ObjectMode,
    folder: &str,
) -> Result<usize, TrainsetError> {
    fs::create_dir_all(xmls_dir).map_err(|source| TrainsetError::DirectorySetup {
        path: xmls_dir.to_path_buf(),
        source,
    })?;

    let mut written = 0;
    for entry in context.entries() {
        let xml_path = xmls_dir.join(format!(
            "{}.{}",
            entry.record.image_id.base_id(),
            VOC_XML_EXTENSION
        ));
        debug!(path = %xml_path.display(), "writing XML annotation file");
        fs::write(&xml_path, voc_xml_string(entry, mode, folder)).map_err(TrainsetError::Io)?;
        written += 1;
    }

    Ok(written)
}

/// Render the VOC XML document for a single image.
pub fn voc_xml_string(entry: &ImageEntry, mode: ObjectMode, folder: &str) -> String {
    let record = &entry.record;
    let mut xml = String::new();

    writeln!(xml, "<?xml version=\"1.0\" encoding=\"utf-8\"?>").expect("write to string");
    writeln!(xml, "<annotation>").expect("write to string");
    writeln!(xml, "  <folder>{}</folder>", xml_escape(folder)).expect("write to string");
    writeln!(
        xml,
        "  <filename>{}</filename>",
        xml_escape(record.image_id.base_id())
    )
    .expect("write to string");
    writeln!(xml, "  <size>").expect("write to string");
    writeln!(xml, "    <width>{}</width>", record.resized_width).expect("write to string");
    writeln!(xml, "    <height>{}</height>", record.resized_height).expect("write to string");
    writeln!(xml, "    <depth>{}</depth>", IMAGE_DEPTH).expect("write to string");
    writeln!(xml, "  </size>").expect("write to string");
    writeln!(xml, "  <segmented>0</segmented>").expect("write to string");

    for annotation in &entry.annotations {
        for label in object_labels(&annotation.tags, mode) {
            let bbox = &annotation.bbox;
            writeln!(xml, "  <object>").expect("write to string");
            writeln!(xml, "    <name>{}</name>", xml_escape(label)).expect("write to string");
            writeln!(xml, "    <bndbox>").expect("write to string");
            writeln!(xml, "      <xmin>{}</xmin>", bbox.xmin()).expect("write to string");
            writeln!(xml, "      <ymin>{}</ymin>", bbox.ymin()).expect("write to string");
            writeln!(xml, "      <xmax>{}</xmax>", bbox.xmax()).expect("write to string");
            writeln!(xml, "      <ymax>{}</ymax>", bbox.ymax()).expect("write to string");
            writeln!(xml, "    </bndbox>").expect("write to string");
            writeln!(xml, "  </object>").expect("write to string");
        }
    }

    writeln!(xml, "</annotation>").expect("write to string");
    xml
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
