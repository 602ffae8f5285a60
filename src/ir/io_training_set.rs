//! Training list (`trainval.txt`) and label map (`label_map.pbtxt`) writers.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::model::{LabelCatalog, RunContext};
use crate::error::TrainsetError;

/// Write the training list: one base image ID per line, in first-seen order.
pub fn write_trainval(path: &Path, context: &RunContext) -> Result<(), TrainsetError> {
    let mut writer = BufWriter::new(File::create(path).map_err(TrainsetError::Io)?);
    writer
        .write_all(trainval_string(context).as_bytes())
        .map_err(TrainsetError::Io)?;
    writer.flush().map_err(TrainsetError::Io)
}

/// Render the training list.
pub fn trainval_string(context: &RunContext) -> String {
    let mut out = String::new();
    for entry in context.entries() {
        writeln!(out, "{}", entry.record.image_id.base_id()).expect("write to string");
    }
    out
}

/// Write the label map in the protobuf text format used by the TensorFlow
/// object detection API.
pub fn write_label_map(path: &Path, catalog: &LabelCatalog) -> Result<(), TrainsetError> {
    let mut writer = BufWriter::new(File::create(path).map_err(TrainsetError::Io)?);
    writer
        .write_all(label_map_string(catalog).as_bytes())
        .map_err(TrainsetError::Io)?;
    writer.flush().map_err(TrainsetError::Io)
}

/// Render the label map.
pub fn label_map_string(catalog: &LabelCatalog) -> String {
    let mut out = String::new();
    for (id, label) in catalog.iter() {
        let quoted = pbtxt_escape(label);
        write!(
            out,
            "item {{\n id: {id}\n name: '{quoted}'\n display_name: '{quoted}'\n}}\n"
        )
        .expect("write to string");
    }
    out
}

fn pbtxt_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}
