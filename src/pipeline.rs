//! The `convert` run: ingestion, output assembly and validation.

use std::fs;

use tracing::info;

use crate::config::RunConfig;
use crate::error::TrainsetError;
use crate::fetch::Fetcher;
use crate::ingest::{IngestSummary, Ingestor};
use crate::ir::io_training_set::{write_label_map, write_trainval};
use crate::ir::io_voc_xml::write_voc_xmls;
use crate::ir::{LabelCatalog, RunContext};
use crate::validation::{validate_context, ValidationReport};

/// Everything a conversion run produced besides the files themselves.
#[derive(Debug)]
pub struct ConvertOutput {
    pub summary: IngestSummary,
    pub report: ValidationReport,
    pub context: RunContext,
    pub labels: LabelCatalog,
}

/// Converts every annotation list in `config.source_urls` into a training
/// set under `config.output_dir`.
///
/// Output assembly starts only after all lists are ingested; the context is
/// not modified after that point.
pub fn convert(config: &RunConfig, fetcher: &Fetcher) -> Result<ConvertOutput, TrainsetError> {
    let mut context = RunContext::new();
    let mut ingestor = Ingestor::new(fetcher, config)?;
    ingestor.ingest_all(&mut context, &config.source_urls);
    let summary = ingestor.into_summary();
    info!(%summary, "ingestion finished");

    let labels = write_outputs(config, &context)?;
    let report = validate_context(&context);

    Ok(ConvertOutput {
        summary,
        report,
        context,
        labels,
    })
}

/// Writes the VOC XML files, the training list and the label map.
pub fn write_outputs(config: &RunConfig, context: &RunContext) -> Result<LabelCatalog, TrainsetError> {
    let xmls_dir = config.xmls_dir();
    let written = write_voc_xmls(&xmls_dir, context, config.object_mode, &config.project_name)?;
    info!(count = written, dir = %xmls_dir.display(), "wrote XML annotation files");

    let trainval = config.trainval_path();
    write_trainval(&trainval, context)?;
    info!(path = %trainval.display(), images = context.image_count(), "wrote training list");

    let labels = LabelCatalog::from_context(context, config.object_mode);
    fs::create_dir_all(&config.output_dir).map_err(|source| TrainsetError::DirectorySetup {
        path: config.output_dir.clone(),
        source,
    })?;
    let label_map = config.label_map_path();
    write_label_map(&label_map, &labels)?;
    info!(path = %label_map.display(), labels = labels.len(), "wrote label map");

    Ok(labels)
}
