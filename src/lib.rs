//! iiif-trainset: turn IIIF annotation streams into object-detection
//! training sets.
//!
//! Human-made IIIF annotations (tagged `xywh` regions on manifest canvases)
//! are converted into resized JPEGs, Pascal VOC XML files, a training list and
//! a label map. A second mode runs a face detector over whole manifests and
//! publishes the results back as IIIF annotation and curation documents.
//!
//! # Modules
//!
//! - [`ir`]: Coordinate spaces, image IDs, run tables and output writers
//! - [`iiif`]: IIIF Presentation/Image API models and manifest index
//! - [`fetch`]: Network transport and the content cache
//! - [`ingest`]: Annotation-list ingestion
//! - [`faces`]: Batched face detection
//! - [`validation`]: Consistency checks and error reporting
//! - [`config`]: Run configuration
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod faces;
pub mod fetch;
pub mod iiif;
pub mod ingest;
pub mod ir;
pub mod pipeline;
pub mod validation;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

pub use config::RunConfig;
pub use error::TrainsetError;

use fetch::{Fetcher, HttpTransport};
use ir::ObjectMode;
use validation::ValidateOptions;

/// The iiif-trainset CLI application.
#[derive(Parser)]
#[command(name = "iiif-trainset")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert annotation lists into a VOC training set.
    Convert(ConvertArgs),
    /// Detect faces in manifests and emit IIIF annotations and a curation.
    Faces(FacesArgs),
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// YAML or JSON configuration file.
    #[arg(long, env = "IIIF_TRAINSET_CONFIG")]
    config: Option<PathBuf>,

    /// Annotation list URL (repeatable).
    #[arg(long = "source", value_name = "URL")]
    sources: Vec<String>,

    /// Only convert annotations on this manifest (repeatable).
    #[arg(long = "allow", value_name = "URL")]
    allow: Vec<String>,

    /// Output root directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fetch everything from the network, bypassing the cache.
    #[arg(long)]
    no_cache: bool,

    /// Save a full-resolution clipping of every annotated region.
    #[arg(long)]
    clip: bool,

    /// How annotation tags become VOC objects.
    #[arg(long, value_enum)]
    object_mode: Option<ObjectModeArg>,

    /// Fail if validation reports any issue (outputs are still written).
    #[arg(long)]
    strict: bool,
}

/// Arguments for the faces subcommand.
#[derive(clap::Args)]
struct FacesArgs {
    /// YAML or JSON configuration file.
    #[arg(long, env = "IIIF_TRAINSET_CONFIG")]
    config: Option<PathBuf>,

    /// Manifest URL (repeatable).
    #[arg(long = "manifest", value_name = "URL")]
    manifests: Vec<String>,

    /// SeetaFace model file.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Output root directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum number of same-size images per detector call.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Number of 2x upscales before detection (0-3).
    #[arg(long)]
    upsample: Option<u32>,

    /// Drop faces covering less than this share of the image.
    #[arg(long)]
    min_face_proportion: Option<f64>,

    /// Fetch everything from the network, bypassing the cache.
    #[arg(long)]
    no_cache: bool,

    /// Save a clipping of every detected face.
    #[arg(long)]
    clip: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ObjectModeArg {
    PerTag,
    Reduced,
}

impl From<ObjectModeArg> for ObjectMode {
    fn from(arg: ObjectModeArg) -> Self {
        match arg {
            ObjectModeArg::PerTag => ObjectMode::PerTag,
            ObjectModeArg::Reduced => ObjectMode::Reduced,
        }
    }
}

/// Run the iiif-trainset CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), TrainsetError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Faces(args)) => run_faces(args),
        None => {
            // No subcommand: just print help hint and exit successfully
            println!("iiif-trainset {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Turn IIIF annotation streams into object-detection training sets.");
            println!();
            println!("Run 'iiif-trainset --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the convert subcommand.
fn run_convert(args: ConvertArgs) -> Result<(), TrainsetError> {
    let mut config = load_config(args.config.as_ref())?;
    config.source_urls.extend(args.sources);
    if !args.allow.is_empty() {
        config
            .allowed_manifests
            .get_or_insert_with(Vec::new)
            .extend(args.allow);
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if args.no_cache {
        config.cache_enabled = false;
    }
    if args.clip {
        config.clip_images = true;
    }
    if let Some(mode) = args.object_mode {
        config.object_mode = mode.into();
    }
    config.validate()?;
    require_sources(&config, "--source")?;

    let fetcher = build_fetcher(&config);
    let output = pipeline::convert(&config, &fetcher)?;

    println!("Converted into {}:", config.output_dir.display());
    println!("  {}", output.summary);
    println!(
        "  {} image(s), {} annotation(s), {} label(s)",
        output.context.image_count(),
        output.context.annotation_count(),
        output.labels.len()
    );

    let report = output.report;
    if !report.is_clean() {
        warn!(
            errors = report.error_count(),
            warnings = report.warning_count(),
            "validation reported issues"
        );
        print!("{}", report);
    }

    let opts = ValidateOptions {
        strict: args.strict,
    };
    if opts.fails(&report) {
        Err(TrainsetError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the faces subcommand.
fn run_faces(args: FacesArgs) -> Result<(), TrainsetError> {
    let mut config = load_config(args.config.as_ref())?;
    config.source_urls.extend(args.manifests);
    if let Some(model) = args.model {
        config.model_path = Some(model);
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(upsample) = args.upsample {
        config.upsample = upsample;
    }
    if let Some(proportion) = args.min_face_proportion {
        config.min_face_proportion = Some(proportion);
    }
    if args.no_cache {
        config.cache_enabled = false;
    }
    if args.clip {
        config.clip_images = true;
    }
    config.validate()?;
    require_sources(&config, "--manifest")?;

    let model_path = config
        .model_path
        .clone()
        .ok_or_else(|| TrainsetError::InvalidConfig {
            message: "no face model given (use --model or model_path)".to_string(),
        })?;
    let mut detector = faces::RustfaceDetector::load(&model_path, config.upsample)?;

    let fetcher = build_fetcher(&config);
    let summary = faces::run_faces(&config, &fetcher, &mut detector)?;
    info!(%summary, "face detection finished");

    println!("Wrote {}", config.face_annotations_path().display());
    println!("Wrote {}", config.face_curation_path().display());
    println!("  {}", summary);
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<RunConfig, TrainsetError> {
    match path {
        Some(path) => RunConfig::load(path),
        None => Ok(RunConfig::default()),
    }
}

fn require_sources(config: &RunConfig, flag: &str) -> Result<(), TrainsetError> {
    if config.source_urls.is_empty() {
        return Err(TrainsetError::InvalidConfig {
            message: format!("no sources given (use {flag} or source_urls)"),
        });
    }
    Ok(())
}

fn build_fetcher(config: &RunConfig) -> Fetcher<'static> {
    let transport = HttpTransport::new(Duration::from_secs(config.request_timeout_secs));
    let fetcher = Fetcher::new(transport);
    if config.cache_enabled {
        fetcher.with_fs_cache(&config.cache_dir)
    } else {
        fetcher
    }
}
