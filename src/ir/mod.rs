//! Intermediate representation for training-set generation.
//!
//! Everything that reaches the output writers passes through these types.
//! Source annotations carry regions in full-resolution pixels; the training
//! set is written in the pixel space of the resized images. The two spaces
//! are distinct marker types, so a box can only move between them through
//! [`resize_box`] or [`region_to_full`].
//!
//! # Design Principles
//!
//! 1. **Type Safety**: marker types keep full-resolution and resized
//!    coordinates from being mixed up at compile time.
//!
//! 2. **Integer Pixels**: every scaled coordinate is truncated toward zero,
//!    matching how downstream tools read VOC files.
//!
//! 3. **Permissive Construction**: boxes may be unordered or out of bounds;
//!    validation reports such issues instead of panicking.
//!
//! # Example
//!
//! ```
//! use iiif_trainset::ir::{parse_xywh, resize_box};
//!
//! let region = parse_xywh("xywh=100,200,50,60").unwrap();
//! let resized = resize_box(&region.to_xyxy(), 2000, 3000, 667, 1000);
//! assert_eq!(
//!     (resized.xmin(), resized.ymin(), resized.xmax(), resized.ymax()),
//!     (33, 66, 50, 86)
//! );
//! ```

mod bbox;
mod coord;
mod ids;
pub mod io_iiif_stream;
pub mod io_training_set;
pub mod io_voc_xml;
mod model;
mod space;
mod tags;
mod transform;

// Re-export core types for convenient access
pub use bbox::{BBoxXYXY, Xywh};
pub use coord::Coord;
pub use ids::{derive_image_id, ImageKey};
pub use model::{AnnotationRecord, ImageEntry, ImageRecord, LabelCatalog, RunContext};
pub use space::{Full, Resized};
pub use tags::{normalize_tag, object_labels, reduce_tags, ObjectMode, TagSet};
pub use transform::{parse_xywh, region_to_full, resize_box, ScaleRatio};
