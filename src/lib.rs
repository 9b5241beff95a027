//! COCO dataset class splitter
//!
//! This library routes every image of a COCO dataset into a single class
//! bucket (with a binary mask of that class) or into a `clean` bucket when the
//! image carries no annotations. Images annotated with more than one class are
//! skipped.

pub mod coco;
pub mod config;
pub mod error;
pub mod index;
pub mod io;
pub mod mask;
pub mod partition;
pub mod raster;
pub mod resolve;
pub mod split_dataset;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use coco::{Annotation, Category, CocoFile, Image, RleCounts, Segmentation};
pub use config::{Args, InvalidRegionPolicy};
pub use error::SplitError;
pub use index::AnnotationIndex;
pub use io::{setup_output_directories, DatasetWriter, ImageLocator, OutputDirs};
pub use mask::{accumulate, BinaryMask};
pub use partition::{ImageOutcome, Partitioner};
pub use raster::{rasterize, rasterize_annotation, rasterize_into, Region, RunLength};
pub use resolve::{resolve, RoutingDecision};
pub use split_dataset::{place_outcome, process_split_dataset, split_index};
pub use types::{Disposition, Tally, CLEAN_BUCKET};
