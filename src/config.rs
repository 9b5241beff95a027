use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Split a COCO dataset into per-class image and mask directories.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Directory containing the source images
    #[arg(long = "images", value_parser = existing_dir)]
    pub images: PathBuf,

    /// COCO annotations JSON file
    #[arg(long = "labels", value_parser = existing_file)]
    pub labels: PathBuf,

    /// Output directory for the split dataset
    #[arg(long = "output", default_value = "split_dataset")]
    pub output: PathBuf,

    /// Number of worker threads, 0 uses one per CPU
    #[arg(long = "workers", default_value_t = 0)]
    pub workers: usize,

    /// What to do with an image whose annotation region cannot be rasterized
    #[arg(long = "on_invalid_region", value_enum, default_value = "skip")]
    pub on_invalid_region: InvalidRegionPolicy,

    /// Resolve and count images without writing any files
    #[arg(long = "dry_run")]
    pub dry_run: bool,
}

// Handling of images that fail to rasterize or cannot be found
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum InvalidRegionPolicy {
    /// Leave the image out and count it as failed
    Skip,
    /// Place the image in the clean bucket
    Clean,
    /// Stop the whole run
    Abort,
}

fn existing_dir(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("Images directory not found: {}", s))
    }
}

fn existing_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("Labels file not found: {}", s))
    }
}
