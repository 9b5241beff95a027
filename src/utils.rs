use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::coco::CocoFile;
use crate::error::SplitError;

/// Read and parse a COCO JSON file.
///
/// The document is parsed straight from a buffered file stream instead of
/// being loaded into a string first.
pub fn read_coco_file(path: &Path) -> Result<CocoFile, SplitError> {
    let file = fs::File::open(path)?;
    let coco: CocoFile = serde_json::from_reader(BufReader::new(file))?;
    debug!(
        "Parsed {} ({} images, {} categories, {} annotations)",
        path.display(),
        coco.images.len(),
        coco.categories.len(),
        coco.annotations.len()
    );
    Ok(coco)
}

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let template = format!(
        "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
        label
    );
    match ProgressStyle::default_bar().template(&template) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => debug!("Falling back to the default progress style: {}", e),
    }
    pb
}

/// Create an output directory, keeping whatever it already contains
pub fn create_output_directory(path: &Path) -> std::io::Result<PathBuf> {
    if path.exists() {
        debug!("Directory {:?} already exists, reusing it.", path);
    }
    fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

/// Build the worker pool used for resolving and placing images.
/// Zero workers lets rayon pick one thread per CPU.
pub fn create_io_thread_pool(
    workers: usize,
) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("coco2mask-worker-{}", i))
        .build()
}
