//! Placement of routed images into the output layout
//!
//! ```text
//! <output>/<class>/images/<file>
//! <output>/<class>/masks/<stem>.png
//! <output>/clean/<file>
//! ```

use dashmap::DashSet;
use jwalk::{Parallelism, WalkDir};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::coco::Image;
use crate::error::SplitError;
use crate::mask::BinaryMask;
use crate::types::{CLEAN_BUCKET, IMG_FORMATS};
use crate::utils::create_output_directory;

/// Paths to the fixed output directories
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub root: PathBuf,
    pub clean_dir: PathBuf,
}

/// Set up the output root and the clean bucket
pub fn setup_output_directories(output: &Path) -> std::io::Result<OutputDirs> {
    let root = create_output_directory(output)?;
    let clean_dir = create_output_directory(&root.join(CLEAN_BUCKET))?;
    Ok(OutputDirs { root, clean_dir })
}

/// Finds source images by their `file_name`.
///
/// The direct path `<images>/<file_name>` is tried first. Otherwise a basename
/// index of the images directory is built once and consulted.
#[derive(Debug)]
pub struct ImageLocator {
    images_dir: PathBuf,
    by_basename: OnceLock<HashMap<String, PathBuf>>,
}

impl ImageLocator {
    pub fn new<P: Into<PathBuf>>(images_dir: P) -> Self {
        Self {
            images_dir: images_dir.into(),
            by_basename: OnceLock::new(),
        }
    }

    pub fn locate(&self, file_name: &str) -> Option<PathBuf> {
        let direct = self.images_dir.join(file_name);
        if direct.is_file() {
            return Some(direct);
        }
        let basename = Path::new(file_name).file_name()?.to_str()?;
        self.basename_index().get(basename).cloned()
    }

    fn basename_index(&self) -> &HashMap<String, PathBuf> {
        self.by_basename.get_or_init(|| {
            let index: HashMap<String, PathBuf> = WalkDir::new(&self.images_dir)
                .parallelism(Parallelism::Serial)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.path())
                .filter(|path| {
                    path.extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| IMG_FORMATS.contains(&ext.to_lowercase().as_str()))
                })
                .filter_map(|path| {
                    let name = path.file_name()?.to_str()?.to_string();
                    Some((name, path))
                })
                .collect();
            debug!(
                "Indexed {} images under {}",
                index.len(),
                self.images_dir.display()
            );
            index
        })
    }
}

/// Copies images and writes masks into the output layout.
///
/// Images whose file stems collide anywhere in the dataset (`a.jpg` and
/// `a.png`, or `train/a.jpg` and `val/a.jpg`) are written as `<stem>_<id>`,
/// so an image and its mask always share a name that no other image uses.
/// Safe to share between workers.
#[derive(Debug)]
pub struct DatasetWriter {
    dirs: OutputDirs,
    locator: ImageLocator,
    shared_stems: HashSet<String>,
    class_dirs: DashSet<String>,
    reserved: DashSet<PathBuf>,
}

impl DatasetWriter {
    /// `images` is every image the writer may be asked to place
    pub fn new(dirs: OutputDirs, locator: ImageLocator, images: &[Image]) -> Self {
        let mut seen = HashSet::with_capacity(images.len());
        let shared_stems: HashSet<String> = images
            .iter()
            .map(|image| file_stem(&destination_name(image)))
            .filter(|stem| !seen.insert(stem.clone()))
            .collect();
        if !shared_stems.is_empty() {
            debug!(
                "{} file stems are shared between images; suffixing them with image ids",
                shared_stems.len()
            );
        }
        Self {
            dirs,
            locator,
            shared_stems,
            class_dirs: DashSet::new(),
            reserved: DashSet::new(),
        }
    }

    pub fn output_dirs(&self) -> &OutputDirs {
        &self.dirs
    }

    /// Copy an unlabeled image into the clean bucket
    pub fn place_clean(&self, image: &Image) -> Result<PathBuf, SplitError> {
        let source = self.source_path(image)?;
        let (name, stem) = self.output_name(image);
        self.reserve(&self.dirs.clean_dir, &stem)?;
        let destination = self.dirs.clean_dir.join(name);
        fs::copy(&source, &destination)?;
        Ok(destination)
    }

    /// Copy an image into its class bucket and write its mask next to it
    pub fn place_class(
        &self,
        image: &Image,
        class_name: &str,
        mask: &BinaryMask,
    ) -> Result<PathBuf, SplitError> {
        if mask.dimensions() != (image.width, image.height) {
            return Err(SplitError::DimensionMismatch {
                expected: (image.width, image.height),
                found: mask.dimensions(),
            });
        }
        let source = self.source_path(image)?;
        let (class_dir, images_dir, masks_dir) = self.class_directories(class_name)?;

        let (name, stem) = self.output_name(image);
        self.reserve(&class_dir, &stem)?;
        let destination = images_dir.join(name);
        fs::copy(&source, &destination)?;
        mask.save(masks_dir.join(format!("{}.png", stem)))?;
        Ok(destination)
    }

    fn source_path(&self, image: &Image) -> Result<PathBuf, SplitError> {
        self.locator
            .locate(&image.file_name)
            .ok_or_else(|| SplitError::MissingImage(image.file_name.clone()))
    }

    fn class_directories(&self, class_name: &str) -> std::io::Result<(PathBuf, PathBuf, PathBuf)> {
        let class_dir = self.dirs.root.join(sanitize_filename::sanitize(class_name));
        let images_dir = class_dir.join("images");
        let masks_dir = class_dir.join("masks");
        if !self.class_dirs.contains(class_name) {
            create_output_directory(&images_dir)?;
            create_output_directory(&masks_dir)?;
            self.class_dirs.insert(class_name.to_string());
        }
        Ok((class_dir, images_dir, masks_dir))
    }

    // File name and stem used for the copied image and its mask
    fn output_name(&self, image: &Image) -> (String, String) {
        let name = destination_name(image);
        let stem = file_stem(&name);
        if !self.shared_stems.contains(&stem) {
            return (name, stem);
        }
        let stem = format!("{}_{}", stem, image.id);
        let name = match Path::new(&name).extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem.clone(),
        };
        (name, stem)
    }

    // One image per stem and bucket; the image copy and its mask share the claim
    fn reserve(&self, bucket: &Path, stem: &str) -> Result<(), SplitError> {
        let key = bucket.join(stem);
        if self.reserved.insert(key.clone()) {
            Ok(())
        } else {
            Err(SplitError::DestinationTaken(key.display().to_string()))
        }
    }
}

// Only the final path component of `file_name` is kept in the output
fn destination_name(image: &Image) -> String {
    let name = Path::new(&image.file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&image.file_name);
    sanitize_filename::sanitize(name)
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
        .to_string()
}
