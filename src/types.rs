use std::collections::BTreeMap;

/// Bucket name for images without annotations
pub const CLEAN_BUCKET: &str = "clean";

// Supported source image extensions, used when searching the images directory
pub const IMG_FORMATS: &[&str] = &[
    "bmp", "dng", "jpeg", "jpg", "mpo", "png", "tif", "tiff", "webp", "pfm",
];

/// Final placement of one image, as counted in the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Placed in the named class bucket
    Class(String),
    /// Placed in the clean bucket
    Clean,
    /// Left out because more than one class was present
    Skipped,
    /// Left out because the image could not be processed
    Failed,
}

/// Running counts of dispositions.
///
/// Each worker keeps its own tally; partial tallies are combined with `merge`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tally {
    buckets: BTreeMap<String, usize>,
    skipped: usize,
    failed: usize,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::Class(name) => *self.buckets.entry(name.clone()).or_insert(0) += 1,
            Disposition::Clean => *self.buckets.entry(CLEAN_BUCKET.to_string()).or_insert(0) += 1,
            Disposition::Skipped => self.skipped += 1,
            Disposition::Failed => self.failed += 1,
        }
    }

    pub fn merge(mut self, other: Tally) -> Tally {
        for (name, count) in other.buckets {
            *self.buckets.entry(name).or_insert(0) += count;
        }
        self.skipped += other.skipped;
        self.failed += other.failed;
        self
    }

    /// Images per bucket, class names and `clean`, sorted by name
    pub fn buckets(&self) -> &BTreeMap<String, usize> {
        &self.buckets
    }

    pub fn count(&self, bucket: &str) -> usize {
        self.buckets.get(bucket).copied().unwrap_or(0)
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Images placed in some bucket
    pub fn total_assigned(&self) -> usize {
        self.buckets.values().sum()
    }

    /// Every image visited, placed or not
    pub fn total_processed(&self) -> usize {
        self.total_assigned() + self.skipped + self.failed
    }

    pub fn print_summary(&self) {
        log::info!("=== Dataset Summary ===");
        for (name, count) in &self.buckets {
            log::info!("{}: {} images", name, count);
        }
        log::info!("Total images processed: {}", self.total_processed());

        if self.skipped > 0 {
            log::warn!("Skipped (multiple classes): {}", self.skipped);
        }
        if self.failed > 0 {
            log::warn!("Failed (invalid region or missing image): {}", self.failed);
        }
    }
}
