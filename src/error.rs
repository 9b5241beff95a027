use thiserror::Error;

/// Errors raised while indexing, rasterizing and placing a COCO dataset
#[derive(Debug, Error)]
pub enum SplitError {
    /// Dangling or duplicated identifiers between the record collections.
    /// Fatal: the index cannot be trusted.
    #[error("malformed dataset: {0}")]
    MalformedDataset(String),

    /// A single annotation's region could not be decoded
    #[error("invalid region in annotation {annotation_id}: {reason}")]
    InvalidRegion { annotation_id: u64, reason: String },

    /// Two grids that must share a size do not (width, height)
    #[error("dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("cannot accumulate an empty sequence of masks")]
    EmptyAccumulation,

    #[error("source image not found: {0}")]
    MissingImage(String),

    /// Another image already claimed this output name
    #[error("output name already taken: {0}")]
    DestinationTaken(String),

    #[error("mask buffer holds {found} cells, expected {expected}")]
    BufferSize { expected: usize, found: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl SplitError {
    /// Failures confined to one image; the run can continue without it
    pub fn is_image_scoped(&self) -> bool {
        matches!(
            self,
            SplitError::InvalidRegion { .. }
                | SplitError::DimensionMismatch { .. }
                | SplitError::EmptyAccumulation
                | SplitError::MissingImage(_)
                | SplitError::DestinationTaken(_)
        )
    }

    pub(crate) fn invalid_region(annotation_id: u64, reason: impl Into<String>) -> Self {
        SplitError::InvalidRegion {
            annotation_id,
            reason: reason.into(),
        }
    }
}
