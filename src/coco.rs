//! COCO format data structures
//!
//! Only the parts of the COCO document that drive the split are modelled.
//! Unknown fields (`info`, `licenses`, `bbox`, `area`, ...) are ignored on load.

use serde::{Deserialize, Serialize};

/// COCO category information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
}

/// COCO image information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

impl Image {
    pub fn new(id: u64, file_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            width,
            height,
        }
    }
}

/// Run-length counts as they appear in the `counts` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RleCounts {
    Uncompressed(Vec<u64>),
    /// pycocotools string encoding
    Compressed(String),
}

/// The `segmentation` field of an annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    /// One or more flat `[x1, y1, x2, y2, ...]` loops
    Polygons(Vec<Vec<f64>>),
    /// A single flat loop written without the outer list
    FlatPolygon(Vec<f64>),
    Rle { size: [u32; 2], counts: RleCounts },
    /// Anything else. Kept so that one bad annotation does not reject the whole file.
    Unrecognized(serde_json::Value),
}

/// COCO annotation information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<Segmentation>,
}

impl Annotation {
    pub fn new(id: u64, image_id: u64, category_id: u64, segmentation: Segmentation) -> Self {
        Self {
            id,
            image_id,
            category_id,
            segmentation: Some(segmentation),
        }
    }
}

/// Complete COCO dataset structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoFile {
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}
