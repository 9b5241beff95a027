//! Per-image class resolution

use std::collections::{BTreeSet, HashMap};

use crate::coco::{Annotation, Image};
use crate::error::SplitError;
use crate::mask::BinaryMask;
use crate::raster::{rasterize_into, Region};

/// Where a single image should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// No annotations: the image belongs to the clean bucket
    Unlabeled,
    /// Every annotation shares one category; `mask` is their union
    AssignedClass {
        category_id: u64,
        class_name: String,
        mask: BinaryMask,
    },
    /// Annotations from more than one category; the image is skipped.
    /// `classes` can be shorter than `category_ids` when categories share a name.
    Conflict {
        category_ids: BTreeSet<u64>,
        classes: BTreeSet<String>,
    },
}

impl RoutingDecision {
    /// Human-readable reason for skipping a conflicting image
    pub fn conflict_warning(&self, file_name: &str) -> Option<String> {
        match self {
            RoutingDecision::Conflict {
                category_ids,
                classes,
            } => {
                let names: Vec<&str> = classes.iter().map(String::as_str).collect();
                if names.len() == category_ids.len() {
                    Some(format!(
                        "image {} skipped: classes {{{}}} both present",
                        file_name,
                        names.join(", ")
                    ))
                } else {
                    let ids: Vec<String> = category_ids.iter().map(u64::to_string).collect();
                    Some(format!(
                        "image {} skipped: categories {{{}}} present with classes {{{}}}",
                        file_name,
                        ids.join(", "),
                        names.join(", ")
                    ))
                }
            }
            _ => None,
        }
    }
}

/// Decide the routing for one image.
///
/// Masks are only rasterized when all annotations share a single category,
/// so conflicting images cost no geometry work. Annotations are drawn one at
/// a time into a single mask of the image's size.
pub fn resolve(
    image: &Image,
    annotations: &[Annotation],
    category_names: &HashMap<u64, String>,
) -> Result<RoutingDecision, SplitError> {
    let category_ids: BTreeSet<u64> = annotations.iter().map(|a| a.category_id).collect();

    let mut ids = category_ids.iter();
    let category_id = match (ids.next(), ids.next()) {
        (None, _) => return Ok(RoutingDecision::Unlabeled),
        (Some(&id), None) => id,
        (Some(_), Some(_)) => {
            let classes = category_ids
                .iter()
                .map(|id| lookup_name(category_names, *id))
                .collect::<Result<_, _>>()?;
            return Ok(RoutingDecision::Conflict {
                category_ids,
                classes,
            });
        }
    };

    let class_name = lookup_name(category_names, category_id)?;
    let mut mask = BinaryMask::new(image.width, image.height);
    for annotation in annotations {
        let region = Region::from_annotation(annotation)?;
        rasterize_into(&region, &mut mask)?;
    }

    Ok(RoutingDecision::AssignedClass {
        category_id,
        class_name,
        mask,
    })
}

fn lookup_name(category_names: &HashMap<u64, String>, id: u64) -> Result<String, SplitError> {
    category_names
        .get(&id)
        .cloned()
        .ok_or_else(|| SplitError::MalformedDataset(format!("unknown category {}", id)))
}
