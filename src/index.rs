//! Lookup structures over a loaded COCO document

use log::debug;
use std::collections::HashMap;

use crate::coco::{Annotation, Category, CocoFile, Image};
use crate::error::SplitError;

/// Read-only index: images in document order, annotations grouped per image,
/// and category names keyed by id
#[derive(Debug, Clone)]
pub struct AnnotationIndex {
    images: Vec<Image>,
    annotations: HashMap<u64, Vec<Annotation>>,
    category_names: HashMap<u64, String>,
}

impl AnnotationIndex {
    /// Build the index, rejecting dangling or duplicated identifiers
    pub fn build(coco: CocoFile) -> Result<Self, SplitError> {
        let CocoFile {
            images,
            categories,
            annotations,
        } = coco;

        let category_names = index_categories(categories)?;

        let mut by_image: HashMap<u64, Vec<Annotation>> = HashMap::with_capacity(images.len());
        for image in &images {
            if by_image.insert(image.id, Vec::new()).is_some() {
                return Err(SplitError::MalformedDataset(format!(
                    "duplicate image id {}",
                    image.id
                )));
            }
        }

        for annotation in annotations {
            if !category_names.contains_key(&annotation.category_id) {
                return Err(SplitError::MalformedDataset(format!(
                    "annotation {} references unknown category {}",
                    annotation.id, annotation.category_id
                )));
            }
            match by_image.get_mut(&annotation.image_id) {
                Some(list) => list.push(annotation),
                None => {
                    return Err(SplitError::MalformedDataset(format!(
                        "annotation {} references unknown image {}",
                        annotation.id, annotation.image_id
                    )))
                }
            }
        }

        debug!(
            "Indexed {} images, {} categories",
            images.len(),
            category_names.len()
        );

        Ok(Self {
            images,
            annotations: by_image,
            category_names,
        })
    }

    /// All images, in document order
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    /// Annotations attached to an image, in document order.
    /// Unknown ids yield an empty slice.
    pub fn annotations_for(&self, image_id: u64) -> &[Annotation] {
        self.annotations
            .get(&image_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn category_names(&self) -> &HashMap<u64, String> {
        &self.category_names
    }

    pub fn category_name(&self, category_id: u64) -> Option<&str> {
        self.category_names.get(&category_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn index_categories(categories: Vec<Category>) -> Result<HashMap<u64, String>, SplitError> {
    let mut names = HashMap::with_capacity(categories.len());
    for category in categories {
        if names.contains_key(&category.id) {
            return Err(SplitError::MalformedDataset(format!(
                "duplicate category id {}",
                category.id
            )));
        }
        names.insert(category.id, category.name);
    }
    Ok(names)
}
