//! Drive class resolution over every image of the dataset

use log::warn;
use rayon::prelude::*;

use crate::coco::Image;
use crate::error::SplitError;
use crate::index::AnnotationIndex;
use crate::resolve::{resolve, RoutingDecision};
use crate::types::{Disposition, Tally};

/// The routing result for one image.
///
/// Geometry failures stay scoped to the image they occurred on.
#[derive(Debug)]
pub struct ImageOutcome<'a> {
    pub image: &'a Image,
    pub decision: Result<RoutingDecision, SplitError>,
}

impl ImageOutcome<'_> {
    /// Warning text for skipped images
    pub fn warning(&self) -> Option<String> {
        match &self.decision {
            Ok(decision) => decision.conflict_warning(&self.image.file_name),
            Err(e) => Some(format!("image {} failed: {}", self.image.file_name, e)),
        }
    }

    /// Where the image lands when no placement policy intervenes
    pub fn disposition(&self) -> Disposition {
        match &self.decision {
            Ok(RoutingDecision::Unlabeled) => Disposition::Clean,
            Ok(RoutingDecision::AssignedClass { class_name, .. }) => {
                Disposition::Class(class_name.clone())
            }
            Ok(RoutingDecision::Conflict { .. }) => Disposition::Skipped,
            Err(_) => Disposition::Failed,
        }
    }
}

/// Produces one outcome per image known to the index, unlabeled ones included
#[derive(Debug, Clone, Copy)]
pub struct Partitioner<'a> {
    index: &'a AnnotationIndex,
}

impl<'a> Partitioner<'a> {
    pub fn new(index: &'a AnnotationIndex) -> Self {
        Self { index }
    }

    pub fn outcome(self, image: &'a Image) -> ImageOutcome<'a> {
        let decision = resolve(
            image,
            self.index.annotations_for(image.id),
            self.index.category_names(),
        );
        ImageOutcome { image, decision }
    }

    /// Lazily resolve images in document order, one at a time
    pub fn decisions(self) -> impl Iterator<Item = ImageOutcome<'a>> + 'a {
        self.index
            .images()
            .iter()
            .map(move |image| self.outcome(image))
    }

    /// Resolve images on the current rayon pool
    pub fn par_decisions(self) -> impl ParallelIterator<Item = ImageOutcome<'a>> + 'a {
        self.index
            .images()
            .par_iter()
            .map(move |image| self.outcome(image))
    }

    /// Resolve every image sequentially and count the default dispositions
    pub fn run(self) -> Tally {
        let mut tally = Tally::new();
        for outcome in self.decisions() {
            if let Some(message) = outcome.warning() {
                warn!("{}", message);
            }
            tally.record(&outcome.disposition());
        }
        tally
    }

    /// Hand every outcome to `place` in parallel.
    ///
    /// Each worker folds into its own tally and the partial tallies are merged
    /// at the end. The first error returned by `place` stops the run.
    pub fn run_parallel<F, E>(self, place: F) -> Result<Tally, E>
    where
        F: Fn(ImageOutcome<'a>) -> Result<Disposition, E> + Sync + Send,
        E: Send,
    {
        self.par_decisions()
            .map(place)
            .try_fold(Tally::new, |mut tally, disposition| {
                tally.record(&disposition?);
                Ok::<_, E>(tally)
            })
            .try_reduce(Tally::new, |a, b| Ok(a.merge(b)))
    }
}
