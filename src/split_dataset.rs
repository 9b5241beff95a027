use log::{debug, info, warn};

use crate::coco::Image;
use crate::config::{Args, InvalidRegionPolicy};
use crate::error::SplitError;
use crate::index::AnnotationIndex;
use crate::io::{setup_output_directories, DatasetWriter, ImageLocator};
use crate::partition::{ImageOutcome, Partitioner};
use crate::resolve::RoutingDecision;
use crate::types::{Disposition, Tally};
use crate::utils::{create_io_thread_pool, create_progress_bar, read_coco_file};

/// Main split pipeline: load, index, resolve every image and place it
pub fn process_split_dataset(args: &Args) -> Result<Tally, Box<dyn std::error::Error>> {
    info!("Reading COCO labels from {}", args.labels.display());
    let coco = read_coco_file(&args.labels)?;

    // A malformed index stops the run before anything is written
    let index = AnnotationIndex::build(coco)?;
    info!(
        "Indexed {} images across {} categories",
        index.len(),
        index.category_names().len()
    );

    let writer = if args.dry_run {
        info!("Dry run: no files will be written");
        None
    } else {
        let output_dirs = setup_output_directories(&args.output)?;
        Some(DatasetWriter::new(
            output_dirs,
            ImageLocator::new(&args.images),
            index.images(),
        ))
    };

    let tally = split_index(&index, writer.as_ref(), args.on_invalid_region, args.workers)?;

    tally.print_summary();
    Ok(tally)
}

/// Resolve and place every image of an already built index
pub fn split_index(
    index: &AnnotationIndex,
    writer: Option<&DatasetWriter>,
    policy: InvalidRegionPolicy,
    workers: usize,
) -> Result<Tally, Box<dyn std::error::Error>> {
    let thread_pool = create_io_thread_pool(workers)?;
    let pb = create_progress_bar(index.len() as u64, "Split");
    let partitioner = Partitioner::new(index);

    let result = thread_pool.install(|| {
        partitioner.run_parallel(|outcome| {
            let disposition = place_outcome(outcome, writer, policy);
            pb.inc(1);
            disposition
        })
    });

    match result {
        Ok(tally) => {
            pb.finish_with_message("Split complete");
            Ok(tally)
        }
        Err(e) => {
            pb.abandon();
            Err(e.into())
        }
    }
}

/// Place one image according to its routing decision.
///
/// Image-scoped failures go through `policy`; anything else is returned.
pub fn place_outcome(
    outcome: ImageOutcome<'_>,
    writer: Option<&DatasetWriter>,
    policy: InvalidRegionPolicy,
) -> Result<Disposition, SplitError> {
    let ImageOutcome { image, decision } = outcome;

    let placed = match decision {
        Ok(RoutingDecision::Unlabeled) => place_clean(image, writer),
        Ok(RoutingDecision::AssignedClass {
            class_name, mask, ..
        }) => match writer {
            Some(writer) => writer
                .place_class(image, &class_name, &mask)
                .map(|path| {
                    debug!(
                        "Processed {} for class {} -> {}",
                        image.file_name,
                        class_name,
                        path.display()
                    );
                    Disposition::Class(class_name)
                }),
            None => Ok(Disposition::Class(class_name)),
        },
        Ok(conflict @ RoutingDecision::Conflict { .. }) => {
            if let Some(message) = conflict.conflict_warning(&image.file_name) {
                warn!("{}", message);
            }
            Ok(Disposition::Skipped)
        }
        Err(e) => Err(e),
    };

    match placed {
        Err(e) if e.is_image_scoped() => handle_image_failure(image, e, writer, policy),
        other => other,
    }
}

fn place_clean(
    image: &Image,
    writer: Option<&DatasetWriter>,
) -> Result<Disposition, SplitError> {
    if let Some(writer) = writer {
        let path = writer.place_clean(image)?;
        debug!(
            "Moved unlabeled image {} to {}",
            image.file_name,
            path.display()
        );
    }
    Ok(Disposition::Clean)
}

fn handle_image_failure(
    image: &Image,
    error: SplitError,
    writer: Option<&DatasetWriter>,
    policy: InvalidRegionPolicy,
) -> Result<Disposition, SplitError> {
    match policy {
        InvalidRegionPolicy::Abort => Err(error),
        // Only an undecodable region may fall back to clean; other failures
        // mean the image cannot be placed correctly anywhere
        InvalidRegionPolicy::Clean if matches!(error, SplitError::InvalidRegion { .. }) => {
            warn!("image {} moved to clean: {}", image.file_name, error);
            match place_clean(image, writer) {
                Err(e) if e.is_image_scoped() => {
                    warn!("image {} failed: {}", image.file_name, e);
                    Ok(Disposition::Failed)
                }
                other => other,
            }
        }
        _ => {
            warn!("image {} failed: {}", image.file_name, error);
            Ok(Disposition::Failed)
        }
    }
}
