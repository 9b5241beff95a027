#[cfg(test)]
mod tests {
    use coco2mask::{
        process_split_dataset, AnnotationIndex, Args, CocoFile, InvalidRegionPolicy, Partitioner,
        RoutingDecision, SplitError, CLEAN_BUCKET,
    };
    use serde_json::{json, Value};
    use std::fs;
    use std::path::{Path, PathBuf};

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
        json!([[x0, y0, x1, y0, x1, y1, x0, y1]])
    }

    fn sample_labels() -> Value {
        json!({
            "images": [
                {"id": 1, "file_name": "one.jpg", "width": 10, "height": 10},
                {"id": 2, "file_name": "two.jpg", "width": 5, "height": 5},
                {"id": 3, "file_name": "three.jpg", "width": 8, "height": 8},
                {"id": 4, "file_name": "four.jpg", "width": 8, "height": 8}
            ],
            "categories": [
                {"id": 1, "name": "cat"},
                {"id": 2, "name": "dog"}
            ],
            "annotations": [
                {"id": 10, "image_id": 1, "category_id": 1, "segmentation": square(0.0, 0.0, 4.0, 4.0)},
                {"id": 11, "image_id": 1, "category_id": 1, "segmentation": square(2.0, 2.0, 6.0, 6.0)},
                {"id": 12, "image_id": 2, "category_id": 2,
                 "segmentation": {"size": [5, 5], "counts": [0, 25]}, "iscrowd": 1},
                {"id": 13, "image_id": 3, "category_id": 1, "segmentation": square(0.0, 0.0, 2.0, 2.0)},
                {"id": 14, "image_id": 3, "category_id": 2, "segmentation": square(4.0, 4.0, 6.0, 6.0)}
            ]
        })
    }

    /// Lay out an images directory and a labels file; returns (images, labels)
    fn write_dataset(root: &Path, labels: &Value) -> (PathBuf, PathBuf) {
        let images = root.join("images");
        fs::create_dir_all(&images).unwrap();
        for image in labels["images"].as_array().unwrap() {
            let name = image["file_name"].as_str().unwrap();
            fs::write(images.join(name), name.as_bytes()).unwrap();
        }
        let labels_path = root.join("labels.json");
        fs::write(&labels_path, serde_json::to_string_pretty(labels).unwrap()).unwrap();
        (images, labels_path)
    }

    fn args(images: PathBuf, labels: PathBuf, output: PathBuf) -> Args {
        Args {
            images,
            labels,
            output,
            workers: 2,
            on_invalid_region: InvalidRegionPolicy::Skip,
            dry_run: false,
        }
    }

    fn count_foreground(path: &Path) -> usize {
        image::open(path)
            .unwrap()
            .into_luma8()
            .pixels()
            .filter(|p| p.0[0] == 255)
            .count()
    }

    #[test]
    fn test_split_dataset_layout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (images, labels) = write_dataset(temp_dir.path(), &sample_labels());
        let output = temp_dir.path().join("split_dataset");

        let tally = process_split_dataset(&args(images, labels, output.clone())).unwrap();

        assert_eq!(tally.count("cat"), 1);
        assert_eq!(tally.count("dog"), 1);
        assert_eq!(tally.count(CLEAN_BUCKET), 1);
        assert_eq!(tally.skipped(), 1);
        assert_eq!(tally.failed(), 0);
        assert_eq!(tally.total_processed(), 4);

        assert_eq!(
            fs::read(output.join("cat/images/one.jpg")).unwrap(),
            b"one.jpg"
        );
        // Two 4x4 squares overlapping in a 2x2 block
        assert_eq!(count_foreground(&output.join("cat/masks/one.png")), 28);
        assert_eq!(count_foreground(&output.join("dog/masks/two.png")), 25);
        assert!(output.join("dog/images/two.jpg").exists());
        assert!(output.join("clean/four.jpg").exists());

        // The conflicting image lands nowhere
        assert!(!output.join("cat/images/three.jpg").exists());
        assert!(!output.join("dog/images/three.jpg").exists());
        assert!(!output.join("clean/three.jpg").exists());
    }

    #[test]
    fn test_malformed_dataset_writes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut labels = sample_labels();
        labels["annotations"]
            .as_array_mut()
            .unwrap()
            .push(json!({"id": 99, "image_id": 42, "category_id": 1, "segmentation": []}));
        let (images, labels) = write_dataset(temp_dir.path(), &labels);
        let output = temp_dir.path().join("out");

        let err = process_split_dataset(&args(images, labels, output.clone())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SplitError>(),
            Some(SplitError::MalformedDataset(_))
        ));
        assert!(!output.exists());
    }

    fn labels_with_bad_region() -> Value {
        json!({
            "images": [
                {"id": 1, "file_name": "good.jpg", "width": 4, "height": 4},
                {"id": 2, "file_name": "bad.jpg", "width": 4, "height": 4}
            ],
            "categories": [{"id": 1, "name": "cat"}],
            "annotations": [
                {"id": 1, "image_id": 1, "category_id": 1, "segmentation": square(0.0, 0.0, 1.0, 1.0)},
                {"id": 2, "image_id": 2, "category_id": 1,
                 "segmentation": {"size": [4, 4], "counts": [3, 4]}}
            ]
        })
    }

    #[test]
    fn test_invalid_region_skip_policy() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (images, labels) = write_dataset(temp_dir.path(), &labels_with_bad_region());
        let output = temp_dir.path().join("out");

        let tally = process_split_dataset(&args(images, labels, output.clone())).unwrap();
        assert_eq!(tally.count("cat"), 1);
        assert_eq!(tally.failed(), 1);
        assert!(!output.join("cat/images/bad.jpg").exists());
        assert!(!output.join("clean/bad.jpg").exists());
    }

    #[test]
    fn test_invalid_region_clean_policy() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (images, labels) = write_dataset(temp_dir.path(), &labels_with_bad_region());
        let output = temp_dir.path().join("out");

        let mut args = args(images, labels, output.clone());
        args.on_invalid_region = InvalidRegionPolicy::Clean;
        let tally = process_split_dataset(&args).unwrap();
        assert_eq!(tally.count(CLEAN_BUCKET), 1);
        assert_eq!(tally.failed(), 0);
        assert!(output.join("clean/bad.jpg").exists());
    }

    #[test]
    fn test_size_mismatch_is_never_cleaned() {
        let temp_dir = tempfile::tempdir().unwrap();
        let labels = json!({
            "images": [{"id": 1, "file_name": "small.jpg", "width": 4, "height": 4}],
            "categories": [{"id": 1, "name": "cat"}],
            "annotations": [
                {"id": 1, "image_id": 1, "category_id": 1,
                 "segmentation": {"size": [5, 5], "counts": [0, 25]}}
            ]
        });
        let (images, labels) = write_dataset(temp_dir.path(), &labels);
        let output = temp_dir.path().join("out");

        let mut args = args(images, labels, output.clone());
        args.on_invalid_region = InvalidRegionPolicy::Clean;
        let tally = process_split_dataset(&args).unwrap();
        assert_eq!(tally.failed(), 1);
        assert_eq!(tally.count(CLEAN_BUCKET), 0);
        assert!(!output.join("clean/small.jpg").exists());
        assert!(!output.join("cat/images/small.jpg").exists());
    }

    #[test]
    fn test_shared_stems_keep_their_own_masks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let labels = json!({
            "images": [
                {"id": 1, "file_name": "a.jpg", "width": 4, "height": 4},
                {"id": 2, "file_name": "a.png", "width": 4, "height": 4}
            ],
            "categories": [{"id": 1, "name": "cat"}],
            "annotations": [
                {"id": 1, "image_id": 1, "category_id": 1, "segmentation": square(0.0, 0.0, 4.0, 4.0)},
                {"id": 2, "image_id": 2, "category_id": 1, "segmentation": square(0.0, 0.0, 1.0, 1.0)}
            ]
        });
        let (images, labels) = write_dataset(temp_dir.path(), &labels);
        let output = temp_dir.path().join("out");

        let tally = process_split_dataset(&args(images, labels, output.clone())).unwrap();
        assert_eq!(tally.count("cat"), 2);
        assert_eq!(tally.failed(), 0);
        assert_eq!(fs::read(output.join("cat/images/a_1.jpg")).unwrap(), b"a.jpg");
        assert_eq!(fs::read(output.join("cat/images/a_2.png")).unwrap(), b"a.png");
        assert_eq!(count_foreground(&output.join("cat/masks/a_1.png")), 16);
        assert_eq!(count_foreground(&output.join("cat/masks/a_2.png")), 1);
        assert!(!output.join("cat/masks/a.png").exists());
    }

    #[test]
    fn test_invalid_region_abort_policy() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (images, labels) = write_dataset(temp_dir.path(), &labels_with_bad_region());

        let mut args = args(images, labels, temp_dir.path().join("out"));
        args.on_invalid_region = InvalidRegionPolicy::Abort;
        let err = process_split_dataset(&args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SplitError>(),
            Some(SplitError::InvalidRegion { annotation_id: 2, .. })
        ));
    }

    #[test]
    fn test_missing_source_image_is_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (images, labels) = write_dataset(temp_dir.path(), &sample_labels());
        fs::remove_file(images.join("four.jpg")).unwrap();

        let tally =
            process_split_dataset(&args(images, labels, temp_dir.path().join("out"))).unwrap();
        assert_eq!(tally.count(CLEAN_BUCKET), 0);
        assert_eq!(tally.failed(), 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (images, labels) = write_dataset(temp_dir.path(), &sample_labels());
        let output = temp_dir.path().join("out");

        let mut args = args(images, labels, output.clone());
        args.dry_run = true;
        let tally = process_split_dataset(&args).unwrap();
        assert_eq!(tally.total_processed(), 4);
        assert!(!output.exists());
    }

    #[test]
    fn test_tally_sums_to_image_count() {
        let n = 37u64;
        let names = ["cat", "dog", "bird"];
        let images: Vec<Value> = (0..n)
            .map(|id| json!({"id": id, "file_name": format!("{}.jpg", id), "width": 6, "height": 6}))
            .collect();
        let categories: Vec<Value> = names
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"id": i, "name": name}))
            .collect();
        // Every fourth image stays unlabeled
        let annotations: Vec<Value> = (0..n)
            .filter(|id| id % 4 != 0)
            .map(|id| {
                json!({"id": id, "image_id": id, "category_id": id % 3,
                       "segmentation": square(1.0, 1.0, 4.0, 4.0)})
            })
            .collect();
        let coco: CocoFile = serde_json::from_value(json!({
            "images": images, "categories": categories, "annotations": annotations
        }))
        .unwrap();

        let index = AnnotationIndex::build(coco).unwrap();
        let partitioner = Partitioner::new(&index);
        let tally = partitioner.run();

        assert_eq!(tally.total_assigned(), n as usize);
        assert_eq!(tally.count(CLEAN_BUCKET), 10);
        let per_class: usize = names.iter().map(|name| tally.count(name)).sum();
        assert_eq!(per_class + tally.count(CLEAN_BUCKET), n as usize);

        let parallel = partitioner
            .run_parallel(|outcome| Ok::<_, SplitError>(outcome.disposition()))
            .unwrap();
        assert_eq!(parallel, tally);
    }

    #[test]
    fn test_decisions_are_stable_across_runs() {
        let coco: CocoFile = serde_json::from_value(sample_labels()).unwrap();
        let index = AnnotationIndex::build(coco).unwrap();
        let first: Vec<RoutingDecision> = Partitioner::new(&index)
            .decisions()
            .map(|outcome| outcome.decision.unwrap())
            .collect();
        let second: Vec<RoutingDecision> = Partitioner::new(&index)
            .decisions()
            .map(|outcome| outcome.decision.unwrap())
            .collect();
        assert_eq!(first, second);
        assert!(matches!(first[2], RoutingDecision::Conflict { .. }));
        assert_eq!(first[3], RoutingDecision::Unlabeled);
    }
}
