use imgdupe::duplicates::{DuplicateFinder, FinderConfig, MatchKind};
use std::fs;
use tempfile::tempdir;

use super::fixtures::{inverted_pattern, name, pattern_image, save};

#[test]
fn test_same_picture_in_two_formats_is_similar() {
    let dir = tempdir().unwrap();
    let img = pattern_image(64, 64);
    save(dir.path(), "a.png", &img);
    save(dir.path(), "b.bmp", &img);
    save(dir.path(), "c.png", &inverted_pattern(64, 64));

    let finder = DuplicateFinder::new(FinderConfig::default().with_find_exact(false));
    let (result, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(result.total_images, 3);
    assert!(result.exact_duplicates.is_empty());
    assert_eq!(result.similar_images.len(), 1);

    let group = &result.similar_images[0];
    assert_eq!(group.kind, MatchKind::Similar);
    assert_eq!(group.similarity, Some(0));
    let names: Vec<String> = group.images.iter().map(|i| name(&i.path)).collect();
    assert_eq!(names, vec!["a.png", "b.bmp"]);
}

#[test]
fn test_inverted_image_is_not_similar() {
    let dir = tempdir().unwrap();
    save(dir.path(), "a.png", &pattern_image(64, 64));
    save(dir.path(), "b.png", &inverted_pattern(64, 64));

    let finder = DuplicateFinder::new(FinderConfig::default().with_find_exact(false));
    let (result, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(result.similar_images.is_empty());
    assert!(!result.has_duplicates());
}

#[test]
fn test_exact_copies_are_collapsed_before_similarity() {
    let dir = tempdir().unwrap();
    let img = pattern_image(64, 64);
    let original = save(dir.path(), "a.png", &img);
    fs::copy(&original, dir.path().join("a_copy.png")).unwrap();
    save(dir.path(), "b.bmp", &img);

    let finder = DuplicateFinder::with_defaults();
    let (result, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(result.exact_duplicates.len(), 1);
    let exact: Vec<String> = result.exact_duplicates[0]
        .images
        .iter()
        .map(|i| name(&i.path))
        .collect();
    assert_eq!(exact, vec!["a.png", "a_copy.png"]);

    // Only the first exact copy takes part in similarity.
    assert_eq!(result.similar_images.len(), 1);
    let similar: Vec<String> = result.similar_images[0]
        .images
        .iter()
        .map(|i| name(&i.path))
        .collect();
    assert_eq!(similar, vec!["a.png", "b.bmp"]);
}

#[test]
fn test_similarity_only_keeps_exact_copies_in_clusters() {
    let dir = tempdir().unwrap();
    let original = save(dir.path(), "a.png", &pattern_image(64, 64));
    fs::copy(&original, dir.path().join("b.png")).unwrap();

    let finder = DuplicateFinder::new(FinderConfig::default().with_find_exact(false));
    let (result, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    // Without exact matching there is nothing to collapse.
    assert!(result.exact_duplicates.is_empty());
    assert_eq!(result.similar_images.len(), 1);
    assert_eq!(result.similar_images[0].len(), 2);
}

#[test]
fn test_zero_threshold_requires_identical_digests() {
    let dir = tempdir().unwrap();
    let img = pattern_image(64, 64);
    save(dir.path(), "a.png", &img);
    save(dir.path(), "b.bmp", &img);

    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_exact(false)
            .with_similarity_threshold(0),
    );
    let (result, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(result.similar_images.len(), 1);
    assert_eq!(result.similar_images[0].similarity, Some(0));
}

#[test]
fn test_similar_savings_counts_non_keepers() {
    let dir = tempdir().unwrap();
    let img = pattern_image(64, 64);
    let png = save(dir.path(), "a.png", &img);
    let bmp = save(dir.path(), "b.bmp", &img);

    let finder = DuplicateFinder::new(FinderConfig::default().with_find_exact(false));
    let (result, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    let png_size = fs::metadata(&png).unwrap().len();
    let bmp_size = fs::metadata(&bmp).unwrap().len();
    assert_eq!(result.potential_savings_similar(), png_size.min(bmp_size));
    assert_eq!(result.similar_file_count(), 2);
}
