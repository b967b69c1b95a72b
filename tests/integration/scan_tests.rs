use imgdupe::duplicates::{DuplicateFinder, FinderConfig, FinderError, MatchKind};
use std::fs::{self, File};
use std::io::Write;
use tempfile::tempdir;

use super::fixtures::name;

fn exact_only() -> FinderConfig {
    FinderConfig::default().with_find_similar(false)
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (result, stats) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(!result.has_duplicates());
    assert_eq!(result.total_images, 0);
    assert_eq!(result.total_size, 0);
    assert_eq!(stats.files_hashed, 0);
}

#[test]
fn test_scan_exact_duplicates_scenario() {
    let dir = tempdir().unwrap();
    let content = vec![0xABu8; 500_000];
    fs::write(dir.path().join("a.jpg"), &content).unwrap();
    fs::write(dir.path().join("b.jpg"), &content).unwrap();
    fs::write(dir.path().join("c.jpg"), vec![0x11u8; 300_000]).unwrap();

    let finder = DuplicateFinder::new(exact_only());
    let (result, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(result.total_images, 3);
    assert_eq!(result.total_size, 1_300_000);
    assert_eq!(result.exact_duplicates.len(), 1);

    let group = &result.exact_duplicates[0];
    assert_eq!(group.kind, MatchKind::Exact);
    let names: Vec<String> = group.images.iter().map(|i| name(&i.path)).collect();
    assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    assert_eq!(group.potential_savings(), 500_000);
    assert_eq!(result.potential_savings_exact(), 500_000);
    assert_eq!(result.exact_duplicate_count(), 1);

    assert!(result
        .groups()
        .all(|g| g.images.iter().all(|i| name(&i.path) != "c.jpg")));
}

#[test]
fn test_scan_ignores_non_image_files() {
    let dir = tempdir().unwrap();
    File::create(dir.path().join("a.txt"))
        .unwrap()
        .write_all(b"duplicate")
        .unwrap();
    File::create(dir.path().join("b.txt"))
        .unwrap()
        .write_all(b"duplicate")
        .unwrap();
    File::create(dir.path().join("c.PNG"))
        .unwrap()
        .write_all(b"duplicate")
        .unwrap();

    let finder = DuplicateFinder::new(exact_only());
    let (result, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(result.total_images, 1);
    assert!(!result.has_duplicates());
}

#[test]
fn test_scan_recursive_and_non_recursive() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("nested").join("deeper");
    fs::create_dir_all(&nested).unwrap();
    fs::write(dir.path().join("top.jpg"), b"same").unwrap();
    fs::write(nested.join("deep.jpg"), b"same").unwrap();

    let recursive = DuplicateFinder::new(exact_only());
    let (result, _) = recursive
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(result.total_images, 2);
    assert_eq!(result.exact_duplicates.len(), 1);

    let flat = DuplicateFinder::new(exact_only().with_recursive(false));
    let (result, _) = flat.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(result.total_images, 1);
    assert!(!result.has_duplicates());
}

#[test]
fn test_best_member_is_largest_then_earliest() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.jpg"), b"identical").unwrap();
    fs::write(dir.path().join("b.jpg"), b"identical").unwrap();
    fs::write(dir.path().join("c.jpg"), b"identical").unwrap();

    let finder = DuplicateFinder::new(exact_only());
    let (result, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    let group = &result.exact_duplicates[0];
    assert_eq!(name(&group.best().path), "a.jpg");
    assert_eq!(group.potential_savings(), 18);
}

#[test]
fn test_scan_is_deterministic() {
    let dir = tempdir().unwrap();
    for i in 0..6 {
        fs::write(dir.path().join(format!("img_{}.jpg", i)), format!("class {}", i % 2)).unwrap();
    }

    let finder = DuplicateFinder::new(exact_only().with_io_threads(3));
    let (first, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    let (second, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    let paths = |r: &imgdupe::duplicates::DeduplicationResult| -> Vec<Vec<String>> {
        r.groups()
            .map(|g| g.images.iter().map(|i| name(&i.path)).collect())
            .collect()
    };
    assert_eq!(paths(&first), paths(&second));
    assert_eq!(
        paths(&first),
        vec![
            vec!["img_0.jpg", "img_2.jpg", "img_4.jpg"],
            vec!["img_1.jpg", "img_3.jpg", "img_5.jpg"],
        ]
    );
}

#[test]
fn test_scan_nonexistent_root() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let err = finder
        .find_duplicates(&[dir.path().join("missing")])
        .unwrap_err();
    assert!(matches!(err, FinderError::PathNotFound(_)));
}

#[test]
fn test_scan_root_that_is_a_file() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("photo.jpg");
    fs::write(&file, b"x").unwrap();

    let finder = DuplicateFinder::with_defaults();
    let err = finder.find_duplicates(&[file]).unwrap_err();
    assert!(matches!(err, FinderError::NotADirectory(_)));
}

#[test]
fn test_scan_one_bad_root_fails_whole_scan() {
    let good = tempdir().unwrap();
    fs::write(good.path().join("a.jpg"), b"a").unwrap();

    let finder = DuplicateFinder::new(exact_only());
    let err = finder
        .find_duplicates(&[good.path().to_path_buf(), good.path().join("nope")])
        .unwrap_err();
    assert!(matches!(err, FinderError::PathNotFound(_)));
}
