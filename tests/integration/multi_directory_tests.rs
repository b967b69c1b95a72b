use imgdupe::duplicates::{DuplicateFinder, FinderConfig};
use std::fs;
use tempfile::tempdir;

use super::fixtures::name;

fn exact_only() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_find_similar(false))
}

#[test]
fn test_duplicates_across_directories() {
    let dir1 = tempdir().unwrap();
    let dir2 = tempdir().unwrap();
    fs::write(dir1.path().join("holiday.jpg"), b"beach").unwrap();
    fs::write(dir2.path().join("copy.jpg"), b"beach").unwrap();

    let (result, _) = exact_only()
        .find_duplicates(&[dir1.path().to_path_buf(), dir2.path().to_path_buf()])
        .unwrap();

    assert_eq!(result.total_images, 2);
    assert_eq!(result.exact_duplicates.len(), 1);
    let names: Vec<String> = result.exact_duplicates[0]
        .images
        .iter()
        .map(|i| name(&i.path))
        .collect();
    // Roots are visited in argument order.
    assert_eq!(names, vec!["holiday.jpg", "copy.jpg"]);
}

#[test]
fn test_nested_roots_count_each_file_once() {
    let dir = tempdir().unwrap();
    let child = dir.path().join("child");
    fs::create_dir(&child).unwrap();
    fs::write(dir.path().join("a.jpg"), b"one").unwrap();
    fs::write(child.join("b.jpg"), b"two").unwrap();

    let (result, _) = exact_only()
        .find_duplicates(&[dir.path().to_path_buf(), child.clone()])
        .unwrap();

    assert_eq!(result.total_images, 2);
    assert!(!result.has_duplicates());
}

#[test]
fn test_same_root_twice() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.jpg"), b"one").unwrap();

    let (result, _) = exact_only()
        .find_duplicates(&[dir.path().to_path_buf(), dir.path().join(".")])
        .unwrap();

    assert_eq!(result.total_images, 1);
    assert!(!result.has_duplicates());
}

#[test]
fn test_explicit_path_list() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.jpg");
    let b = dir.path().join("b.jpg");
    fs::write(&a, b"same").unwrap();
    fs::write(&b, b"same").unwrap();

    let (result, _) = exact_only()
        .find_duplicates_in_paths(vec![a.clone(), b.clone(), a.clone()])
        .unwrap();

    assert_eq!(result.total_images, 2);
    assert_eq!(result.exact_duplicates.len(), 1);
}
