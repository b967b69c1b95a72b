use imgdupe::actions::relocate::{relocate_duplicates, RelocateConfig};
use imgdupe::duplicates::{DuplicateFinder, FinderConfig};
use std::fs;
use tempfile::tempdir;

use super::fixtures::name;

fn scan(dir: &std::path::Path) -> imgdupe::duplicates::DeduplicationResult {
    let finder = DuplicateFinder::new(FinderConfig::default().with_find_similar(false));
    finder.find_duplicates(&[dir.to_path_buf()]).unwrap().0
}

#[test]
fn test_relocate_moves_all_but_keeper() {
    let dir = tempdir().unwrap();
    let images = dir.path().join("images");
    let sub = images.join("sub");
    fs::create_dir_all(&sub).unwrap();
    fs::write(images.join("a.jpg"), b"same content").unwrap();
    fs::write(images.join("b.jpg"), b"same content").unwrap();
    fs::write(sub.join("b.jpg"), b"same content").unwrap();
    fs::write(images.join("unique.jpg"), b"different").unwrap();

    let result = scan(&images);
    let keeper = result.exact_duplicates[0].best().path.clone();

    let target = dir.path().join("dupes");
    let outcome = relocate_duplicates(&result, &RelocateConfig::new(target.clone())).unwrap();

    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.moved.len(), 2);
    assert_eq!(outcome.bytes_moved(), 24);
    assert!(keeper.exists());
    assert!(images.join("unique.jpg").exists());

    let mut moved: Vec<String> = fs::read_dir(&target)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    moved.sort();
    assert_eq!(moved, vec!["b.jpg", "b_1.jpg"]);
    for planned in &outcome.moved {
        assert!(!planned.from.exists());
        assert!(planned.to.exists());
    }
}

#[test]
fn test_relocate_dry_run_touches_nothing() {
    let dir = tempdir().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("a.jpg"), b"same").unwrap();
    fs::write(images.join("b.jpg"), b"same").unwrap();

    let result = scan(&images);
    let target = dir.path().join("dupes");
    let config = RelocateConfig::new(target.clone()).with_dry_run(true);
    let outcome = relocate_duplicates(&result, &config).unwrap();

    assert!(outcome.dry_run);
    assert_eq!(outcome.moved.len(), 1);
    assert_eq!(name(&outcome.moved[0].from), "b.jpg");
    assert!(!target.exists());
    assert!(images.join("a.jpg").exists());
    assert!(images.join("b.jpg").exists());
}

#[test]
fn test_relocate_skips_files_changed_since_scan() {
    let dir = tempdir().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("a.jpg"), b"same").unwrap();
    fs::write(images.join("b.jpg"), b"same").unwrap();
    fs::write(images.join("c.jpg"), b"same").unwrap();

    let result = scan(&images);
    fs::write(images.join("b.jpg"), b"rewritten with more bytes").unwrap();
    fs::remove_file(images.join("c.jpg")).unwrap();

    let target = dir.path().join("dupes");
    let outcome = relocate_duplicates(&result, &RelocateConfig::new(target)).unwrap();

    assert!(outcome.moved.is_empty());
    assert_eq!(outcome.failures.len(), 2);
    assert!(images.join("b.jpg").exists());
}
