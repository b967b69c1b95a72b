use filetime::{set_file_mtime, FileTime};
use imgdupe::cache::HashCache;
use imgdupe::duplicates::{DuplicateFinder, FinderConfig};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

use super::fixtures::{pattern_image, save};

#[test]
fn test_cache_entry_invalidated_by_mtime_change() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("photo.jpg");
    fs::write(&file, vec![7u8; 1000]).unwrap();
    let file = file.canonicalize().unwrap();

    let cache = Arc::new(HashCache::open(&dir.path().join("cache.db")).unwrap());
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_similar(false)
            .with_cache(Arc::clone(&cache)),
    );
    finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert!(cache.get(&file).unwrap().is_some());

    let meta = fs::metadata(&file).unwrap();
    let later = FileTime::from_unix_time(
        FileTime::from_last_modification_time(&meta).unix_seconds() + 5,
        0,
    );
    set_file_mtime(&file, later).unwrap();

    assert!(cache.get(&file).unwrap().is_none());
    // The stale row is evicted on lookup.
    assert_eq!(cache.stats().unwrap().total, 0);
}

#[test]
fn test_cache_entry_invalidated_by_size_change() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("photo.jpg");
    fs::write(&file, vec![7u8; 1000]).unwrap();
    let file = file.canonicalize().unwrap();

    let cache = Arc::new(HashCache::open_in_memory().unwrap());
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_similar(false)
            .with_cache(Arc::clone(&cache)),
    );
    finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    let before = cache.get(&file).unwrap().unwrap();
    assert_eq!(before.size, 1000);

    let mtime = FileTime::from_last_modification_time(&fs::metadata(&file).unwrap());
    fs::write(&file, vec![7u8; 1200]).unwrap();
    set_file_mtime(&file, mtime).unwrap();

    assert!(cache.get(&file).unwrap().is_none());
    assert_eq!(cache.stats().unwrap().total, 0);
}

#[test]
fn test_rescan_is_served_from_cache() {
    let dir = tempdir().unwrap();
    let img = pattern_image(48, 48);
    save(dir.path(), "one.png", &img);
    save(dir.path(), "two.png", &img);
    save(dir.path(), "three.bmp", &img);

    let cache = Arc::new(HashCache::open(&dir.path().join("hashes.db")).unwrap());
    let finder = DuplicateFinder::new(FinderConfig::default().with_cache(Arc::clone(&cache)));

    let (first, first_stats) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(first_stats.cache_misses, 3);
    assert_eq!(first_stats.cache_writes, 3);

    let (second, second_stats) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(second_stats.cache_hits, 3);
    assert_eq!(second_stats.cache_misses, 0);
    assert_eq!(second_stats.cache_writes, 0);

    assert_eq!(first.exact_duplicates, second.exact_duplicates);
    assert_eq!(first.similar_images, second.similar_images);
    assert_eq!(first.total_images, second.total_images);
}

#[test]
fn test_cache_survives_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("cache").join("hashes.db");
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("a.jpg"), b"same bytes").unwrap();
    fs::write(images.join("b.jpg"), b"same bytes").unwrap();

    {
        let cache = Arc::new(HashCache::open(&db).unwrap());
        let finder = DuplicateFinder::new(
            FinderConfig::default()
                .with_find_similar(false)
                .with_cache(cache),
        );
        finder.find_duplicates(&[images.clone()]).unwrap();
    }

    let cache = Arc::new(HashCache::open(&db).unwrap());
    assert_eq!(cache.stats().unwrap().total, 2);
    assert_eq!(cache.stats().unwrap().with_exact, 2);

    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_similar(false)
            .with_cache(cache),
    );
    let (result, stats) = finder.find_duplicates(&[images]).unwrap();
    assert_eq!(stats.cache_hits, 2);
    assert_eq!(result.exact_duplicates.len(), 1);
}

#[test]
fn test_grid_change_recomputes_perceptual_digests() {
    let dir = tempdir().unwrap();
    save(dir.path(), "a.png", &pattern_image(32, 32));

    let cache = Arc::new(HashCache::open_in_memory().unwrap());
    let small = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_exact(false)
            .with_grid_size(8)
            .with_cache(Arc::clone(&cache)),
    );
    small.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    let large = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_exact(false)
            .with_grid_size(16)
            .with_cache(Arc::clone(&cache)),
    );
    let (_, stats) = large.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.cache_writes, 1);

    let (_, stats) = large.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(stats.cache_hits, 1);
}

#[test]
fn test_exact_then_similar_scan_keeps_both_digests() {
    let dir = tempdir().unwrap();
    let file = save(dir.path(), "a.png", &pattern_image(32, 32))
        .canonicalize()
        .unwrap();
    let cache = Arc::new(HashCache::open_in_memory().unwrap());

    let exact = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_similar(false)
            .with_cache(Arc::clone(&cache)),
    );
    exact.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    let row = cache.get(&file).unwrap().unwrap();
    assert!(row.exact_digest.is_some());
    assert!(row.structural_digest.is_none());

    let similar = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_exact(false)
            .with_cache(Arc::clone(&cache)),
    );
    let (_, stats) = similar.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(stats.cache_writes, 1);

    let after = cache.get(&file).unwrap().unwrap();
    assert_eq!(after.exact_digest, row.exact_digest);
    assert!(after.structural_digest.is_some());
    assert!(after.gradient_digest.is_some());
}

#[test]
fn test_similar_then_exact_scan_keeps_both_digests() {
    let dir = tempdir().unwrap();
    let file = save(dir.path(), "a.png", &pattern_image(32, 32))
        .canonicalize()
        .unwrap();
    let cache = Arc::new(HashCache::open_in_memory().unwrap());

    let similar = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_exact(false)
            .with_cache(Arc::clone(&cache)),
    );
    similar.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    let row = cache.get(&file).unwrap().unwrap();
    assert!(row.exact_digest.is_none());
    assert!(row.structural_digest.is_some());

    let exact = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_similar(false)
            .with_cache(Arc::clone(&cache)),
    );
    let (_, stats) = exact.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(stats.cache_writes, 1);

    let after = cache.get(&file).unwrap().unwrap();
    assert!(after.exact_digest.is_some());
    assert_eq!(after.structural_digest, row.structural_digest);
    assert_eq!(after.gradient_digest, row.gradient_digest);

    // A full scan is now served entirely from the cache.
    let both = DuplicateFinder::new(FinderConfig::default().with_cache(Arc::clone(&cache)));
    let (_, stats) = both.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_writes, 0);
}

#[cfg(unix)]
#[test]
fn test_non_utf8_names_never_share_fingerprints() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let first = dir.path().join(OsStr::from_bytes(b"a\xff.jpg"));
    let second = dir.path().join(OsStr::from_bytes(b"a\xfe.jpg"));
    fs::write(&first, b"AAAA").unwrap();
    fs::write(&second, b"BBBB").unwrap();
    let mtime = FileTime::from_unix_time(1_600_000_000, 0);
    set_file_mtime(&first, mtime).unwrap();
    set_file_mtime(&second, mtime).unwrap();

    let cache = Arc::new(HashCache::open_in_memory().unwrap());
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_find_similar(false)
            .with_io_threads(1)
            .with_cache(Arc::clone(&cache)),
    );

    let (first_run, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(first_run.total_images, 2);
    assert!(first_run.exact_duplicates.is_empty());
    assert_eq!(cache.stats().unwrap().total, 2);

    let (second_run, stats) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(stats.cache_hits, 2);
    assert!(second_run.exact_duplicates.is_empty());
}

#[test]
fn test_failed_file_is_not_cached() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

    let cache = Arc::new(HashCache::open_in_memory().unwrap());
    let finder = DuplicateFinder::new(FinderConfig::default().with_cache(Arc::clone(&cache)));
    let (result, stats) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(stats.cache_writes, 0);
    assert_eq!(cache.stats().unwrap().total, 0);
}
