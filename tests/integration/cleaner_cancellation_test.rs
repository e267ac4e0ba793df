// Integration tests for TempCleaner cancellation functionality
// Tests cooperative cancellation during file deletion operations

use rboost::core::cleaner::TempCleaner;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn populate(dir: &std::path::Path, count: usize) {
    for i in 0..count {
        std::fs::write(dir.join(format!("file{}.txt", i)), "content").unwrap();
    }
}

#[test]
fn test_cancellation_during_cleanup() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 20);

    let cleaner = TempCleaner::with_directories([temp_dir.path()]);
    let cancel_flag = cleaner.cancel_flag.clone();

    // Cancel from inside the progress callback once five files were seen
    let stats = cleaner
        .clean(false, |processed, _| {
            if processed == 5 {
                cancel_flag.store(true, Ordering::Relaxed);
            }
        })
        .unwrap();

    assert!(stats.was_cancelled, "Should indicate cancellation occurred");
    assert_eq!(stats.processed, 5);
    assert_eq!(stats.deleted_files, 5);

    let remaining = std::fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(remaining, 15, "Files after the cancel point must survive");
}

#[test]
fn test_no_cancellation_completes_fully() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 10);

    let cleaner = TempCleaner::with_directories([temp_dir.path()]);
    let stats = cleaner.clean(false, |_, _| {}).unwrap();

    assert!(!stats.was_cancelled, "Should not be cancelled");
    assert_eq!(stats.deleted_files, 10, "Should delete all files");
    assert_eq!(stats.failed_files, 0);
}

#[test]
fn test_cancel_before_start() {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..5 {
        let subdir = temp_dir.path().join(format!("dir{}", i));
        std::fs::create_dir(&subdir).unwrap();
        populate(&subdir, 4);
    }

    let cleaner = TempCleaner::with_directories([temp_dir.path()]);
    cleaner.cancel();

    let stats = cleaner.clean(false, |_, _| {}).unwrap();

    assert!(stats.was_cancelled, "Should be cancelled");
    assert_eq!(stats.total_files, 20, "Scan still reports what was found");
    assert_eq!(stats.deleted_files, 0, "Nothing deleted when cancelled before start");
}

#[test]
fn test_shared_cancel_flag() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 3);

    let task_flag = Arc::new(AtomicBool::new(true));
    let cleaner = TempCleaner::with_directories([temp_dir.path()]).with_cancel_flag(Arc::clone(&task_flag));

    assert!(cleaner.is_cancelled());
    let stats = cleaner.clean(true, |_, _| {}).unwrap();
    assert!(stats.was_cancelled);
    assert_eq!(stats.processed, 0);
}

#[test]
fn test_age_filter_keeps_new_files() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 30);

    let cleaner = TempCleaner::with_directories([temp_dir.path()]).with_min_age(Some(Duration::from_secs(3600)));
    let stats = cleaner.clean(false, |_, _| {}).unwrap();

    let remaining = std::fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(remaining, 30, "Files should not be deleted due to age filter");
    assert_eq!(stats.deleted_files, 0, "No files should be deleted");
    assert!(!stats.was_cancelled);
}
