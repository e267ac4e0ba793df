//! Temporary files cleaner
//!
//! Scans and deletes files below the system temporary directories plus any
//! user-configured paths.
//!
//! # Examples
//!
//! ```no_run
//! use rboost::core::cleaner::TempCleaner;
//!
//! let cleaner = TempCleaner::new();
//!
//! let stats = cleaner.scan();
//! println!("Found {} files ({} bytes)", stats.total_files, stats.total_size);
//!
//! let stats = cleaner.clean(true, |processed, total| {
//!     println!("Progress: {}/{}", processed, total);
//! })?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::platform::get_default_temp_directories;

pub struct TempCleaner {
    pub directories: Vec<PathBuf>,
    /// Files modified more recently than this are left alone.
    pub min_age: Option<Duration>,
    pub cancel_flag: Arc<AtomicBool>,
}

/// Statistics from cleanup operations
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupStats {
    pub total_files: usize,
    pub total_size: u64,
    pub processed: usize,
    pub deleted_files: usize,
    pub deleted_size: u64,
    pub failed_files: usize,
    pub was_cancelled: bool,
}

impl TempCleaner {
    /// Cleaner over the platform's default temporary directories.
    pub fn new() -> Self {
        Self::with_directories(get_default_temp_directories())
    }

    pub fn with_directories<I, P>(directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            directories: directories.into_iter().map(Into::into).collect(),
            min_age: None,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add extra directories, skipping duplicates and paths that are not
    /// directories.
    pub fn add_directories<I, P>(&mut self, extra: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for dir in extra.into_iter().map(Into::into) {
            if !dir.is_dir() {
                log::warn!("Skipping clean path {}: not a directory", dir.display());
                continue;
            }
            if !self.directories.contains(&dir) {
                self.directories.push(dir);
            }
        }
    }

    pub fn with_min_age(mut self, min_age: Option<Duration>) -> Self {
        self.min_age = min_age;
        self
    }

    /// Share an existing cancellation flag, e.g. the one of a running task.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = flag;
        self
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Count the files a clean would touch.
    pub fn scan(&self) -> CleanupStats {
        let mut stats = CleanupStats::default();
        for dir in &self.directories {
            self.count_files_recursive(dir, &mut stats);
        }
        stats
    }

    /// Delete eligible files, calling `on_progress(processed, total)` before
    /// each one. With `dry_run` nothing is removed but the stats are computed
    /// as if it had been.
    pub fn clean<F>(&self, dry_run: bool, on_progress: F) -> Result<CleanupStats>
    where
        F: FnMut(usize, usize),
    {
        let scanned = self.scan();

        let mut ctx = DeleteContext {
            stats: CleanupStats {
                total_files: scanned.total_files,
                total_size: scanned.total_size,
                ..Default::default()
            },
            dry_run,
            on_progress,
        };

        for dir in &self.directories {
            if self.is_cancelled() {
                break;
            }
            self.delete_files_recursive(dir, &mut ctx);
        }

        ctx.stats.was_cancelled = self.is_cancelled();
        log::info!(
            "Temp cleanup{}: {} of {} files removed ({} bytes), {} failed{}",
            if dry_run { " (dry run)" } else { "" },
            ctx.stats.deleted_files,
            ctx.stats.total_files,
            ctx.stats.deleted_size,
            ctx.stats.failed_files,
            if ctx.stats.was_cancelled { ", cancelled" } else { "" }
        );
        Ok(ctx.stats)
    }

    fn is_old_enough(&self, metadata: &fs::Metadata) -> bool {
        let Some(min_age) = self.min_age else {
            return true;
        };
        metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age >= min_age)
    }

    fn count_files_recursive(&self, dir: &Path, stats: &mut CleanupStats) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.is_file() {
                if self.is_old_enough(&metadata) {
                    stats.total_files += 1;
                    stats.total_size += metadata.len();
                }
            } else if metadata.is_dir() {
                self.count_files_recursive(&entry.path(), stats);
            }
        }
    }

    fn delete_files_recursive<F>(&self, dir: &Path, ctx: &mut DeleteContext<F>)
    where
        F: FnMut(usize, usize),
    {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            if self.is_cancelled() {
                return;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };

            if metadata.is_file() {
                if !self.is_old_enough(&metadata) {
                    continue;
                }
                ctx.stats.processed += 1;
                (ctx.on_progress)(ctx.stats.processed, ctx.stats.total_files);

                let size = metadata.len();
                if ctx.dry_run {
                    ctx.stats.deleted_files += 1;
                    ctx.stats.deleted_size += size;
                    continue;
                }
                match fs::remove_file(entry.path()) {
                    Ok(()) => {
                        ctx.stats.deleted_files += 1;
                        ctx.stats.deleted_size += size;
                    }
                    Err(e) => {
                        log::debug!("Could not delete {}: {}", entry.path().display(), e);
                        ctx.stats.failed_files += 1;
                    }
                }
            } else if metadata.is_dir() {
                let path = entry.path();
                self.delete_files_recursive(&path, ctx);
                if !ctx.dry_run && !self.is_cancelled() {
                    // Only succeeds once the directory is empty.
                    let _ = fs::remove_dir(&path);
                }
            }
        }
    }
}

impl Default for TempCleaner {
    fn default() -> Self {
        Self::new()
    }
}

struct DeleteContext<F>
where
    F: FnMut(usize, usize),
{
    stats: CleanupStats,
    dry_run: bool,
    on_progress: F,
}
