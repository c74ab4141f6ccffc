//! Progress reporting and cancellation for restore runs.
//!
//! Regular files may be restored on worker threads, so reporters take
//! `&self` and must be `Send + Sync`.
//!
//! # Example
//!
//! ```rust
//! use pagerestore::progress::{AtomicProgress, ProgressReporter};
//!
//! let progress = AtomicProgress::shared();
//! progress.on_entry_start("base/1/1234", 8192);
//! progress.on_entry_complete("base/1/1234", true);
//! assert_eq!(progress.entries_completed(), 1);
//!
//! progress.cancel();
//! assert!(progress.should_cancel());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress reporting trait for restore runs.
pub trait ProgressReporter: Send + Sync {
    /// Called when an entry is about to be restored.
    fn on_entry_start(&self, entry_name: &str, size: u64) {
        let _ = (entry_name, size);
    }

    /// Called when an entry finished, successfully or not.
    fn on_entry_complete(&self, entry_name: &str, success: bool) {
        let _ = (entry_name, success);
    }

    /// Checks if cancellation has been requested.
    ///
    /// Polled before each entry is dispatched. Entries already handed to a
    /// worker still run to completion.
    fn should_cancel(&self) -> bool {
        false
    }
}

impl<T: ProgressReporter + ?Sized> ProgressReporter for Arc<T> {
    fn on_entry_start(&self, entry_name: &str, size: u64) {
        (**self).on_entry_start(entry_name, size)
    }

    fn on_entry_complete(&self, entry_name: &str, success: bool) {
        (**self).on_entry_complete(entry_name, success)
    }

    fn should_cancel(&self) -> bool {
        (**self).should_cancel()
    }
}

/// Lock-free progress counters with a cancel flag.
#[derive(Debug)]
pub struct AtomicProgress {
    entries_started: AtomicU64,
    entries_completed: AtomicU64,
    entries_failed: AtomicU64,
    bytes_processed: AtomicU64,
    cancelled: AtomicBool,
    start_time: Instant,
}

impl Default for AtomicProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgress {
    /// Creates a new atomic progress reporter.
    pub fn new() -> Self {
        Self {
            entries_started: AtomicU64::new(0),
            entries_completed: AtomicU64::new(0),
            entries_failed: AtomicU64::new(0),
            bytes_processed: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            start_time: Instant::now(),
        }
    }

    /// Creates a shared atomic progress reporter.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the number of entries started.
    pub fn entries_started(&self) -> u64 {
        self.entries_started.load(Ordering::Relaxed)
    }

    /// Returns the number of entries restored successfully.
    pub fn entries_completed(&self) -> u64 {
        self.entries_completed.load(Ordering::Relaxed)
    }

    /// Returns the number of entries that failed.
    pub fn entries_failed(&self) -> u64 {
        self.entries_failed.load(Ordering::Relaxed)
    }

    /// Returns the payload bytes of all started entries.
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed.load(Ordering::Relaxed)
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns elapsed time since creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns processing rate in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            0.0
        } else {
            self.bytes_processed() as f64 / elapsed
        }
    }
}

impl ProgressReporter for AtomicProgress {
    fn on_entry_start(&self, _entry_name: &str, size: u64) {
        self.entries_started.fetch_add(1, Ordering::Relaxed);
        self.bytes_processed.fetch_add(size, Ordering::Relaxed);
    }

    fn on_entry_complete(&self, _entry_name: &str, success: bool) {
        if success {
            self.entries_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.entries_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn should_cancel(&self) -> bool {
        self.is_cancelled()
    }
}

/// Formats a byte count using IEC units.
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let b = bytes as f64;
    if b >= GIB {
        format!("{:.2} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.2} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.2} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}
