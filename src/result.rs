//! Per-file outcomes and their run-wide aggregate.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of restoring one regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrapResult {
    /// The entry was not materialized.
    Skipped,
    /// The file was written in full from the payload.
    Completed,
    /// A new file was built from an increment.
    CreatedFromIncrement {
        /// Number of blocks the increment carried.
        blocks: usize,
    },
    /// Increment blocks were merged into an existing file.
    WroteIncrementBlocks {
        /// Number of blocks written.
        blocks: usize,
    },
}

/// Acquires a mutex lock, recovering from poisoned state if necessary.
///
/// Each insert is a single container operation, so a panic on another
/// thread cannot leave a collection half-updated.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Restore result mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Concurrency-safe aggregate of per-file outcomes.
///
/// The three collections are locked independently, so workers recording
/// different kinds of outcome never contend. Locks are held for one insert
/// only.
#[derive(Debug, Default)]
pub struct RestoreResult {
    completed_files: Mutex<Vec<String>>,
    created_page_files: Mutex<HashMap<String, usize>>,
    written_increment_files: Mutex<HashMap<String, usize>>,
}

impl RestoreResult {
    /// Creates an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome for `name`. `Skipped` is a no-op.
    pub fn record(&self, name: &str, result: UnwrapResult) {
        match result {
            UnwrapResult::Skipped => {}
            UnwrapResult::Completed => {
                lock_or_recover(&self.completed_files).push(name.to_string());
            }
            UnwrapResult::CreatedFromIncrement { blocks } => {
                lock_or_recover(&self.created_page_files).insert(name.to_string(), blocks);
            }
            UnwrapResult::WroteIncrementBlocks { blocks } => {
                lock_or_recover(&self.written_increment_files).insert(name.to_string(), blocks);
            }
        }
    }

    /// Number of outcomes recorded so far.
    pub fn len(&self) -> usize {
        lock_or_recover(&self.completed_files).len()
            + lock_or_recover(&self.created_page_files).len()
            + lock_or_recover(&self.written_increment_files).len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the aggregate and returns its contents.
    pub fn into_summary(self) -> RestoreSummary {
        fn take<T>(mutex: Mutex<T>) -> T {
            mutex.into_inner().unwrap_or_else(PoisonError::into_inner)
        }
        RestoreSummary {
            completed_files: take(self.completed_files),
            created_page_files: take(self.created_page_files),
            written_increment_files: take(self.written_increment_files),
        }
    }
}

/// Final, read-only view of a run's outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Files written in full, in completion order.
    pub completed_files: Vec<String>,
    /// Files created from an increment, with their block counts.
    pub created_page_files: HashMap<String, usize>,
    /// Files that had increment blocks merged, with their block counts.
    pub written_increment_files: HashMap<String, usize>,
}

impl RestoreSummary {
    /// Total number of files with a recorded outcome.
    pub fn file_count(&self) -> usize {
        self.completed_files.len() + self.created_page_files.len() + self.written_increment_files.len()
    }

    /// Total number of increment blocks applied.
    pub fn block_count(&self) -> usize {
        self.created_page_files.values().sum::<usize>()
            + self.written_increment_files.values().sum::<usize>()
    }

    /// Returns the outcome recorded for `name`, or `Skipped` if none was.
    pub fn outcome(&self, name: &str) -> UnwrapResult {
        if let Some(&blocks) = self.created_page_files.get(name) {
            UnwrapResult::CreatedFromIncrement { blocks }
        } else if let Some(&blocks) = self.written_increment_files.get(name) {
            UnwrapResult::WroteIncrementBlocks { blocks }
        } else if self.completed_files.iter().any(|n| n == name) {
            UnwrapResult::Completed
        } else {
            UnwrapResult::Skipped
        }
    }
}
