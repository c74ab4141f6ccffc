//! Restore run configuration.

use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::progress::ProgressReporter;
use crate::selection::FileSelection;
use crate::unwrap::UnwrapMode;
use crate::{Error, Result};

/// Default database page size in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 8192;

/// Smallest accepted page size.
pub const MIN_PAGE_SIZE: usize = 512;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 65536;

/// Thread configuration for parallel restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threads {
    /// Automatically determine thread count.
    #[default]
    Auto,
    /// Use a specific number of threads.
    Count(NonZeroUsize),
    /// Restore everything on the dispatching thread.
    Single,
}

impl Threads {
    /// Creates a `Threads::Count` variant from a `usize`.
    ///
    /// Returns `Threads::Single` if the count is zero.
    ///
    /// ```rust
    /// use pagerestore::Threads;
    ///
    /// assert_eq!(Threads::count_or_single(0), Threads::Single);
    /// assert_eq!(Threads::count_or_single(4).count(), 4);
    /// ```
    pub fn count_or_single(n: usize) -> Self {
        match NonZeroUsize::new(n) {
            Some(count) => Self::Count(count),
            None => Self::Single,
        }
    }

    /// Returns the actual thread count.
    ///
    /// `Auto` resolves to the number of available CPUs, minimum 1.
    pub fn count(&self) -> usize {
        match self {
            Self::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            Self::Count(n) => n.get(),
            Self::Single => 1,
        }
    }
}

/// Options for a restore run.
///
/// Every setting is an explicit input; nothing is read from process-wide
/// state.
///
/// # Example
///
/// ```rust
/// use pagerestore::{RestoreOptions, Threads, UnwrapMode};
///
/// let options = RestoreOptions::new()
///     .mode(UnwrapMode::Catchup)
///     .fsync(false)
///     .threads(Threads::count_or_single(4));
/// assert!(options.validate().is_ok());
/// assert!(RestoreOptions::new().page_size(1000).validate().is_err());
/// ```
#[derive(Clone)]
pub struct RestoreOptions {
    /// Page size of the database files in bytes.
    pub page_size: usize,
    /// Sync every restored file to stable storage.
    pub fsync: bool,
    /// Unwrap strategy for the run.
    pub mode: UnwrapMode,
    /// Thread configuration for regular-file restore.
    pub threads: Threads,
    /// Upper bound on payloads held in memory at once.
    ///
    /// `None` uses twice the thread count.
    pub max_in_flight: Option<NonZeroUsize>,
    /// Files to materialize.
    pub selection: FileSelection,
    /// Progress reporter (optional).
    pub progress: Option<Arc<dyn ProgressReporter>>,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fsync: true,
            mode: UnwrapMode::Default,
            threads: Threads::Auto,
            max_in_flight: None,
            selection: FileSelection::all(),
            progress: None,
        }
    }
}

impl std::fmt::Debug for RestoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestoreOptions")
            .field("page_size", &self.page_size)
            .field("fsync", &self.fsync)
            .field("mode", &self.mode)
            .field("threads", &self.threads)
            .field("max_in_flight", &self.max_in_flight)
            .field("selection", &self.selection.len())
            .finish_non_exhaustive()
    }
}

impl RestoreOptions {
    /// Creates restore options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Enables or disables fsync of restored files.
    pub fn fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    /// Sets the unwrap strategy.
    pub fn mode(mut self, mode: UnwrapMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the thread configuration.
    pub fn threads(mut self, threads: Threads) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the in-flight payload bound.
    pub fn max_in_flight(mut self, max: NonZeroUsize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    /// Restricts the run to the given files.
    pub fn selection(mut self, selection: FileSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the progress reporter.
    pub fn progress(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.progress = Some(Arc::new(reporter));
        self
    }

    /// Resolves the in-flight payload bound.
    pub fn in_flight_limit(&self) -> usize {
        self.max_in_flight
            .map(NonZeroUsize::get)
            .unwrap_or_else(|| self.threads.count().saturating_mul(2))
    }

    /// Checks the settings for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPageSize`] unless the page size is a power of
    /// two between 512 and 65536.
    pub fn validate(&self) -> Result<()> {
        let size = self.page_size;
        if !size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size) {
            return Err(Error::InvalidPageSize { size });
        }
        Ok(())
    }

    pub(crate) fn should_cancel(&self) -> bool {
        self.progress.as_ref().is_some_and(|p| p.should_cancel())
    }
}
