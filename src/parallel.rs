//! Bounded parallel restore of regular files.
//!
//! The archive is consumed strictly in order on the calling thread.
//! Directories and links are applied right there; regular-file payloads are
//! handed to a rayon pool. A bounded channel of permits caps the number of
//! payloads in flight, so the dispatcher blocks when workers fall behind.

#[cfg(feature = "parallel")]
use std::sync::Mutex;

#[cfg(feature = "parallel")]
use crossbeam_channel::{Receiver, Sender, bounded};

use crate::entry::ArchiveEntry;
#[cfg(feature = "parallel")]
use crate::entry::EntryKind;
use crate::interpreter::RestoreInterpreter;
use crate::{Error, Result};

/// Statistics about one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Entries handed to the interpreter.
    pub entries_dispatched: usize,
    /// Regular files restored on worker threads.
    pub files_offloaded: usize,
    /// Worker threads used (1 when running sequentially).
    pub threads_used: usize,
}

/// Drives a [`RestoreInterpreter`] over a stream of entries.
///
/// # Example
///
/// ```rust,no_run
/// use pagerestore::catalog::FilesMetadataDto;
/// use pagerestore::{ArchiveEntry, ParallelRestorer, RestoreInterpreter, RestoreOptions};
///
/// let interpreter = RestoreInterpreter::new("/restore", FilesMetadataDto::default(), RestoreOptions::new())?;
/// let entries = vec![
///     Ok(ArchiveEntry::directory("base", 0o700)),
///     Ok(ArchiveEntry::file("base/PG_VERSION", b"15\n".to_vec())),
/// ];
/// ParallelRestorer::new(&interpreter)?.restore(entries)?;
/// let summary = interpreter.into_summary();
/// # Ok::<(), pagerestore::Error>(())
/// ```
pub struct ParallelRestorer<'a> {
    interpreter: &'a RestoreInterpreter,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for ParallelRestorer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelRestorer")
            .field("data_dir", &self.interpreter.data_dir())
            .field("threads", &self.threads_used())
            .finish_non_exhaustive()
    }
}

impl<'a> ParallelRestorer<'a> {
    /// Creates a restorer using the interpreter's thread configuration.
    ///
    /// With `Threads::Single`, or without the `parallel` feature, every entry
    /// is restored on the calling thread.
    pub fn new(interpreter: &'a RestoreInterpreter) -> Result<Self> {
        #[cfg(feature = "parallel")]
        {
            let threads = interpreter.options().threads.count();
            let pool = if threads > 1 {
                Some(
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .thread_name(|i| format!("pagerestore-{}", i))
                        .build()
                        .map_err(|e| Error::io(interpreter.data_dir(), std::io::Error::other(e)))?,
                )
            } else {
                None
            };
            Ok(Self { interpreter, pool })
        }
        #[cfg(not(feature = "parallel"))]
        {
            Ok(Self { interpreter })
        }
    }

    /// Returns the interpreter being driven.
    pub fn interpreter(&self) -> &'a RestoreInterpreter {
        self.interpreter
    }

    /// Number of threads restoring regular files.
    pub fn threads_used(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            self.pool.as_ref().map_or(1, |p| p.current_num_threads())
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }

    /// Restores every entry of `entries` in order.
    ///
    /// Stops dispatching at the first error (from the stream, the dispatching
    /// thread or a worker) or on cancellation, waits for in-flight workers,
    /// and returns that error. Outcomes recorded before the failure remain
    /// in the interpreter.
    pub fn restore<I>(&self, entries: I) -> Result<DispatchStats>
    where
        I: IntoIterator<Item = Result<ArchiveEntry>>,
    {
        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.pool {
            return self.restore_parallel(pool, entries.into_iter());
        }
        self.restore_sequential(entries.into_iter())
    }

    fn restore_sequential(
        &self,
        entries: impl Iterator<Item = Result<ArchiveEntry>>,
    ) -> Result<DispatchStats> {
        let mut stats = DispatchStats {
            threads_used: 1,
            ..Default::default()
        };
        for entry in entries {
            if self.interpreter.options().should_cancel() {
                log::info!("restore cancelled after {} entries", stats.entries_dispatched);
                return Err(Error::Cancelled);
            }
            self.interpreter.interpret(&entry?)?;
            stats.entries_dispatched += 1;
        }
        Ok(stats)
    }

    #[cfg(feature = "parallel")]
    fn restore_parallel(
        &self,
        pool: &rayon::ThreadPool,
        entries: impl Iterator<Item = Result<ArchiveEntry>>,
    ) -> Result<DispatchStats> {
        let limit = self.interpreter.options().in_flight_limit().max(1);
        let (release, acquire) = bounded::<()>(limit);
        for _ in 0..limit {
            // Cannot fail: capacity matches and both ends are alive
            let _ = release.send(());
        }

        let failure: Mutex<Option<Error>> = Mutex::new(None);
        let mut stats = DispatchStats {
            threads_used: pool.current_num_threads(),
            ..Default::default()
        };

        let interpreter = self.interpreter;
        let dispatched: Result<()> = pool.in_place_scope(|scope| {
            for entry in entries {
                if has_failed(&failure) {
                    break;
                }
                if interpreter.options().should_cancel() {
                    log::info!("restore cancelled after {} entries", stats.entries_dispatched);
                    return Err(Error::Cancelled);
                }
                let entry = entry?;
                stats.entries_dispatched += 1;

                if entry.kind() != EntryKind::RegularFile {
                    interpreter.interpret(&entry)?;
                    continue;
                }

                let permit = Permit::acquire(&acquire, &release);
                stats.files_offloaded += 1;
                let failure = &failure;
                scope.spawn(move |_| {
                    let _permit = permit;
                    if let Err(e) = interpreter.interpret(&entry) {
                        log::debug!("worker failed on '{}': {}", entry.name(), e);
                        let mut slot = lock_or_recover(failure);
                        slot.get_or_insert(e);
                    }
                });
            }
            Ok(())
        });

        // Scope exit joined every worker
        let worker_error = failure.into_inner().unwrap_or_else(|p| p.into_inner());
        match (dispatched, worker_error) {
            (Err(e), _) => Err(e),
            (Ok(()), Some(e)) => Err(e),
            (Ok(()), None) => Ok(stats),
        }
    }
}

/// One slot of the in-flight budget, returned on drop.
#[cfg(feature = "parallel")]
struct Permit {
    release: Sender<()>,
}

#[cfg(feature = "parallel")]
impl Permit {
    fn acquire(acquire: &Receiver<()>, release: &Sender<()>) -> Self {
        // Both channel ends live in the dispatcher, so recv only blocks
        let _ = acquire.recv();
        Self {
            release: release.clone(),
        }
    }
}

#[cfg(feature = "parallel")]
impl Drop for Permit {
    fn drop(&mut self) {
        let _ = self.release.send(());
    }
}

#[cfg(feature = "parallel")]
fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Worker failure mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

#[cfg(feature = "parallel")]
fn has_failed(failure: &Mutex<Option<Error>>) -> bool {
    lock_or_recover(failure).is_some()
}
