//! # pagerestore
//!
//! Incremental restore engine for page-oriented database backups.
//!
//! A backup is a stream of archive entries (regular files, directories, hard
//! links and symbolic links) plus a catalog saying which files were captured
//! as full copies and which as block-level increments. This crate replays
//! that stream onto a data directory: full copies are written verbatim and
//! increments are either merged page by page into an existing copy or turned
//! into a new file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use pagerestore::catalog::FilesMetadataDto;
//! use pagerestore::{ParallelRestorer, RestoreInterpreter, RestoreOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let catalog = FilesMetadataDto::from_reader(
//!         File::open("files_metadata.json").map_err(|e| pagerestore::Error::io("files_metadata.json", e))?,
//!     )?;
//!     let interpreter = RestoreInterpreter::new(
//!         "/var/lib/postgresql/data",
//!         catalog,
//!         RestoreOptions::new(),
//!     )?;
//!
//!     let restorer = ParallelRestorer::new(&interpreter)?;
//!     let tar = File::open("part_1.tar").map_err(|e| pagerestore::Error::io("part_1.tar", e))?;
//!     pagerestore::restore_tar(tar, &restorer)?;
//!
//!     let summary = interpreter.into_summary();
//!     println!("{} files restored", summary.file_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `parallel` | Yes | Restore regular files on a rayon thread pool |
//! | `tar` | Yes | Restore straight from a tar stream |
//! | `cli` | No | The `pagerestore` command-line tool |
//!
//! ## Strategies
//!
//! The run's [`UnwrapMode`] picks how increments are applied:
//!
//! - `Default` creates sparse files from increments and overwrites listed
//!   pages of existing page files in place.
//! - `Catchup` writes every page of new files and resizes existing files to
//!   the logical size recorded in the increment before merging.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod catalog;
pub mod entry;
pub mod error;
pub mod increment;
pub mod interpreter;
pub mod options;
pub mod page_file;
pub mod parallel;
pub mod permanence;
pub mod progress;
pub mod reconciler;
pub mod result;
pub mod safety;
pub mod selection;
pub mod unwrap;

#[cfg(feature = "tar")]
#[cfg_attr(docsrs, doc(cfg(feature = "tar")))]
pub mod tar;

pub use entry::{ArchiveEntry, EntryHeader, EntryKind};
pub use error::{Error, LinkKind, Result};
pub use interpreter::RestoreInterpreter;
pub use options::{RestoreOptions, Threads};
pub use parallel::{DispatchStats, ParallelRestorer};
pub use progress::{AtomicProgress, ProgressReporter};
pub use result::{RestoreResult, RestoreSummary, UnwrapResult};
pub use selection::FileSelection;
pub use unwrap::{BackupFileOptions, FileUnwrapper, UnwrapMode, Unwrapper};

#[cfg(feature = "tar")]
pub use crate::tar::restore_tar;
