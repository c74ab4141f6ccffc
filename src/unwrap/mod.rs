//! Unwrap strategies: how a regular-file payload lands on disk.
//!
//! Two strategies exist and one is picked per run:
//!
//! - [`DefaultUnwrapper`] writes full copies verbatim, creates sparse files
//!   from increments and merges increment pages into existing page files.
//! - [`CatchupUnwrapper`] is used when a catch-up backup is applied on top of
//!   an older copy. New files are materialized densely and existing files are
//!   first resized to the size recorded in the increment.
//!
//! Both implement [`FileUnwrapper`]; [`Unwrapper`] is the closed set the
//! interpreter dispatches through.

mod catchup;
mod default;
pub(crate) mod pages;

use std::fs::File;
use std::io::Read;

pub use catchup::CatchupUnwrapper;
pub use default::DefaultUnwrapper;

use crate::Result;
use crate::entry::EntryHeader;
use crate::result::UnwrapResult;

/// Facts about one file that drive the unwrap decision.
///
/// Computed per entry and never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupFileOptions {
    /// The catalog marks the file as an increment.
    pub is_incremented: bool,
    /// The file already on disk is page structured.
    pub is_page_file: bool,
}

/// Run-wide choice of unwrap strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnwrapMode {
    /// Regular restore.
    #[default]
    Default,
    /// Catch-up restore creating new incremental files.
    Catchup,
}

/// Strategy for writing one regular file's payload.
///
/// `file` is open for reading and writing and positioned at the start.
/// Syncing and closing are the caller's job.
pub trait FileUnwrapper {
    /// Writes a payload into a file that did not exist before.
    fn unwrap_new_file(
        &self,
        payload: &mut dyn Read,
        header: &EntryHeader,
        file: &mut File,
        options: BackupFileOptions,
    ) -> Result<UnwrapResult>;

    /// Writes a payload into a file that already existed.
    fn unwrap_existing_file(
        &self,
        payload: &mut dyn Read,
        header: &EntryHeader,
        file: &mut File,
        options: BackupFileOptions,
    ) -> Result<UnwrapResult>;
}

/// The strategy selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unwrapper {
    /// See [`DefaultUnwrapper`].
    Default(DefaultUnwrapper),
    /// See [`CatchupUnwrapper`].
    Catchup(CatchupUnwrapper),
}

impl Unwrapper {
    /// Creates the strategy for `mode` writing pages of `page_size` bytes.
    pub fn new(mode: UnwrapMode, page_size: usize) -> Self {
        match mode {
            UnwrapMode::Default => Self::Default(DefaultUnwrapper::new(page_size)),
            UnwrapMode::Catchup => Self::Catchup(CatchupUnwrapper::new(page_size)),
        }
    }

    /// Returns the mode this strategy implements.
    pub fn mode(&self) -> UnwrapMode {
        match self {
            Self::Default(_) => UnwrapMode::Default,
            Self::Catchup(_) => UnwrapMode::Catchup,
        }
    }

    /// Dispatches to the new-file or existing-file path.
    pub fn unwrap_file(
        &self,
        payload: &mut dyn Read,
        header: &EntryHeader,
        file: &mut File,
        is_new: bool,
        options: BackupFileOptions,
    ) -> Result<UnwrapResult> {
        if is_new {
            self.unwrap_new_file(payload, header, file, options)
        } else {
            self.unwrap_existing_file(payload, header, file, options)
        }
    }
}

impl FileUnwrapper for Unwrapper {
    fn unwrap_new_file(
        &self,
        payload: &mut dyn Read,
        header: &EntryHeader,
        file: &mut File,
        options: BackupFileOptions,
    ) -> Result<UnwrapResult> {
        match self {
            Self::Default(u) => u.unwrap_new_file(payload, header, file, options),
            Self::Catchup(u) => u.unwrap_new_file(payload, header, file, options),
        }
    }

    fn unwrap_existing_file(
        &self,
        payload: &mut dyn Read,
        header: &EntryHeader,
        file: &mut File,
        options: BackupFileOptions,
    ) -> Result<UnwrapResult> {
        match self {
            Self::Default(u) => u.unwrap_existing_file(payload, header, file, options),
            Self::Catchup(u) => u.unwrap_existing_file(payload, header, file, options),
        }
    }
}
