//! Target file reconciliation.
//!
//! Decides whether a regular-file entry reuses an existing local file or
//! creates a new one, and hands out the open handle wrapped in a guard that
//! syncs it (when durability is requested) and closes it on every exit path.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use crate::page_file::is_page_file;
use crate::{Error, Result};

/// Open target file, synced and closed when dropped.
///
/// Call [`LocalFile::finish`] on the success path to observe sync errors.
/// When the guard is dropped without `finish` (an error unwound the restore
/// of this file) the sync still happens and failures are logged.
#[derive(Debug)]
pub struct LocalFile {
    file: File,
    path: PathBuf,
    fsync: bool,
    finished: bool,
}

impl LocalFile {
    fn new(file: File, path: PathBuf, fsync: bool) -> Self {
        Self {
            file,
            path,
            fsync,
            finished: false,
        }
    }

    /// Returns the target path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Syncs the file to stable storage if requested and releases it.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        if self.fsync {
            self.file
                .sync_all()
                .map_err(|e| Error::io(&self.path, e))?;
        }
        Ok(())
    }
}

impl Deref for LocalFile {
    type Target = File;

    fn deref(&self) -> &File {
        &self.file
    }
}

impl DerefMut for LocalFile {
    fn deref_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for LocalFile {
    fn drop(&mut self) {
        if self.finished || !self.fsync {
            return;
        }
        if let Err(e) = self.file.sync_all() {
            log::warn!("Failed to sync '{}': {}", self.path.display(), e);
        }
    }
}

/// Outcome of probing and opening a target path.
#[derive(Debug)]
pub struct ReconciledFile {
    /// The open handle.
    pub file: LocalFile,
    /// True if the file did not exist before this entry.
    pub is_new: bool,
    /// True if the pre-existing file is page structured.
    pub is_page_file: bool,
}

/// Probes `target` and opens it for reading and writing.
///
/// An existing file is opened without truncation and probed for page
/// structure. A missing file is created together with its parent
/// directories. A directory at `target` is rejected.
pub fn open_local_file(
    name: &str,
    target: &Path,
    page_size: usize,
    fsync: bool,
) -> Result<ReconciledFile> {
    match fs::metadata(target) {
        Ok(meta) if meta.is_dir() => Err(Error::InvalidTarget {
            path: target.to_path_buf(),
            reason: "requested file is a directory",
        }),
        Ok(meta) => {
            let is_page_file = is_page_file(Path::new(name), &meta, page_size);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(target)
                .map_err(|e| Error::io(target, e))?;
            Ok(ReconciledFile {
                file: LocalFile::new(file, target.to_path_buf(), fsync),
                is_new: false,
                is_page_file,
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            prepare_parent_dirs(target)?;
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(target)
                .map_err(|e| Error::io(target, e))?;
            Ok(ReconciledFile {
                file: LocalFile::new(file, target.to_path_buf(), fsync),
                is_new: true,
                is_page_file: false,
            })
        }
        Err(e) => Err(Error::io(target, e)),
    }
}

/// Creates every missing directory above `target`.
pub(crate) fn prepare_parent_dirs(target: &Path) -> Result<()> {
    let Some(parent) = target.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    create_dir_all(parent)
}

/// Creates `path` and its parents with mode `0o755`.
pub(crate) fn create_dir_all(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path).map_err(|e| Error::io(path, e))
}
