//! Entry dispatcher: turns archive entries into files on disk.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::catalog::FilesMetadataDto;
use crate::entry::{ArchiveEntry, EntryHeader, EntryKind};
use crate::options::RestoreOptions;
use crate::reconciler::{ReconciledFile, create_dir_all, open_local_file};
use crate::result::{RestoreResult, RestoreSummary, UnwrapResult};
use crate::safety::{create_hard_link, create_symlink, normalize_entry_name, resolve_target};
use crate::unwrap::{BackupFileOptions, Unwrapper};
use crate::{Error, Result};

/// Restores archive entries into a data directory.
///
/// One interpreter serves one run. [`interpret`](Self::interpret) takes
/// `&self` and may be called from several threads for distinct regular
/// files; directories and links must be interpreted in stream order by the
/// dispatching thread. Outcomes accumulate in the interpreter and are read
/// with [`into_summary`](Self::into_summary) once the stream is exhausted.
///
/// # Example
///
/// ```rust,no_run
/// use pagerestore::catalog::FilesMetadataDto;
/// use pagerestore::{ArchiveEntry, RestoreInterpreter, RestoreOptions};
///
/// let interpreter = RestoreInterpreter::new(
///     "/var/lib/postgresql/data",
///     FilesMetadataDto::default(),
///     RestoreOptions::new(),
/// )?;
/// interpreter.interpret(&ArchiveEntry::directory("base", 0o700))?;
/// interpreter.interpret(&ArchiveEntry::file("PG_VERSION", b"15\n".to_vec()))?;
/// let summary = interpreter.into_summary();
/// assert_eq!(summary.completed_files, vec!["PG_VERSION"]);
/// # Ok::<(), pagerestore::Error>(())
/// ```
#[derive(Debug)]
pub struct RestoreInterpreter {
    data_dir: PathBuf,
    catalog: FilesMetadataDto,
    options: RestoreOptions,
    unwrapper: Unwrapper,
    result: RestoreResult,
}

impl RestoreInterpreter {
    /// Creates an interpreter restoring into `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPageSize`] if the options carry an unusable
    /// page size.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        catalog: FilesMetadataDto,
        options: RestoreOptions,
    ) -> Result<Self> {
        options.validate()?;
        let unwrapper = Unwrapper::new(options.mode, options.page_size);
        Ok(Self {
            data_dir: data_dir.into(),
            catalog,
            options,
            unwrapper,
            result: RestoreResult::new(),
        })
    }

    /// Returns the restore root.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the run options.
    pub fn options(&self) -> &RestoreOptions {
        &self.options
    }

    /// Returns the outcomes recorded so far.
    pub fn result(&self) -> &RestoreResult {
        &self.result
    }

    /// Consumes the interpreter and returns the run's outcomes.
    pub fn into_summary(self) -> RestoreSummary {
        let summary = self.result.into_summary();
        log::info!(
            "restore finished: {} completed, {} created from increment, {} with increment blocks",
            summary.completed_files.len(),
            summary.created_page_files.len(),
            summary.written_increment_files.len()
        );
        summary
    }

    /// Restores one fully read entry.
    pub fn interpret(&self, entry: &ArchiveEntry) -> Result<()> {
        self.interpret_reader(&entry.header, &mut entry.payload.as_slice())
    }

    /// Restores one entry whose payload is read from `payload`.
    ///
    /// Lets a sequential caller stream large files straight from the archive.
    pub fn interpret_reader(&self, header: &EntryHeader, payload: &mut dyn Read) -> Result<()> {
        let name = normalize_entry_name(&header.name)?;
        let target = resolve_target(&self.data_dir, &name)?;
        log::debug!("Interpreting: {}", name);

        let progress = self.options.progress.as_deref();
        if let Some(p) = progress {
            p.on_entry_start(&name, header.size);
        }

        let result = match header.kind {
            EntryKind::RegularFile => self
                .unwrap_regular_file(&name, header, payload, &target)
                .map(|outcome| self.result.record(&name, outcome)),
            EntryKind::Directory => restore_directory(&target, header.mode),
            EntryKind::HardLink => create_hard_link(Path::new(&name), &target),
            EntryKind::SymbolicLink => create_symlink(&name, &target),
        };

        if let Some(p) = progress {
            p.on_entry_complete(&name, result.is_ok());
        }
        result
    }

    fn unwrap_regular_file(
        &self,
        name: &str,
        header: &EntryHeader,
        payload: &mut dyn Read,
        target: &Path,
    ) -> Result<UnwrapResult> {
        // Catalog and allowlist are keyed by the name as archived
        let raw_name = header.name.as_str();
        if !(self.options.selection.is_selected(raw_name)
            || self.options.selection.is_selected(name))
        {
            log::debug!("Don't have to unwrap '{}' this time", name);
            return Ok(UnwrapResult::Skipped);
        }

        let ReconciledFile {
            mut file,
            is_new,
            is_page_file,
        } = open_local_file(name, target, self.options.page_size, self.options.fsync)?;
        let file_options = BackupFileOptions {
            is_incremented: self
                .catalog
                .get(raw_name)
                .or_else(|| self.catalog.get(name))
                .is_some_and(|d| d.is_incremented),
            is_page_file,
        };

        let outcome = self
            .unwrapper
            .unwrap_file(payload, header, &mut file, is_new, file_options)
            .map_err(|e| e.with_context(name, target))?;
        file.finish()?;
        Ok(outcome)
    }
}

/// Creates the directory with its parents, then applies the recorded mode.
fn restore_directory(target: &Path, mode: u32) -> Result<()> {
    create_dir_all(target)?;
    set_mode(target, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
