//! Restore straight from a tar stream.

use std::io::Read;
use std::path::PathBuf;

use tar::EntryType;

use crate::entry::{ArchiveEntry, EntryHeader, EntryKind};
use crate::parallel::{DispatchStats, ParallelRestorer};
use crate::{Error, Result};

/// Cap on the up-front allocation for one payload.
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

fn read_error(e: std::io::Error) -> Error {
    Error::io(PathBuf::new(), e)
}

/// Converts a tar header into an entry header.
///
/// Returns `Ok(None)` for entry types the restore does not materialize
/// (devices, FIFOs, extension headers).
fn entry_header<R: Read>(entry: &tar::Entry<'_, R>) -> Result<Option<EntryHeader>> {
    let header = entry.header();
    let kind = match header.entry_type() {
        EntryType::Regular | EntryType::Continuous => EntryKind::RegularFile,
        EntryType::Directory => EntryKind::Directory,
        EntryType::Link => EntryKind::HardLink,
        EntryType::Symlink => EntryKind::SymbolicLink,
        other => {
            log::debug!(
                "skipping tar entry '{}' of type {:?}",
                String::from_utf8_lossy(&entry.path_bytes()),
                other
            );
            return Ok(None);
        }
    };

    let name = String::from_utf8(entry.path_bytes().into_owned()).map_err(|e| {
        Error::InvalidEntryName {
            name: String::from_utf8_lossy(e.as_bytes()).into_owned(),
            reason: "name is not valid UTF-8",
        }
    })?;
    let mode = header.mode().unwrap_or(match kind {
        EntryKind::Directory => 0o755,
        _ => 0o644,
    });
    let size = if kind.is_regular_file() { entry.size() } else { 0 };

    Ok(Some(EntryHeader {
        name,
        kind,
        mode,
        size,
    }))
}

/// Restores every entry of a tar stream through `restorer`.
///
/// With a single restore thread payloads are streamed from the archive into
/// the target files. Otherwise each regular-file payload is read into memory
/// and handed to a worker, within the restorer's in-flight bound.
///
/// # Example
///
/// ```rust,no_run
/// use std::fs::File;
/// use pagerestore::catalog::FilesMetadataDto;
/// use pagerestore::{ParallelRestorer, RestoreInterpreter, RestoreOptions, restore_tar};
///
/// let interpreter = RestoreInterpreter::new("/restore", FilesMetadataDto::default(), RestoreOptions::new())?;
/// let restorer = ParallelRestorer::new(&interpreter)?;
/// let file = File::open("part_1.tar").map_err(|e| pagerestore::Error::io("part_1.tar", e))?;
/// restore_tar(file, &restorer)?;
/// println!("{:?}", interpreter.into_summary());
/// # Ok::<(), pagerestore::Error>(())
/// ```
pub fn restore_tar<R: Read>(reader: R, restorer: &ParallelRestorer<'_>) -> Result<DispatchStats> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(read_error)?;

    if restorer.threads_used() == 1 {
        return stream_sequential(entries, restorer);
    }

    let buffered = entries.filter_map(|entry| {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) => return Some(Err(read_error(e))),
        };
        let header = match entry_header(&entry) {
            Ok(Some(header)) => header,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };
        let mut payload = Vec::with_capacity(header.size.min(MAX_PREALLOCATION) as usize);
        if header.kind.is_regular_file() {
            if let Err(e) = entry.read_to_end(&mut payload) {
                return Some(Err(read_error(e)));
            }
        }
        Some(Ok(ArchiveEntry { header, payload }))
    });
    restorer.restore(buffered)
}

fn stream_sequential<R: Read>(
    entries: tar::Entries<'_, R>,
    restorer: &ParallelRestorer<'_>,
) -> Result<DispatchStats> {
    let interpreter = restorer.interpreter();
    let mut stats = DispatchStats {
        threads_used: 1,
        ..Default::default()
    };
    for entry in entries {
        if interpreter.options().should_cancel() {
            log::info!("restore cancelled after {} entries", stats.entries_dispatched);
            return Err(Error::Cancelled);
        }
        let mut entry = entry.map_err(read_error)?;
        let Some(header) = entry_header(&entry)? else {
            continue;
        };
        interpreter.interpret_reader(&header, &mut entry)?;
        stats.entries_dispatched += 1;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FilesMetadataDto;
    use crate::interpreter::RestoreInterpreter;
    use crate::options::{RestoreOptions, Threads};
    use std::fs;
    use tempfile::TempDir;

    fn build_tar() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        let mut dir = tar::Header::new_gnu();
        dir.set_entry_type(EntryType::Directory);
        dir.set_mode(0o700);
        dir.set_size(0);
        builder.append_data(&mut dir, "base/1/", std::io::empty()).unwrap();

        let data = b"hello";
        let mut file = tar::Header::new_gnu();
        file.set_entry_type(EntryType::Regular);
        file.set_mode(0o600);
        file.set_size(data.len() as u64);
        builder.append_data(&mut file, "base/1/PG_VERSION", &data[..]).unwrap();

        let mut fifo = tar::Header::new_gnu();
        fifo.set_entry_type(EntryType::Fifo);
        fifo.set_size(0);
        builder.append_data(&mut fifo, "base/1/pipe", std::io::empty()).unwrap();

        builder.into_inner().unwrap()
    }

    fn restore_with(threads: Threads) -> (TempDir, DispatchStats) {
        let dir = TempDir::new().unwrap();
        let options = RestoreOptions::new().fsync(false).threads(threads);
        let interp = RestoreInterpreter::new(dir.path(), FilesMetadataDto::default(), options).unwrap();
        let restorer = ParallelRestorer::new(&interp).unwrap();
        let stats = restore_tar(build_tar().as_slice(), &restorer).unwrap();
        (dir, stats)
    }

    #[test]
    fn test_restore_tar_sequential() {
        let (dir, stats) = restore_with(Threads::Single);
        assert_eq!(stats.entries_dispatched, 2);
        assert_eq!(fs::read(dir.path().join("base/1/PG_VERSION")).unwrap(), b"hello");
        assert!(!dir.path().join("base/1/pipe").exists());
    }

    #[test]
    fn test_restore_tar_parallel() {
        let (dir, stats) = restore_with(Threads::count_or_single(2));
        assert_eq!(stats.entries_dispatched, 2);
        assert_eq!(fs::read(dir.path().join("base/1/PG_VERSION")).unwrap(), b"hello");
    }

    #[test]
    fn test_truncated_tar_is_error() {
        let dir = TempDir::new().unwrap();
        let options = RestoreOptions::new().fsync(false).threads(Threads::Single);
        let interp = RestoreInterpreter::new(dir.path(), FilesMetadataDto::default(), options).unwrap();
        let restorer = ParallelRestorer::new(&interp).unwrap();

        let tar = build_tar();
        let err = restore_tar(&tar[..600], &restorer).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
