//! Archive entry types.

/// Kind of an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A regular file with a byte payload.
    RegularFile,
    /// A directory.
    Directory,
    /// A hard link.
    HardLink,
    /// A symbolic link.
    SymbolicLink,
}

impl EntryKind {
    /// Returns true if this entry carries a file payload.
    pub fn is_regular_file(&self) -> bool {
        matches!(self, Self::RegularFile)
    }
}

/// Header of one archive entry, as read from the archive stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Relative path of the entry inside the data directory.
    pub name: String,
    /// Entry kind.
    pub kind: EntryKind,
    /// Unix permission bits recorded in the archive.
    pub mode: u32,
    /// Payload size in bytes (zero for non-regular entries).
    pub size: u64,
}

impl EntryHeader {
    /// Creates a header for a regular file.
    pub fn file(name: impl Into<String>, mode: u32, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::RegularFile,
            mode,
            size,
        }
    }

    /// Creates a header for a directory.
    pub fn directory(name: impl Into<String>, mode: u32) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            mode,
            size: 0,
        }
    }

    /// Creates a header for a hard link.
    pub fn hard_link(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::HardLink,
            mode: 0,
            size: 0,
        }
    }

    /// Creates a header for a symbolic link.
    pub fn symlink(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::SymbolicLink,
            mode: 0o777,
            size: 0,
        }
    }
}

/// One fully read archive entry: header plus payload.
///
/// Entries are immutable once read. The payload is empty for everything but
/// regular files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// The entry header.
    pub header: EntryHeader,
    /// The entry payload.
    pub payload: Vec<u8>,
}

impl ArchiveEntry {
    /// Creates a regular-file entry with mode `0o600`.
    pub fn file(name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        Self {
            header: EntryHeader::file(name, 0o600, payload.len() as u64),
            payload,
        }
    }

    /// Creates a directory entry.
    pub fn directory(name: impl Into<String>, mode: u32) -> Self {
        Self::from_header(EntryHeader::directory(name, mode))
    }

    /// Creates a hard-link entry.
    pub fn hard_link(name: impl Into<String>) -> Self {
        Self::from_header(EntryHeader::hard_link(name))
    }

    /// Creates a symbolic-link entry.
    pub fn symlink(name: impl Into<String>) -> Self {
        Self::from_header(EntryHeader::symlink(name))
    }

    /// Creates an entry without payload.
    pub fn from_header(header: EntryHeader) -> Self {
        Self {
            header,
            payload: Vec::new(),
        }
    }

    /// Returns the entry name.
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Returns the entry kind.
    pub fn kind(&self) -> EntryKind {
        self.header.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_entry() {
        let entry = ArchiveEntry::file("base/1/1234", vec![1, 2, 3]);
        assert_eq!(entry.name(), "base/1/1234");
        assert_eq!(entry.kind(), EntryKind::RegularFile);
        assert_eq!(entry.header.size, 3);
        assert!(entry.kind().is_regular_file());
    }

    #[test]
    fn test_non_file_entries_have_no_payload() {
        for entry in [
            ArchiveEntry::directory("base", 0o700),
            ArchiveEntry::hard_link("base/1/1234"),
            ArchiveEntry::symlink("pg_wal"),
        ] {
            assert!(entry.payload.is_empty());
            assert!(!entry.kind().is_regular_file());
            assert_eq!(entry.header.size, 0);
        }
    }
}
