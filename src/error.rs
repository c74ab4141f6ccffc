//! Error types for restore operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when restoring a backup onto disk, along with a convenient
//! [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. A per-file
//! error aborts that file and is handed back to the caller of
//! [`RestoreInterpreter::interpret`], which treats it as fatal for the run.
//! Outcomes recorded before the failure stay available in the aggregate.
//!
//! ```rust,no_run
//! use pagerestore::{Error, RestoreInterpreter, RestoreOptions};
//! use pagerestore::catalog::FilesMetadataDto;
//!
//! fn restore(interpreter: &RestoreInterpreter, entry: &pagerestore::ArchiveEntry) {
//!     match interpreter.interpret(entry) {
//!         Ok(()) => {}
//!         Err(e @ Error::CorruptIncrement { .. }) => eprintln!("bad increment: {}", e),
//!         Err(e) if e.path().is_some() => eprintln!("disk error: {}", e),
//!         Err(e) => eprintln!("restore failed: {}", e),
//!     }
//! }
//! # let _ = (FilesMetadataDto::default(), RestoreOptions::default());
//! ```
//!
//! [`RestoreInterpreter::interpret`]: crate::RestoreInterpreter::interpret

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Kind of link an archive entry asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// A hard link.
    Hard,
    /// A symbolic link.
    Symbolic,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hard => write!(f, "hard link"),
            Self::Symbolic => write!(f, "symlink"),
        }
    }
}

/// Helper struct for formatting CorruptIncrement error messages.
struct CorruptIncrementDisplay<'a> {
    name: Option<&'a str>,
    reason: &'a str,
}

impl fmt::Display for CorruptIncrementDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Corrupt increment")?;
        if let Some(name) = self.name {
            write!(f, " for '{}'", name)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// The main error type for restore operations.
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | open/read/write/seek/sync failures |
/// | Target | [`InvalidTarget`][Self::InvalidTarget], [`Link`][Self::Link] | unexpected on-disk state |
/// | Integrity | [`CorruptIncrement`][Self::CorruptIncrement] | malformed increment payload |
/// | Input | [`InvalidEntryName`][Self::InvalidEntryName], [`InvalidPageSize`][Self::InvalidPageSize], [`Catalog`][Self::Catalog] | bad archive or configuration |
/// | Control | [`Cancelled`][Self::Cancelled], [`Storage`][Self::Storage] | cancellation, backend failures |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while restoring a file.
    ///
    /// The path is the target file or directory being written. Errors raised
    /// while decoding a payload carry an empty path until the restore layer
    /// attaches the target through [`Error::with_context`].
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// The path being restored when the error happened.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The target path holds something other than a regular file.
    ///
    /// A directory found where a file is expected is never coerced.
    #[error("Invalid restore target '{}': {reason}", path.display())]
    InvalidTarget {
        /// The offending target path.
        path: PathBuf,
        /// Why the target was rejected.
        reason: &'static str,
    },

    /// A hard or symbolic link could not be created.
    ///
    /// Typical causes are a missing link source (hard links) or an already
    /// existing link path.
    #[error("Failed to create {kind} '{}' -> '{}': {source}", link.display(), original.display())]
    Link {
        /// Which kind of link was requested.
        kind: LinkKind,
        /// The existing path (hard link) or link text (symlink).
        original: PathBuf,
        /// The path where the link was to be created.
        link: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An increment payload is malformed.
    ///
    /// Fatal for the file being restored. The entry name is attached by the
    /// restore layer.
    #[error("{}", CorruptIncrementDisplay { name: name.as_deref(), reason })]
    CorruptIncrement {
        /// The archive entry name (if known).
        name: Option<String>,
        /// A description of the corruption.
        reason: String,
    },

    /// An archive entry name is unsafe or empty.
    #[error("Invalid entry name '{name}': {reason}")]
    InvalidEntryName {
        /// The name as found in the archive.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// The configured page size is unusable.
    #[error("invalid page size {size}: must be a power of two between 512 and 65536")]
    InvalidPageSize {
        /// The page size that was provided.
        size: usize,
    },

    /// The backup catalog could not be parsed.
    #[error("Invalid backup catalog: {0}")]
    Catalog(#[from] serde_json::Error),

    /// A storage backend operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The run was cancelled before all entries were dispatched.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Creates an Io error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a CorruptIncrement error without an entry name.
    pub fn corrupt_increment(reason: impl Into<String>) -> Self {
        Error::CorruptIncrement {
            name: None,
            reason: reason.into(),
        }
    }

    /// Attaches the entry name and target path to errors that lack them.
    ///
    /// Payload decoding happens before the restore layer knows which file the
    /// bytes belong to, so those errors are completed here.
    pub fn with_context(self, name: &str, target: &Path) -> Self {
        match self {
            Error::CorruptIncrement { name: None, reason } => Error::CorruptIncrement {
                name: Some(name.to_string()),
                reason,
            },
            Error::Io { path, source } if path.as_os_str().is_empty() => Error::Io {
                path: target.to_path_buf(),
                source,
            },
            other => other,
        }
    }

    /// Returns `true` if this is a data corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::CorruptIncrement { .. })
    }

    /// Returns `true` if this error might be recoverable by retrying the run.
    ///
    /// Only cancellation and transient I/O errors (`WouldBlock`,
    /// `Interrupted`, `TimedOut`) qualify.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns the filesystem path associated with this error, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::Io { path, .. } if !path.as_os_str().is_empty() => Some(path),
            Error::InvalidTarget { path, .. } => Some(path),
            Error::Link { link, .. } => Some(link),
            _ => None,
        }
    }

    /// Returns the archive entry name associated with this error, if any.
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Error::CorruptIncrement { name, .. } => name.as_deref(),
            Error::InvalidEntryName { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A specialized Result type for restore operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_carries_path() {
        let err = Error::io("/data/base/1/1234", io::Error::other("disk full"));
        assert_eq!(err.path(), Some(Path::new("/data/base/1/1234")));
        assert!(err.to_string().contains("/data/base/1/1234"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_corrupt_increment_display() {
        let err = Error::corrupt_increment("bad magic");
        assert_eq!(err.to_string(), "Corrupt increment: bad magic");
        assert!(err.is_corruption());
        assert_eq!(err.entry_name(), None);
    }

    #[test]
    fn test_with_context_fills_missing_fields() {
        let target = Path::new("/restore/base/1/1234");

        let err = Error::corrupt_increment("truncated").with_context("base/1/1234", target);
        assert_eq!(err.entry_name(), Some("base/1/1234"));
        assert_eq!(
            err.to_string(),
            "Corrupt increment for 'base/1/1234': truncated"
        );

        let err = Error::io(PathBuf::new(), io::Error::other("boom"))
            .with_context("base/1/1234", target);
        assert_eq!(err.path(), Some(target));
    }

    #[test]
    fn test_with_context_keeps_existing_fields() {
        let err = Error::io("/other", io::Error::other("boom"))
            .with_context("x", Path::new("/restore/x"));
        assert_eq!(err.path(), Some(Path::new("/other")));

        let err = Error::CorruptIncrement {
            name: Some("a".into()),
            reason: "r".into(),
        }
        .with_context("b", Path::new("/restore/b"));
        assert_eq!(err.entry_name(), Some("a"));
    }

    #[test]
    fn test_link_error_display() {
        let err = Error::Link {
            kind: LinkKind::Symbolic,
            original: PathBuf::from("base/1/1234"),
            link: PathBuf::from("/restore/base/1/1234"),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "exists"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to create symlink"));
        assert_eq!(err.path(), Some(Path::new("/restore/base/1/1234")));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::Cancelled.is_recoverable());
        assert!(Error::io("/x", io::Error::new(io::ErrorKind::Interrupted, "i")).is_recoverable());
        assert!(!Error::io("/x", io::Error::new(io::ErrorKind::NotFound, "n")).is_recoverable());
        assert!(!Error::corrupt_increment("x").is_recoverable());
        assert!(!Error::InvalidPageSize { size: 3 }.is_recoverable());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
