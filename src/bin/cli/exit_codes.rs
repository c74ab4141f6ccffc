//! Exit codes for the CLI tool.

use pagerestore::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Backup data is corrupt
pub const BAD_BACKUP: i32 = 3;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Restore target is in an unexpected state
pub const BAD_TARGET: i32 = 6;
/// Ctrl+C (128 + SIGINT)
pub const USER_INTERRUPT: i32 = 130;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    BadBackup,
    IoError,
    BadTarget,
    UserInterrupt,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::BadBackup => BAD_BACKUP,
            Self::IoError => IO_ERROR,
            Self::BadTarget => BAD_TARGET,
            Self::UserInterrupt => USER_INTERRUPT,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts a restore error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io { .. } => ExitCode::IoError,
        Error::InvalidTarget { .. } | Error::Link { .. } => ExitCode::BadTarget,
        Error::CorruptIncrement { .. } | Error::InvalidEntryName { .. } => ExitCode::BadBackup,
        Error::Catalog(_) => ExitCode::BadBackup,
        Error::InvalidPageSize { .. } => ExitCode::BadArgs,
        Error::Storage(_) => ExitCode::IoError,
        Error::Cancelled => ExitCode::UserInterrupt,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
