//! Entry-name validation and link creation.
//!
//! Archive entry names are relative paths inside the database data
//! directory. Before anything touches the disk the name is normalized and
//! checked so that a hostile archive cannot write outside the restore root.

use std::path::{Component, Path, PathBuf};

use crate::error::LinkKind;
use crate::{Error, Result};

/// Maximum length for entry names (in bytes).
const MAX_NAME_LENGTH: usize = 32768;

/// Normalizes an archive entry name.
///
/// Strips a leading `./` and any trailing `/` the way tar writers emit them,
/// then rejects names that are absolute, contain `..` or NUL bytes, or are
/// longer than 32 KiB. The archive root itself (`./`) normalizes to `"."`.
///
/// # Examples
///
/// ```
/// use pagerestore::safety::normalize_entry_name;
///
/// assert_eq!(normalize_entry_name("./base/1/").unwrap(), "base/1");
/// assert_eq!(normalize_entry_name("./").unwrap(), ".");
/// assert!(normalize_entry_name("../etc/passwd").is_err());
/// assert!(normalize_entry_name("/etc/passwd").is_err());
/// ```
pub fn normalize_entry_name(name: &str) -> Result<String> {
    let reject = |reason: &'static str| Error::InvalidEntryName {
        name: name.to_string(),
        reason,
    };

    if name.contains('\0') {
        return Err(reject("contains NUL byte"));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(reject("name exceeds maximum length"));
    }
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(reject("absolute path not allowed"));
    }

    let mut trimmed = name;
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        if name.is_empty() {
            return Err(reject("empty name"));
        }
        return Ok(".".to_string());
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(reject("'..' segment not allowed (path traversal)")),
            s => segments.push(s),
        }
    }

    // Windows drive prefixes are absolute too
    if segments
        .first()
        .is_some_and(|s| s.len() >= 2 && s.as_bytes()[1] == b':')
    {
        return Err(reject("absolute path not allowed"));
    }

    Ok(segments.join("/"))
}

/// Joins a normalized entry name onto the restore root.
///
/// The result is guaranteed to stay under `root` because the name contains
/// only normal components.
pub fn resolve_target(root: &Path, normalized_name: &str) -> Result<PathBuf> {
    if normalized_name == "." {
        return Ok(root.to_path_buf());
    }
    let relative = Path::new(normalized_name);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(Error::InvalidEntryName {
            name: normalized_name.to_string(),
            reason: "name is not normalized",
        });
    }
    Ok(root.join(relative))
}

/// Creates a hard link at `link` pointing to the existing `original`.
pub(crate) fn create_hard_link(original: &Path, link: &Path) -> Result<()> {
    std::fs::hard_link(original, link).map_err(|source| Error::Link {
        kind: LinkKind::Hard,
        original: original.to_path_buf(),
        link: link.to_path_buf(),
        source,
    })
}

/// Creates a symbolic link at `link` whose link text is `target`.
#[cfg(unix)]
pub(crate) fn create_symlink(target: &str, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).map_err(|source| symlink_error(target, link, source))
}

/// Creates a symbolic link at `link` whose link text is `target`.
#[cfg(windows)]
pub(crate) fn create_symlink(target: &str, link: &Path) -> Result<()> {
    // Windows needs to know whether the target is a directory
    let resolved = link.parent().map(|p| p.join(target));
    let result = match resolved {
        Some(ref p) if p.is_dir() => std::os::windows::fs::symlink_dir(target, link),
        _ => std::os::windows::fs::symlink_file(target, link),
    };
    result.map_err(|source| symlink_error(target, link, source))
}

/// Creates a symbolic link at `link` whose link text is `target`.
#[cfg(not(any(unix, windows)))]
pub(crate) fn create_symlink(target: &str, link: &Path) -> Result<()> {
    Err(symlink_error(
        target,
        link,
        std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "symbolic links are not supported on this platform",
        ),
    ))
}

fn symlink_error(target: &str, link: &Path, source: std::io::Error) -> Error {
    Error::Link {
        kind: LinkKind::Symbolic,
        original: PathBuf::from(target),
        link: link.to_path_buf(),
        source,
    }
}
