//! Page-file detection.
//!
//! Only relation data files are laid out as fixed-size pages. They can serve
//! as a base for merging increment blocks; anything else must be rebuilt.

use std::fs::Metadata;
use std::path::{Component, Path};

/// Top-level directories holding relation files.
const RELATION_DIRS: &[&str] = &["base", "global", "pg_tblspc"];

/// Returns true if the existing file at `relative_path` is page structured.
///
/// `relative_path` is the entry name inside the data directory and
/// `metadata` describes the file currently on disk. The file must be a
/// regular, non-empty file whose size is a whole number of pages and whose
/// name follows the relation layout (`<relfilenode>[.segment]` below
/// `base/`, `global/` or `pg_tblspc/`).
///
/// # Examples
///
/// ```
/// use pagerestore::page_file::is_relation_path;
/// use std::path::Path;
///
/// assert!(is_relation_path(Path::new("base/1/1234")));
/// assert!(is_relation_path(Path::new("base/1/1234.2")));
/// assert!(!is_relation_path(Path::new("base/1/1234_fsm")));
/// assert!(!is_relation_path(Path::new("base/1/PG_VERSION")));
/// assert!(!is_relation_path(Path::new("pg_wal/000000010000000000000001")));
/// ```
pub fn is_page_file(relative_path: &Path, metadata: &Metadata, page_size: usize) -> bool {
    if !metadata.is_file() {
        return false;
    }
    let len = metadata.len();
    if len == 0 || len % page_size as u64 != 0 {
        return false;
    }
    is_relation_path(relative_path)
}

/// Returns true if `relative_path` names a relation file.
pub fn is_relation_path(relative_path: &Path) -> bool {
    let mut components = relative_path.components();
    let in_relation_dir = matches!(
        components.next(),
        Some(Component::Normal(first)) if RELATION_DIRS.iter().any(|d| first == *d)
    );
    if !in_relation_dir {
        return false;
    }
    // A relation file sits at least one directory below the top level
    if relative_path.components().count() < 3 {
        return false;
    }
    relative_path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(is_relation_file_name)
}

fn is_relation_file_name(name: &str) -> bool {
    let (stem, segment) = match name.split_once('.') {
        Some((stem, segment)) => (stem, Some(segment)),
        None => (name, None),
    };
    if let Some(segment) = segment {
        if !is_number(segment) {
            return false;
        }
    }
    is_number(stem)
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
