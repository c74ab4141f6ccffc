//! Permanent backup lookup.
//!
//! Backups marked permanent must never be selected for deletion. These two
//! functions are the boundary the retention logic calls into; the storage
//! backend is abstracted by [`BackupFolder`] and [`MetaFetcher`].

use std::collections::HashSet;

use crate::Result;

/// Storage prefix under which base backups live.
pub const BASE_BACKUP_PATH: &str = "base_backup/";

/// Metadata fields of a backup that permanence depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GenericMetadata {
    /// Backup name.
    #[serde(default)]
    pub backup_name: String,
    /// Whether the backup is protected from deletion.
    #[serde(default)]
    pub is_permanent: bool,
}

/// A storage folder that can list the base backups below it.
pub trait BackupFolder {
    /// Returns the names of all base backups under [`BASE_BACKUP_PATH`].
    fn list_backups(&self) -> Result<Vec<String>>;
}

/// Fetches per-backup metadata from storage.
pub trait MetaFetcher {
    /// Fetches the metadata of `backup_name`.
    fn fetch(&self, backup_name: &str) -> Result<GenericMetadata>;
}

/// Returns the names of all permanent base backups in `folder`.
///
/// A listing failure yields an empty set. A backup whose metadata cannot be
/// fetched is logged and left out.
pub fn find_permanent_backups(
    folder: &dyn BackupFolder,
    fetcher: &dyn MetaFetcher,
) -> HashSet<String> {
    log::info!("retrieving permanent objects");
    let backups = match folder.list_backups() {
        Ok(backups) => backups,
        Err(e) => {
            log::warn!("failed to list base backups: {}", e);
            return HashSet::new();
        }
    };

    let mut permanent = HashSet::new();
    for backup in backups {
        match fetcher.fetch(&backup) {
            Ok(meta) if meta.is_permanent => {
                permanent.insert(backup);
            }
            Ok(_) => {}
            Err(e) => {
                log::error!(
                    "failed to fetch backup meta for backup {} with error {}, ignoring...",
                    backup,
                    e
                );
            }
        }
    }
    permanent
}

/// Returns true if the storage object belongs to a permanent base backup.
///
/// The backup name is the `backup_name_length` bytes right after
/// [`BASE_BACKUP_PATH`]. WAL segments and every other object are never
/// permanent.
///
/// # Example
///
/// ```rust
/// use std::collections::HashSet;
/// use pagerestore::permanence::is_permanent;
///
/// let permanent: HashSet<String> = ["base_123".to_string()].into();
/// assert!(is_permanent("base_backup/base_123/tar_partitions/part_1.tar", &permanent, 8));
/// assert!(!is_permanent("wal_005/000000010000000000000001.lz4", &permanent, 8));
/// ```
pub fn is_permanent(
    object_path: &str,
    permanent_backups: &HashSet<String>,
    backup_name_length: usize,
) -> bool {
    let Some(rest) = object_path.strip_prefix(BASE_BACKUP_PATH) else {
        return false;
    };
    // A name cut in the middle of a UTF-8 sequence cannot be a backup name
    rest.get(..backup_name_length)
        .is_some_and(|name| permanent_backups.contains(name))
}
