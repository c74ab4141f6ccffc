//! Backup catalog types.
//!
//! The catalog is produced when the backup is taken and consumed read-only
//! during restore. Field names follow the JSON layout written by the backup
//! tool, so catalogs from existing backups deserialize unchanged.

use std::collections::HashMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Per-file metadata recorded at backup time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileDescriptor {
    /// Whether the file was captured as a block-level increment.
    #[serde(default)]
    pub is_incremented: bool,
    /// Whether the file was skipped because it was unchanged.
    #[serde(default)]
    pub is_skipped: bool,
    /// Modification time as recorded by the backup tool.
    #[serde(rename = "MTime", default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<String>,
    /// Number of page updates observed since the previous backup.
    #[serde(default)]
    pub updates_count: u64,
}

impl FileDescriptor {
    /// Descriptor for a file captured as a full copy.
    pub fn full() -> Self {
        Self::default()
    }

    /// Descriptor for a file captured as an increment.
    pub fn incremented() -> Self {
        Self {
            is_incremented: true,
            ..Self::default()
        }
    }
}

/// Files metadata of one backup: entry name to descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilesMetadataDto {
    /// Descriptors keyed by entry name.
    #[serde(default)]
    pub files: HashMap<String, FileDescriptor>,
    /// Tar file sets: tar name to the entry names it contains.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tar_file_sets: HashMap<String, Vec<String>>,
}

impl FilesMetadataDto {
    /// Parses a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a catalog from a JSON reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Returns the descriptor recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&FileDescriptor> {
        self.files.get(name)
    }

    /// Adds or replaces a descriptor.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: FileDescriptor) {
        self.files.insert(name.into(), descriptor);
    }

    /// Returns true if `name` was captured as an increment.
    ///
    /// Names missing from the catalog are treated as full copies.
    pub fn is_incremented(&self, name: &str) -> bool {
        self.get(name).is_some_and(|d| d.is_incremented)
    }
}

/// Backup sentinel: the top-level record describing one backup.
///
/// Only the fields the restore side reads are modelled; unknown fields are
/// ignored on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BackupSentinelDto {
    /// LSN at backup start.
    #[serde(rename = "LSN", default, skip_serializing_if = "Option::is_none")]
    pub backup_start_lsn: Option<u64>,
    /// LSN of the base this delta backup was taken from.
    #[serde(rename = "DeltaLSN", default, skip_serializing_if = "Option::is_none")]
    pub increment_from_lsn: Option<u64>,
    /// Name of the backup this delta was taken from.
    #[serde(rename = "DeltaFrom", default, skip_serializing_if = "Option::is_none")]
    pub increment_from: Option<String>,
    /// Name of the full backup at the root of the delta chain.
    #[serde(rename = "DeltaFullName", default, skip_serializing_if = "Option::is_none")]
    pub increment_full_name: Option<String>,
    /// Number of deltas between this backup and its full base.
    #[serde(rename = "DeltaCount", default, skip_serializing_if = "Option::is_none")]
    pub increment_count: Option<u32>,
    /// Server version number.
    #[serde(default)]
    pub pg_version: u32,
    /// LSN at backup finish.
    #[serde(rename = "FinishLSN", default)]
    pub backup_finish_lsn: u64,
    /// Cluster system identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_identifier: Option<u64>,
    /// Total uncompressed size in bytes.
    #[serde(default)]
    pub uncompressed_size: i64,
    /// Total compressed size in bytes.
    #[serde(default)]
    pub compressed_size: i64,
    /// Whether files metadata was not written for this backup.
    #[serde(default)]
    pub files_metadata_disabled: bool,
}

impl BackupSentinelDto {
    /// Parses a sentinel from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns true if this backup is a delta on top of another backup.
    pub fn is_incremental(&self) -> bool {
        self.increment_from.is_some()
    }
}
