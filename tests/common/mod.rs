//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::path::Path;

use pagerestore::catalog::{FileDescriptor, FilesMetadataDto};
use pagerestore::increment::INCREMENT_MAGIC;
use pagerestore::{RestoreInterpreter, RestoreOptions};

/// Page size used by the scenario tests.
pub const PAGE_SIZE: usize = 8192;

/// Encodes an increment payload from `(block, page)` pairs.
pub fn encode_increment(file_size: u64, pages: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&INCREMENT_MAGIC);
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(&(pages.len() as u32).to_le_bytes());
    for (block, _) in pages {
        out.extend_from_slice(&block.to_le_bytes());
    }
    for (_, data) in pages {
        out.extend_from_slice(data);
    }
    out
}

/// A page filled with one byte value.
pub fn page(fill: u8, page_size: usize) -> Vec<u8> {
    vec![fill; page_size]
}

/// Catalog marking the given names as incremented.
pub fn catalog_with_increments(names: &[&str]) -> FilesMetadataDto {
    let mut catalog = FilesMetadataDto::default();
    for name in names {
        catalog.insert(*name, FileDescriptor::incremented());
    }
    catalog
}

/// Interpreter over `dir` with fsync disabled.
pub fn interpreter(
    dir: &Path,
    catalog: FilesMetadataDto,
    options: RestoreOptions,
) -> RestoreInterpreter {
    RestoreInterpreter::new(dir, catalog, options.fsync(false)).expect("valid options")
}

/// One entry for [`build_tar`].
pub enum TarItem<'a> {
    Dir(&'a str, u32),
    File(&'a str, &'a [u8]),
    Symlink(&'a str, &'a str),
}

/// Builds an uncompressed tar stream in memory.
pub fn build_tar(items: &[TarItem<'_>]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for item in items {
        let mut header = tar::Header::new_gnu();
        match item {
            TarItem::Dir(name, mode) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(*mode);
                header.set_size(0);
                builder
                    .append_data(&mut header, name, std::io::empty())
                    .expect("append dir");
            }
            TarItem::File(name, data) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o600);
                header.set_size(data.len() as u64);
                builder
                    .append_data(&mut header, name, *data)
                    .expect("append file");
            }
            TarItem::Symlink(name, target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                builder
                    .append_link(&mut header, name, target)
                    .expect("append symlink");
            }
        }
    }
    builder.into_inner().expect("finish tar")
}
