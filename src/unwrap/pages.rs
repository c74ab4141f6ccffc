//! Page-level write primitives shared by the unwrap strategies.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::increment::IncrementReader;
use crate::{Error, Result};

/// How pages absent from an increment are materialized in a new file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fill {
    /// Leave holes; the filesystem reads them back as zeros.
    Sparse,
    /// Write every page explicitly, zeros where the increment has none.
    Dense,
}

fn io_err(e: io::Error) -> Error {
    // The target path is attached by the interpreter
    Error::io(PathBuf::new(), e)
}

/// Replaces the file contents with the verbatim payload.
///
/// Returns the number of bytes written.
pub(crate) fn write_local_file(payload: &mut dyn Read, file: &mut File) -> Result<u64> {
    file.set_len(0).map_err(io_err)?;
    file.seek(SeekFrom::Start(0)).map_err(io_err)?;
    let written = io::copy(payload, file).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(written)
}

/// Builds the file from scratch out of an increment.
///
/// The file is emptied and then sized to the increment's logical size.
/// Present blocks are written at `block * page_size`. Returns the increment's
/// block count.
pub(crate) fn create_file_from_increment<R: Read>(
    mut increment: IncrementReader<R>,
    file: &mut File,
    fill: Fill,
) -> Result<usize> {
    let page_size = increment.page_size();
    let file_size = increment.header().file_size;
    let page_count = increment.header().page_count(page_size);

    file.set_len(0).map_err(io_err)?;
    file.set_len(file_size).map_err(io_err)?;

    let mut buf = vec![0u8; page_size];
    let mut written = HashSet::new();
    while let Some(block) = increment.next_page(&mut buf)? {
        write_page(file, block, page_size, &buf)?;
        written.insert(block);
    }
    let header = increment.finish()?;

    if fill == Fill::Dense {
        buf.fill(0);
        for page in 0..page_count {
            // Pages past u32::MAX cannot be addressed by an increment and stay holes
            let Ok(page) = u32::try_from(page) else {
                break;
            };
            if !written.contains(&page) {
                write_page(file, page, page_size, &buf)?;
            }
        }
    }

    // A final partial page must not extend the file past its logical size
    file.set_len(file_size).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(header.block_count())
}

/// Overwrites the pages listed in the increment, leaving every other byte
/// untouched.
///
/// With `resize` the file is first set to the increment's logical size.
/// Without it the file never grows past the larger of its current length and
/// the logical size. Returns the number of blocks written.
pub(crate) fn write_pages_from_increment<R: Read>(
    mut increment: IncrementReader<R>,
    file: &mut File,
    resize: bool,
) -> Result<usize> {
    let page_size = increment.page_size();
    let file_size = increment.header().file_size;
    let limit = if resize {
        file.set_len(file_size).map_err(io_err)?;
        file_size
    } else {
        file.metadata().map_err(io_err)?.len().max(file_size)
    };

    let mut buf = vec![0u8; page_size];
    let mut blocks = 0;
    while let Some(block) = increment.next_page(&mut buf)? {
        write_page(file, block, page_size, &buf)?;
        blocks += 1;
    }
    increment.finish()?;

    // A final partial page must not extend the file past its logical size
    if file.metadata().map_err(io_err)?.len() > limit {
        file.set_len(limit).map_err(io_err)?;
    }
    file.flush().map_err(io_err)?;
    Ok(blocks)
}

fn write_page(file: &mut File, block: u32, page_size: usize, data: &[u8]) -> Result<()> {
    let offset = u64::from(block) * page_size as u64;
    file.seek(SeekFrom::Start(offset)).map_err(io_err)?;
    file.write_all(data).map_err(io_err)
}
