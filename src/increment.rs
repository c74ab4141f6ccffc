//! Increment payload decoding.
//!
//! A file captured as an increment is stored as a header listing the changed
//! pages followed by the page images themselves. All integers are little
//! endian:
//!
//! ```text
//! +--------------+-----------+-------------+---------------------+------------------------+
//! | magic (4)    | size (8)  | count (4)   | count x block (4)   | count x page_size data |
//! | "wi1" 0x55   | u64       | u32         | u32 each            | one page per block     |
//! +--------------+-----------+-------------+---------------------+------------------------+
//! ```
//!
//! `size` is the logical size of the file at backup time. Pages are stored
//! in the same order as the block list.

use std::collections::HashSet;
use std::io::{self, Read};
use std::path::PathBuf;

use crate::{Error, Result};

/// Magic bytes opening every increment payload.
pub const INCREMENT_MAGIC: [u8; 4] = [b'w', b'i', b'1', 0x55];

/// Size of the fixed part of the header (magic, size, count).
pub const INCREMENT_HEADER_SIZE: usize = 4 + 8 + 4;

/// Decoded increment header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementHeader {
    /// Logical size of the file in bytes.
    pub file_size: u64,
    /// Page numbers present in the payload, in payload order.
    pub blocks: Vec<u32>,
}

impl IncrementHeader {
    /// Number of pages a file of `file_size` spans.
    pub fn page_count(&self, page_size: usize) -> u64 {
        self.file_size.div_ceil(page_size as u64)
    }

    /// Number of blocks carried by the increment.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

/// Streaming decoder for an increment payload.
///
/// The header is parsed and validated by [`IncrementReader::new`]; page data
/// is then pulled one block at a time with [`IncrementReader::next_page`], so
/// a payload never has to be held in memory twice.
pub struct IncrementReader<R> {
    reader: R,
    header: IncrementHeader,
    page_size: usize,
    next_block: usize,
}

impl<R: Read> IncrementReader<R> {
    /// Parses and validates the increment header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptIncrement`] on bad magic, a truncated header,
    /// a block count the logical size cannot hold, a block beyond the logical
    /// size, or a duplicated block number.
    pub fn new(mut reader: R, page_size: usize) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(decode_error)?;
        if magic != INCREMENT_MAGIC {
            return Err(Error::corrupt_increment(format!(
                "bad magic {:02x?}",
                magic
            )));
        }

        let file_size = read_u64_le(&mut reader).map_err(decode_error)?;
        let block_count = read_u32_le(&mut reader).map_err(decode_error)?;

        let page_count = file_size.div_ceil(page_size as u64);
        if u64::from(block_count) > page_count {
            return Err(Error::corrupt_increment(format!(
                "{} blocks do not fit in a file of {} bytes",
                block_count, file_size
            )));
        }

        // Grow incrementally; the count is untrusted until the blocks are read
        let mut blocks = Vec::with_capacity((block_count as usize).min(4096));
        let mut seen = HashSet::with_capacity(blocks.capacity());
        for _ in 0..block_count {
            let block = read_u32_le(&mut reader).map_err(decode_error)?;
            if u64::from(block) >= page_count {
                return Err(Error::corrupt_increment(format!(
                    "block {} is beyond the logical size of {} bytes",
                    block, file_size
                )));
            }
            if !seen.insert(block) {
                return Err(Error::corrupt_increment(format!(
                    "block {} is listed twice",
                    block
                )));
            }
            blocks.push(block);
        }

        log::trace!(
            "increment header: size={} blocks={}",
            file_size,
            blocks.len()
        );

        Ok(Self {
            reader,
            header: IncrementHeader { file_size, blocks },
            page_size,
            next_block: 0,
        })
    }

    /// Returns the decoded header.
    pub fn header(&self) -> &IncrementHeader {
        &self.header
    }

    /// Returns the page size this reader decodes with.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Reads the next page into `buf` and returns its block number.
    ///
    /// Returns `Ok(None)` once every listed block has been read.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is not exactly `page_size` bytes long.
    pub fn next_page(&mut self, buf: &mut [u8]) -> Result<Option<u32>> {
        assert_eq!(buf.len(), self.page_size, "page buffer size mismatch");
        let Some(&block) = self.header.blocks.get(self.next_block) else {
            return Ok(None);
        };
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::corrupt_increment(format!("short page data for block {}", block))
            } else {
                Error::io(PathBuf::new(), e)
            }
        })?;
        self.next_block += 1;
        Ok(Some(block))
    }

    /// Verifies that the payload ends right after the last page.
    ///
    /// Must be called after all pages were consumed.
    pub fn finish(mut self) -> Result<IncrementHeader> {
        if self.next_block != self.header.blocks.len() {
            return Err(Error::corrupt_increment("not all pages were consumed"));
        }
        let mut probe = [0u8; 1];
        loop {
            match self.reader.read(&mut probe) {
                Ok(0) => return Ok(self.header),
                Ok(_) => return Err(Error::corrupt_increment("trailing bytes after last page")),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io(PathBuf::new(), e)),
            }
        }
    }
}

/// Maps a header read failure to the error the caller sees.
fn decode_error(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::corrupt_increment("truncated increment header")
    } else {
        Error::io(PathBuf::new(), e)
    }
}

fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Builds an increment payload. Test helper shared by the unit tests.
#[cfg(test)]
pub(crate) fn encode(file_size: u64, pages: &[(u32, Vec<u8>)]) -> Vec<u8> {
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
