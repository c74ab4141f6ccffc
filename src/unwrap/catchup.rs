use std::fs::File;
use std::io::Read;

use super::pages::{Fill, create_file_from_increment, write_pages_from_increment};
use super::{BackupFileOptions, DefaultUnwrapper, FileUnwrapper};
use crate::Result;
use crate::entry::EntryHeader;
use crate::increment::IncrementReader;
use crate::result::UnwrapResult;

/// Catch-up restore strategy.
///
/// Full copies behave exactly as in [`DefaultUnwrapper`]. Increments are
/// applied against a base that may be older than the increment's own base:
/// new files get every page written (zeros where the increment has none) and
/// existing page files are resized to the recorded logical size before the
/// listed pages are overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchupUnwrapper {
    inner: DefaultUnwrapper,
}

impl CatchupUnwrapper {
    /// Creates the strategy for pages of `page_size` bytes.
    pub fn new(page_size: usize) -> Self {
        Self {
            inner: DefaultUnwrapper::new(page_size),
        }
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    fn create_dense(&self, payload: &mut dyn Read, file: &mut File) -> Result<UnwrapResult> {
        let increment = IncrementReader::new(payload, self.page_size())?;
        let blocks = create_file_from_increment(increment, file, Fill::Dense)?;
        Ok(UnwrapResult::CreatedFromIncrement { blocks })
    }
}

impl FileUnwrapper for CatchupUnwrapper {
    fn unwrap_new_file(
        &self,
        payload: &mut dyn Read,
        header: &EntryHeader,
        file: &mut File,
        options: BackupFileOptions,
    ) -> Result<UnwrapResult> {
        if !options.is_incremented {
            return self.inner.write_full_copy(payload, header, file);
        }
        self.create_dense(payload, file)
    }

    fn unwrap_existing_file(
        &self,
        payload: &mut dyn Read,
        header: &EntryHeader,
        file: &mut File,
        options: BackupFileOptions,
    ) -> Result<UnwrapResult> {
        if !options.is_incremented {
            return self.inner.write_full_copy(payload, header, file);
        }
        if !options.is_page_file {
            log::debug!(
                "'{}' is not a page file, rebuilding it from the increment",
                header.name
            );
            return self.create_dense(payload, file);
        }
        let increment = IncrementReader::new(payload, self.page_size())?;
        let blocks = write_pages_from_increment(increment, file, true)?;
        Ok(UnwrapResult::WroteIncrementBlocks { blocks })
    }
}
