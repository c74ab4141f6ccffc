use std::fs::File;
use std::io::Read;

use super::pages::{Fill, create_file_from_increment, write_local_file, write_pages_from_increment};
use super::{BackupFileOptions, FileUnwrapper};
use crate::Result;
use crate::entry::EntryHeader;
use crate::increment::IncrementReader;
use crate::result::UnwrapResult;

/// Regular restore strategy.
///
/// | file     | incremented | page file | action                         |
/// |----------|-------------|-----------|--------------------------------|
/// | new      | no          | -         | write verbatim                 |
/// | new      | yes         | -         | sparse file from increment     |
/// | existing | no          | any       | truncate, write verbatim       |
/// | existing | yes         | yes       | overwrite listed pages         |
/// | existing | yes         | no        | rebuild from increment         |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultUnwrapper {
    page_size: usize,
}

impl DefaultUnwrapper {
    /// Creates the strategy for pages of `page_size` bytes.
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub(super) fn write_full_copy(
        &self,
        payload: &mut dyn Read,
        header: &EntryHeader,
        file: &mut File,
    ) -> Result<UnwrapResult> {
        let written = write_local_file(payload, file)?;
        log::trace!("wrote {} bytes to '{}'", written, header.name);
        Ok(UnwrapResult::Completed)
    }
}

impl FileUnwrapper for DefaultUnwrapper {
    fn unwrap_new_file(
        &self,
        payload: &mut dyn Read,
        header: &EntryHeader,
        file: &mut File,
        options: BackupFileOptions,
    ) -> Result<UnwrapResult> {
        if !options.is_incremented {
            return self.write_full_copy(payload, header, file);
        }
        let increment = IncrementReader::new(payload, self.page_size)?;
        let blocks = create_file_from_increment(increment, file, Fill::Sparse)?;
        Ok(UnwrapResult::CreatedFromIncrement { blocks })
    }

    fn unwrap_existing_file(
        &self,
        payload: &mut dyn Read,
        header: &EntryHeader,
        file: &mut File,
        options: BackupFileOptions,
    ) -> Result<UnwrapResult> {
        if !options.is_incremented {
            return self.write_full_copy(payload, header, file);
        }
        let increment = IncrementReader::new(payload, self.page_size)?;
        if options.is_page_file {
            let blocks = write_pages_from_increment(increment, file, false)?;
            Ok(UnwrapResult::WroteIncrementBlocks { blocks })
        } else {
            log::debug!(
                "'{}' is not a page file, rebuilding it from the increment",
                header.name
            );
            let blocks = create_file_from_increment(increment, file, Fill::Sparse)?;
            Ok(UnwrapResult::CreatedFromIncrement { blocks })
        }
    }
}
