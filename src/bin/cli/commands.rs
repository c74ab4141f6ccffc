//! Command implementations for the CLI tool.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use pagerestore::catalog::FilesMetadataDto;
use pagerestore::{
    AtomicProgress, Error, FileSelection, ParallelRestorer, RestoreInterpreter, RestoreOptions,
    Threads, UnwrapMode, restore_tar,
};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::{RestoreReport, create_formatter};

/// Configuration for the extract command.
pub struct ExtractConfig<'a> {
    pub archive_path: &'a Path,
    pub data_dir: &'a Path,
    pub files_metadata: Option<&'a Path>,
    pub only: &'a [String],
    pub catchup: bool,
    pub no_fsync: bool,
    pub page_size: usize,
    pub format: OutputFormat,
    pub thread_count: usize,
}

fn open(path: &Path) -> Result<BufReader<File>, Error> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::io(path, e))
}

fn load_catalog(path: Option<&Path>) -> Result<FilesMetadataDto, Error> {
    match path {
        Some(path) => FilesMetadataDto::from_reader(open(path)?),
        None => Ok(FilesMetadataDto::default()),
    }
}

/// Extract command implementation
pub fn extract(config: &ExtractConfig<'_>, progress: Arc<AtomicProgress>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let catalog = match load_catalog(config.files_metadata) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading files metadata: {}", e);
            return error_to_exit_code(&e);
        }
    };

    let threads = match config.thread_count {
        0 => Threads::Auto,
        n => Threads::count_or_single(n),
    };
    let mode = if config.catchup {
        UnwrapMode::Catchup
    } else {
        UnwrapMode::Default
    };

    let options = RestoreOptions::new()
        .page_size(config.page_size)
        .fsync(!config.no_fsync)
        .mode(mode)
        .threads(threads)
        .selection(FileSelection::from_names(config.only.iter().cloned()))
        .progress(Arc::clone(&progress));

    let interpreter = match RestoreInterpreter::new(config.data_dir, catalog, options) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    };

    let start = Instant::now();
    let stats = open(config.archive_path).and_then(|archive| {
        let restorer = ParallelRestorer::new(&interpreter)?;
        restore_tar(archive, &restorer)
    });
    let stats = match stats {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(path) = e.path() {
                eprintln!("  at {}", path.display());
            }
            return error_to_exit_code(&e);
        }
    };

    let summary = interpreter.into_summary();
    print!(
        "{}",
        formatter.format_restore(&RestoreReport {
            summary: &summary,
            stats: &stats,
            bytes: progress.bytes_processed(),
            elapsed: start.elapsed(),
        })
    );
    ExitCode::Success
}
