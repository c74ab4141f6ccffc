//! CLI tool for restoring page-oriented database backups.

mod commands;
mod exit_codes;
mod output;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use exit_codes::ExitCode;
use pagerestore::AtomicProgress;
use pagerestore::options::DEFAULT_PAGE_SIZE;

/// Incremental restore tool for database backups
#[derive(Parser)]
#[command(name = "pagerestore")]
#[command(author, version, about = "Incremental restore tool for database backups", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Number of threads (0 = auto)
    #[arg(long, short = 't', default_value = "0", global = true)]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore a backup tar into a data directory (alias: x)
    #[command(alias = "x")]
    Extract {
        /// Tar archive to restore
        archive: PathBuf,

        /// Database data directory to restore into
        #[arg(short = 'D', long)]
        data_dir: PathBuf,

        /// Files metadata JSON of the backup
        #[arg(short = 'm', long)]
        files_metadata: Option<PathBuf>,

        /// Create new incremental files (catch-up restore)
        #[arg(long)]
        catchup: bool,

        /// Skip fsync of restored files
        #[arg(long, env = "PAGERESTORE_TAR_DISABLE_FSYNC")]
        no_fsync: bool,

        /// Restore only these files (may be repeated)
        #[arg(long)]
        only: Vec<String>,

        /// Database page size in bytes
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    let progress = AtomicProgress::shared();

    // First Ctrl+C stops dispatching, a second one exits at once
    let handler_progress = progress.clone();
    ctrlc::set_handler(move || {
        if handler_progress.is_cancelled() {
            std::process::exit(exit_codes::USER_INTERRUPT);
        }
        eprintln!("\nInterrupted, waiting for in-flight files");
        handler_progress.cancel();
    })
    .ok();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Extract {
            archive,
            data_dir,
            files_metadata,
            catchup,
            no_fsync,
            only,
            page_size,
        } => commands::extract(
            &commands::ExtractConfig {
                archive_path: &archive,
                data_dir: &data_dir,
                files_metadata: files_metadata.as_deref(),
                only: &only,
                catchup,
                no_fsync,
                page_size,
                format: cli.format,
                thread_count: cli.threads,
            },
            progress,
        ),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
