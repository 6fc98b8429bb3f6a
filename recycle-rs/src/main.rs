use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recycle_core::{CommandKind, CoreError, EntryId, ExitStatusLike, RecycleConfig, Recycler};
use tracing_subscriber::EnvFilter;

/// Move files into a recycle bin and restore them later
#[derive(Parser)]
#[command(name = "recycle")]
#[command(author, version)]
#[command(after_help = "EXAMPLES:
    # Recycle two files
    recycle store notes.txt build.log

    # See what was recycled under the current directory
    recycle list

    # Put entry 12 back where it came from
    recycle recover 12
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Recycle root holding the catalog and storage [default: $RECYCLE_HOME, then ~/.recycle]
    #[arg(long, value_name = "DIR", global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move files or directories into the recycle bin
    Store {
        /// Paths to recycle
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<String>,
    },

    /// Restore an entry under the current directory (ids come from `list`)
    Recover {
        /// Entry id
        id: EntryId,
    },

    /// List recycled entries at or below a path (default: current directory)
    List {
        /// File or directory to look under
        path: Option<String>,
    },
}

impl Commands {
    fn kind(&self) -> CommandKind {
        match self {
            Self::Store { .. } => CommandKind::Store,
            Self::Recover { .. } => CommandKind::Recover,
            Self::List { .. } => CommandKind::List,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::from(ExitStatusLike::Ok.as_code()),
        Err(err) => {
            eprintln!("recycle: {err:#}");
            ExitCode::from(categorize_error(&err).as_code())
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match cli.root {
        Some(root) => RecycleConfig::new(root),
        None => RecycleConfig::from_env()?,
    };
    let cwd = env::current_dir().context("failed to read the current directory")?;
    let mut recycler = Recycler::open(&config, &cwd)
        .with_context(|| format!("failed to open recycle bin at {}", config.root().display()))?;

    let span = tracing::info_span!("command", kind = %cli.command.kind());
    let _guard = span.enter();

    match cli.command {
        Commands::Store { paths } => {
            recycler.store(paths.as_slice())?;
        }
        Commands::Recover { id } => {
            recycler.recover(id)?;
        }
        Commands::List { path } => {
            let listing = recycler.list(path.as_deref().unwrap_or(""))?;
            write!(io::stdout().lock(), "{listing}").context("failed to write listing")?;
        }
    }

    recycler.close()?;
    Ok(())
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Maps the first core error in the chain to an exit status.
fn categorize_error(err: &anyhow::Error) -> ExitStatusLike {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CoreError>())
        .map_or(ExitStatusLike::Error, CoreError::exit_status)
}
