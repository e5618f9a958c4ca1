use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use dbsnap::cli::{
    handle_backup_command, handle_cron_command, handle_list_command, handle_restore_command,
};
use dbsnap::config::Settings;
use dbsnap::DbsnapError;

/// Exit code for usage errors, matching clap's
const USAGE_EXIT_CODE: u8 = 2;

#[derive(Parser)]
#[command(
    name = "dbsnap",
    version,
    about = "SQLite snapshot backups to S3-compatible object storage",
    long_about = "dbsnap takes consistent online snapshots of a live SQLite database, \
                  optionally encrypts them with ENCRYPTION_KEY, and uploads them to \
                  S3_BUCKET under timestamped keys. Restores swap a snapshot into place \
                  and roll back to the previous database on failure.\n\n\
                  All settings are read from the environment."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a snapshot and upload it
    Backup,

    /// Replace the live database with a stored snapshot
    Restore {
        /// Snapshot timestamp, YYYYMMDDHHMMSS (see `dbsnap list`)
        timestamp: String,
    },

    /// Run a backup at every fire time of CRON_SCHEDULE
    Cron,

    /// List stored snapshots, newest first
    #[command(alias = "ls")]
    List,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        eprintln!("{}", Cli::command().render_help());
        return ExitCode::from(USAGE_EXIT_CODE);
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{:#}", err), "command failed");
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<DbsnapError>()
                .map(DbsnapError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(command: Commands) -> Result<()> {
    let settings = Settings::from_env()?;

    match command {
        Commands::Backup => handle_backup_command(&settings)?,
        Commands::Restore { timestamp } => handle_restore_command(&settings, &timestamp)?,
        Commands::Cron => handle_cron_command(&settings)?,
        Commands::List => handle_list_command(&settings)?,
    }

    Ok(())
}

/// Human-readable logs on stderr, `info` unless `RUST_LOG` says otherwise
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
