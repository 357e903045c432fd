mod archive;
mod cli;
mod copy;
mod ignore_rules;
mod prune;
mod sync;
mod walk;

use anyhow::Context;
use cli::{Cli, Command, LogLevel};
use prune::PruneOptions;
use std::fmt as stdfmt;
use std::io::{IsTerminal, stderr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Event, Level, Subscriber, error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

struct TidyExitCode;

impl TidyExitCode {
    /// Exit code used for every failure (I/O errors, existing backups, git failures, etc.).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_level);

    // Change working directory if -C was specified
    if let Some(directory) = cli.directory
        && let Err(e) = std::env::set_current_dir(&directory)
    {
        error!(
            "Failed to change directory to {}: {}",
            directory.display(),
            e
        );
        return TidyExitCode::any_error();
    }

    let result: anyhow::Result<ExitCode> = match cli.command {
        Command::Copy { path } => handle_copy(&path),
        Command::Clean {
            path,
            dry_run,
            max_depth,
        } => handle_clean(&path, dry_run, max_depth),
        Command::Archive { path } => handle_archive(&path),
        Command::Sync { path } => handle_sync(&path),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err:#}");
            TidyExitCode::any_error()
        }
    }
}

/// Absolute form of a path given on the command line.
///
/// Symlinks are kept as given: `copy proj` with `proj` a link writes
/// `proj_bak` next to the link, not next to its target. A path whose last
/// component is not a name (`..`, `/`) is canonicalized so it has one.
fn resolve(path: &Path) -> anyhow::Result<PathBuf> {
    let cannot_access = || format!("Cannot access {}", path.display());

    let absolute = std::path::absolute(path).with_context(cannot_access)?;
    std::fs::metadata(&absolute).with_context(cannot_access)?;

    if absolute.file_name().is_none() {
        return absolute.canonicalize().with_context(cannot_access);
    }

    Ok(absolute)
}

fn handle_copy(path: &Path) -> anyhow::Result<ExitCode> {
    let source = resolve(path)?;
    let destination = copy::backup_path_for(&source);

    let result = copy::copy_tree(&source, &destination)?;

    info!(
        "Directory successfully copied to: {} ({} files)",
        destination.display(),
        result.files_copied
    );

    Ok(ExitCode::SUCCESS)
}

fn handle_clean(path: &Path, dry_run: bool, max_depth: usize) -> anyhow::Result<ExitCode> {
    let root = resolve(path)?;
    let options = PruneOptions {
        max_depth,
        dry_run,
        ..PruneOptions::default()
    };

    let result = prune::prune_tree(&root, &options)?;

    if dry_run {
        info!("DRY RUN - nothing was removed");
        for removed in &result.removed {
            println!("{}", removed.display());
        }
    }

    info!(
        "Cleaned {} projects, removed {} paths",
        result.marker_dirs.len(),
        result.removed.len()
    );

    Ok(ExitCode::SUCCESS)
}

fn handle_archive(path: &Path) -> anyhow::Result<ExitCode> {
    let source = resolve(path)?;
    anyhow::ensure!(source.is_dir(), "Not a directory: {}", source.display());

    let archive_path = archive::archive_path_for(&source);

    archive::archive_tree(&source, &archive_path)?;

    info!(
        "Directory successfully compressed into ZIP file at {}",
        archive_path.display()
    );

    Ok(ExitCode::SUCCESS)
}

fn handle_sync(path: &Path) -> anyhow::Result<ExitCode> {
    let dir = resolve(path)?;

    let branch = sync::sync_directory(&dir)?;

    info!("Git repository successfully updated to branch '{branch}'");

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: u8, log_level: Option<LogLevel>) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = EmojiFormatter { stderr_is_terminal };

    let requested = match (log_level, verbose) {
        (Some(level), _) => Some(level.as_filter()),
        (None, 0) => None,
        (None, 1) => Some("info"),
        (None, _) => Some("debug"),
    };

    let filter = match requested {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

struct EmojiFormatter {
    stderr_is_terminal: bool,
}

impl<S, N> FormatEvent<S, N> for EmojiFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.stderr_is_terminal {
            match *event.metadata().level() {
                Level::DEBUG => write!(writer, "🔍 ")?,
                Level::INFO => write!(writer, "ℹ️ ")?,
                Level::WARN => write!(writer, "⚠️  ")?,
                Level::ERROR => write!(writer, "❌️ ")?,
                _ => {}
            }
        } else {
            match *event.metadata().level() {
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
                _ => {}
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
