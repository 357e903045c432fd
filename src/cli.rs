mod help_text;

use crate::prune::DEFAULT_MAX_DEPTH;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Back up, prune and archive trees of project directories
#[derive(Parser, Debug)]
#[command(name = "treetidy", version, about, long_about = help_text::ROOT_LONG_ABOUT)]
pub struct Cli {
    /// Change to DIRECTORY before doing anything
    #[arg(short = 'C', value_name = "DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// Increase log output (-v for info, -vv for debug). Takes precedence over RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "log_level")]
    pub verbose: u8,

    /// Set the log level. Takes precedence over RUST_LOG.
    #[arg(long, value_name = "LEVEL", value_enum)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy a directory recursively into a sibling backup named <PATH>_bak
    #[command(long_about = help_text::COPY_LONG_ABOUT)]
    Copy {
        /// Directory to back up
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Remove node_modules, .git and .gitignore'd paths from projects below PATH
    #[command(alias = "remove", long_about = help_text::CLEAN_LONG_ABOUT)]
    Clean {
        /// Directory to search for projects
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Print what would be removed without removing anything
        #[arg(long)]
        dry_run: bool,

        /// How many levels below PATH to look for package.json
        #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// Compress a backup directory into <name>.zip next to it
    #[command(alias = "zip", long_about = help_text::ARCHIVE_LONG_ABOUT)]
    Archive {
        /// Backup directory to compress, normally ending in _bak
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Switch a git working copy to main or master and pull
    #[command(alias = "gitupdate", long_about = help_text::SYNC_LONG_ABOUT)]
    Sync {
        /// Git working copy to update
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn aliases_map_to_commands() {
        let cli = Cli::try_parse_from(["treetidy", "remove", "dir"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Clean {
                dry_run: false,
                max_depth: DEFAULT_MAX_DEPTH,
                ..
            }
        ));

        let cli = Cli::try_parse_from(["treetidy", "zip", "dir_bak"]).unwrap();
        assert!(matches!(cli.command, Command::Archive { .. }));

        let cli = Cli::try_parse_from(["treetidy", "gitupdate", "dir"]).unwrap();
        assert!(matches!(cli.command, Command::Sync { .. }));
    }

    #[test]
    fn log_level_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["treetidy", "-v", "--log-level", "info", "copy", "x"]);
        assert!(result.is_err());
    }
}
