use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Instagrool - Manage your posted media, stories, etc. Back up your media or
/// delete the oldest ones.
#[derive(Parser, Debug)]
#[command(name = "instagrool", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Exit status for a command line the parser rejected. Usage errors exit 1
/// like every other usage problem; `--help` and `--version` exit 0.
pub fn parse_error_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Delete your oldest posted media.
    ///
    /// Examples:
    ///   instagrool delete -u user -p password -s 100
    ///   instagrool delete -u user -p password -d 2022-01-01
    Delete(DeleteArgs),

    /// Back up your oldest posted media to a local directory.
    ///
    /// Examples:
    ///   instagrool backup -u user -p password -s 100 -o ./backup
    ///   instagrool backup -u user -p password -d 2022-01-01 -o ./backup
    Backup(BackupArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// The amount of oldest media to act on
    #[arg(short, long)]
    pub size: Option<String>,

    /// Act on media taken before this date (format: YYYY-MM-DD), e.g. 2022-09-23
    #[arg(short, long)]
    pub date: Option<String>,

    /// Fetch every page of the feed instead of only the first one
    #[arg(long)]
    pub all_pages: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Your IG username. Default value is taken from IG_USER env var
    #[arg(short, long)]
    pub username: Option<String>,

    /// Your IG password. Default value is taken from IG_PASSWORD env var
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BackupArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    /// The directory where media is saved
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
