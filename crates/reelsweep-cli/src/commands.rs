use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "reelsweep")]
#[command(about = "Finds duplicate and misnamed files in movie and TV libraries", long_about = None)]
pub struct Cli {
    /// Configuration file to use instead of ./Config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the configured libraries and print a report
    Scan {
        /// Write the duplicate list to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Write the full scan result as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Scan, then delete duplicates and fix naming issues
    Clean {
        /// Show what would happen without touching any file
        #[arg(long)]
        dry_run: bool,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
        /// JSON file with keep overrides, skipped groups and title decisions
        #[arg(long)]
        decisions: Option<PathBuf>,
    },
    /// Manage library backups
    Backup {
        #[command(subcommand)]
        action: BackupCommand,
    },
    /// Rename a TV show folder and its episodes
    Rename {
        #[command(subcommand)]
        action: RenameCommand,
    },
    /// Print configuration values
    PrintConfig,
    /// Write the effective configuration to a file
    InitConfig {
        #[arg(long, default_value = "Config.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Snapshot the configured libraries
    Create {
        /// movies, tv or all
        #[arg(default_value = "all")]
        library: String,
    },
    /// List snapshots, newest first
    List,
    /// Check that the files in a snapshot are still there
    Verify { id: String },
    /// Undo the moves and renames recorded in a snapshot
    Revert {
        id: String,
        #[arg(long, short)]
        yes: bool,
    },
    /// Remove a snapshot file
    Delete {
        id: String,
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum RenameCommand {
    /// List the folders and episodes a rename would touch
    Preview {
        base: PathBuf,
        old_title: String,
        new_title: String,
    },
    /// Rename the folders and episodes
    Apply {
        base: PathBuf,
        old_title: String,
        new_title: String,
        #[arg(long)]
        dry_run: bool,
        #[arg(long, short)]
        yes: bool,
    },
}
