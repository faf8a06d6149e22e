use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "spacescout")]
#[command(about = "Find duplicate and stale content, plan and commit cleanups", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan configured roots and print the storage summary and policy counts
    Report,
    /// List duplicate groups found by a fresh scan
    Dupes,
    /// Scan, plan deletion of everything tagged safe-to-delete, and commit
    AutoClean {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        /// Show the plan without committing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print configuration values
    PrintConfig,
}
