use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "sortbox")]
#[command(about = "Sort an inbox folder into a categorized library", long_about = None)]
pub struct Cli {
    /// Folder whose top-level items get sorted
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,

    /// Categorized destination folder
    #[arg(long, global = true)]
    pub library: Option<PathBuf>,

    /// Directory holding per-pair workspaces
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlannerChoice {
    Heuristic,
    Remote,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Summarize the source folder and save the inventory
    Scan,
    /// Index the library categories and save the index
    Index,
    /// Scan, index and produce a placement plan
    Plan {
        /// Override the configured planner
        #[arg(long, value_enum)]
        planner: Option<PlannerChoice>,
    },
    /// Print the latest plan
    ShowPlan,
    /// Validate and apply the latest plan (or a plan file)
    Apply {
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Move items back using the latest move log (or a log file)
    Undo {
        #[arg(long)]
        log: Option<PathBuf>,
        /// Leave folders the apply created in the library
        #[arg(long)]
        keep_folders: bool,
        #[arg(long)]
        yes: bool,
    },
    /// List saved snapshots in the workspace
    History,
    /// Print configuration values
    PrintConfig,
}
