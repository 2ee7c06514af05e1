//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    boq::BoqCommands, completions::CompletionsArgs, init::InitArgs, project::ProjectCommands,
    sheet::SheetCommands, team::TeamCommands,
};

#[derive(Parser)]
#[command(name = "gk")]
#[command(author, version, about = "Construction book (GK) sheets against a bill of quantities")]
#[command(long_about = "Record periodic construction progress against a project's bill of quantities. \
Contractors keep the sheets; supervisors and investors review them.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Workspace root (default: auto-detect by finding .gk/)
    #[arg(long, short = 'C', global = true)]
    pub workspace: Option<PathBuf>,

    /// Acting username (default: GK_USER or the `user` config key)
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,

    /// Project code (default: GK_PROJECT, the `project` config key, or the first project)
    #[arg(long, short = 'p', global = true)]
    pub project: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new gk workspace
    Init(InitArgs),

    /// Users and roles
    #[command(subcommand)]
    Team(TeamCommands),

    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Bill of quantities
    #[command(subcommand)]
    Boq(BoqCommands),

    /// Construction book sheets
    #[command(subcommand)]
    Sheet(SheetCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Just IDs, one per line
    Id,
}
