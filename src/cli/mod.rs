//! CLI definitions and entry point.

use crate::outline::IssueKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;
pub mod prompt;

/// Turn a mind-map outline into linked Jira epics, tasks and sub-tasks
#[derive(Parser, Debug)]
#[command(name = "mmj", author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project config file (default: ./mmj.yaml)
    #[arg(long, short = 'c', global = true, env = "MMJ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the config's working directory
    #[arg(long, global = true)]
    pub working_dir: Option<PathBuf>,

    /// Override the config's tracker URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Never ask; create missing files without confirmation
    #[arg(long, global = true)]
    pub no_prompt: bool,

    /// Dump every request payload before it is sent
    #[arg(long, global = true)]
    pub debug: bool,

    /// Mirror log events as JSON lines into this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create every outline node that has no tracker record yet
    Run(OutlineArgs),

    /// Create the workspace, settings file and per-type templates
    Init,

    /// Print a freshly generated template for one issue type
    Template(TemplateArgs),

    /// Validate the edited templates against the tracker's field catalogs
    Check,

    /// List the tracker key of every outline node, without network access
    Summary(OutlineArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// An outline document argument.
#[derive(Args, Debug, Clone)]
pub struct OutlineArgs {
    /// Freeplane (.mm) or Markdown (.md) outline
    pub outline: PathBuf,
}

/// Arguments for the template command.
#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Issue type to render
    #[arg(value_enum)]
    pub kind: KindArg,
}

/// Tracked outline levels.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum KindArg {
    Epic,
    Task,
    #[value(name = "sub-task", alias = "subtask")]
    SubTask,
}

impl From<KindArg> for IssueKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Epic => Self::Epic,
            KindArg::Task => Self::Task,
            KindArg::SubTask => Self::SubTask,
        }
    }
}

/// Arguments for the completions command.
#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    /// Elvish
    Elvish,
}
