use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lexi_core::ConflictStrategy;

pub const DEFAULT_TABLE: &str = "default";

#[derive(Parser)]
#[command(name = "lexi")]
#[command(about = "Keep a topic dictionary in sync between this device and a remote store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Dictionary table to operate on
    #[arg(long, global = true, value_name = "NAME", default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Optional path to the client config JSON
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new entry
    #[command(alias = "new")]
    Add {
        /// Entry key
        key: String,
        /// Entry description (read from stdin when omitted)
        description: Vec<String>,
        /// Usage example; repeat for several
        #[arg(short, long = "example", value_name = "TEXT")]
        examples: Vec<String>,
    },
    /// Change an existing entry
    Edit {
        /// Entry key
        key: String,
        /// Replacement description
        #[arg(short, long)]
        description: Option<String>,
        /// Replacement usage examples; repeat for several
        #[arg(short, long = "example", value_name = "TEXT")]
        examples: Vec<String>,
        /// Remove every usage example
        #[arg(long, conflicts_with = "examples")]
        clear_examples: bool,
    },
    /// Delete an entry
    #[command(alias = "rm")]
    Delete {
        /// Entry key
        key: String,
    },
    /// Show one entry
    Show {
        /// Entry key
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List entries in key order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one sync cycle against the configured remote store
    Sync {
        /// Override the configured conflict strategy
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },
    /// Show sync bookkeeping for the table
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StrategyArg {
    MostRecent,
    PreferLocal,
    PreferRemote,
}

impl From<StrategyArg> for ConflictStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::MostRecent => Self::MostRecent,
            StrategyArg::PreferLocal => Self::PreferLocal,
            StrategyArg::PreferRemote => Self::PreferRemote,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
