//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Interactive study-programme finder: walk a decision tree of questions
#[derive(Parser, Debug)]
#[command(name = "progwalk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory holding a local `.progwalk.toml` (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer questions until programmes are recommended
    Walk {
        /// Tree document (default: configured tree_path)
        #[arg(value_hint = ValueHint::FilePath)]
        tree: Option<PathBuf>,
    },

    /// Show the decision tree
    Tree {
        /// Tree document (default: configured tree_path)
        #[arg(value_hint = ValueHint::FilePath)]
        tree: Option<PathBuf>,
    },

    /// List all programmes reachable in the tree
    Leaves {
        /// Tree document (default: configured tree_path)
        #[arg(value_hint = ValueHint::FilePath)]
        tree: Option<PathBuf>,
    },

    /// Validate a tree document
    Check {
        /// Tree document (default: configured tree_path)
        #[arg(value_hint = ValueHint::FilePath)]
        tree: Option<PathBuf>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
