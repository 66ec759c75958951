//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::BranchKind;

/// Edit and validate IF / ELSE IF / ELSE rule documents
#[derive(Parser, Debug)]
#[command(name = "rulebuilder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory holding the local .rulebuilder.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a rule document
    Check {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Show a rule document as tree
    Tree {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Normalize a rule document
    Fmt {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Write the result back instead of printing it
        #[arg(short, long)]
        write: bool,
    },

    /// Create a rule document with a single IF branch
    New {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Action value of the IF branch
        #[arg(short, long)]
        action: Option<String>,
    },

    /// Add or remove branches
    Branch {
        #[command(subcommand)]
        command: BranchCommands,
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
pub enum BranchCommands {
    /// Append a branch (IF always goes first)
    Add {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(value_enum)]
        kind: KindArg,
        /// Action value of the new branch
        #[arg(short, long)]
        action: Option<String>,
    },
    /// Remove the branch at a zero-based position
    Remove {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        index: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented template
    Template,
    /// Show config file locations
    Path,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    If,
    Elseif,
    Else,
}

impl From<KindArg> for BranchKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::If => BranchKind::If,
            KindArg::Elseif => BranchKind::ElseIf,
            KindArg::Else => BranchKind::Else,
        }
    }
}
