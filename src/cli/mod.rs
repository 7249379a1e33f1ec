//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Tether - durable sessions and history for AI coding assistants
#[derive(Parser, Debug)]
#[command(name = "tether", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.tether/data/tether.db)
    #[arg(long, global = true, env = "TETHER_DB")]
    pub db: Option<PathBuf>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Scope overrides; anything not given is detected from git.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Repository host (default: from `origin` remote)
    #[arg(long, global = true, env = "TETHER_HOST")]
    pub host: Option<String>,

    /// Repository organization
    #[arg(long, global = true, env = "TETHER_ORG")]
    pub org: Option<String>,

    /// Repository project name
    #[arg(long, global = true, env = "TETHER_PROJECT")]
    pub project: Option<String>,

    /// Branch name (default: current git branch)
    #[arg(long, global = true, env = "TETHER_BRANCH")]
    pub branch: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database
    Init,

    /// Print version information
    Version,

    /// Stored sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Prompt and command history for the current branch
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// Known repositories and branches
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Session Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List sessions, most recently updated first
    List {
        /// Include sessions from every repository and branch
        #[arg(short, long)]
        all: bool,

        /// Maximum sessions to return (default: settings listLimit, 0 = all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a session and its transcript
    Show {
        /// Session ID
        id: String,

        /// Only print the last N messages
        #[arg(short, long)]
        messages: Option<usize>,
    },

    /// Delete a session permanently
    Delete {
        /// Session ID
        id: String,
    },

    /// Search message content with a regular expression
    Search {
        /// Regex pattern
        pattern: String,

        /// Maximum hits (0 = all)
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Apply the retention policy
    Cleanup {
        /// Remove sessions not updated for this many days (default: settings)
        #[arg(long)]
        max_age_days: Option<u32>,

        /// Keep at most this many sessions overall (default: settings)
        #[arg(long)]
        max_sessions: Option<usize>,
    },
}

// ============================================================================
// History Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Print history, oldest first
    Show {
        /// Show command history instead of prompts
        #[arg(short, long)]
        commands: bool,

        /// Only the newest N entries (0 = all)
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Append an entry
    Add {
        /// Prompt or command text
        text: String,

        /// Record as a command instead of a prompt
        #[arg(short, long)]
        command: bool,
    },

    /// Clear history for the current branch
    Clear {
        /// Clear command history instead of prompts
        #[arg(short, long)]
        commands: bool,
    },

    /// Remove entries older than the age limit on every branch
    Cleanup {
        /// Age limit in days (default: settings)
        #[arg(long)]
        max_age_days: Option<u32>,
    },
}

// ============================================================================
// Repository Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum RepoCommands {
    /// List repositories
    List,

    /// List the branches of a repository
    Branches {
        /// Repository ID
        id: i64,
    },

    /// Delete a repository with all its branches, sessions and history
    Delete {
        /// Repository ID
        id: i64,
    },

    /// Delete a branch with its sessions and history
    DeleteBranch {
        /// Branch ID
        id: i64,
    },
}

// ============================================================================
// Database Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Row counts per table
    Stats,

    /// Reclaim free space (VACUUM)
    Compact,
}
