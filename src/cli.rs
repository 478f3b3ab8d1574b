use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Sensitive-data detection and risk scoring")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Data directory for session logs and score stores
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Pattern registry config file (JSON); built-in defaults when omitted
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan a file (or stdin) and print the analysis
    Scan {
        /// File to scan; reads stdin when omitted
        file: Option<PathBuf>,

        /// Session id the scan is logged under
        #[arg(short, long, default_value = "cli")]
        session: String,

        /// Externally supplied risk score, adopted only when positive
        #[arg(long)]
        external_score: Option<u32>,

        /// Treat the input as an external analysis report instead of code
        #[arg(long)]
        report: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Close a session: score its log and update the user's profile
    Score {
        /// Session id to close
        session: String,

        /// User the session belongs to
        #[arg(short, long)]
        user: String,

        /// Print the session score as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the leaderboard (users with three or more sessions)
    Leaderboard {
        /// Maximum rows to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Print the leaderboard as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show overall statistics across all sessions
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}
