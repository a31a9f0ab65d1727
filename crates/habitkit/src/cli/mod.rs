// crates/habitkit/src/cli/mod.rs
// CLI module for habitkit commands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

pub use commands::run_command;

#[derive(Parser, Debug)]
#[command(name = "habitkit")]
#[command(about = "Local-first habit tracking: completions, streaks, points and achievements")]
#[command(version)]
pub struct Cli {
    /// Database file (overrides HABITKIT_DB and ~/.habitkit/config.toml)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Pin "today" to a YYYY-MM-DD day instead of the system clock
    #[arg(long, global = true, env = "HABITKIT_TODAY")]
    pub today: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List habits
    Habits {
        /// Show archived habits instead of the active list
        #[arg(long)]
        archived: bool,
    },

    /// Create a habit
    Add {
        /// Habit name
        #[arg(index = 1)]
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long, default_value = "#4caf50")]
        color: String,

        #[arg(long, default_value = "✅")]
        icon: String,

        /// Target completions per week (1-7)
        #[arg(short, long, default_value_t = 7)]
        target: i64,

        /// Points awarded per completion
        #[arg(short, long, default_value_t = 10)]
        points: i64,
    },

    /// Edit a habit's name, description, color, icon, target or points
    Edit {
        #[arg(index = 1)]
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Remove the description
        #[arg(long)]
        clear_description: bool,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        #[arg(short, long)]
        target: Option<i64>,

        #[arg(short, long)]
        points: Option<i64>,
    },

    /// Hide a habit from the default list
    Archive {
        #[arg(index = 1)]
        id: String,
    },

    /// Restore an archived habit
    Unarchive {
        #[arg(index = 1)]
        id: String,
    },

    /// Remove a habit (history is kept)
    Remove {
        #[arg(index = 1)]
        id: String,
    },

    /// Mark a habit done
    Complete {
        #[arg(index = 1)]
        id: String,

        /// Day to record (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Undo a completion and roll the stats back
    Undo {
        #[arg(index = 1)]
        id: String,

        /// Day to undo (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show points, completions and streaks
    Stats,

    /// Per-day completion counts (default: the 7 days ending today)
    Week {
        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },

    /// Recent completions of one habit
    History {
        #[arg(index = 1)]
        id: String,

        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// List achievements and their unlock state
    Achievements,

    /// Rebuild stats from the stored completions
    Reconcile,

    /// Apply pending schema migrations and report the version
    Migrate,
}
