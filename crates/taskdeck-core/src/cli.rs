use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::task::Priority;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck",
    version,
    about = "taskdeck: tasks and categories from the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a task.
    Add(AddArgs),
    /// Change fields of an existing task.
    Edit(EditArgs),
    /// Toggle a task between done and not done.
    Done { id: String },
    /// Delete a task.
    Delete { id: String },
    /// Show tasks for a view, optionally searched and sorted.
    List(ListArgs),
    /// Show every field of one task.
    Info { id: String },
    /// Per-view and per-category task counts.
    Summary,
    /// Manage categories.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Write tasks or categories as CSV.
    Export {
        what: Collection,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Append tasks or categories from a CSV file.
    Import { what: Collection, file: PathBuf },
    /// Show or change saved preferences.
    Prefs(PrefsArgs),
    /// Print the effective configuration.
    Show,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    Add {
        name: String,
        #[arg(long = "color", default_value = "#4f46e5")]
        color: String,
    },
    Edit {
        id: String,
        #[arg(long = "name")]
        name: Option<String>,
        #[arg(long = "color")]
        color: Option<String>,
    },
    Delete {
        id: String,
    },
    List,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Tasks,
    Categories,
}

fn parse_priority(s: &str) -> anyhow::Result<Priority> {
    s.parse::<Priority>()
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(required = true, num_args = 1..)]
    pub name: Vec<String>,

    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,

    /// YYYY-MM-DD, `today` or `tomorrow`.
    #[arg(long = "due")]
    pub due: Option<String>,

    /// HH:MM, 24-hour.
    #[arg(long = "time")]
    pub time: Option<String>,

    /// Category id, id prefix or name.
    #[arg(short = 'c', long = "category")]
    pub category: Option<String>,

    #[arg(short = 'p', long = "priority", value_parser = clap::builder::ValueParser::new(parse_priority))]
    pub priority: Option<Priority>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,

    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,

    #[arg(long = "due", conflicts_with = "clear_due")]
    pub due: Option<String>,

    #[arg(long = "time", conflicts_with = "clear_due")]
    pub time: Option<String>,

    /// Remove the due date and time.
    #[arg(long = "clear-due")]
    pub clear_due: bool,

    #[arg(short = 'c', long = "category", conflicts_with = "no_category")]
    pub category: Option<String>,

    #[arg(long = "no-category")]
    pub no_category: bool,

    #[arg(short = 'p', long = "priority", value_parser = clap::builder::ValueParser::new(parse_priority))]
    pub priority: Option<Priority>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// all, today, upcoming, completed or category:<id|name>.
    #[arg(long = "view")]
    pub view: Option<String>,

    #[arg(short = 's', long = "search")]
    pub search: Option<String>,

    /// date-asc, date-desc, priority-high, priority-low, name-asc, name-desc.
    #[arg(long = "sort")]
    pub sort: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PrefsArgs {
    #[arg(long = "view-mode", value_parser = ["grid", "list"])]
    pub view_mode: Option<String>,

    #[arg(long = "dark-mode")]
    pub dark_mode: Option<bool>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
