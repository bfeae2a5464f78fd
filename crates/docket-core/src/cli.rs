use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::board::RowRef;
use crate::filter::{KindFlag, TaskSelector};
use crate::task::{TaskField, TaskId};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

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
    name = "docket",
    version,
    about = "Docket: a task list client for a remote task store",
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
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "docketrc")]
    pub docketrc: Option<PathBuf>,

    /// Only show tasks with a field containing TEXT (case-insensitive).
    #[arg(short = 's', long = "search", value_name = "TEXT", global = true)]
    pub search: Option<String>,

    /// Only show tasks of this type; repeat to combine.
    #[arg(
        short = 'k',
        long = "kind",
        value_name = "KIND",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KindFlag>()),
        action = ArgAction::Append,
        global = true
    )]
    pub kinds: Vec<KindFlag>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl GlobalCli {
    /// Selector built from the `--kind` flags, if any were given.
    pub fn selector(&self) -> Option<TaskSelector> {
        if self.kinds.is_empty() {
            return None;
        }
        let mut selector = TaskSelector::none();
        for flag in &self.kinds {
            selector.select(*flag);
        }
        Some(selector)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the filtered task list (default).
    List,
    /// Create a task.
    Add(RecordArgs),
    /// Replace the fields of an existing task.
    Edit {
        /// Task id, or `#N` for the Nth row of the list.
        row: String,
        #[command(flatten)]
        fields: RecordArgs,
    },
    /// Set a task's status, or flip it when no status is given.
    Status { row: String, status: Option<String> },
    /// Replace a task's notes.
    Notes { row: String, text: String },
    Delete { row: String },
    /// Copy a row locally; the copy is never sent to the store.
    Duplicate { row: String },
    /// Interactive session over one loaded board.
    Shell,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RecordArgs {
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub time: Option<String>,
    #[arg(long)]
    pub entity: Option<String>,
    /// Task type: Call, Meeting or Video Call.
    #[arg(long = "task", value_name = "KIND")]
    pub kind: Option<String>,
    #[arg(long)]
    pub person: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Open or Closed.
    #[arg(long)]
    pub status: Option<String>,
}

impl RecordArgs {
    /// The fields given on the command line, in form order.
    pub fn assignments(&self) -> Vec<(TaskField, &str)> {
        [
            (TaskField::Date, &self.date),
            (TaskField::Time, &self.time),
            (TaskField::Entity, &self.entity),
            (TaskField::Task, &self.kind),
            (TaskField::Person, &self.person),
            (TaskField::Notes, &self.notes),
            (TaskField::Status, &self.status),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }
}

/// `#N` names the Nth row of the current view; anything else is a task id.
pub fn parse_row_ref(text: &str) -> anyhow::Result<RowRef> {
    let text = text.trim();
    if let Some(number) = text.strip_prefix('#') {
        let n: usize = number
            .parse()
            .with_context(|| format!("invalid row reference {text:?}"))?;
        if n == 0 {
            return Err(anyhow!("rows are numbered from #1"));
        }
        return Ok(RowRef::Position(n - 1));
    }
    TaskId::parse(text)
        .map(RowRef::Id)
        .ok_or_else(|| anyhow!("empty task reference"))
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

/// Pulls `rc.key=value` and `rc.key:value` arguments out before clap
/// sees them.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest
                .split_once('=')
                .or_else(|| rest.split_once(':'))
                .map(|(k, v)| (format!("rc.{k}"), v.to_string()));

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
