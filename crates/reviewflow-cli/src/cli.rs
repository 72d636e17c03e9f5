//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;

use reviewflow_cli::config::Overrides;

#[derive(Parser)]
#[command(
    name = "reviewflow",
    version,
    about = "Collect restaurant reviews, score them and report the run",
    long_about = "Batch pipeline over restaurant reviews.\n\n\
                  `run` collects a city, builds the scored leaderboard, checks it and\n\
                  sends one notification. `score` scores a saved batch offline."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags and RUST_LOG).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline once.
    Run(RunArgs),

    /// Stage and score a saved batch without running the pipeline.
    Score(ScoreArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// TOML configuration file.
    #[arg(long = "config", short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// City to collect.
    #[arg(long = "city")]
    pub city: Option<String>,

    /// Maximum restaurants to collect.
    #[arg(long = "max-results", value_name = "N")]
    pub max_results: Option<usize>,

    /// Attempts per step, first attempt included.
    #[arg(long = "max-attempts", value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Restaurants listed in the success notification.
    #[arg(long = "top", value_name = "N")]
    pub top_n: Option<usize>,

    /// Replay a saved batch instead of calling Google Places.
    #[arg(long = "snapshot", value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Also write the notification into this directory.
    #[arg(long = "notify-dir", value_name = "DIR")]
    pub notify_dir: Option<PathBuf>,

    /// Also post the notification to this webhook.
    #[arg(long = "webhook-url", value_name = "URL")]
    pub webhook_url: Option<String>,
}

impl RunArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            city: self.city.clone(),
            max_results: self.max_results,
            max_attempts: self.max_attempts,
            top_n: self.top_n,
            snapshot: self.snapshot.clone(),
            notify_dir: self.notify_dir.clone(),
            webhook_url: self.webhook_url.clone(),
        }
    }
}

#[derive(Parser)]
pub struct ScoreArgs {
    /// Batch file written by a snapshot export.
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Rows shown in the leaderboard.
    #[arg(long = "limit", default_value_t = 10)]
    pub limit: usize,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
