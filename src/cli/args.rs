use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use healthtrack::report::Metric;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "healthtrack")]
#[command(about = "Record daily weight, steps and sleep in a local JSON file")]
pub struct Cli {
    /// Directory holding the data file (default: $HEALTHTRACK_DATA_DIR or ./data)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Data file name inside the data directory
    #[arg(long, global = true)]
    pub file: Option<String>,

    /// Longest wait for the file lock, in milliseconds
    #[arg(long, global = true)]
    pub lock_timeout_ms: Option<u64>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record metrics for a day
    Add(AddArgs),
    /// Show the history list, newest first
    List {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show averages and totals
    Summary {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Print the chart series for one metric, oldest first
    Trend {
        /// weight, steps or sleep
        metric: Metric,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Load the data file and report its state, repairing it from the backup if needed
    Check,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Day to record (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Weight in kg
    #[arg(long)]
    pub weight: Option<f64>,

    #[arg(long)]
    pub steps: Option<u64>,

    /// Hours slept
    #[arg(long)]
    pub sleep: Option<f64>,

    /// Replace an existing record for the same day
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct RangeArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Only the last N days up to today
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub days: Option<u32>,
}
