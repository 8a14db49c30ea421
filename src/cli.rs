use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(name = "deployrisk")]
#[command(about = "Release deployment-failure risk scoring and insights", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase verbosity level (can be repeated: -v, -vv, -vvv)
    /// -v: Stage boundaries
    /// -vv: Per-model details
    /// -vvv: Everything
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Suppress progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a synthetic release log
    Generate {
        /// Number of releases
        #[arg(long)]
        rows: usize,

        /// Output CSV path
        #[arg(long)]
        out: PathBuf,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Latest possible release date (defaults to today)
        #[arg(long = "anchor-date", value_name = "YYYY-MM-DD")]
        anchor_date: Option<NaiveDate>,
    },

    /// Train the risk model and write model and metrics artifacts
    Train {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Score every release and write the ranked predictions
    Score {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Rows printed from the top of the ranking
        #[arg(long = "top-k", default_value = "50")]
        top_k: usize,
    },

    /// Feature importance, chart, predictions and the weekly summary
    Explain {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Top-K rows the summary covers
        #[arg(long, default_value = "50")]
        k: usize,

        /// Shuffles per feature (overrides insights.n_repeats)
        #[arg(long)]
        repeats: Option<usize>,
    },

    /// Write the default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,

        /// Destination of the config file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,
    },
}
