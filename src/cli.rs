//! Command line interface, built on clap.

use clap::{Parser, Subcommand};

/// folio — queue-driven portfolio analysis pipeline.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Total attempts per stage before a job is failed.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Print full job records after processing.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process pending jobs from the store until drained.
    Run {
        /// Stop after this many queue messages.
        #[arg(long)]
        max_jobs: Option<usize>,
    },

    /// Show a job record, or list pending jobs.
    Status {
        /// Job id to inspect.
        job_id: Option<String>,
    },

    /// Run the retirement projection engine once and print the result.
    Simulate {
        #[arg(long, default_value_t = 1_000_000.0)]
        balance: f64,

        #[arg(long, default_value_t = 30)]
        years: u32,

        #[arg(long, default_value_t = 40_000.0)]
        withdrawal: f64,

        #[arg(long, default_value_t = 0.02)]
        inflation: f64,

        #[arg(long, default_value_t = 0.06)]
        return_mean: f64,

        #[arg(long, default_value_t = 0.12)]
        return_stdev: f64,

        #[arg(long, default_value_t = 10_000)]
        trajectories: u32,

        /// Fixed seed for reproducible output.
        #[arg(long)]
        seed: Option<u64>,

        /// Comma-separated historical annual returns to resample instead
        /// of the normal model, e.g. `--bootstrap 0.21,-0.04,0.11`.
        #[arg(long, value_delimiter = ',')]
        bootstrap: Option<Vec<f64>>,
    },

    /// Run the built-in end-to-end pipeline demo with stub stages.
    Demo,
}
