mod cli;
mod config;
mod error;
mod orchestrator;
mod pipeline;
mod queue;
mod retirement;
mod stage;
mod store;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use console::Style;

use cli::{Cli, Command};
use config::FolioConfig;
use error::PipelineError;
use orchestrator::{Orchestrator, Worker, WorkerStats};
use pipeline::job::{Account, Job, PortfolioSnapshot, Position, RetryConfig};
use queue::JobQueue;
use retirement::engine::{self, ReturnModel};
use retirement::scenario::RetirementScenario;
use stage::invoker::StageInvoker;
use stage::{HttpStageClient, PipelineStages, StubStages};
use store::{FileStore, JobStore, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = FolioConfig::load()?;

    match cli.command {
        Command::Run { max_jobs } => {
            run_worker(&config, cli.max_attempts, max_jobs, cli.verbose).await?;
        }
        Command::Demo => {
            run_demo(cli.max_attempts, cli.verbose).await?;
        }
        Command::Simulate {
            balance,
            years,
            withdrawal,
            inflation,
            return_mean,
            return_stdev,
            trajectories,
            seed,
            bootstrap,
        } => {
            let scenario = RetirementScenario {
                initial_balance: balance,
                years_to_retirement: years,
                annual_withdrawal: withdrawal,
                inflation_rate: inflation,
                return_mean,
                return_stdev,
                num_trajectories: trajectories,
                seed,
            };
            let result = match bootstrap {
                Some(samples) => {
                    engine::run_with_model(&scenario, &ReturnModel::Bootstrap(samples))?
                }
                None => engine::run(&scenario)?,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Status { job_id } => {
            show_status(&config, job_id)?;
        }
    }

    Ok(())
}

fn retry_config(config: &FolioConfig, max_attempts: Option<u32>) -> RetryConfig {
    RetryConfig {
        max_attempts: max_attempts.unwrap_or(config.max_attempts),
        base_delay_ms: config.base_delay_ms,
    }
}

/// Drains pending jobs from the store through the HTTP stage services.
async fn run_worker(
    config: &FolioConfig,
    max_attempts: Option<u32>,
    max_jobs: Option<usize>,
    verbose: bool,
) -> Result<()> {
    let store: Arc<dyn JobStore> = Arc::new(FileStore::open(&config.store_dir)?);
    let pending = store.pending_ids()?;
    if pending.is_empty() {
        println!("No pending jobs in {}", config.store_dir);
        return Ok(());
    }

    let queue = Arc::new(JobQueue::new());
    for id in &pending {
        queue.enqueue(id);
    }

    let stages = PipelineStages::new(HttpStageClient::new(
        config.stage_base_url.clone(),
        config.stage_timeout_seconds,
    ));
    let invoker = StageInvoker::new(
        retry_config(config, max_attempts),
        Duration::from_secs(config.stage_timeout_seconds),
    );
    let orchestrator = Orchestrator::new(store.clone(), stages, invoker);
    let worker = Worker::new(queue, store.clone(), orchestrator);

    let limit = max_jobs.map_or(pending.len(), |requested| requested.min(pending.len()));
    let stats = worker.run(Some(limit)).await?;
    print_stats(&stats);

    if verbose {
        for id in &pending {
            if let Some(job) = store.get(id)? {
                ui::print_record(&job);
            }
        }
    }

    Ok(())
}

/// End-to-end pipeline against deterministic stub stages, including one
/// duplicate delivery to show the idempotency guard at work.
async fn run_demo(max_attempts: Option<u32>, verbose: bool) -> Result<()> {
    let store: Arc<dyn JobStore> = Arc::new(MemoryStore::new());
    let queue = Arc::new(JobQueue::new());

    let scenario = RetirementScenario {
        initial_balance: 1_000_000.0,
        years_to_retirement: 30,
        annual_withdrawal: 40_000.0,
        inflation_rate: 0.02,
        return_mean: 0.06,
        return_stdev: 0.12,
        num_trajectories: 1000,
        seed: Some(1),
    };

    let untagged = Job::new(demo_snapshot(false), scenario.clone());
    let tagged = Job::new(demo_snapshot(true), scenario);
    store.insert(&untagged)?;
    store.insert(&tagged)?;

    queue.enqueue(&untagged.id);
    queue.enqueue(&tagged.id);
    queue.enqueue(&untagged.id); // duplicate delivery, skipped by the guard

    let invoker = StageInvoker::new(
        retry_config(&FolioConfig::default(), max_attempts),
        Duration::from_secs(30),
    );
    let orchestrator = Orchestrator::new(store.clone(), StubStages, invoker);
    let worker = Worker::new(queue, store.clone(), orchestrator);
    let stats = worker.run(Some(3)).await?;
    print_stats(&stats);

    if verbose {
        for id in [&untagged.id, &tagged.id] {
            if let Some(job) = store.get(id)? {
                ui::print_record(&job);
            }
        }
    }

    Ok(())
}

fn show_status(config: &FolioConfig, job_id: Option<String>) -> Result<(), PipelineError> {
    let store = FileStore::open(&config.store_dir)?;
    match job_id {
        Some(id) => {
            let job = store
                .get(&id)?
                .ok_or_else(|| PipelineError::JobNotFound(id))?;
            ui::print_record(&job);
        }
        None => {
            let pending = store.pending_ids()?;
            if pending.is_empty() {
                println!("No pending jobs in {}", config.store_dir);
            } else {
                println!("Pending jobs:");
                for id in pending {
                    println!("  {id}");
                }
            }
        }
    }
    Ok(())
}

fn print_stats(stats: &WorkerStats) {
    let bold = Style::new().bold();
    println!(
        "{} {} completed, {} failed, {} skipped, {} errors",
        bold.apply_to("Done:"),
        stats.completed,
        stats.failed,
        stats.skipped,
        stats.errors
    );
}

fn demo_snapshot(tagged: bool) -> PortfolioSnapshot {
    PortfolioSnapshot {
        accounts: vec![
            Account {
                name: "brokerage".into(),
                positions: vec![
                    Position {
                        symbol: "VTI".into(),
                        quantity: 120.0,
                        asset_class: tagged.then(|| "equity".to_string()),
                    },
                    Position {
                        symbol: "BND".into(),
                        quantity: 80.0,
                        asset_class: tagged.then(|| "bond".to_string()),
                    },
                ],
            },
            Account {
                name: "ira".into(),
                positions: vec![Position {
                    symbol: "VXUS".into(),
                    quantity: 60.0,
                    asset_class: tagged.then(|| "equity".to_string()),
                }],
            },
        ],
    }
}
