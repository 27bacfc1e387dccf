//! Monte Carlo retirement projection engine.
//!
//! Simulates many independent trajectories of portfolio balance across the
//! retirement horizon under a fixed withdrawal policy and aggregates the
//! outcomes. Trajectories share no mutable state: each one derives its own
//! random stream from the scenario seed and its index, and writes into its
//! own slot of a preallocated outcome arena, so rayon can fan them out
//! across cores without locks and without disturbing reproducibility.

use std::f64::consts::PI;

use rayon::prelude::*;

use super::scenario::{Percentiles, RetirementScenario, ScenarioError, SimulationResult};

/// Annual return distribution.
///
/// The engine contract is identical for every variant; swapping the model
/// changes only how each year's return is drawn.
#[derive(Debug, Clone)]
pub enum ReturnModel {
    /// Normal returns with the given mean and standard deviation.
    Normal { mean: f64, stdev: f64 },
    /// Uniform resampling from a set of historical annual returns.
    Bootstrap(Vec<f64>),
}

impl ReturnModel {
    fn sample(&self, rng: &mut Rng) -> f64 {
        match self {
            ReturnModel::Normal { mean, stdev } => mean + stdev * rng.standard_normal(),
            ReturnModel::Bootstrap(samples) => {
                samples[(rng.next_u64() % samples.len() as u64) as usize]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TrajectoryOutcome {
    final_balance: f64,
    depleted: bool,
}

/// Runs the scenario under its own normal return distribution.
pub fn run(scenario: &RetirementScenario) -> Result<SimulationResult, ScenarioError> {
    run_with_model(
        scenario,
        &ReturnModel::Normal {
            mean: scenario.return_mean,
            stdev: scenario.return_stdev,
        },
    )
}

/// Runs the scenario under an explicit return model.
pub fn run_with_model(
    scenario: &RetirementScenario,
    model: &ReturnModel,
) -> Result<SimulationResult, ScenarioError> {
    scenario.validate()?;
    if let ReturnModel::Bootstrap(samples) = model
        && samples.is_empty()
    {
        return Err(ScenarioError::EmptyBootstrap);
    }

    let base_seed = scenario.seed.unwrap_or_else(entropy_seed);
    let mut outcomes = vec![TrajectoryOutcome::default(); scenario.num_trajectories as usize];

    // Disjoint slots, per-index seeds: the result is the same regardless of
    // how rayon schedules the work.
    outcomes
        .par_iter_mut()
        .enumerate()
        .for_each(|(index, slot)| {
            let mut rng = Rng::new(derive_seed(base_seed, index as u64));
            *slot = simulate_trajectory(scenario, model, &mut rng);
        });

    Ok(aggregate(&outcomes))
}

/// One simulated path of portfolio balance across the horizon.
///
/// Depletion is absorbing: once the balance reaches zero the trajectory
/// stays at zero for every remaining year, whatever the market does.
fn simulate_trajectory(
    scenario: &RetirementScenario,
    model: &ReturnModel,
    rng: &mut Rng,
) -> TrajectoryOutcome {
    let mut balance = scenario.initial_balance;
    let mut depleted = false;

    for year in 1..=scenario.years_to_retirement {
        if depleted {
            break;
        }

        let annual_return = model.sample(rng);
        balance *= 1.0 + annual_return;

        let withdrawal =
            scenario.annual_withdrawal * (1.0 + scenario.inflation_rate).powi(year as i32 - 1);
        balance -= withdrawal;

        if balance <= 0.0 {
            balance = 0.0;
            depleted = true;
        }
    }

    TrajectoryOutcome {
        final_balance: balance,
        depleted,
    }
}

fn aggregate(outcomes: &[TrajectoryOutcome]) -> SimulationResult {
    let surviving = outcomes.iter().filter(|outcome| !outcome.depleted).count();
    let success_rate = 100.0 * surviving as f64 / outcomes.len() as f64;

    let mut finals: Vec<f64> = outcomes.iter().map(|outcome| outcome.final_balance).collect();
    let p10 = percentile(&mut finals, 10.0);
    let p50 = percentile(&mut finals, 50.0);
    let p90 = percentile(&mut finals, 90.0);

    SimulationResult {
        success_rate,
        projected_value: p50,
        percentiles: Percentiles { p10, p50, p90 },
        num_trajectories: outcomes.len() as u32,
    }
}

fn derive_seed(base_seed: u64, trajectory: u64) -> u64 {
    splitmix64(base_seed.wrapping_add(trajectory.wrapping_mul(0x9E3779B97F4A7C15)))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

fn entropy_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0x5DEECE66D);
    splitmix64(nanos ^ u64::from(std::process::id()))
}

/// xorshift64* generator with a cached Box–Muller normal draw.
struct Rng {
    state: u64,
    cached_normal: Option<f64>,
}

impl Rng {
    fn new(seed: u64) -> Self {
        // xorshift state must never be zero.
        let state = if seed == 0 { 0xA5A5_A5A5_A5A5_A5A5 } else { seed };
        Self {
            state,
            cached_normal: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }

    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        let z0 = r * theta.cos();
        let z1 = r * theta.sin();
        self.cached_normal = Some(z1);
        z0
    }
}

fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}
