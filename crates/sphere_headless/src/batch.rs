//! Batch runner for scenario sweeps.
//!
//! Plays many scenarios (or many repeats of one) in parallel using rayon
//! and collects their reports. Repeats of the same scenario double as a
//! determinism check: every repeat must end on the same state hash.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::scenario::{Scenario, ScenarioError, ScenarioReport};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario files to play
    pub scenario_files: Vec<PathBuf>,
    /// Built-in scenarios to play
    pub builtins: Vec<String>,
    /// How many times each scenario is played
    pub repeats: u32,
    /// Maximum parallel runs (0 = use rayon default)
    pub parallel_runs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario_files: Vec::new(),
            builtins: vec!["duel".to_string()],
            repeats: 1,
            parallel_runs: 0,
        }
    }
}

impl BatchConfig {
    /// Config for a list of scenario files
    pub fn new(scenario_files: Vec<PathBuf>) -> Self {
        Self {
            scenario_files,
            builtins: Vec::new(),
            ..Default::default()
        }
    }

    /// Add built-in scenarios
    pub fn with_builtins<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builtins.extend(names.into_iter().map(Into::into));
        self
    }

    /// Set repeat count
    pub fn with_repeats(mut self, repeats: u32) -> Self {
        self.repeats = repeats;
        self
    }

    /// Set thread count
    pub fn with_parallel_runs(mut self, parallel_runs: usize) -> Self {
        self.parallel_runs = parallel_runs;
        self
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Reports of every successful run, in job order
    pub runs: Vec<ScenarioReport>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Aggregate over every run of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Successful runs
    pub total_runs: usize,
    /// Missile hits over all runs
    pub total_hits: usize,
    /// Agent collisions over all runs
    pub total_collisions: usize,
    /// Mean number of agents alive at the end of a run
    pub mean_living_agents: f64,
    /// Scenarios whose repeats ended on different state hashes
    pub nondeterministic: Vec<String>,
}

impl BatchSummary {
    /// Summarise a set of reports.
    pub fn from_runs(runs: &[ScenarioReport]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }

        let mut hashes: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
        for run in runs {
            hashes.entry(run.name.as_str()).or_default().push(run.state_hash);
        }
        let nondeterministic = hashes
            .into_iter()
            .filter(|(_, h)| h.windows(2).any(|w| w[0] != w[1]))
            .map(|(name, _)| name.to_string())
            .collect();

        Self {
            total_runs: runs.len(),
            total_hits: runs.iter().map(|r| r.hits.len()).sum(),
            total_collisions: runs.iter().map(|r| r.collisions.len()).sum(),
            mean_living_agents: runs.iter().map(|r| r.living_agents as f64).sum::<f64>()
                / runs.len() as f64,
            nondeterministic,
        }
    }

    /// Whether every repeated scenario reproduced its state hash.
    pub fn is_deterministic(&self) -> bool {
        self.nondeterministic.is_empty()
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Job index
    pub index: usize,
    /// Scenario file or built-in name
    pub source: String,
    /// Error message
    pub message: String,
}

struct Job {
    source: String,
    scenario: Result<Scenario, String>,
}

fn load_jobs(config: &BatchConfig) -> Vec<Job> {
    let files = config.scenario_files.iter().map(|path| Job {
        source: path.display().to_string(),
        scenario: Scenario::load(path).map_err(|e| e.to_string()),
    });
    let builtins = config.builtins.iter().map(|name| Job {
        source: name.clone(),
        scenario: Scenario::builtin(name).map_err(|e| e.to_string()),
    });

    let mut jobs = Vec::new();
    for job in files.chain(builtins) {
        for _ in 0..config.repeats.max(1) {
            jobs.push(Job {
                source: job.source.clone(),
                scenario: job.scenario.clone(),
            });
        }
    }
    jobs
}

/// Run a batch of scenarios
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let jobs = load_jobs(&config);
    let completed = AtomicUsize::new(0);

    info!(
        "Starting batch run: {} runs from {} sources",
        jobs.len(),
        config.scenario_files.len() + config.builtins.len()
    );

    let run_all = || {
        jobs.par_iter()
            .enumerate()
            .map(|(index, job)| {
                let result = job
                    .scenario
                    .as_ref()
                    .map_err(Clone::clone)
                    .and_then(|scenario| scenario.run().map_err(|e| e.to_string()));

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 10 == 0 {
                    debug!("Progress: {}/{}", done, jobs.len());
                }

                result.map_err(|message| {
                    warn!("Run {} ({}) failed: {}", index, job.source, message);
                    BatchError {
                        index,
                        source: job.source.clone(),
                        message,
                    }
                })
            })
            .collect::<Vec<_>>()
    };

    let pool = if config.parallel_runs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_runs)
            .build()
            .map_err(|e| warn!("Falling back to the global thread pool: {}", e))
            .ok()
    } else {
        None
    };
    let results = match pool {
        Some(pool) => pool.install(run_all),
        None => run_all(),
    };

    let (runs, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let runs: Vec<ScenarioReport> = runs.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} runs in {:.2}s ({} errors)",
        runs.len(),
        duration_seconds,
        errors.len()
    );

    BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
        errors,
    }
}

/// Verify determinism by playing the same scenario several times in
/// parallel and comparing final state hashes.
pub fn verify_determinism(scenario: &Scenario, runs: u32) -> Result<bool, ScenarioError> {
    let hashes = (0..runs.max(1))
        .into_par_iter()
        .map(|_| scenario.run().map(|report| report.state_hash))
        .collect::<Result<Vec<_>, _>>()?;

    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        warn!(scenario = %scenario.name, ?hashes, "Runs diverged");
    }
    Ok(deterministic)
}
