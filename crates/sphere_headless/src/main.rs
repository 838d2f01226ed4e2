//! Headless engagement runner.
//!
//! Plays scenarios without any front end, or serves an engine over JSON
//! lines on stdin/stdout for an external controller.
//!
//! # Usage
//!
//! ```bash
//! # Play a scenario and print a summary
//! cargo run -p sphere_headless -- run --scenario scenarios/duel.ron
//!
//! # Serve the JSON protocol, starting from a built-in scenario
//! cargo run -p sphere_headless -- serve --builtin duel
//!
//! # Play every scenario file four times in parallel
//! cargo run -p sphere_headless -- batch --scenarios scenarios/*.ron --repeats 4 --output results/batch.json
//!
//! # Check a recorded replay
//! cargo run -p sphere_headless -- replay --file duel.replay
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sphere_core::prelude::{Action, EngineError, Replay};
use sphere_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    scenario::Scenario,
    session::{Session, SessionConfig},
};

#[derive(Parser)]
#[command(name = "sphere_headless")]
#[command(about = "Headless sphere combat runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario to the end
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Built-in scenario (duel, ring)
        #[arg(short, long, conflicts_with = "scenario")]
        builtin: Option<String>,

        /// Print the full report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Save a replay of the run
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Serve the JSON-lines protocol on stdin/stdout
    Serve {
        /// Scenario file whose setup is preloaded (actions are not applied)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Built-in scenario whose setup is preloaded
        #[arg(short, long, conflicts_with = "scenario")]
        builtin: Option<String>,

        /// Output state after every command that changes the engine
        #[arg(long)]
        auto_state: bool,
    },

    /// Verify determinism by playing a scenario several times
    Verify {
        /// Scenario file to test
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Built-in scenario to test
        #[arg(short, long, conflicts_with = "scenario")]
        builtin: Option<String>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Check that a recorded replay reproduces its final state
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Play many scenarios in parallel
    Batch {
        /// Scenario files
        #[arg(short, long, num_args = 1..)]
        scenarios: Vec<PathBuf>,

        /// Built-in scenarios
        #[arg(short, long)]
        builtin: Vec<String>,

        /// Times each scenario is played
        #[arg(short, long, default_value = "1")]
        repeats: u32,

        /// Maximum parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: usize,

        /// Output JSON file for results
        #[arg(short, long, default_value = "results/batch.json")]
        output: PathBuf,
    },

    /// Time the reference duel
    Benchmark {
        /// Number of sub-steps to run
        #[arg(short, long, default_value = "100000")]
        steps: u32,

        /// Simulated seconds covered by those sub-steps
        #[arg(short, long, default_value = "100.0")]
        time: f64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            builtin,
            json,
            record,
        }) => {
            cmd_run(load_scenario(scenario, builtin), json, record);
        }
        Some(Commands::Serve {
            scenario,
            builtin,
            auto_state,
        }) => {
            let preload = (scenario.is_some() || builtin.is_some())
                .then(|| load_scenario(scenario, builtin));
            cmd_serve(preload, auto_state);
        }
        Some(Commands::Verify {
            scenario,
            builtin,
            runs,
        }) => {
            cmd_verify(&load_scenario(scenario, builtin), runs);
        }
        Some(Commands::Replay { file }) => {
            cmd_replay(file);
        }
        Some(Commands::Batch {
            scenarios,
            builtin,
            repeats,
            parallel,
            output,
        }) => {
            cmd_batch(scenarios, builtin, repeats, parallel, output);
        }
        Some(Commands::Benchmark { steps, time }) => {
            cmd_benchmark(steps, time);
        }
        None => {
            // Default: protocol session with no engine
            cmd_serve(None, false);
        }
    }
}

/// Load a scenario from CLI arguments or exit.
fn load_scenario(path: Option<PathBuf>, builtin: Option<String>) -> Scenario {
    match Scenario::resolve(path.as_deref(), builtin.as_deref()) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario: {e}");
            std::process::exit(1);
        }
    }
}

/// Play a scenario and print its outcome
fn cmd_run(scenario: Scenario, json: bool, record: Option<PathBuf>) {
    tracing::info!(
        "Running '{}' ({} agents, {} actions)",
        scenario.name,
        scenario.agents.len(),
        scenario.actions.len()
    );

    let report = match scenario.run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Scenario failed: {e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = record {
        match scenario.record().and_then(|replay| Ok(replay.save(&path)?)) {
            Ok(()) => tracing::info!("Replay saved to {}", path.display()),
            Err(e) => {
                eprintln!("Failed to save replay: {e}");
                std::process::exit(1);
            }
        }
    }

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Failed to serialize report: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    eprintln!("Scenario: {}", report.name);
    eprintln!("  Steps:      {}", report.steps);
    eprintln!("  Elapsed:    {:.3}", report.elapsed);
    eprintln!("  Hits:       {}", report.hits.len());
    eprintln!("  Collisions: {}", report.collisions.len());
    eprintln!("  Missiles:   {}", report.final_state.missiles.len());
    for (index, agent) in report.final_state.agents.iter().enumerate() {
        eprintln!(
            "  Agent {index}: hp {:>3}  v {:.4}  r ({:+.4}, {:+.4}, {:+.4})",
            agent.hp, agent.v, agent.r.x, agent.r.y, agent.r.z
        );
    }
    eprintln!("  State hash: {:016x}", report.state_hash);
}

/// Serve the protocol on stdin/stdout
fn cmd_serve(preload: Option<Scenario>, auto_state: bool) {
    tracing::info!("Starting protocol session");

    let config = SessionConfig {
        auto_state_output: auto_state,
    };
    let mut session = match preload {
        Some(scenario) => match scenario.engine() {
            Ok(engine) => {
                tracing::info!("Preloaded '{}'", scenario.name);
                Session::with_engine(engine, config)
            }
            Err(e) => {
                eprintln!("Failed to build engine: {e}");
                std::process::exit(1);
            }
        },
        None => Session::new(config),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = session.run(stdin.lock(), stdout.lock()) {
        eprintln!("Session IO error: {e}");
        std::process::exit(1);
    }
}

/// Verify determinism across runs
fn cmd_verify(scenario: &Scenario, runs: u32) {
    tracing::info!("Verifying determinism: {} ({} runs)", scenario.name, runs);

    match verify_determinism(scenario, runs) {
        Ok(true) => eprintln!("PASS: All {runs} runs produced identical results"),
        Ok(false) => {
            eprintln!("FAIL: Non-determinism detected!");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: Error during verification: {e}");
            std::process::exit(1);
        }
    }
}

/// Verify a recorded replay
fn cmd_replay(file: PathBuf) {
    tracing::info!("Verifying replay: {}", file.display());

    let replay = match Replay::load(&file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load replay: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("Loaded replay:");
    eprintln!("  Scenario: {}", replay.name);
    eprintln!("  Agents:   {}", replay.agents.len());
    eprintln!("  Actions:  {}", replay.actions.len());
    eprintln!("  Duration: {:.3}", replay.duration());

    match replay.verify() {
        Ok(engine) => {
            eprintln!("PASS: Replay verification successful");
            eprintln!("  Hash: {:016x}", engine.state_hash());
        }
        Err(EngineError::ReplayMismatch { expected, actual }) => {
            eprintln!("FAIL: Replay produced different hash!");
            eprintln!("  Expected: {expected:016x}");
            eprintln!("  Actual:   {actual:016x}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: Error during verification: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a batch and save the results
fn cmd_batch(
    scenarios: Vec<PathBuf>,
    builtins: Vec<String>,
    repeats: u32,
    parallel: usize,
    output: PathBuf,
) {
    let config = BatchConfig::new(scenarios)
        .with_builtins(builtins)
        .with_repeats(repeats)
        .with_parallel_runs(parallel);

    let results = run_batch(config);

    if let Err(e) = results.save(&output) {
        eprintln!("Failed to save results: {e}");
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!("Batch complete: {} runs", summary.total_runs);
    eprintln!("  Hits:          {}", summary.total_hits);
    eprintln!("  Collisions:    {}", summary.total_collisions);
    eprintln!("  Mean survivors: {:.2}", summary.mean_living_agents);
    eprintln!("  Errors:        {}", results.errors.len());
    eprintln!("  Results:       {}", output.display());

    if !summary.is_deterministic() {
        eprintln!(
            "FAIL: Non-deterministic scenarios: {}",
            summary.nondeterministic.join(", ")
        );
        std::process::exit(1);
    }
    if !results.errors.is_empty() {
        std::process::exit(1);
    }
}

/// Run benchmark
fn cmd_benchmark(steps: u32, time: f64) {
    tracing::info!("Running {} step benchmark", steps);

    let scenario = Scenario::duel();
    let mut engine = match scenario.engine() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to build engine: {e}");
            std::process::exit(1);
        }
    };
    for action in scenario
        .actions
        .iter()
        .filter(|a| matches!(a, Action::Launch { .. }))
    {
        if let Err(e) = engine.apply(action) {
            eprintln!("Failed to launch: {e}");
            std::process::exit(1);
        }
    }

    let start = Instant::now();
    let events = match engine.simulate(time, steps) {
        Ok(events) => events,
        Err(e) => {
            eprintln!("Benchmark failed: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    let steps_per_sec = f64::from(steps) / elapsed.as_secs_f64();
    let mut stdout = io::stdout();
    let _ = writeln!(
        stdout,
        "{steps} steps in {:.3}s ({steps_per_sec:.0} steps/s, {} hits, hash {:016x})",
        elapsed.as_secs_f64(),
        events.hits.len(),
        engine.state_hash()
    );
}
