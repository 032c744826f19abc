//! dicesim-run — run a damage simulation script
//!
//! Loads a script of `name@levels: expression` definitions, reports any
//! script errors with their line spans, then runs each selected simulation
//! across the requested level/AC grid and prints a summary table or JSON.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dicesim_dsl::{parse_ranges, parse_script, ExprKind, SimParams, Simulation};
use dicesim_runtime::{run_simulation, RunConfig, Stats};

#[derive(Parser, Debug)]
#[command(name = "dicesim-run")]
#[command(about = "Run damage simulations from a definition script")]
struct Cli {
    /// Path to the simulation script
    script: PathBuf,

    /// Levels to run, e.g. "1-20" or "5,9,13"
    #[arg(long, default_value = "1-20")]
    levels: String,

    /// Armor class values to run against, e.g. "12,15,18"
    #[arg(long, default_value = "15")]
    ac: String,

    /// Flat offset applied to the derived save modifier
    #[arg(long, default_value_t = 0)]
    sm_offset: i64,

    /// Iterations per simulation/AC pairing
    #[arg(long, default_value_t = 100_000)]
    iterations: u64,

    /// RNG seed (omitted: derived from the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Comma-separated simulation names to run (default: all)
    #[arg(long)]
    names: Option<String>,

    /// Disable the natural-1 auto-miss rule on attacks
    #[arg(long)]
    no_nat1_miss: bool,

    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ResultRow {
    name: String,
    level: i64,
    ac: i64,
    #[serde(flatten)]
    stats: Stats,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dicesim_run=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let text = match std::fs::read_to_string(&cli.script) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to read {}: {e}", cli.script.display());
            std::process::exit(1);
        }
    };

    let Some(levels) = parse_ranges(&cli.levels) else {
        error!("Invalid --levels value: {}", cli.levels);
        std::process::exit(1);
    };
    let Some(ac_values) = parse_ranges(&cli.ac) else {
        error!("Invalid --ac value: {}", cli.ac);
        std::process::exit(1);
    };
    let selected: Option<Vec<&str>> = cli
        .names
        .as_deref()
        .map(|names| names.split(',').map(str::trim).collect());

    let script = parse_script(&text);
    for err in &script.errors {
        match err.line_count {
            Some(count) => error!(
                "lines {}-{}: {}",
                err.line_start + 1,
                err.line_start + count,
                err.message
            ),
            None => error!("line {}: {}", err.line_start + 1, err.message),
        }
    }
    if script.sims.is_empty() {
        error!("No valid simulations in {}", cli.script.display());
        std::process::exit(1);
    }

    let seed = cli.seed.unwrap_or_else(clock_seed);
    let config = RunConfig {
        iterations: cli.iterations,
        seed,
        ..RunConfig::default()
    };
    info!(
        "Running {} simulation group(s), {} iterations each, seed {seed}",
        script.sims.len(),
        cli.iterations
    );

    let mut rows = Vec::new();
    for sim in script.all() {
        if let Some(names) = &selected {
            if !names.contains(&sim.name()) {
                continue;
            }
        }
        if !levels.contains(&sim.level()) {
            continue;
        }
        if ac_values.len() > 1 && ac_independent(sim) {
            info!(
                "{} never reads AC or makes attacks; its results will not vary across --ac",
                sim.id()
            );
        }
        for &ac in &ac_values {
            let mut params = SimParams::for_level(sim.level(), ac, cli.sm_offset);
            params.nat1_auto_miss = !cli.no_nat1_miss;
            match run_simulation(sim, params, &config) {
                Ok(dist) => {
                    if let Some(stats) = Stats::from_distribution(&dist) {
                        rows.push(ResultRow {
                            name: sim.name().to_string(),
                            level: sim.level(),
                            ac,
                            stats,
                        });
                    }
                }
                Err(e) => error!("{}: {e}", sim.id()),
            }
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&rows) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("Failed to serialize results: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print_table(&rows);
    }
}

/// A simulation that never rolls against AC (directly or via an attack) and
/// never reads the AC-derived save modifier produces the same distribution
/// at every AC value.
fn ac_independent(sim: &Simulation) -> bool {
    !sim.root().any(|kind| {
        matches!(
            kind,
            ExprKind::ArmorClass | ExprKind::SaveMod | ExprKind::Attack { .. } | ExprKind::Save { .. }
        )
    })
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

fn print_table(rows: &[ResultRow]) {
    let name_width = rows
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(10)
        .max(10);
    println!(
        "{:<name_width$}  {:>5}  {:>4}  {:>9}  {:>8}  {:>7}  {:>7}",
        "SIMULATION", "LEVEL", "AC", "MEAN", "STDEV", "MIN", "MAX"
    );
    for row in rows {
        println!(
            "{:<name_width$}  {:>5}  {:>4}  {:>9.2}  {:>8.2}  {:>7}  {:>7}",
            row.name, row.level, row.ac, row.stats.mean, row.stats.stdev, row.stats.min,
            row.stats.max
        );
    }
}
