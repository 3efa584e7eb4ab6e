//! `lineage-sim`: replay seeded toy-transport events through the lineage
//! tracker and report which bookkeeping scenarios hold.

use std::process::ExitCode;

use clap::Parser;
use lineage_core::ParticleListConfig;
use lineage_sim::scenarios::ScenarioId;
use lineage_sim::{ScenarioResult, ScenarioRunner, SimExport};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "lineage-sim")]
#[command(about = "Run deterministic particle-lineage scenarios", long_about = None)]
struct Args {
    /// Engine seed; 0 picks one from the clock
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Events per scenario
    #[arg(short, long, default_value = "3")]
    events: usize,

    /// baseline, energy_cut, shower_collapse, volume_filter, multi_pass or all
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Consecutive seeds to sweep, starting at --seed
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Tracker configuration file (JSON)
    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    verbose: bool,

    /// Print a JSON report on stdout instead of log lines
    #[arg(long)]
    json: bool,

    /// Write every finished event of one scenario to this JSON file
    #[arg(long)]
    export: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every requested run passed.
fn run(args: &Args) -> Result<bool, String> {
    let config = match &args.config {
        Some(path) => ParticleListConfig::from_file(path).map_err(|e| format!("{}: {}", path, e))?,
        None => ParticleListConfig::default(),
    };
    let scenarios = select_scenarios(&args.scenario)?;
    let seed = resolve_seed(args.seed);

    if let Some(path) = &args.export {
        let [scenario] = scenarios.as_slice() else {
            return Err("--export needs exactly one scenario".to_string());
        };
        return export_scenario(*scenario, seed, args.events, config, path);
    }

    let results: Vec<ScenarioResult> = (0..args.seeds as u64)
        .flat_map(|i| {
            let runner = ScenarioRunner::new(seed.wrapping_add(i), args.events).with_config(config.clone());
            scenarios.iter().map(move |scenario| runner.run(*scenario)).collect::<Vec<_>>()
        })
        .collect();

    let failed = results.iter().filter(|r| !r.passed).count();
    if args.json {
        print_report(&results, failed)?;
    } else {
        results.iter().for_each(ScenarioResult::log);
        info!("{}/{} runs passed", results.len() - failed, results.len());
    }
    Ok(failed == 0)
}

fn select_scenarios(name: &str) -> Result<Vec<ScenarioId>, String> {
    if name == "all" {
        return Ok(ScenarioId::all());
    }
    name.parse::<ScenarioId>().map(|s| vec![s]).map_err(|e| e.to_string())
}

fn resolve_seed(seed: u64) -> u64 {
    if seed != 0 {
        return seed;
    }
    let picked = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(42);
    info!("seed 0 requested, using {}", picked);
    picked
}

fn export_scenario(
    scenario: ScenarioId,
    seed: u64,
    events: usize,
    config: ParticleListConfig,
    path: &str,
) -> Result<bool, String> {
    let runner = ScenarioRunner::new(seed, events).with_config(config);
    let mut export = SimExport::new(scenario.name(), seed);
    let result = runner.run_with_export(scenario, &mut export);

    export
        .write_to_file(path)
        .map_err(|e| format!("failed to write {}: {}", path, e))?;
    info!("wrote {} events to {}", export.events.len(), path);

    result.log();
    Ok(result.passed)
}

fn print_report(results: &[ScenarioResult], failed: usize) -> Result<(), String> {
    let report = serde_json::json!({
        "total": results.len(),
        "passed": results.len() - failed,
        "failed": failed,
        "results": results.iter().map(ScenarioResult::to_json).collect::<Vec<_>>(),
    });
    let text = serde_json::to_string_pretty(&report).map_err(|e| format!("failed to encode report: {}", e))?;
    println!("{}", text);
    Ok(())
}
