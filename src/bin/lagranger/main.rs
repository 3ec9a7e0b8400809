// Lagrangian Spoke Runner: one hub thread, one spoke, synthetic quadratic model
// The hub runs progressive hedging and pushes per-scenario x; the spoke reports bounds
//
// Usage:
//   cargo run --release --bin lagranger                          # 8 scenarios, 4 nonants
//   cargo run --release --bin lagranger -- --scenarios 32        # Larger model
//   cargo run --release --bin lagranger -- --hub-iters 50        # Longer hub run
//   cargo run --release --bin lagranger -- --config spoke.json   # Spoke options (JSON)
//   cargo run --release --bin lagranger -- --trace bounds.jsonl  # JSONL bound trace
//   cargo run --release --bin lagranger -- --seed 42             # Custom model seed

mod hub_sim;
mod trace;

use lagranger_spoke::hub::LocalHub;
use lagranger_spoke::model::QuadraticBoxModel;
use lagranger_spoke::telemetry::init_tracing;
use lagranger_spoke::weights::StandardAggregator;
use lagranger_spoke::{Collaborators, LagrangerSpoke, SpokeConfig};
use std::path::PathBuf;
use std::time::Instant;

use hub_sim::HubSim;
use trace::BoundTrace;

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    scenarios: usize,
    nonants: usize,
    seed: u64,
    hub_iters: u64,
    config: Option<PathBuf>,
    trace: Option<PathBuf>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        scenarios: 8,
        nonants: 4,
        seed: 0,
        hub_iters: 20,
        config: None,
        trace: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--scenarios" => {
                i += 1;
                if i < args.len() {
                    cli.scenarios = args[i].parse().unwrap_or(8);
                }
            }
            "--nonants" => {
                i += 1;
                if i < args.len() {
                    cli.nonants = args[i].parse().unwrap_or(4);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            "--hub-iters" => {
                i += 1;
                if i < args.len() {
                    cli.hub_iters = args[i].parse().unwrap_or(20);
                }
            }
            "--config" => {
                i += 1;
                if i < args.len() {
                    cli.config = Some(PathBuf::from(&args[i]));
                }
            }
            "--trace" => {
                i += 1;
                if i < args.len() {
                    cli.trace = Some(PathBuf::from(&args[i]));
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    if let Err(e) = init_tracing("info") {
        eprintln!("tracing disabled: {}", e);
    }
    let cli = parse_args();

    let config = match &cli.config {
        Some(path) => match SpokeConfig::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Invalid spoke config {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => SpokeConfig::default(),
    };

    let model = QuadraticBoxModel::random(cli.scenarios, cli.nonants, cli.seed);
    let hub = LocalHub::new();

    println!("\n  Lagrangian Spoke Runner");
    println!("  Model: {} scenarios x {} nonants | Seed: {} | Hub iterations: {}",
        cli.scenarios, cli.nonants, cli.seed, cli.hub_iters);

    let hub_thread = {
        let sim = HubSim::new(model.clone(), hub.clone(), cli.hub_iters);
        std::thread::spawn(move || sim.run())
    };

    let mut spoke = LagrangerSpoke::new(Collaborators {
        builder: Box::new(model.clone()),
        solver: Box::new(model),
        aggregator: Box::new(StandardAggregator),
        transport: Box::new(hub.clone()),
        record_sink: None,
        rho_setter: None,
    });

    let start = Instant::now();
    let outcome = spoke.run_to_completion(config);

    // The hub normally stops on its own; make sure it does if the spoke failed early.
    hub.send_kill();
    let hub_ph_objective = hub_thread.join().ok().flatten();

    let final_record = match outcome {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Spoke failed: {}", e);
            std::process::exit(1);
        }
    };

    let published = hub.published();
    println!("  {}", "-".repeat(60));
    if let Some(trivial) = spoke.trivial_bound() {
        println!("  Trivial bound (iter 0):   {:>14.6}", trivial.value);
    }
    println!("  Final bound (iter {:>3}):   {:>14.6}", final_record.iteration, final_record.value);
    if let Some(best) = published.iter().map(|r| r.value).reduce(f64::max) {
        println!("  Best published bound:     {:>14.6}", best);
    }
    if let Some(obj) = hub_ph_objective {
        println!("  Hub PH objective:         {:>14.6}", obj);
    }
    println!("  Bounds published: {} | Elapsed: {:.1}ms\n",
        published.len(), start.elapsed().as_secs_f64() * 1000.0);

    if let Some(path) = &cli.trace {
        let trace = BoundTrace::from_records(&published);
        match trace.write_jsonl(path) {
            Ok(()) => println!("  Bound trace saved to: {}\n", path.display()),
            Err(e) => eprintln!("Failed to write trace {}: {}", path.display(), e),
        }
    }
}
