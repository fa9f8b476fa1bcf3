use helixopt::config::{Config, ConfigError};
use helixopt::constraints::ConstraintEngine;
use helixopt::export::{write_export_to_json, RunExport};
use helixopt::objective::ObjectiveFunction;
use helixopt::optimization::Optimizer;
use helixopt::sequence::Sequence;
use std::path::Path;
use std::process;

type Run = (
    Sequence,
    ConstraintEngine,
    Box<ObjectiveFunction>,
    Box<dyn Optimizer>,
);

/// Builds everything one optimization run needs from a validated configuration.
///
/// # Arguments
/// * `config` - The loaded run configuration
///
/// # Returns
/// * `Ok(Run)` - The starting sequence, the constraint set, the objective and a seeded optimizer.
/// * `Err(ConfigError)` - The first section that could not be built.
fn prepare_run(config: &Config) -> Result<Run, ConfigError> {
    let initial = config.build_sequence()?;
    let constraints = config.build_constraints()?;
    let objective = config.build_objective()?;
    let optimizer = config.build_optimizer()?;
    Ok((initial, constraints, objective, optimizer))
}

fn main() {
    env_logger::init();
    log::info!("Booting helixopt...");

    // 1. Load and Validate Configuration
    let config = match Config::load(Path::new("config.toml")) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {}", e);
        process::exit(1);
    }
    log::info!("Configuration loaded and validated.");

    // 2. Build the run: sequence, constraints, objective, optimizer
    let (initial, constraints, objective, mut optimizer) = match prepare_run(&config) {
        Ok(run) => run,
        Err(e) => {
            log::error!("Failed to set up the run: {}", e);
            process::exit(1);
        }
    };
    log::info!(
        "Sequence '{}' ({}, {} symbols, GC {:.3}) with {} constraint(s).",
        initial.id(),
        initial.seq_type(),
        initial.len(),
        initial.gc_content(),
        constraints.len()
    );
    for description in constraints.descriptions() {
        log::info!("  - {}", description);
    }

    let report = constraints.evaluate(&initial);
    if !report.all_satisfied() {
        log::warn!("Initial sequence violates constraints:\n{}", report);
    }

    // 3. Optimize
    log::info!("--- Starting {} (seed {}) ---", optimizer.name(), config.seed);
    let result = optimizer.optimize(&initial, objective.as_ref(), Some(&constraints));

    // 4. Report
    println!("\n{}", result);
    println!("Best Sequence: {}", result.best_sequence);
    println!("\n{}", constraints.evaluate(&result.best_sequence));

    if let Some(path) = &config.export_path {
        let export = RunExport::new(&config, optimizer.name(), &initial, &constraints, result);
        match write_export_to_json(&export, Path::new(path)) {
            Ok(()) => log::info!("Run exported to '{}'.", path),
            Err(e) => {
                log::error!("Failed to write export to '{}': {}", path, e);
                process::exit(1);
            }
        }
    }
}
