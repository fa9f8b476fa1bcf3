//! Run export for persisting an optimization run with everything needed to reproduce it.
//!
//! An export bundles the configuration snapshot, the seed, the full optimization result and a
//! constraint report of the final sequence, so a run can be inspected or replayed later.

use crate::config::Config;
use crate::constraints::{ConstraintEngine, ConstraintReport};
use crate::mutation::{calculate_mutation_rate, edit_distance, hamming_distance};
use crate::optimization::OptimizationResult;
use crate::sequence::Sequence;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Complete record of one optimization run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunExport {
    /// Schema version for forward/backward compatibility
    pub schema_version: String,
    /// Unix timestamp when export was generated
    pub generated_at: u64,
    /// Name of the optimizer that produced the result
    pub optimizer: String,
    pub seed: u64,
    /// Snapshot of the run configuration
    pub config: Config,
    pub initial_sequence: String,
    pub final_sequence: String,
    pub changes: ChangeSummary,
    /// Constraint results of the final sequence
    pub constraint_report: ConstraintReport,
    pub result: OptimizationResult,
}

/// How far the optimized sequence moved from where it started.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChangeSummary {
    /// Only defined when both sequences have the same length
    pub hamming_distance: Option<usize>,
    pub edit_distance: usize,
    pub mutation_rate: f64,
}

impl ChangeSummary {
    pub fn between(initial: &Sequence, optimized: &Sequence) -> Self {
        Self {
            hamming_distance: hamming_distance(initial, optimized).ok(),
            edit_distance: edit_distance(initial, optimized),
            mutation_rate: calculate_mutation_rate(initial, optimized),
        }
    }
}

impl RunExport {
    /// Creates a new run export.
    ///
    /// # Arguments
    /// * `config` - The configuration the run was started from
    /// * `optimizer` - Name of the optimizer that ran
    /// * `initial` - The starting sequence
    /// * `constraints` - Constraints the run enforced, re-evaluated on the best sequence
    /// * `result` - The optimization result
    pub fn new(
        config: &Config,
        optimizer: &str,
        initial: &Sequence,
        constraints: &ConstraintEngine,
        result: OptimizationResult,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: chrono::Utc::now().timestamp() as u64,
            optimizer: optimizer.to_string(),
            seed: config.seed,
            config: config.clone(),
            initial_sequence: initial.data().to_string(),
            final_sequence: result.best_sequence.data().to_string(),
            changes: ChangeSummary::between(initial, &result.best_sequence),
            constraint_report: constraints.evaluate(&result.best_sequence),
            result,
        }
    }
}

/// Writes a run export to a JSON file.
pub fn write_export_to_json(
    export: &RunExport,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(export)?;
    std::fs::write(output_path, json)?;
    Ok(())
}

/// Reads a run export from a JSON file.
pub fn read_export_from_json(input_path: &Path) -> Result<RunExport, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(input_path)?;
    let export: RunExport = serde_json::from_str(&content)?;
    Ok(export)
}
