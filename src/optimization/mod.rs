pub mod beam_search;
pub mod genetic_algorithm;
pub mod hill_climbing;
pub mod simulated_annealing;

pub use beam_search::{BeamSearch, BeamSearchConfig};
pub use genetic_algorithm::{
    CrossoverMethod, GeneticAlgorithm, GeneticAlgorithmConfig, SelectionMethod,
};
pub use hill_climbing::{HillClimbing, HillClimbingConfig};
pub use simulated_annealing::{CoolingSchedule, SimulatedAnnealing, SimulatedAnnealingConfig};

use crate::constraints::ConstraintEngine;
use crate::mutation::{MutationEngine, MutationError, MutationResult};
use crate::objective::ObjectiveFunction;
use crate::sequence::Sequence;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const REASON_INITIAL_VIOLATION: &str = "Initial sequence violates constraints";
pub const REASON_PATIENCE: &str = "No improvement within patience window";
pub const REASON_TEMPERATURE: &str = "Temperature reached minimum";
pub const REASON_LIMIT: &str = "Reached iteration/evaluation limit";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizationError {
    #[error("Must specify at least one termination criterion (max_iterations or max_evaluations)")]
    NoTerminationCriterion,
    #[error("min_improvement must be non-negative (got {0})")]
    NegativeMinImprovement(f64),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Invalid mutation config: {0}")]
    Mutation(#[from] MutationError),
}

impl OptimizationError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        OptimizationError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Termination and reporting knobs shared by every optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// `0` leaves the iteration count unbounded
    pub max_iterations: usize,
    /// `0` leaves the evaluation count unbounded
    pub max_evaluations: usize,
    /// Stop as soon as the best score reaches this value
    #[serde(with = "unbounded_target")]
    pub target_score: f64,
    /// Non-improving iterations tolerated before declaring convergence, `0` disables the check
    pub patience: usize,
    /// Smallest gain that counts as an improvement
    pub min_improvement: f64,
    /// When off, the constraints passed to `optimize` are ignored for the whole run
    pub enforce_constraints: bool,
    /// Draws allowed when searching for a constraint-satisfying restart point
    pub max_constraint_attempts: usize,
    pub verbose: bool,
    pub log_frequency: usize,
    pub track_history: bool,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_evaluations: 10000,
            target_score: f64::INFINITY,
            patience: 100,
            min_improvement: 1e-6,
            enforce_constraints: true,
            max_constraint_attempts: 100,
            verbose: false,
            log_frequency: 100,
            track_history: true,
        }
    }
}

impl OptimizationConfig {
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if self.max_iterations == 0 && self.max_evaluations == 0 {
            return Err(OptimizationError::NoTerminationCriterion);
        }
        if self.min_improvement.is_nan() || self.min_improvement < 0.0 {
            return Err(OptimizationError::NegativeMinImprovement(self.min_improvement));
        }
        Ok(())
    }
}

/// JSON has no infinities: an unbounded target is written as `null` and read back as `+inf`.
mod unbounded_target {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Same as [`unbounded_target`] for a best score that was never set, read back as `-inf`.
mod unscored {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::unbounded_target::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

/// Outcome of one `optimize` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best_sequence: Sequence,
    /// Starts at negative infinity so the first evaluated candidate always replaces it
    #[serde(with = "unscored")]
    pub best_score: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
    pub termination_reason: String,
    /// Best score after the initial evaluation, then after every completed iteration
    pub score_history: Vec<f64>,
    /// Cumulative evaluation count next to each `score_history` entry
    pub evaluation_history: Vec<usize>,
}

impl OptimizationResult {
    pub fn new(initial: &Sequence) -> Self {
        Self {
            best_sequence: initial.clone(),
            best_score: f64::NEG_INFINITY,
            iterations: 0,
            evaluations: 0,
            converged: false,
            termination_reason: String::new(),
            score_history: Vec::new(),
            evaluation_history: Vec::new(),
        }
    }

    /// Replaces the best candidate only on a strictly higher score, so earlier ties win.
    pub fn update_best(&mut self, seq: &Sequence, score: f64) -> bool {
        if score > self.best_score {
            self.best_sequence = seq.clone();
            self.best_score = score;
            return true;
        }
        false
    }

    /// Machine-readable summary of the run.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&serde_json::json!({
            "best_score": self.best_score,
            "iterations": self.iterations,
            "evaluations": self.evaluations,
            "converged": self.converged,
            "termination_reason": self.termination_reason,
            "sequence_length": self.best_sequence.len(),
            "best_sequence": self.best_sequence.data(),
            "score_history": self.score_history,
            "evaluation_history": self.evaluation_history,
        }))
    }
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "-------------------")?;
        writeln!(f, "Best Score: {:.6}", self.best_score)?;
        writeln!(f, "Iterations: {}", self.iterations)?;
        writeln!(f, "Evaluations: {}", self.evaluations)?;
        writeln!(f, "Converged: {}", if self.converged { "Yes" } else { "No" })?;
        if !self.termination_reason.is_empty() {
            writeln!(f, "Termination: {}", self.termination_reason)?;
        }
        writeln!(f, "Best Sequence Length: {}", self.best_sequence.len())
    }
}

/// Contract shared by every search strategy.
pub trait Optimizer {
    /// Maximizes `objective` starting from `initial`, keeping only candidates that satisfy
    /// `constraints` when given. Always returns a complete result.
    fn optimize(
        &mut self,
        initial: &Sequence,
        objective: &ObjectiveFunction,
        constraints: Option<&ConstraintEngine>,
    ) -> OptimizationResult;

    fn name(&self) -> &'static str;

    fn config(&self) -> &OptimizationConfig;

    /// Replaces the termination config; an invalid config leaves the optimizer unchanged.
    fn set_config(&mut self, config: OptimizationConfig) -> Result<(), OptimizationError>;

    /// The mutation engine that proposes candidates, for configuring mutation rates.
    fn mutation_engine_mut(&mut self) -> &mut MutationEngine<'static>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    HillClimbing,
    SimulatedAnnealing,
    BeamSearch,
    GeneticAlgorithm,
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizerKind::HillClimbing => "hill_climbing",
            OptimizerKind::SimulatedAnnealing => "simulated_annealing",
            OptimizerKind::BeamSearch => "beam_search",
            OptimizerKind::GeneticAlgorithm => "genetic_algorithm",
        };
        write!(f, "{}", name)
    }
}

/// Builds an optimizer of the given kind with default algorithm settings.
pub fn create_optimizer(kind: OptimizerKind, seed: u64) -> Box<dyn Optimizer> {
    match kind {
        OptimizerKind::HillClimbing => Box::new(HillClimbing::new(seed)),
        OptimizerKind::SimulatedAnnealing => Box::new(SimulatedAnnealing::new(seed)),
        OptimizerKind::BeamSearch => Box::new(BeamSearch::new(seed)),
        OptimizerKind::GeneticAlgorithm => Box::new(GeneticAlgorithm::new(seed)),
    }
}

pub(crate) fn satisfies(seq: &Sequence, constraints: Option<&ConstraintEngine>) -> bool {
    constraints.map_or(true, |c| c.satisfies_all(seq))
}

/// The constraints a run enforces, nothing when `enforce_constraints` is off.
pub(crate) fn enforced<'c>(
    config: &OptimizationConfig,
    constraints: Option<&'c ConstraintEngine>,
) -> Option<&'c ConstraintEngine> {
    constraints.filter(|_| config.enforce_constraints)
}

/// A proposed edit may enter the search only if the engine's own guards accepted it and the
/// edited sequence satisfies `constraints`.
pub(crate) fn admissible(mutation: &MutationResult, constraints: Option<&ConstraintEngine>) -> bool {
    mutation.constraint_satisfied && satisfies(&mutation.mutated_sequence, constraints)
}

/// Opens a run: the short-circuit result when `initial` violates the constraints, otherwise a
/// result seeded with the initial evaluation and its score.
pub(crate) fn begin(
    name: &str,
    config: &OptimizationConfig,
    initial: &Sequence,
    objective: &ObjectiveFunction,
    constraints: Option<&ConstraintEngine>,
) -> Result<(OptimizationResult, f64), OptimizationResult> {
    let mut result = OptimizationResult::new(initial);
    if !satisfies(initial, constraints) {
        info!("{}: {}", name, REASON_INITIAL_VIOLATION);
        result.termination_reason = REASON_INITIAL_VIOLATION.to_string();
        return Err(result);
    }
    info!(
        "Starting {} on '{}' ({} symbols, max_iterations={}, max_evaluations={})",
        name,
        initial.id(),
        initial.len(),
        config.max_iterations,
        config.max_evaluations
    );
    let score = objective(initial);
    result.evaluations += 1;
    result.update_best(initial, score);
    record_snapshot(config, &mut result);
    Ok((result, score))
}

pub(crate) fn should_terminate(config: &OptimizationConfig, result: &OptimizationResult) -> bool {
    (config.max_iterations > 0 && result.iterations >= config.max_iterations)
        || (config.max_evaluations > 0 && result.evaluations >= config.max_evaluations)
        || result.best_score >= config.target_score
}

pub(crate) fn record_snapshot(config: &OptimizationConfig, result: &mut OptimizationResult) {
    if config.track_history {
        result.score_history.push(result.best_score);
        result.evaluation_history.push(result.evaluations);
    }
}

/// Progress line every `log_frequency` iterations when `verbose` is on.
pub(crate) fn log_progress(name: &str, config: &OptimizationConfig, result: &OptimizationResult) {
    if !config.verbose || config.log_frequency == 0 {
        return;
    }
    if result.iterations % config.log_frequency == 0 {
        info!(
            "[{} iter {}] Score: {:.4} (Evals: {})",
            name, result.iterations, result.best_score, result.evaluations
        );
    }
}

/// Closes a run, defaulting the reason to the limit reason.
pub(crate) fn finish(name: &str, mut result: OptimizationResult) -> OptimizationResult {
    if result.termination_reason.is_empty() {
        result.termination_reason = REASON_LIMIT.to_string();
    }
    info!(
        "{} finished after {} iterations / {} evaluations: {} (best score {:.6})",
        name, result.iterations, result.evaluations, result.termination_reason, result.best_score
    );
    result
}

/// Counts consecutive observations that fail to beat a moving reference score.
#[derive(Debug, Clone)]
pub(crate) struct Stagnation {
    reference: f64,
    stalled: usize,
}

impl Stagnation {
    pub(crate) fn new(reference: f64) -> Self {
        Self {
            reference,
            stalled: 0,
        }
    }

    /// Returns `true` and moves the reference when `score` beats it by more than
    /// `min_improvement`; otherwise counts a stalled step.
    pub(crate) fn observe(&mut self, score: f64, min_improvement: f64) -> bool {
        if score > self.reference + min_improvement {
            self.reference = score;
            self.stalled = 0;
            true
        } else {
            self.stalled += 1;
            false
        }
    }

    pub(crate) fn reset(&mut self, reference: f64) {
        self.reference = reference;
        self.stalled = 0;
    }

    pub(crate) fn exhausted(&self, patience: usize) -> bool {
        patience > 0 && self.stalled >= patience
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::builtin::premature_stop_count;
    use crate::mutation::MutationConfig;
    use crate::objective::ObjectiveFactory;

    /// Rewards in-frame premature stops, so only the engine's stop guard keeps them out.
    fn stop_count(seq: &Sequence) -> f64 {
        seq.translate(0, false)
            .map(|protein| premature_stop_count(protein.data()) as f64)
            .unwrap_or(0.0)
    }

    fn stop_guarded_optimizers(seed: u64) -> Vec<Box<dyn Optimizer>> {
        let mut ga = GeneticAlgorithm::new(seed);
        // Recombination does not pass through the engine, so only mutation is exercised here
        ga.set_algorithm_config(GeneticAlgorithmConfig {
            population_size: 20,
            crossover_rate: 0.0,
            mutation_rate: 1.0,
            ..Default::default()
        })
        .unwrap();
        let mut optimizers: Vec<Box<dyn Optimizer>> = vec![
            Box::new(HillClimbing::new(seed)),
            Box::new(SimulatedAnnealing::new(seed)),
            Box::new(BeamSearch::new(seed)),
            Box::new(ga),
        ];
        for optimizer in optimizers.iter_mut() {
            optimizer
                .set_config(OptimizationConfig {
                    max_iterations: 40,
                    patience: 0,
                    ..Default::default()
                })
                .unwrap();
            optimizer
                .mutation_engine_mut()
                .set_config(MutationConfig {
                    substitution_rate: 1.0,
                    insertion_rate: 0.0,
                    deletion_rate: 0.0,
                    avoid_stop_codons: true,
                    ..Default::default()
                })
                .unwrap();
        }
        optimizers
    }

    #[test]
    fn test_engine_rejected_edits_never_enter_the_search() {
        let seq = Sequence::from_dna("ATGGCCCCCAAGTCCAGTCCACAGCC", "guarded");
        assert_eq!(stop_count(&seq), 0.0);
        for mut optimizer in stop_guarded_optimizers(3) {
            let result = optimizer.optimize(&seq, &stop_count, None);
            assert!(result.iterations > 0, "{}", optimizer.name());
            assert_eq!(result.best_score, 0.0, "{}", optimizer.name());
            assert_eq!(stop_count(&result.best_sequence), 0.0, "{}", optimizer.name());
        }
    }

    #[test]
    fn test_unenforced_constraints_are_ignored() {
        let seq = Sequence::from_dna("ATGAAATTTAAATTTAAATTTAAA", "loose");
        let objective = ObjectiveFactory::maximize_gc();
        let mut constraints = ConstraintEngine::new();
        constraints.add_constraint_from_string("gc=0.6-1.0").unwrap();
        for kind in [
            OptimizerKind::HillClimbing,
            OptimizerKind::SimulatedAnnealing,
            OptimizerKind::BeamSearch,
            OptimizerKind::GeneticAlgorithm,
        ] {
            let mut optimizer = create_optimizer(kind, 17);
            optimizer
                .set_config(OptimizationConfig {
                    max_iterations: 5,
                    ..Default::default()
                })
                .unwrap();
            let strict = optimizer.optimize(&seq, objective.as_ref(), Some(&constraints));
            assert_eq!(strict.termination_reason, REASON_INITIAL_VIOLATION, "{}", kind);

            optimizer
                .set_config(OptimizationConfig {
                    max_iterations: 5,
                    enforce_constraints: false,
                    ..Default::default()
                })
                .unwrap();
            let loose = optimizer.optimize(&seq, objective.as_ref(), Some(&constraints));
            assert_ne!(loose.termination_reason, REASON_INITIAL_VIOLATION, "{}", kind);
            assert_eq!(loose.iterations, 5, "{}", kind);
        }
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = OptimizationConfig::default();
        assert_eq!(config.max_iterations, 1000);
        assert_eq!(config.max_evaluations, 10000);
        assert!(config.target_score.is_infinite());
        assert!(config.validate().is_ok());

        let no_limits = OptimizationConfig {
            max_iterations: 0,
            max_evaluations: 0,
            ..Default::default()
        };
        assert_eq!(
            no_limits.validate(),
            Err(OptimizationError::NoTerminationCriterion)
        );

        let negative = OptimizationConfig {
            min_improvement: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_update_best_keeps_first_on_ties() {
        let a = Sequence::from_dna("AAAA", "a");
        let b = Sequence::from_dna("CCCC", "b");
        let mut result = OptimizationResult::new(&a);
        assert!(result.best_score.is_infinite() && result.best_score < 0.0);
        assert!(result.update_best(&a, 1.0));
        assert!(!result.update_best(&b, 1.0));
        assert_eq!(result.best_sequence, a);
        assert!(result.update_best(&b, 2.0));
        assert_eq!(result.best_sequence, b);
    }

    #[test]
    fn test_display_and_json() {
        let seq = Sequence::from_dna("ACGT", "r");
        let mut result = OptimizationResult::new(&seq);
        result.update_best(&seq, 0.5);
        result.iterations = 3;
        result.evaluations = 7;
        result.termination_reason = REASON_LIMIT.to_string();
        result.score_history = vec![0.5, 0.5];

        let text = result.to_string();
        assert!(text.starts_with("Optimization Result:\n-------------------\n"));
        assert!(text.contains("Best Score: 0.500000"));
        assert!(text.contains("Converged: No"));
        assert!(text.contains("Termination: Reached iteration/evaluation limit"));
        assert!(text.contains("Best Sequence Length: 4"));

        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["iterations"], 3);
        assert_eq!(json["evaluations"], 7);
        assert_eq!(json["sequence_length"], 4);
        assert_eq!(json["score_history"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_infinite_scores_survive_json() {
        let config = OptimizationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"target_score\":null"));
        let back: OptimizationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        let unscored = OptimizationResult::new(&Sequence::from_dna("ACGT", "u"));
        let json = serde_json::to_string(&unscored).unwrap();
        let back: OptimizationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.best_score, f64::NEG_INFINITY);
        assert_eq!(back, unscored);
    }

    #[test]
    fn test_should_terminate_treats_zero_as_unbounded() {
        let seq = Sequence::from_dna("ACGT", "t");
        let mut result = OptimizationResult::new(&seq);
        let config = OptimizationConfig {
            max_iterations: 0,
            max_evaluations: 5,
            ..Default::default()
        };
        result.iterations = 100;
        result.evaluations = 4;
        assert!(!should_terminate(&config, &result));
        result.evaluations = 5;
        assert!(should_terminate(&config, &result));

        let target = OptimizationConfig {
            target_score: 0.9,
            ..Default::default()
        };
        let mut reached = OptimizationResult::new(&seq);
        reached.best_score = 0.95;
        assert!(should_terminate(&target, &reached));
    }

    #[test]
    fn test_stagnation() {
        let mut s = Stagnation::new(1.0);
        assert!(!s.observe(1.0 + 1e-9, 1e-6));
        assert!(!s.exhausted(2));
        assert!(!s.observe(1.0, 1e-6));
        assert!(s.exhausted(2));
        assert!(!s.exhausted(0));
        assert!(s.observe(2.0, 1e-6));
        assert!(!s.exhausted(2));
        s.reset(0.0);
        assert!(!s.exhausted(1));
    }

    #[test]
    fn test_factory_names() {
        let objective = ObjectiveFactory::maximize_gc();
        let seq = Sequence::from_dna("ATGAAATTTAAA", "f");
        for (kind, name) in [
            (OptimizerKind::HillClimbing, "HillClimbing"),
            (OptimizerKind::SimulatedAnnealing, "SimulatedAnnealing"),
            (OptimizerKind::BeamSearch, "BeamSearch"),
            (OptimizerKind::GeneticAlgorithm, "GeneticAlgorithm"),
        ] {
            let mut optimizer = create_optimizer(kind, 11);
            assert_eq!(optimizer.name(), name);
            optimizer
                .set_config(OptimizationConfig {
                    max_iterations: 5,
                    ..Default::default()
                })
                .unwrap();
            let result = optimizer.optimize(&seq, objective.as_ref(), None);
            assert!(result.iterations <= 5);
            assert!(result.best_score >= seq.gc_content());
        }
    }
}
