use crate::constraints::ConstraintEngine;
use crate::mutation::MutationEngine;
use crate::objective::ObjectiveFunction;
use crate::optimization::{
    admissible, begin, enforced, finish, log_progress, record_snapshot, should_terminate,
    OptimizationConfig, OptimizationError, OptimizationResult, Optimizer, Stagnation,
    REASON_PATIENCE,
};
use crate::sequence::Sequence;
use log::debug;
use serde::{Deserialize, Serialize};

/// Compounding mutations applied to jump to a restart point
const RESTART_MUTATIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillClimbingConfig {
    /// Random neighbors proposed per iteration
    pub num_neighbors: usize,
    pub random_restart: bool,
    pub max_restarts: usize,
}

impl Default for HillClimbingConfig {
    fn default() -> Self {
        Self {
            num_neighbors: 10,
            random_restart: false,
            max_restarts: 3,
        }
    }
}

impl HillClimbingConfig {
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if self.num_neighbors == 0 {
            return Err(OptimizationError::invalid("num_neighbors", "must be at least 1"));
        }
        Ok(())
    }
}

/// Best-of-N steepest ascent with optional random restarts.
pub struct HillClimbing {
    config: OptimizationConfig,
    algo_config: HillClimbingConfig,
    engine: MutationEngine<'static>,
}

impl HillClimbing {
    pub fn new(seed: u64) -> Self {
        Self {
            config: OptimizationConfig::default(),
            algo_config: HillClimbingConfig::default(),
            engine: MutationEngine::new(seed),
        }
    }

    pub fn algorithm_config(&self) -> &HillClimbingConfig {
        &self.algo_config
    }

    pub fn set_algorithm_config(&mut self, config: HillClimbingConfig) -> Result<(), OptimizationError> {
        config.validate()?;
        self.algo_config = config;
        Ok(())
    }

    /// Scores every constraint-satisfying neighbor and keeps the first one with the top score.
    fn best_neighbor(
        &mut self,
        current: &Sequence,
        objective: &ObjectiveFunction,
        constraints: Option<&ConstraintEngine>,
    ) -> Option<(Sequence, f64)> {
        let mut best: Option<(Sequence, f64)> = None;
        for _ in 0..self.algo_config.num_neighbors {
            let proposal = self.engine.apply_random_mutation(current);
            if !admissible(&proposal, constraints) {
                debug!("HillClimbing: neighbor rejected by constraints");
                continue;
            }
            let neighbor = proposal.mutated_sequence;
            let score = objective(&neighbor);
            if best.as_ref().map_or(true, |(_, best_score)| score > *best_score) {
                best = Some((neighbor, score));
            }
        }
        best
    }

    /// A compounded jump away from `current` that passes the constraints, drawn at most
    /// `max_constraint_attempts` times.
    fn restart_point(
        &mut self,
        current: &Sequence,
        constraints: Option<&ConstraintEngine>,
    ) -> Option<Sequence> {
        for _ in 0..self.config.max_constraint_attempts {
            let jump = self.engine.apply_n_mutations(current, RESTART_MUTATIONS);
            if admissible(&jump, constraints) {
                return Some(jump.mutated_sequence);
            }
        }
        None
    }
}

impl Optimizer for HillClimbing {
    fn optimize(
        &mut self,
        initial: &Sequence,
        objective: &ObjectiveFunction,
        constraints: Option<&ConstraintEngine>,
    ) -> OptimizationResult {
        let name = self.name();
        let constraints = enforced(&self.config, constraints);
        let (mut result, mut current_score) =
            match begin(name, &self.config, initial, objective, constraints) {
                Ok(start) => start,
                Err(rejected) => return rejected,
            };
        let mut current = initial.clone();
        let mut stagnation = Stagnation::new(current_score);
        let mut restarts = 0;

        while !should_terminate(&self.config, &result) {
            result.iterations += 1;

            let best = self.best_neighbor(&current, objective, constraints);
            result.evaluations += self.algo_config.num_neighbors;

            if let Some((neighbor, score)) = best {
                if stagnation.observe(score, self.config.min_improvement) {
                    current = neighbor;
                    current_score = score;
                    result.update_best(&current, current_score);
                }
            } else {
                stagnation.observe(f64::NEG_INFINITY, self.config.min_improvement);
            }

            record_snapshot(&self.config, &mut result);

            if stagnation.exhausted(self.config.patience) {
                if self.algo_config.random_restart && restarts < self.algo_config.max_restarts {
                    restarts += 1;
                    if let Some(start) = self.restart_point(&current, constraints) {
                        current = start;
                        current_score = objective(&current);
                        result.evaluations += 1;
                        result.update_best(&current, current_score);
                    }
                    debug!(
                        "HillClimbing: restart {}/{} from score {:.4}",
                        restarts, self.algo_config.max_restarts, current_score
                    );
                    stagnation.reset(current_score);
                } else {
                    result.converged = true;
                    result.termination_reason = REASON_PATIENCE.to_string();
                    break;
                }
            }

            log_progress(name, &self.config, &result);
        }

        finish(name, result)
    }

    fn name(&self) -> &'static str {
        "HillClimbing"
    }

    fn config(&self) -> &OptimizationConfig {
        &self.config
    }

    fn set_config(&mut self, config: OptimizationConfig) -> Result<(), OptimizationError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    fn mutation_engine_mut(&mut self) -> &mut MutationEngine<'static> {
        &mut self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::builtin::CustomConstraint;
    use crate::objective::ObjectiveFactory;
    use crate::optimization::{REASON_INITIAL_VIOLATION, REASON_LIMIT};

    fn get_test_config() -> OptimizationConfig {
        OptimizationConfig {
            max_iterations: 200,
            max_evaluations: 5000,
            patience: 30,
            ..Default::default()
        }
    }

    fn seed_sequence() -> Sequence {
        Sequence::from_dna("ATGAAATTTAAATTTAAATTTAAA", "hc")
    }

    #[test]
    fn test_initial_violation_short_circuits() {
        let mut optimizer = HillClimbing::new(42);
        let mut constraints = ConstraintEngine::new();
        constraints.add_constraint_from_string("gc=0.4-0.6").unwrap();
        let seq = Sequence::from_dna("AAAAAAAAAA", "bad");
        let result = optimizer.optimize(&seq, ObjectiveFactory::maximize_gc().as_ref(), Some(&constraints));
        assert!(!result.converged);
        assert_eq!(result.termination_reason, REASON_INITIAL_VIOLATION);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.evaluations, 0);
        assert_eq!(result.best_score, f64::NEG_INFINITY);
        assert_eq!(result.best_sequence, seq);
    }

    #[test]
    fn test_improves_and_history_is_monotonic() {
        let mut optimizer = HillClimbing::new(7);
        optimizer.set_config(get_test_config()).unwrap();
        let seq = seed_sequence();
        let result = optimizer.optimize(&seq, ObjectiveFactory::maximize_gc().as_ref(), None);
        assert!(result.best_score > seq.gc_content());
        assert!(result.evaluations >= result.iterations);
        assert_eq!(result.score_history.len(), result.iterations + 1);
        assert_eq!(result.evaluation_history.len(), result.score_history.len());
        assert!(result.score_history.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(result.best_score, ObjectiveFactory::maximize_gc()(&result.best_sequence));
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let run = || {
            let mut optimizer = HillClimbing::new(1234);
            optimizer.set_config(get_test_config()).unwrap();
            optimizer.optimize(&seed_sequence(), ObjectiveFactory::target_gc(0.5).as_ref(), None)
        };
        let a = run();
        let b = run();
        assert_eq!(a.best_sequence, b.best_sequence);
        assert_eq!(a.best_score.to_bits(), b.best_score.to_bits());
        assert_eq!(a.iterations, b.iterations);
        assert_eq!(a.evaluations, b.evaluations);
        assert_eq!(a.score_history, b.score_history);
    }

    #[test]
    fn test_patience_convergence_on_flat_objective() {
        let mut optimizer = HillClimbing::new(3);
        optimizer
            .set_config(OptimizationConfig {
                patience: 5,
                ..get_test_config()
            })
            .unwrap();
        let flat = |_: &Sequence| 1.0;
        let result = optimizer.optimize(&seed_sequence(), &flat, None);
        assert!(result.converged);
        assert_eq!(result.termination_reason, REASON_PATIENCE);
        assert_eq!(result.iterations, 5);
        assert_eq!(result.evaluations, 1 + 5 * 10);
    }

    #[test]
    fn test_restarts_extend_the_run() {
        let mut optimizer = HillClimbing::new(3);
        optimizer
            .set_config(OptimizationConfig {
                patience: 5,
                ..get_test_config()
            })
            .unwrap();
        optimizer
            .set_algorithm_config(HillClimbingConfig {
                random_restart: true,
                max_restarts: 2,
                ..Default::default()
            })
            .unwrap();
        let flat = |_: &Sequence| 1.0;
        let result = optimizer.optimize(&seed_sequence(), &flat, None);
        assert!(result.converged);
        assert_eq!(result.iterations, 15);
    }

    #[test]
    fn test_restart_draws_are_bounded_by_max_constraint_attempts() {
        let run = |max_constraint_attempts: usize, constraints: Option<&ConstraintEngine>| {
            let mut optimizer = HillClimbing::new(3);
            optimizer
                .set_config(OptimizationConfig {
                    patience: 5,
                    max_constraint_attempts,
                    ..get_test_config()
                })
                .unwrap();
            optimizer
                .set_algorithm_config(HillClimbingConfig {
                    random_restart: true,
                    max_restarts: 2,
                    ..Default::default()
                })
                .unwrap();
            let flat = |_: &Sequence| 1.0;
            optimizer.optimize(&seed_sequence(), &flat, constraints)
        };

        // Each successful restart scores its new starting point
        assert_eq!(run(100, None).evaluations, 1 + 15 * 10 + 2);
        assert_eq!(run(0, None).evaluations, 1 + 15 * 10);

        let mut frozen = ConstraintEngine::new();
        let seed = seed_sequence();
        frozen.add_constraint(Box::new(CustomConstraint::new(
            "frozen",
            "sequence must not change",
            move |s: &Sequence| s.data() == seed.data(),
        )));
        let result = run(4, Some(&frozen));
        assert!(result.converged);
        assert_eq!(result.iterations, 15);
        assert_eq!(result.evaluations, 1 + 15 * 10);
        assert_eq!(result.best_sequence, seed_sequence());
    }

    #[test]
    fn test_respects_constraints_and_limits() {
        let mut optimizer = HillClimbing::new(99);
        optimizer
            .set_config(OptimizationConfig {
                max_iterations: 50,
                patience: 0,
                ..Default::default()
            })
            .unwrap();
        let mut constraints = ConstraintEngine::new();
        constraints.add_constraint_from_string("gc=0.0-0.5").unwrap();
        constraints.add_constraint_from_string("length=20-30").unwrap();
        let result = optimizer.optimize(
            &seed_sequence(),
            ObjectiveFactory::maximize_gc().as_ref(),
            Some(&constraints),
        );
        assert!(constraints.satisfies_all(&result.best_sequence));
        assert_eq!(result.iterations, 50);
        assert_eq!(result.termination_reason, REASON_LIMIT);
        assert!(!result.converged);
    }

    #[test]
    fn test_rejects_zero_neighbors() {
        let mut optimizer = HillClimbing::new(1);
        assert!(optimizer
            .set_algorithm_config(HillClimbingConfig {
                num_neighbors: 0,
                ..Default::default()
            })
            .is_err());
    }
}
