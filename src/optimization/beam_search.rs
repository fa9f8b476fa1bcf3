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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamSearchConfig {
    pub beam_width: usize,
    /// Neighbors proposed for every beam member per iteration
    pub expansion_factor: usize,
    pub diverse_beam: bool,
    /// Minimum Hamming dissimilarity between same-length candidates when `diverse_beam` is on
    pub diversity_threshold: f64,
    pub prune_duplicates: bool,
}

impl Default for BeamSearchConfig {
    fn default() -> Self {
        Self {
            beam_width: 10,
            expansion_factor: 5,
            diverse_beam: false,
            diversity_threshold: 0.1,
            prune_duplicates: true,
        }
    }
}

impl BeamSearchConfig {
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if self.beam_width == 0 {
            return Err(OptimizationError::invalid("beam_width", "must be at least 1"));
        }
        if self.expansion_factor == 0 {
            return Err(OptimizationError::invalid("expansion_factor", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.diversity_threshold) {
            return Err(OptimizationError::invalid(
                "diversity_threshold",
                format!("must be in [0, 1] (got {})", self.diversity_threshold),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    sequence: Sequence,
    score: f64,
}

/// Keeps the `beam_width` best candidates alive and expands all of them every iteration.
pub struct BeamSearch {
    config: OptimizationConfig,
    algo_config: BeamSearchConfig,
    engine: MutationEngine<'static>,
}

impl BeamSearch {
    pub fn new(seed: u64) -> Self {
        Self {
            config: OptimizationConfig::default(),
            algo_config: BeamSearchConfig::default(),
            engine: MutationEngine::new(seed),
        }
    }

    pub fn algorithm_config(&self) -> &BeamSearchConfig {
        &self.algo_config
    }

    pub fn set_algorithm_config(&mut self, config: BeamSearchConfig) -> Result<(), OptimizationError> {
        config.validate()?;
        self.algo_config = config;
        Ok(())
    }

    /// Scored neighbors of every beam member, or a copy of the beam when none survive.
    fn expand(
        &mut self,
        beam: &[Candidate],
        objective: &ObjectiveFunction,
        constraints: Option<&ConstraintEngine>,
    ) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = Vec::new();
        for parent in beam {
            for _ in 0..self.algo_config.expansion_factor {
                let proposal = self.engine.apply_random_mutation(&parent.sequence);
                if proposal.mutated_sequence.is_empty() || !admissible(&proposal, constraints) {
                    continue;
                }
                let neighbor = proposal.mutated_sequence;
                if self.algo_config.prune_duplicates && is_duplicate(&neighbor, &candidates) {
                    continue;
                }
                if self.algo_config.diverse_beam && !self.is_diverse(&neighbor, &candidates) {
                    continue;
                }
                let score = objective(&neighbor);
                candidates.push(Candidate {
                    sequence: neighbor,
                    score,
                });
            }
        }

        if candidates.is_empty() {
            debug!("BeamSearch: no valid candidates, carrying the beam forward");
            return beam.to_vec();
        }
        candidates
    }

    /// Stable descending sort, then cut to the beam width.
    fn select(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(self.algo_config.beam_width);
        candidates
    }

    /// `true` only when `seq` is strictly less similar than `1 - diversity_threshold` to every
    /// same-length candidate.
    fn is_diverse(&self, seq: &Sequence, candidates: &[Candidate]) -> bool {
        let ceiling = 1.0 - self.algo_config.diversity_threshold;
        candidates
            .iter()
            .filter(|c| c.sequence.len() == seq.len() && !seq.is_empty())
            .all(|c| {
                let differing = seq
                    .as_bytes()
                    .iter()
                    .zip(c.sequence.as_bytes())
                    .filter(|(a, b)| a != b)
                    .count();
                let similarity = 1.0 - differing as f64 / seq.len() as f64;
                similarity < ceiling
            })
    }
}

fn is_duplicate(seq: &Sequence, candidates: &[Candidate]) -> bool {
    candidates.iter().any(|c| c.sequence.data() == seq.data())
}

impl Optimizer for BeamSearch {
    fn optimize(
        &mut self,
        initial: &Sequence,
        objective: &ObjectiveFunction,
        constraints: Option<&ConstraintEngine>,
    ) -> OptimizationResult {
        let name = self.name();
        let constraints = enforced(&self.config, constraints);
        let (mut result, initial_score) =
            match begin(name, &self.config, initial, objective, constraints) {
                Ok(start) => start,
                Err(rejected) => return rejected,
            };
        let mut beam = vec![Candidate {
            sequence: initial.clone(),
            score: initial_score,
        }];
        let mut stagnation = Stagnation::new(result.best_score);

        while !should_terminate(&self.config, &result) {
            result.iterations += 1;

            let candidates = self.expand(&beam, objective, constraints);
            result.evaluations += candidates.len();
            beam = self.select(candidates);

            if let Some(leader) = beam.first() {
                result.update_best(&leader.sequence, leader.score);
            }
            record_snapshot(&self.config, &mut result);

            stagnation.observe(result.best_score, self.config.min_improvement);
            if stagnation.exhausted(self.config.patience) {
                result.converged = true;
                result.termination_reason = REASON_PATIENCE.to_string();
                break;
            }

            log_progress(name, &self.config, &result);
        }

        finish(name, result)
    }

    fn name(&self) -> &'static str {
        "BeamSearch"
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

    fn get_test_config() -> OptimizationConfig {
        OptimizationConfig {
            max_iterations: 60,
            max_evaluations: 5000,
            patience: 20,
            ..Default::default()
        }
    }

    fn seed_sequence() -> Sequence {
        Sequence::from_dna("ATGAAATTTAAATTTAAATTTAAA", "beam")
    }

    fn candidate(data: &str, score: f64) -> Candidate {
        Candidate {
            sequence: Sequence::from_dna(data, "c"),
            score,
        }
    }

    #[test]
    fn test_width_one_behaves_like_best_of_n_climbing() {
        let mut beam = BeamSearch::new(42);
        beam.set_config(get_test_config()).unwrap();
        beam.set_algorithm_config(BeamSearchConfig {
            beam_width: 1,
            ..Default::default()
        })
        .unwrap();
        let seq = seed_sequence();
        let result = beam.optimize(&seq, ObjectiveFactory::maximize_gc().as_ref(), None);

        assert!(result.best_score > seq.gc_content());
        assert!(result.evaluations <= 1 + 5 * result.iterations);
        assert!(result.evaluations >= result.iterations);
        assert!(result.score_history.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(result.best_score, result.best_sequence.gc_content());
    }

    #[test]
    fn test_wider_beam_is_deterministic() {
        let run = || {
            let mut beam = BeamSearch::new(77);
            beam.set_config(get_test_config()).unwrap();
            beam.optimize(&seed_sequence(), ObjectiveFactory::target_gc(0.6).as_ref(), None)
        };
        let a = run();
        let b = run();
        assert_eq!(a, b);
        assert_eq!(a.evaluation_history.len(), a.score_history.len());
        assert!(a.evaluation_history.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_beam_carried_forward_when_nothing_survives() {
        let mut beam = BeamSearch::new(9);
        beam.set_config(OptimizationConfig {
            patience: 3,
            ..get_test_config()
        })
        .unwrap();
        let frozen = seed_sequence();
        let mut constraints = ConstraintEngine::new();
        constraints.add_constraint(Box::new(CustomConstraint::new(
            "frozen",
            "sequence must not change",
            move |s: &Sequence| s.data() == frozen.data(),
        )));
        let result = beam.optimize(
            &seed_sequence(),
            ObjectiveFactory::maximize_gc().as_ref(),
            Some(&constraints),
        );
        assert!(result.converged);
        assert_eq!(result.termination_reason, REASON_PATIENCE);
        assert_eq!(result.iterations, 3);
        // The carried beam is counted again each iteration
        assert_eq!(result.evaluations, 4);
        assert_eq!(result.best_sequence, seed_sequence());
    }

    #[test]
    fn test_select_sorts_descending_and_truncates() {
        let mut beam = BeamSearch::new(1);
        beam.set_algorithm_config(BeamSearchConfig {
            beam_width: 2,
            ..Default::default()
        })
        .unwrap();
        let selected = beam.select(vec![
            candidate("AAAA", 0.1),
            candidate("CCCC", 0.9),
            candidate("GGGG", 0.9),
            candidate("TTTT", 0.5),
        ]);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].sequence.data(), "CCCC");
        assert_eq!(selected[1].sequence.data(), "GGGG");
    }

    #[test]
    fn test_duplicate_and_diversity_filters() {
        let mut beam = BeamSearch::new(1);
        beam.set_algorithm_config(BeamSearchConfig {
            diversity_threshold: 0.5,
            ..Default::default()
        })
        .unwrap();
        let existing = vec![candidate("ACGTACGT", 1.0)];

        assert!(is_duplicate(&Sequence::from_dna("ACGTACGT", "x"), &existing));
        assert!(!is_duplicate(&Sequence::from_dna("ACGTACGA", "x"), &existing));

        // 7/8 similar
        assert!(!beam.is_diverse(&Sequence::from_dna("ACGTACGA", "x"), &existing));
        // 4/8 similar sits exactly on the 0.5 ceiling and is rejected
        assert!(!beam.is_diverse(&Sequence::from_dna("ACGTTGCA", "x"), &existing));
        // 3/8 similar
        assert!(beam.is_diverse(&Sequence::from_dna("ACGATGCA", "x"), &existing));
        // Lengths differ, never compared
        assert!(beam.is_diverse(&Sequence::from_dna("ACGTACG", "x"), &existing));
    }

    #[test]
    fn test_invalid_algorithm_config() {
        let mut beam = BeamSearch::new(1);
        for config in [
            BeamSearchConfig {
                beam_width: 0,
                ..Default::default()
            },
            BeamSearchConfig {
                expansion_factor: 0,
                ..Default::default()
            },
            BeamSearchConfig {
                diversity_threshold: 1.5,
                ..Default::default()
            },
        ] {
            assert!(beam.set_algorithm_config(config).is_err());
        }
    }
}
