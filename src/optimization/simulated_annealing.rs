use crate::constraints::ConstraintEngine;
use crate::mutation::MutationEngine;
use crate::objective::ObjectiveFunction;
use crate::optimization::{
    admissible, begin, enforced, finish, log_progress, record_snapshot, should_terminate,
    OptimizationConfig, OptimizationError, OptimizationResult, Optimizer, Stagnation,
    REASON_PATIENCE, REASON_TEMPERATURE,
};
use crate::sequence::Sequence;
use log::debug;
use serde::{Deserialize, Serialize};

/// Decay factor of the adaptive schedule
const ADAPTIVE_DECAY: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoolingSchedule {
    Linear,
    #[default]
    Exponential,
    Logarithmic,
    Adaptive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedAnnealingConfig {
    pub initial_temperature: f64,
    pub final_temperature: f64,
    pub cooling_schedule: CoolingSchedule,
    /// Per-iteration factor of the exponential schedule
    pub cooling_rate: f64,
}

impl Default for SimulatedAnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 100.0,
            final_temperature: 0.01,
            cooling_schedule: CoolingSchedule::Exponential,
            cooling_rate: 0.95,
        }
    }
}

impl SimulatedAnnealingConfig {
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if self.final_temperature.is_nan() || self.final_temperature <= 0.0 {
            return Err(OptimizationError::invalid("final_temperature", "must be positive"));
        }
        if self.initial_temperature.is_nan() || self.initial_temperature < self.final_temperature {
            return Err(OptimizationError::invalid(
                "initial_temperature",
                "must be at least final_temperature",
            ));
        }
        if self.cooling_rate.is_nan() || self.cooling_rate <= 0.0 || self.cooling_rate >= 1.0 {
            return Err(OptimizationError::invalid("cooling_rate", "must be in (0, 1)"));
        }
        Ok(())
    }
}

/// Single-neighbor Metropolis search over a cooling schedule.
pub struct SimulatedAnnealing {
    config: OptimizationConfig,
    algo_config: SimulatedAnnealingConfig,
    engine: MutationEngine<'static>,
}

impl SimulatedAnnealing {
    pub fn new(seed: u64) -> Self {
        Self {
            config: OptimizationConfig::default(),
            algo_config: SimulatedAnnealingConfig::default(),
            engine: MutationEngine::new(seed),
        }
    }

    pub fn algorithm_config(&self) -> &SimulatedAnnealingConfig {
        &self.algo_config
    }

    pub fn set_algorithm_config(
        &mut self,
        config: SimulatedAnnealingConfig,
    ) -> Result<(), OptimizationError> {
        config.validate()?;
        self.algo_config = config;
        Ok(())
    }

    /// Temperature at `iteration`, never below `final_temperature`.
    pub fn temperature(&self, iteration: usize) -> f64 {
        self.raw_temperature(iteration)
            .max(self.algo_config.final_temperature)
    }

    /// Schedule value before flooring; dropping under the final temperature ends the run.
    fn raw_temperature(&self, iteration: usize) -> f64 {
        let t0 = self.algo_config.initial_temperature;
        let tf = self.algo_config.final_temperature;
        let k = iteration as f64;
        match self.algo_config.cooling_schedule {
            CoolingSchedule::Linear => {
                let horizon = if self.config.max_iterations > 0 {
                    self.config.max_iterations
                } else {
                    self.config.max_evaluations
                };
                let horizon = horizon.max(1);
                if iteration == horizon {
                    // Exact endpoint; the interpolated value can round just under it
                    tf
                } else {
                    t0 + (tf - t0) / horizon as f64 * k
                }
            }
            CoolingSchedule::Exponential => t0 * self.algo_config.cooling_rate.powf(k),
            CoolingSchedule::Logarithmic => t0 / (k + 2.0).ln(),
            CoolingSchedule::Adaptive => t0 * ADAPTIVE_DECAY.powf(k),
        }
    }

    /// Metropolis criterion for maximization.
    fn accept(&mut self, current_score: f64, neighbor_score: f64, temperature: f64) -> bool {
        if neighbor_score > current_score {
            return true;
        }
        let probability = ((neighbor_score - current_score) / temperature).exp();
        self.engine.rng().random_double() < probability
    }
}

impl Optimizer for SimulatedAnnealing {
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
        let mut stagnation = Stagnation::new(result.best_score);

        while !should_terminate(&self.config, &result) {
            let iteration = result.iterations + 1;
            let temperature = self.raw_temperature(iteration);
            if temperature < self.algo_config.final_temperature {
                result.converged = true;
                result.termination_reason = REASON_TEMPERATURE.to_string();
                break;
            }
            result.iterations = iteration;

            let proposal = self.engine.apply_random_mutation(&current);
            if admissible(&proposal, constraints) {
                let neighbor = proposal.mutated_sequence;
                let neighbor_score = objective(&neighbor);
                result.evaluations += 1;
                if self.accept(current_score, neighbor_score, temperature) {
                    current = neighbor;
                    current_score = neighbor_score;
                    result.update_best(&current, current_score);
                }
                stagnation.observe(result.best_score, self.config.min_improvement);
            } else {
                debug!(
                    "SimulatedAnnealing: iteration {} skipped, neighbor violates constraints",
                    iteration
                );
            }

            record_snapshot(&self.config, &mut result);

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
        "SimulatedAnnealing"
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
