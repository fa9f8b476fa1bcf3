use crate::constraints::ConstraintEngine;
use crate::mutation::MutationEngine;
use crate::objective::ObjectiveFunction;
use crate::optimization::{
    admissible, begin, enforced, finish, log_progress, record_snapshot, satisfies,
    should_terminate, OptimizationConfig, OptimizationError, OptimizationResult, Optimizer,
    Stagnation, REASON_PATIENCE,
};
use crate::sequence::Sequence;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Upper bound on compounding mutations used to seed the initial population
const MAX_SEED_MUTATIONS: usize = 5;
/// Attempts allowed per population slot when seeding and breeding
const ATTEMPTS_PER_SLOT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    #[default]
    Tournament,
    Roulette,
    Rank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverMethod {
    #[default]
    SinglePoint,
    TwoPoint,
    Uniform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticAlgorithmConfig {
    pub population_size: usize,
    /// Probability that each child receives one random mutation
    pub mutation_rate: f64,
    /// Probability that a parent pair is recombined rather than copied
    pub crossover_rate: f64,
    /// Fittest individuals copied unchanged into every generation
    pub elitism_count: usize,
    pub selection: SelectionMethod,
    pub tournament_size: usize,
    pub crossover: CrossoverMethod,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            mutation_rate: 0.1,
            crossover_rate: 0.7,
            elitism_count: 2,
            selection: SelectionMethod::Tournament,
            tournament_size: 3,
            crossover: CrossoverMethod::SinglePoint,
        }
    }
}

impl GeneticAlgorithmConfig {
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if self.population_size == 0 {
            return Err(OptimizationError::invalid("population_size", "must be at least 1"));
        }
        if self.elitism_count > self.population_size {
            return Err(OptimizationError::invalid(
                "elitism_count",
                format!("cannot exceed population_size ({})", self.population_size),
            ));
        }
        if self.tournament_size == 0 {
            return Err(OptimizationError::invalid("tournament_size", "must be at least 1"));
        }
        for (name, rate) in [
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(OptimizationError::invalid(name, format!("must be in [0, 1] (got {})", rate)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Individual {
    sequence: Sequence,
    fitness: f64,
}

fn sort_by_fitness(population: &mut [Individual]) {
    population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
}

/// Generational search with elitism, parent selection, crossover and mutation.
///
/// Selection, crossover and mutation all draw from the mutation engine's RNG, so one seed fixes
/// the whole run.
pub struct GeneticAlgorithm {
    config: OptimizationConfig,
    algo_config: GeneticAlgorithmConfig,
    engine: MutationEngine<'static>,
}

impl GeneticAlgorithm {
    pub fn new(seed: u64) -> Self {
        Self {
            config: OptimizationConfig::default(),
            algo_config: GeneticAlgorithmConfig::default(),
            engine: MutationEngine::new(seed),
        }
    }

    pub fn algorithm_config(&self) -> &GeneticAlgorithmConfig {
        &self.algo_config
    }

    pub fn set_algorithm_config(
        &mut self,
        config: GeneticAlgorithmConfig,
    ) -> Result<(), OptimizationError> {
        config.validate()?;
        self.algo_config = config;
        Ok(())
    }

    /// Seed plus constraint-satisfying mutants of it, sorted by fitness. May come up short of
    /// `population_size` when constraints reject most mutants.
    fn initialize_population(
        &mut self,
        seed: &Sequence,
        seed_fitness: f64,
        objective: &ObjectiveFunction,
        constraints: Option<&ConstraintEngine>,
    ) -> Vec<Individual> {
        let target = self.algo_config.population_size;
        let mut population = Vec::with_capacity(target);
        population.push(Individual {
            sequence: seed.clone(),
            fitness: seed_fitness,
        });

        let max_attempts = target * ATTEMPTS_PER_SLOT;
        let mut attempts = 0;
        while population.len() < target && attempts < max_attempts {
            attempts += 1;
            let count = self.engine.rng().below(MAX_SEED_MUTATIONS) + 1;
            let proposal = self.engine.apply_n_mutations(seed, count);
            if !admissible(&proposal, constraints) {
                continue;
            }
            let mutant = proposal.mutated_sequence;
            let fitness = objective(&mutant);
            population.push(Individual {
                sequence: mutant,
                fitness,
            });
        }

        if population.len() < target {
            warn!(
                "GeneticAlgorithm: seeded {} of {} individuals after {} attempts",
                population.len(),
                target,
                attempts
            );
        }
        sort_by_fitness(&mut population);
        population
    }

    fn next_generation(
        &mut self,
        population: &[Individual],
        objective: &ObjectiveFunction,
        constraints: Option<&ConstraintEngine>,
    ) -> Vec<Individual> {
        let target = self.algo_config.population_size;
        let mut next: Vec<Individual> = population
            .iter()
            .take(self.algo_config.elitism_count)
            .cloned()
            .collect();

        let max_rounds = target * ATTEMPTS_PER_SLOT;
        let mut rounds = 0;
        while next.len() < target && rounds < max_rounds {
            rounds += 1;
            let first = &population[self.select(population)].sequence;
            let second = &population[self.select(population)].sequence;

            let (child_a, child_b) = if self.engine.rng().random_double() < self.algo_config.crossover_rate {
                self.crossover(first, second)
            } else {
                (first.clone(), second.clone())
            };

            for child in [child_a, child_b] {
                if next.len() >= target {
                    break;
                }
                let Some(child) = self.mutate(child) else {
                    continue;
                };
                if !satisfies(&child, constraints) {
                    continue;
                }
                let fitness = objective(&child);
                next.push(Individual {
                    sequence: child,
                    fitness,
                });
            }
        }

        if next.is_empty() {
            debug!("GeneticAlgorithm: no viable offspring, keeping the previous generation");
            return population.to_vec();
        }
        sort_by_fitness(&mut next);
        next
    }

    /// Index of one parent, drawn by the configured selection method.
    fn select(&mut self, population: &[Individual]) -> usize {
        match self.algo_config.selection {
            SelectionMethod::Tournament => self.tournament_selection(population),
            SelectionMethod::Roulette => self.roulette_selection(population),
            SelectionMethod::Rank => self.rank_selection(population),
        }
    }

    /// Fittest of `tournament_size` uniform draws; earlier draws win ties.
    fn tournament_selection(&mut self, population: &[Individual]) -> usize {
        let rng = self.engine.rng();
        let mut best = rng.below(population.len());
        for _ in 1..self.algo_config.tournament_size {
            let challenger = rng.below(population.len());
            if population[challenger].fitness > population[best].fitness {
                best = challenger;
            }
        }
        best
    }

    /// Fitness-proportional draw with negative fitness counted as zero. Falls back to a uniform
    /// draw when no individual has positive fitness.
    fn roulette_selection(&mut self, population: &[Individual]) -> usize {
        let rng = self.engine.rng();
        let total: f64 = population.iter().map(|ind| ind.fitness.max(0.0)).sum();
        if total <= 0.0 || !total.is_finite() {
            return rng.below(population.len());
        }
        let spin = rng.random_double() * total;
        let mut cumulative = 0.0;
        for (i, ind) in population.iter().enumerate() {
            cumulative += ind.fitness.max(0.0);
            if cumulative >= spin {
                return i;
            }
        }
        population.len() - 1
    }

    /// Draw weighted by rank: the fittest of `n` individuals has weight `n`, the weakest `1`.
    /// Expects `population` sorted by descending fitness.
    fn rank_selection(&mut self, population: &[Individual]) -> usize {
        let n = population.len();
        let spin = self.engine.rng().below(n * (n + 1) / 2);
        let mut cumulative = 0;
        for i in 0..n {
            cumulative += n - i;
            if cumulative > spin {
                return i;
            }
        }
        n - 1
    }

    fn crossover(&mut self, first: &Sequence, second: &Sequence) -> (Sequence, Sequence) {
        match self.algo_config.crossover {
            CrossoverMethod::SinglePoint => self.single_point_crossover(first, second),
            CrossoverMethod::TwoPoint => self.two_point_crossover(first, second),
            CrossoverMethod::Uniform => self.uniform_crossover(first, second),
        }
    }

    /// Swaps tails at one cut point inside the shorter parent. Parents shorter than two symbols
    /// are returned as they are.
    fn single_point_crossover(&mut self, first: &Sequence, second: &Sequence) -> (Sequence, Sequence) {
        let shortest = first.len().min(second.len());
        if shortest < 2 {
            return (first.clone(), second.clone());
        }
        let cut = self.engine.rng().below(shortest - 1) + 1;
        let (a, b) = (first.as_bytes(), second.as_bytes());
        (
            child_of(first, [&a[..cut], &b[cut..]]),
            child_of(second, [&b[..cut], &a[cut..]]),
        )
    }

    /// Swaps the middle segment between two cut points; degrades to single-point below three
    /// symbols.
    fn two_point_crossover(&mut self, first: &Sequence, second: &Sequence) -> (Sequence, Sequence) {
        let shortest = first.len().min(second.len());
        if shortest < 3 {
            return self.single_point_crossover(first, second);
        }
        let rng = self.engine.rng();
        let left = rng.below(shortest - 2) + 1;
        let right = rng.below(shortest - left - 1) + left + 1;
        let (a, b) = (first.as_bytes(), second.as_bytes());
        (
            child_of(first, [&a[..left], &b[left..right], &a[right..]]),
            child_of(second, [&b[..left], &a[left..right], &b[right..]]),
        )
    }

    /// Per-position coin flip over the shared prefix; each child keeps its own parent's tail.
    fn uniform_crossover(&mut self, first: &Sequence, second: &Sequence) -> (Sequence, Sequence) {
        let shortest = first.len().min(second.len());
        let (a, b) = (first.as_bytes(), second.as_bytes());
        let mut left = Vec::with_capacity(a.len());
        let mut right = Vec::with_capacity(b.len());
        let rng = self.engine.rng();
        for (&x, &y) in a.iter().zip(b) {
            if rng.random_double() < 0.5 {
                left.push(x);
                right.push(y);
            } else {
                left.push(y);
                right.push(x);
            }
        }
        left.extend_from_slice(&a[shortest..]);
        right.extend_from_slice(&b[shortest..]);
        (child_of(first, [&left[..]]), child_of(second, [&right[..]]))
    }

    /// The child after its chance of one random mutation, or `None` when the engine rejected
    /// the edit.
    fn mutate(&mut self, seq: Sequence) -> Option<Sequence> {
        if self.engine.rng().random_double() < self.algo_config.mutation_rate {
            let proposal = self.engine.apply_random_mutation(&seq);
            proposal.constraint_satisfied.then_some(proposal.mutated_sequence)
        } else {
            Some(seq)
        }
    }
}

/// Joins `parts` into a sequence that keeps the parent's type and identity.
fn child_of<const N: usize>(parent: &Sequence, parts: [&[u8]; N]) -> Sequence {
    let data: Vec<u8> = parts.concat();
    parent.with_data(String::from_utf8_lossy(&data).into_owned())
}

impl Optimizer for GeneticAlgorithm {
    fn optimize(
        &mut self,
        initial: &Sequence,
        objective: &ObjectiveFunction,
        constraints: Option<&ConstraintEngine>,
    ) -> OptimizationResult {
        let name = self.name();
        let constraints = enforced(&self.config, constraints);
        let (mut result, seed_fitness) =
            match begin(name, &self.config, initial, objective, constraints) {
                Ok(start) => start,
                Err(rejected) => return rejected,
            };

        let mut population = self.initialize_population(initial, seed_fitness, objective, constraints);
        result.evaluations += population.len() - 1;
        if let Some(leader) = population.first() {
            result.update_best(&leader.sequence, leader.fitness);
        }
        // The initial snapshot covers the whole seeded population
        if let (Some(score), Some(evals)) = (
            result.score_history.last_mut(),
            result.evaluation_history.last_mut(),
        ) {
            *score = result.best_score;
            *evals = result.evaluations;
        }
        debug!("{}: initial population of {}", name, population.len());

        let mut stagnation = Stagnation::new(result.best_score);

        while !should_terminate(&self.config, &result) {
            result.iterations += 1;

            population = self.next_generation(&population, objective, constraints);
            result.evaluations += population.len();

            if let Some(leader) = population.first() {
                result.update_best(&leader.sequence, leader.fitness);
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
        "GeneticAlgorithm"
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
