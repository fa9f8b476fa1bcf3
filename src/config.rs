use crate::constraints::{ConstraintEngine, ConstraintError};
use crate::mutation::{MutationConfig, MutationError};
use crate::objective::{ObjectiveError, ObjectiveFactory, ObjectiveFunction, ObjectiveKind};
use crate::optimization::{
    BeamSearch, BeamSearchConfig, GeneticAlgorithm, GeneticAlgorithmConfig, HillClimbing,
    HillClimbingConfig, OptimizationConfig, OptimizationError, Optimizer, OptimizerKind,
    SimulatedAnnealing, SimulatedAnnealingConfig,
};
use crate::sequence::{Sequence, SequenceError, SequenceType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid sequence: {0}")]
    Sequence(#[from] SequenceError),
    #[error("Invalid constraint: {0}")]
    Constraint(#[from] ConstraintError),
    #[error("Invalid objective: {0}")]
    Objective(#[from] ObjectiveError),
    #[error("Invalid mutation settings: {0}")]
    Mutation(#[from] MutationError),
    #[error("Invalid optimizer settings: {0}")]
    Optimization(#[from] OptimizationError),
}

/// Starting sequence of a run.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SequenceConfig {
    pub data: String,
    #[serde(default)]
    pub seq_type: SequenceType,
    #[serde(default = "default_sequence_id")]
    pub id: String,
}

fn default_sequence_id() -> String {
    "seed".to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ObjectiveConfig {
    pub kind: ObjectiveKind,
    /// Target GC fraction for `target_gc`, ignored otherwise
    pub parameter: f64,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            kind: ObjectiveKind::MaximizeGc,
            parameter: 0.5,
        }
    }
}

fn default_seed() -> u64 {
    42
}

/// Everything one optimization run needs, read from a TOML file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub sequence: SequenceConfig,
    #[serde(default)]
    pub optimizer: OptimizerKind,
    #[serde(default)]
    pub objective: ObjectiveConfig,
    /// Constraint strings such as `gc=0.4-0.6` or `avoid:GAATTC`
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub mutation: MutationConfig,
    #[serde(default)]
    pub optimization: OptimizationConfig,
    #[serde(default)]
    pub hill_climbing: HillClimbingConfig,
    #[serde(default)]
    pub annealing: SimulatedAnnealingConfig,
    #[serde(default)]
    pub beam: BeamSearchConfig,
    #[serde(default)]
    pub genetic: GeneticAlgorithmConfig,
    /// Where to write the JSON run export, if anywhere
    #[serde(default)]
    pub export_path: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Checks every section, including the ones the selected optimizer will not read.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build_sequence()?;
        self.build_constraints()?;
        self.build_objective()?;
        self.mutation.validate()?;
        self.optimization.validate()?;
        self.hill_climbing.validate()?;
        self.annealing.validate()?;
        self.beam.validate()?;
        self.genetic.validate()?;
        Ok(())
    }

    /// The starting sequence, rejected when it holds symbols outside its alphabet.
    pub fn build_sequence(&self) -> Result<Sequence, ConfigError> {
        let seq = Sequence::new(
            self.sequence.data.trim(),
            self.sequence.seq_type,
            self.sequence.id.as_str(),
            "",
        );
        seq.validate_or_err(false)?;
        Ok(seq)
    }

    pub fn build_constraints(&self) -> Result<ConstraintEngine, ConfigError> {
        let mut engine = ConstraintEngine::new();
        for constraint in &self.constraints {
            engine.add_constraint_from_string(constraint)?;
        }
        Ok(engine)
    }

    pub fn build_objective(&self) -> Result<Box<ObjectiveFunction>, ConfigError> {
        Ok(ObjectiveFactory::create(self.objective.kind, self.objective.parameter)?)
    }

    /// The selected optimizer, seeded and carrying every configured section that applies to it.
    pub fn build_optimizer(&self) -> Result<Box<dyn Optimizer>, ConfigError> {
        let mut optimizer: Box<dyn Optimizer> = match self.optimizer {
            OptimizerKind::HillClimbing => {
                let mut hc = HillClimbing::new(self.seed);
                hc.set_algorithm_config(self.hill_climbing.clone())?;
                Box::new(hc)
            }
            OptimizerKind::SimulatedAnnealing => {
                let mut sa = SimulatedAnnealing::new(self.seed);
                sa.set_algorithm_config(self.annealing.clone())?;
                Box::new(sa)
            }
            OptimizerKind::BeamSearch => {
                let mut beam = BeamSearch::new(self.seed);
                beam.set_algorithm_config(self.beam.clone())?;
                Box::new(beam)
            }
            OptimizerKind::GeneticAlgorithm => {
                let mut ga = GeneticAlgorithm::new(self.seed);
                ga.set_algorithm_config(self.genetic.clone())?;
                Box::new(ga)
            }
        };
        optimizer.set_config(self.optimization.clone())?;
        optimizer
            .mutation_engine_mut()
            .set_config(self.mutation.clone())?;
        Ok(optimizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn get_test_config() -> &'static str {
        r#"
seed = 7
optimizer = "simulated_annealing"
constraints = ["gc=0.0-0.8", "avoid:GAATTC"]

[sequence]
data = "atgaaatttaaatttaaatttaaa"
id = "demo"

[objective]
kind = "target_gc"
parameter = 0.5

[optimization]
max_iterations = 50
patience = 20

[annealing]
cooling_schedule = "logarithmic"
initial_temperature = 10.0

[mutation]
substitution_rate = 1.0
insertion_rate = 0.0
deletion_rate = 0.0
"#
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(get_test_config());
        let config = Config::load(file.path()).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.seed, 7);
        assert_eq!(config.optimizer, OptimizerKind::SimulatedAnnealing);
        assert_eq!(config.sequence.seq_type, SequenceType::Dna);
        assert_eq!(config.objective.kind, ObjectiveKind::TargetGc);
        assert_eq!(config.optimization.max_iterations, 50);
        // Unset fields keep their defaults
        assert_eq!(config.optimization.max_evaluations, 10000);
        assert_eq!(config.annealing.final_temperature, 0.01);
        assert_eq!(config.beam, BeamSearchConfig::default());
        assert!(config.export_path.is_none());

        let seq = config.build_sequence().unwrap();
        assert_eq!(seq.data(), "ATGAAATTTAAATTTAAATTTAAA");
        assert_eq!(seq.id(), "demo");
        assert_eq!(config.build_constraints().unwrap().len(), 2);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write_config("[sequence]\ndata = \"ACGT\"\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.optimizer, OptimizerKind::HillClimbing);
        assert_eq!(config.sequence.id, "seed");
        assert!(config.constraints.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_optimizer_applies_sections() {
        let file = write_config(get_test_config());
        let config = Config::load(file.path()).unwrap();
        let mut optimizer = config.build_optimizer().unwrap();
        assert_eq!(optimizer.name(), "SimulatedAnnealing");
        assert_eq!(optimizer.config().max_iterations, 50);
        assert_eq!(optimizer.mutation_engine_mut().config().substitution_rate, 1.0);

        let seq = config.build_sequence().unwrap();
        let constraints = config.build_constraints().unwrap();
        let objective = config.build_objective().unwrap();
        let result = optimizer.optimize(&seq, objective.as_ref(), Some(&constraints));
        assert!(result.iterations <= 50);
        assert!(constraints.satisfies_all(&result.best_sequence));
        assert_eq!(result.best_sequence.len(), seq.len());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let cases = [
            // Missing sequence section
            "seed = 1\n",
            "[sequence]\ndata = \"ACGX\"\n",
            "constraints = [\"gc=wrong\"]\n[sequence]\ndata = \"ACGT\"\n",
            "[sequence]\ndata = \"ACGT\"\n[objective]\nkind = \"target_gc\"\nparameter = 2.0\n",
            "[sequence]\ndata = \"ACGT\"\n[mutation]\nsubstitution_rate = 0.9\ninsertion_rate = 0.9\n",
            "[sequence]\ndata = \"ACGT\"\n[optimization]\nmax_iterations = 0\nmax_evaluations = 0\n",
            "[sequence]\ndata = \"ACGT\"\n[genetic]\npopulation_size = 0\n",
        ];
        for content in cases {
            let file = write_config(content);
            let rejected = Config::load(file.path()).and_then(|c| c.validate());
            assert!(rejected.is_err(), "accepted: {}", content);
        }
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/helixopt.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
