pub mod distance;
pub mod engine;

pub use distance::{
    calculate_mutation_rate, edit_distance, find_mutations, generate_all_neighbors,
    hamming_distance,
};
pub use engine::{apply_mutation, MutationEngine};

use crate::sequence::{Position, Sequence};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Tolerance on the rate sum, so configs written as decimals that add to 1.0 still validate
const RATE_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Mutation rates sum to {0}, which is more than 1.0")]
    RatesExceedOne(f64),
    #[error("Mutation rate '{name}' must be non-negative (got {value})")]
    NegativeRate { name: &'static str, value: f64 },
    #[error("Cannot maintain length with insertions, deletions or duplications enabled")]
    LengthChangingMutations,
    #[error("Maximum size '{0}' must be at least 1")]
    ZeroMaxLength(&'static str),
    #[error("Maximum size '{name}' ({value}) cannot hold a whole codon while maintaining the reading frame")]
    FrameIncompatibleLength { name: &'static str, value: usize },
    #[error("Sequences must have equal length for Hamming distance ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
    #[error("Mutation at {position} (length {length}) does not fit a sequence of length {sequence_length}")]
    OutOfRange {
        position: usize,
        length: usize,
        sequence_length: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationType {
    Substitution,
    Insertion,
    Deletion,
    Inversion,
    Duplication,
    Translocation,
}

/// One recorded edit. `position` is an offset into the sequence before the edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub mutation_type: MutationType,
    pub position: Position,
    /// Content removed or overwritten
    pub original: String,
    /// Content written (inserted bases, the reversed segment, the duplicated copy...)
    pub mutated: String,
    /// Size of the affected region
    pub length: usize,
    /// Reinsertion offset of a translocated segment, counted after excision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Position>,
}

impl Mutation {
    pub fn new(
        mutation_type: MutationType,
        position: Position,
        original: impl Into<String>,
        mutated: impl Into<String>,
        length: usize,
    ) -> Self {
        Self {
            mutation_type,
            position,
            original: original.into(),
            mutated: mutated.into(),
            length,
            destination: None,
        }
    }

    pub(crate) fn substitution(position: Position, old: u8, new: u8) -> Self {
        Self::new(
            MutationType::Substitution,
            position,
            (old as char).to_string(),
            (new as char).to_string(),
            1,
        )
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.position;
        match self.mutation_type {
            MutationType::Substitution => write!(f, "SUB@{}: {} -> {}", p, self.original, self.mutated),
            MutationType::Insertion => {
                write!(f, "INS@{}: +{} (length={})", p, self.mutated, self.length)
            }
            MutationType::Deletion => {
                write!(f, "DEL@{}: -{} (length={})", p, self.original, self.length)
            }
            MutationType::Inversion => write!(
                f,
                "INV@{}: {} <-> {} (length={})",
                p, self.original, self.mutated, self.length
            ),
            MutationType::Duplication => {
                write!(f, "DUP@{}: {} (length={})", p, self.original, self.length)
            }
            MutationType::Translocation => match self.destination {
                Some(dest) => write!(f, "TRA@{}: {} => {} (length={})", p, self.original, dest, self.length),
                None => write!(f, "TRA@{}: (length={})", p, self.length),
            },
        }
    }
}

/// Probabilities and size limits that drive random mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    pub substitution_rate: f64,
    pub insertion_rate: f64,
    pub deletion_rate: f64,
    pub inversion_rate: f64,
    pub duplication_rate: f64,
    pub translocation_rate: f64,

    pub max_insertion_length: usize,
    pub max_deletion_length: usize,
    pub max_inversion_length: usize,
    pub max_duplication_length: usize,
    pub max_translocation_length: usize,

    /// Forbids every length-changing mutation type
    pub maintain_length: bool,
    /// Forces edit sizes to whole codons
    pub maintain_reading_frame: bool,
    /// Keeps random mutation sites out of the first codon
    pub avoid_start_codon: bool,
    /// Flags results that introduce a new in-frame stop as constraint failures
    pub avoid_stop_codons: bool,
    pub codon_aware: bool,
    /// With `codon_aware`, restricts substitutions to synonymous codons
    pub synonymous_only: bool,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            substitution_rate: 0.7,
            insertion_rate: 0.15,
            deletion_rate: 0.15,
            inversion_rate: 0.0,
            duplication_rate: 0.0,
            translocation_rate: 0.0,
            max_insertion_length: 5,
            max_deletion_length: 5,
            max_inversion_length: 10,
            max_duplication_length: 10,
            max_translocation_length: 10,
            maintain_length: false,
            maintain_reading_frame: false,
            avoid_start_codon: true,
            avoid_stop_codons: false,
            codon_aware: false,
            synonymous_only: false,
        }
    }
}

impl MutationConfig {
    /// Rates in selection order, each paired with the type it selects.
    pub(crate) fn rates(&self) -> [(MutationType, f64); 6] {
        [
            (MutationType::Substitution, self.substitution_rate),
            (MutationType::Insertion, self.insertion_rate),
            (MutationType::Deletion, self.deletion_rate),
            (MutationType::Inversion, self.inversion_rate),
            (MutationType::Duplication, self.duplication_rate),
            (MutationType::Translocation, self.translocation_rate),
        ]
    }

    /// Checks that the config can drive a `MutationEngine`.
    ///
    /// # Returns
    /// * `Result<(), MutationError>` - The first problem found, if any
    pub fn validate(&self) -> Result<(), MutationError> {
        let names = [
            "substitution_rate",
            "insertion_rate",
            "deletion_rate",
            "inversion_rate",
            "duplication_rate",
            "translocation_rate",
        ];
        for (name, (_, value)) in names.into_iter().zip(self.rates()) {
            if value.is_nan() || value < 0.0 {
                return Err(MutationError::NegativeRate { name, value });
            }
        }

        let total: f64 = self.rates().iter().map(|(_, rate)| rate).sum();
        if total > 1.0 + RATE_SUM_TOLERANCE {
            return Err(MutationError::RatesExceedOne(total));
        }

        if self.maintain_length
            && (self.insertion_rate > 0.0
                || self.deletion_rate > 0.0
                || self.duplication_rate > 0.0)
        {
            return Err(MutationError::LengthChangingMutations);
        }

        let sizes = [
            ("max_insertion_length", self.max_insertion_length, self.insertion_rate),
            ("max_deletion_length", self.max_deletion_length, self.deletion_rate),
            ("max_inversion_length", self.max_inversion_length, self.inversion_rate),
            ("max_duplication_length", self.max_duplication_length, self.duplication_rate),
            ("max_translocation_length", self.max_translocation_length, self.translocation_rate),
        ];
        for (name, value, rate) in sizes {
            if value == 0 {
                return Err(MutationError::ZeroMaxLength(name));
            }
            let frame_bound = matches!(name, "max_insertion_length" | "max_deletion_length");
            if self.maintain_reading_frame && frame_bound && rate > 0.0 && value < 3 {
                return Err(MutationError::FrameIncompatibleLength { name, value });
            }
        }
        Ok(())
    }
}

/// Outcome of one mutation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationResult {
    pub mutated_sequence: Sequence,
    /// Applied edits in application order
    pub mutations: Vec<Mutation>,
    pub constraint_satisfied: bool,
    pub failure_reason: Option<String>,
}

impl MutationResult {
    pub fn new(mutated_sequence: Sequence, mutations: Vec<Mutation>, constraint_satisfied: bool) -> Self {
        Self {
            mutated_sequence,
            mutations,
            constraint_satisfied,
            failure_reason: None,
        }
    }

    /// The untouched input with no edits and a reason.
    pub fn failed(original: &Sequence, reason: impl Into<String>) -> Self {
        Self {
            mutated_sequence: original.clone(),
            mutations: Vec::new(),
            constraint_satisfied: false,
            failure_reason: Some(reason.into()),
        }
    }
}
