pub mod alphabet;

use crate::sequence::alphabet::{Alphabet, CODON_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type Position = usize;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("Invalid sequence data for type {0}")]
    InvalidData(SequenceType),
    #[error("{operation} is only valid for DNA/RNA sequences, got {found}")]
    WrongType {
        operation: &'static str,
        found: SequenceType,
    },
    #[error("Reading frame must be 0, 1, or 2 (got {0})")]
    InvalidFrame(usize),
    #[error("Position {position} out of range for sequence of length {length}")]
    OutOfRange { position: usize, length: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SequenceType {
    #[default]
    Dna,
    Rna,
    Protein,
    Unknown,
}

impl SequenceType {
    pub fn is_nucleotide(self) -> bool {
        matches!(self, SequenceType::Dna | SequenceType::Rna)
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SequenceType::Dna => "DNA",
            SequenceType::Rna => "RNA",
            SequenceType::Protein => "PROTEIN",
            SequenceType::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// A typed biological sequence with its identifying metadata.
///
/// Sequences are values: every edit in this crate builds a new `Sequence` rather than mutating
/// one that a caller already holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sequence {
    data: String,
    seq_type: SequenceType,
    id: String,
    description: String,
}

impl Sequence {
    /// Creates a new `Sequence`. Data is upper-cased; validity is checked by [`Sequence::validate`].
    pub fn new(
        data: impl Into<String>,
        seq_type: SequenceType,
        id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into().to_ascii_uppercase(),
            seq_type,
            id: id.into(),
            description: description.into(),
        }
    }

    pub fn from_dna(data: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(data, SequenceType::Dna, id, "")
    }

    pub fn from_rna(data: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(data, SequenceType::Rna, id, "")
    }

    pub fn from_protein(data: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(data, SequenceType::Protein, id, "")
    }

    /// A new sequence with the same type and metadata but different data.
    pub fn with_data(&self, data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            seq_type: self.seq_type,
            id: self.id.clone(),
            description: self.description.clone(),
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn seq_type(&self) -> SequenceType {
        self.seq_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Symbol at `pos`, `None` past the end.
    pub fn at(&self, pos: Position) -> Option<u8> {
        self.data.as_bytes().get(pos).copied()
    }

    pub fn validate(&self, allow_ambiguous: bool) -> bool {
        Alphabet::is_valid_sequence(&self.data, self.seq_type, allow_ambiguous)
    }

    pub fn validate_or_err(&self, allow_ambiguous: bool) -> Result<(), SequenceError> {
        if self.validate(allow_ambiguous) {
            Ok(())
        } else {
            Err(SequenceError::InvalidData(self.seq_type))
        }
    }

    /// Fraction of G/C symbols, `0.0` for proteins and empty sequences.
    pub fn gc_content(&self) -> f64 {
        if !self.seq_type.is_nucleotide() || self.data.is_empty() {
            return 0.0;
        }
        let gc = self
            .data
            .bytes()
            .filter(|b| matches!(b, b'G' | b'C'))
            .count();
        gc as f64 / self.data.len() as f64
    }

    /// Number of (possibly overlapping) occurrences of `motif`.
    pub fn count_motif(&self, motif: &str) -> usize {
        if motif.is_empty() || motif.len() > self.data.len() {
            return 0;
        }
        self.data
            .as_bytes()
            .windows(motif.len())
            .filter(|w| *w == motif.as_bytes())
            .count()
    }

    pub fn contains_motif(&self, motif: &str) -> bool {
        self.count_motif(motif) > 0
    }

    /// Translates into a protein sequence starting at `frame`.
    ///
    /// # Errors
    /// * `WrongType` - If the sequence is not DNA/RNA
    /// * `InvalidFrame` - If `frame > 2`
    pub fn translate(&self, frame: usize, to_stop: bool) -> Result<Sequence, SequenceError> {
        if !self.seq_type.is_nucleotide() {
            return Err(SequenceError::WrongType {
                operation: "Translation",
                found: self.seq_type,
            });
        }
        if frame > 2 {
            return Err(SequenceError::InvalidFrame(frame));
        }

        let mut protein = String::with_capacity(self.data.len() / CODON_LENGTH);
        for codon in self.codons(frame) {
            let aa = Alphabet::translate_codon(codon);
            if to_stop && aa == alphabet::STOP_SYMBOL {
                break;
            }
            protein.push(aa);
        }
        Ok(Sequence::new(
            protein,
            SequenceType::Protein,
            format!("{}_protein", self.id),
            self.description.clone(),
        ))
    }

    /// Start offsets of open reading frames (start codon through stop or end) at least
    /// `min_length` symbols long, scanning all three forward frames.
    pub fn find_orfs(&self, min_length: usize) -> Result<Vec<Position>, SequenceError> {
        if !self.seq_type.is_nucleotide() {
            return Err(SequenceError::WrongType {
                operation: "ORF finding",
                found: self.seq_type,
            });
        }

        let mut starts = Vec::new();
        for frame in 0..CODON_LENGTH {
            let codons: Vec<(usize, &str)> = self
                .codons(frame)
                .enumerate()
                .map(|(i, c)| (frame + i * CODON_LENGTH, c))
                .collect();
            for (idx, (start, codon)) in codons.iter().enumerate() {
                if Alphabet::translate_codon(codon) != 'M' {
                    continue;
                }
                let mut orf_length = 0;
                for (_, next) in &codons[idx..] {
                    orf_length += CODON_LENGTH;
                    if Alphabet::is_stop_codon(next) {
                        break;
                    }
                }
                if orf_length >= min_length {
                    starts.push(*start);
                }
            }
        }
        Ok(starts)
    }

    /// Iterates over complete codons of the given frame.
    pub fn codons(&self, frame: usize) -> impl Iterator<Item = &str> {
        let data = self.data.get(frame.min(self.data.len())..).unwrap_or("");
        data.as_bytes()
            .chunks_exact(CODON_LENGTH)
            .filter_map(|c| std::str::from_utf8(c).ok())
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {} bp]: {}",
            if self.id.is_empty() { "<unnamed>" } else { &self.id },
            self.seq_type,
            self.data.len(),
            self.data
        )
    }
}
