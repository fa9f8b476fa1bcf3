use crate::constraints::{Constraint, ConstraintResult};
use crate::sequence::alphabet::STOP_SYMBOL;
use crate::sequence::Sequence;

/// GC fraction must lie within `[min_gc, max_gc]`.
#[derive(Debug, Clone)]
pub struct GcContentConstraint {
    min_gc: f64,
    max_gc: f64,
}

impl GcContentConstraint {
    pub fn new(min_gc: f64, max_gc: f64) -> Self {
        Self { min_gc, max_gc }
    }
}

impl Constraint for GcContentConstraint {
    fn evaluate(&self, seq: &Sequence) -> ConstraintResult {
        let gc = seq.gc_content();
        let satisfied = gc >= self.min_gc && gc <= self.max_gc;
        let message = if satisfied {
            String::new()
        } else {
            format!(
                "GC content {:.3} outside [{:.3}, {:.3}]",
                gc, self.min_gc, self.max_gc
            )
        };
        ConstraintResult::new(self.name(), satisfied, gc, message)
    }

    fn name(&self) -> &str {
        "gc_content_range"
    }

    fn description(&self) -> String {
        format!(
            "GC content must be between {:.1}% and {:.1}%",
            self.min_gc * 100.0,
            self.max_gc * 100.0
        )
    }
}

/// Length must lie within `[min_length, max_length]`.
#[derive(Debug, Clone)]
pub struct LengthConstraint {
    min_length: usize,
    max_length: usize,
}

impl LengthConstraint {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
        }
    }

    pub fn at_least(min_length: usize) -> Self {
        Self::new(min_length, usize::MAX)
    }
}

impl Constraint for LengthConstraint {
    fn evaluate(&self, seq: &Sequence) -> ConstraintResult {
        let len = seq.len();
        let satisfied = len >= self.min_length && len <= self.max_length;
        let message = if satisfied {
            String::new()
        } else if len < self.min_length {
            format!("Length {} below minimum {}", len, self.min_length)
        } else {
            format!("Length {} above maximum {}", len, self.max_length)
        };
        ConstraintResult::new(self.name(), satisfied, len as f64, message)
    }

    fn name(&self) -> &str {
        "length_constraint"
    }

    fn description(&self) -> String {
        if self.max_length == usize::MAX {
            format!("Length must be at least {}", self.min_length)
        } else {
            format!(
                "Length must be between {} and {}",
                self.min_length, self.max_length
            )
        }
    }
}

/// None of the listed motifs may occur.
#[derive(Debug, Clone, Default)]
pub struct ForbiddenMotifConstraint {
    motifs: Vec<String>,
}

impl ForbiddenMotifConstraint {
    pub fn new(motifs: Vec<String>) -> Self {
        Self {
            motifs: motifs.into_iter().map(|m| m.to_ascii_uppercase()).collect(),
        }
    }
}

impl Constraint for ForbiddenMotifConstraint {
    fn evaluate(&self, seq: &Sequence) -> ConstraintResult {
        for motif in &self.motifs {
            let count = seq.count_motif(motif);
            if count > 0 {
                return ConstraintResult::new(
                    self.name(),
                    false,
                    count as f64,
                    format!("Forbidden motif {} found {} time(s)", motif, count),
                );
            }
        }
        ConstraintResult::new(self.name(), true, 0.0, String::new())
    }

    fn name(&self) -> &str {
        "forbidden_motif"
    }

    fn description(&self) -> String {
        format!("Sequence must not contain: {}", self.motifs.join(", "))
    }
}

/// Every listed motif must occur at least once.
#[derive(Debug, Clone, Default)]
pub struct RequiredMotifConstraint {
    motifs: Vec<String>,
}

impl RequiredMotifConstraint {
    pub fn new(motifs: Vec<String>) -> Self {
        Self {
            motifs: motifs.into_iter().map(|m| m.to_ascii_uppercase()).collect(),
        }
    }
}

impl Constraint for RequiredMotifConstraint {
    fn evaluate(&self, seq: &Sequence) -> ConstraintResult {
        if let Some(missing) = self.motifs.iter().find(|m| !seq.contains_motif(m)) {
            return ConstraintResult::new(
                self.name(),
                false,
                0.0,
                format!("Required motif {} not found", missing),
            );
        }
        ConstraintResult::new(self.name(), true, 1.0, String::new())
    }

    fn name(&self) -> &str {
        "required_motif"
    }

    fn description(&self) -> String {
        format!("Sequence must contain: {}", self.motifs.join(", "))
    }
}

/// Runs of one repeated symbol may not exceed `max_length`.
#[derive(Debug, Clone)]
pub struct HomopolymerConstraint {
    max_length: usize,
}

impl HomopolymerConstraint {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

/// Length of the longest run of one repeated symbol.
pub fn longest_run(data: &[u8]) -> usize {
    data.chunk_by(|a, b| a == b)
        .map(|run| run.len())
        .max()
        .unwrap_or(0)
}

impl Constraint for HomopolymerConstraint {
    fn evaluate(&self, seq: &Sequence) -> ConstraintResult {
        let max_run = longest_run(seq.as_bytes());
        let satisfied = max_run <= self.max_length;
        let message = if satisfied {
            String::new()
        } else {
            format!(
                "Homopolymer run of length {} exceeds limit {}",
                max_run, self.max_length
            )
        };
        ConstraintResult::new(self.name(), satisfied, max_run as f64, message)
    }

    fn name(&self) -> &str {
        "homopolymer_limit"
    }

    fn description(&self) -> String {
        format!(
            "Homopolymer runs must not exceed {} bases",
            self.max_length
        )
    }
}

/// At least one open reading frame of `min_length` symbols must exist.
#[derive(Debug, Clone)]
pub struct ValidOrfConstraint {
    min_length: usize,
}

impl ValidOrfConstraint {
    pub const DEFAULT_MIN_LENGTH: usize = 100;

    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl Default for ValidOrfConstraint {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_LENGTH)
    }
}

impl Constraint for ValidOrfConstraint {
    fn evaluate(&self, seq: &Sequence) -> ConstraintResult {
        match seq.find_orfs(self.min_length) {
            Ok(orfs) if !orfs.is_empty() => {
                ConstraintResult::new(self.name(), true, orfs.len() as f64, String::new())
            }
            Ok(_) => ConstraintResult::new(
                self.name(),
                false,
                0.0,
                format!("No valid ORF of minimum length {} found", self.min_length),
            ),
            Err(e) => ConstraintResult::new(self.name(), false, 0.0, format!("Error: {}", e)),
        }
    }

    fn name(&self) -> &str {
        "valid_orf"
    }

    fn description(&self) -> String {
        format!(
            "Sequence must contain a valid ORF of at least {} bases",
            self.min_length
        )
    }
}

/// Frame-0 translation may only carry a stop in its last position.
#[derive(Debug, Clone, Default)]
pub struct NoPrematureStopConstraint;

/// Number of stop symbols in a protein string, ignoring the final residue.
pub fn premature_stop_count(protein: &str) -> usize {
    let body = match protein.len() {
        0 => "",
        n => &protein[..n - 1],
    };
    body.chars().filter(|&c| c == STOP_SYMBOL).count()
}

impl Constraint for NoPrematureStopConstraint {
    fn evaluate(&self, seq: &Sequence) -> ConstraintResult {
        if !seq.seq_type().is_nucleotide() {
            return ConstraintResult::new(
                self.name(),
                true,
                0.0,
                "Not applicable to protein sequences".to_string(),
            );
        }
        match seq.translate(0, false) {
            Ok(protein) => {
                let stops = premature_stop_count(protein.data());
                let message = if stops == 0 {
                    String::new()
                } else {
                    format!("Found {} premature stop codon(s)", stops)
                };
                ConstraintResult::new(self.name(), stops == 0, stops as f64, message)
            }
            Err(e) => ConstraintResult::new(
                self.name(),
                false,
                0.0,
                format!("Translation error: {}", e),
            ),
        }
    }

    fn name(&self) -> &str {
        "no_premature_stops"
    }

    fn description(&self) -> String {
        "Sequence must not contain premature stop codons".to_string()
    }
}

/// Caller-supplied predicate.
pub struct CustomConstraint {
    name: String,
    description: String,
    predicate: Box<dyn Fn(&Sequence) -> bool>,
}

impl CustomConstraint {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        predicate: impl Fn(&Sequence) -> bool + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }
}

impl Constraint for CustomConstraint {
    fn evaluate(&self, seq: &Sequence) -> ConstraintResult {
        let satisfied = (self.predicate)(seq);
        ConstraintResult::new(
            &self.name,
            satisfied,
            if satisfied { 1.0 } else { 0.0 },
            String::new(),
        )
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gc_range() {
        let c = GcContentConstraint::new(0.4, 0.6);
        assert!(c.evaluate(&Sequence::from_dna("ATGC", "a")).satisfied);
        let result = c.evaluate(&Sequence::from_dna("GGGG", "a"));
        assert!(!result.satisfied);
        assert_eq!(result.actual_value, 1.0);
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run(b""), 0);
        assert_eq!(longest_run(b"ACGT"), 1);
        assert_eq!(longest_run(b"ACCCCGTT"), 4);
        let c = HomopolymerConstraint::new(3);
        assert!(!c.evaluate(&Sequence::from_dna("ACCCCG", "h")).satisfied);
        assert!(c.evaluate(&Sequence::from_dna("ACCCG", "h")).satisfied);
    }

    #[test]
    fn test_motifs() {
        let seq = Sequence::from_dna("ATGGAATTCTAA", "m");
        let forbidden = ForbiddenMotifConstraint::new(vec!["gaattc".to_string()]);
        assert!(!forbidden.evaluate(&seq).satisfied);
        let required = RequiredMotifConstraint::new(vec!["ATG".to_string(), "TAA".to_string()]);
        assert!(required.evaluate(&seq).satisfied);
        let missing = RequiredMotifConstraint::new(vec!["CCC".to_string()]);
        assert!(!missing.evaluate(&seq).satisfied);
    }

    #[test]
    fn test_premature_stops() {
        assert_eq!(premature_stop_count(""), 0);
        assert_eq!(premature_stop_count("MA*"), 0);
        assert_eq!(premature_stop_count("M*A*"), 1);
        let c = NoPrematureStopConstraint;
        assert!(c.evaluate(&Sequence::from_dna("ATGGCCTAA", "s")).satisfied);
        assert!(!c.evaluate(&Sequence::from_dna("ATGTAAGCC", "s")).satisfied);
        assert!(c.evaluate(&Sequence::from_protein("M*A", "p")).satisfied);
    }

    #[test]
    fn test_custom() {
        let c = CustomConstraint::new("even", "even length", |s: &Sequence| s.len() % 2 == 0);
        assert!(c.evaluate(&Sequence::from_dna("AC", "c")).satisfied);
        assert!(!c.evaluate(&Sequence::from_dna("ACG", "c")).satisfied);
        assert_eq!(c.name(), "even");
    }
}
