pub mod builtin;

use crate::constraints::builtin::{
    ForbiddenMotifConstraint, GcContentConstraint, HomopolymerConstraint, LengthConstraint,
    NoPrematureStopConstraint, RequiredMotifConstraint, ValidOrfConstraint,
};
use crate::sequence::Sequence;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("Unable to parse constraint: '{0}'")]
    ParseError(String),
    #[error("Invalid bounds in constraint '{0}': min must be <= max")]
    InvalidBounds(String),
}

/// Outcome of one constraint on one sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintResult {
    pub constraint_name: String,
    pub satisfied: bool,
    /// Measured quantity the constraint judged (GC fraction, length, run length...)
    pub actual_value: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ConstraintResult {
    pub fn new(name: &str, satisfied: bool, actual_value: f64, message: String) -> Self {
        Self {
            constraint_name: name.to_string(),
            satisfied,
            actual_value,
            message,
        }
    }
}

/// A named predicate over sequences.
pub trait Constraint {
    fn evaluate(&self, seq: &Sequence) -> ConstraintResult;
    fn name(&self) -> &str;
    fn description(&self) -> String;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintReport {
    results: Vec<ConstraintResult>,
}

impl ConstraintReport {
    pub fn add_result(&mut self, result: ConstraintResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[ConstraintResult] {
        &self.results
    }

    pub fn all_satisfied(&self) -> bool {
        self.results.iter().all(|r| r.satisfied)
    }

    pub fn violations(&self) -> Vec<&ConstraintResult> {
        self.results.iter().filter(|r| !r.satisfied).collect()
    }

    pub fn total_constraints(&self) -> usize {
        self.results.len()
    }

    pub fn satisfied_count(&self) -> usize {
        self.results.iter().filter(|r| r.satisfied).count()
    }

    pub fn violated_count(&self) -> usize {
        self.total_constraints() - self.satisfied_count()
    }
}

impl fmt::Display for ConstraintReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Constraint Report:")?;
        writeln!(f, "------------------")?;
        writeln!(f, "Total: {} constraints", self.total_constraints())?;
        writeln!(f, "Satisfied: {}", self.satisfied_count())?;
        writeln!(f, "Violated: {}", self.violated_count())?;
        writeln!(f)?;
        if self.all_satisfied() {
            return writeln!(f, "All constraints satisfied!");
        }
        writeln!(f, "Violations:")?;
        for result in self.violations() {
            writeln!(f, "  [FAIL] {}: {}", result.constraint_name, result.message)?;
            writeln!(f, "         Actual value: {}", result.actual_value)?;
        }
        Ok(())
    }
}

lazy_static::lazy_static! {
    static ref GC_RANGE_REGEX: Regex = Regex::new(r"^gc\s*=\s*([\d.]+)\s*-\s*([\d.]+)$").unwrap();
    static ref LENGTH_RANGE_REGEX: Regex = Regex::new(r"^length\s*=\s*(\d+)\s*-\s*(\d+)$").unwrap();
    static ref LENGTH_MIN_REGEX: Regex = Regex::new(r"^length\s*>\s*(\d+)$").unwrap();
    static ref AVOID_REGEX: Regex = Regex::new(r"^avoid\s*:\s*([A-Za-z]+)$").unwrap();
    static ref REQUIRE_REGEX: Regex = Regex::new(r"^require\s*:\s*([A-Za-z]+)$").unwrap();
    static ref HOMOPOLYMER_REGEX: Regex = Regex::new(r"^homopolymer\s*<\s*(\d+)$").unwrap();
}

/// Ordered set of constraints evaluated together.
#[derive(Default)]
pub struct ConstraintEngine {
    constraints: Vec<Box<dyn Constraint>>,
}

impl ConstraintEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) {
        self.constraints.push(constraint);
    }

    /// Parses a compact textual constraint and adds it.
    ///
    /// # Arguments
    /// * `constraint_str` - One of `gc=MIN-MAX`, `length=MIN-MAX`, `length>N`, `avoid:MOTIF`,
    ///   `require:MOTIF`, `homopolymer<N`, `orf`/`valid_orf`, `no_stop`/`no_stops`
    ///
    /// # Returns
    /// * `Result<(), ConstraintError>` - `ParseError` when the string matches no known form
    pub fn add_constraint_from_string(&mut self, constraint_str: &str) -> Result<(), ConstraintError> {
        let constraint = Self::parse_constraint_string(constraint_str)?;
        self.add_constraint(constraint);
        Ok(())
    }

    pub fn parse_constraint_string(
        constraint_str: &str,
    ) -> Result<Box<dyn Constraint>, ConstraintError> {
        let s = constraint_str.trim();
        let parse_err = || ConstraintError::ParseError(constraint_str.to_string());

        if let Some(caps) = GC_RANGE_REGEX.captures(s) {
            let min: f64 = caps[1].parse().map_err(|_| parse_err())?;
            let max: f64 = caps[2].parse().map_err(|_| parse_err())?;
            if min > max {
                return Err(ConstraintError::InvalidBounds(constraint_str.to_string()));
            }
            return Ok(Box::new(GcContentConstraint::new(min, max)));
        }
        if let Some(caps) = LENGTH_RANGE_REGEX.captures(s) {
            let min: usize = caps[1].parse().map_err(|_| parse_err())?;
            let max: usize = caps[2].parse().map_err(|_| parse_err())?;
            if min > max {
                return Err(ConstraintError::InvalidBounds(constraint_str.to_string()));
            }
            return Ok(Box::new(LengthConstraint::new(min, max)));
        }
        if let Some(caps) = LENGTH_MIN_REGEX.captures(s) {
            let min: usize = caps[1].parse().map_err(|_| parse_err())?;
            return Ok(Box::new(LengthConstraint::at_least(min)));
        }
        if let Some(caps) = AVOID_REGEX.captures(s) {
            return Ok(Box::new(ForbiddenMotifConstraint::new(vec![
                caps[1].to_string()
            ])));
        }
        if let Some(caps) = REQUIRE_REGEX.captures(s) {
            return Ok(Box::new(RequiredMotifConstraint::new(vec![
                caps[1].to_string()
            ])));
        }
        if let Some(caps) = HOMOPOLYMER_REGEX.captures(s) {
            let max: usize = caps[1].parse().map_err(|_| parse_err())?;
            return Ok(Box::new(HomopolymerConstraint::new(max)));
        }
        match s {
            "orf" | "valid_orf" => Ok(Box::new(ValidOrfConstraint::default())),
            "no_stop" | "no_stops" => Ok(Box::new(NoPrematureStopConstraint)),
            _ => Err(parse_err()),
        }
    }

    pub fn evaluate(&self, seq: &Sequence) -> ConstraintReport {
        let mut report = ConstraintReport::default();
        for constraint in &self.constraints {
            report.add_result(constraint.evaluate(seq));
        }
        report
    }

    /// Short-circuits on the first violated constraint.
    pub fn satisfies_all(&self, seq: &Sequence) -> bool {
        self.constraints.iter().all(|c| c.evaluate(seq).satisfied)
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.constraints.iter().map(|c| c.description()).collect()
    }

    pub fn clear(&mut self) {
        self.constraints.clear();
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl fmt::Debug for ConstraintEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintEngine")
            .field(
                "constraints",
                &self.constraints.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
