use crate::sequence::Sequence;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scores a sequence; higher is better. Must be total and side-effect free.
pub type ObjectiveFunction = dyn Fn(&Sequence) -> f64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObjectiveError {
    #[error("Number of objectives ({objectives}) must match number of weights ({weights})")]
    WeightMismatch { objectives: usize, weights: usize },
    #[error("Target GC content {0} is outside [0, 1]")]
    InvalidTarget(f64),
}

/// Built-in objectives selectable from a config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    #[default]
    MaximizeGc,
    MinimizeGc,
    TargetGc,
}

pub struct ObjectiveFactory;

impl ObjectiveFactory {
    /// Builds a built-in objective. `parameter` is only read by `TargetGc`.
    pub fn create(
        kind: ObjectiveKind,
        parameter: f64,
    ) -> Result<Box<ObjectiveFunction>, ObjectiveError> {
        match kind {
            ObjectiveKind::MaximizeGc => Ok(Self::maximize_gc()),
            ObjectiveKind::MinimizeGc => Ok(Self::minimize_gc()),
            ObjectiveKind::TargetGc => {
                if !(0.0..=1.0).contains(&parameter) {
                    return Err(ObjectiveError::InvalidTarget(parameter));
                }
                Ok(Self::target_gc(parameter))
            }
        }
    }

    pub fn maximize_gc() -> Box<ObjectiveFunction> {
        Box::new(|seq: &Sequence| seq.gc_content())
    }

    pub fn minimize_gc() -> Box<ObjectiveFunction> {
        Box::new(|seq: &Sequence| 1.0 - seq.gc_content())
    }

    /// `1 - |gc - target|`, peaking at exactly `target`.
    pub fn target_gc(target: f64) -> Box<ObjectiveFunction> {
        Box::new(move |seq: &Sequence| 1.0 - (seq.gc_content() - target).abs())
    }

    /// Linear blend of several objectives.
    ///
    /// # Arguments
    /// * `objectives` - The objectives to blend
    /// * `weights` - One weight per objective
    ///
    /// # Returns
    /// * `Result<Box<ObjectiveFunction>, ObjectiveError>` - `WeightMismatch` if the two lengths differ
    pub fn weighted_sum(
        objectives: Vec<Box<ObjectiveFunction>>,
        weights: Vec<f64>,
    ) -> Result<Box<ObjectiveFunction>, ObjectiveError> {
        if objectives.len() != weights.len() {
            return Err(ObjectiveError::WeightMismatch {
                objectives: objectives.len(),
                weights: weights.len(),
            });
        }
        Ok(Box::new(move |seq: &Sequence| {
            objectives
                .iter()
                .zip(&weights)
                .map(|(objective, weight)| weight * objective(seq))
                .sum()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gc_objectives() {
        let seq = Sequence::from_dna("GGAT", "o");
        assert_eq!(ObjectiveFactory::maximize_gc()(&seq), 0.5);
        assert_eq!(ObjectiveFactory::minimize_gc()(&seq), 0.5);
        assert_eq!(ObjectiveFactory::target_gc(0.5)(&seq), 1.0);
        assert!((ObjectiveFactory::target_gc(0.25)(&seq) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_sum() {
        let blended = ObjectiveFactory::weighted_sum(
            vec![ObjectiveFactory::maximize_gc(), ObjectiveFactory::minimize_gc()],
            vec![2.0, 1.0],
        )
        .unwrap();
        let seq = Sequence::from_dna("GGGG", "o");
        assert_eq!(blended(&seq), 2.0);

        let mismatch =
            ObjectiveFactory::weighted_sum(vec![ObjectiveFactory::maximize_gc()], vec![]);
        assert!(matches!(
            mismatch,
            Err(ObjectiveError::WeightMismatch {
                objectives: 1,
                weights: 0
            })
        ));
    }

    #[test]
    fn test_create_validates_target() {
        assert!(ObjectiveFactory::create(ObjectiveKind::TargetGc, 1.5).is_err());
        assert!(ObjectiveFactory::create(ObjectiveKind::TargetGc, 0.5).is_ok());
        assert!(ObjectiveFactory::create(ObjectiveKind::MaximizeGc, f64::NAN).is_ok());
    }
}
