//! Per-set scoring.
//!
//! A set scores `weight * reps`; an exercise's PR is its best set score.

use crate::{Error, Result};

/// Scores computed for one exercise
#[derive(Clone, Debug, PartialEq)]
pub struct SetScores {
    pub scores: Vec<f64>,
    pub pr: f64,
}

/// Score the first `sets` entries of parallel weight/rep sequences.
///
/// Entries past `sets` are ignored. Fails with [`Error::Shape`] when either
/// sequence is shorter than `sets`.
pub fn score_sets(sets: u32, weights: &[f64], reps: &[u32]) -> Result<SetScores> {
    if sets == 0 {
        return Err(Error::Validation("an exercise needs at least 1 set".into()));
    }

    let sets = sets as usize;
    if weights.len() < sets || reps.len() < sets {
        return Err(Error::Shape(format!(
            "{} sets need at least {} weights and reps, got {} weights and {} reps",
            sets,
            sets,
            weights.len(),
            reps.len()
        )));
    }

    let scores: Vec<f64> = weights
        .iter()
        .zip(reps)
        .take(sets)
        .map(|(weight, reps)| weight * f64::from(*reps))
        .collect();
    let pr = scores.iter().copied().fold(f64::MIN, f64::max);

    Ok(SetScores { scores, pr })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_are_weight_times_reps() {
        let result = score_sets(2, &[30.0, 40.0], &[12, 10]).unwrap();
        assert_eq!(result.scores, vec![360.0, 400.0]);
        assert_eq!(result.pr, 400.0);
    }

    #[test]
    fn test_pr_is_best_set_not_last() {
        let result = score_sets(3, &[40.0, 45.0, 20.0], &[8, 6, 5]).unwrap();
        assert_eq!(result.scores, vec![320.0, 270.0, 100.0]);
        assert_eq!(result.pr, 320.0);
    }

    #[test]
    fn test_extra_entries_are_ignored() {
        let result = score_sets(1, &[50.0, 999.0], &[5, 999]).unwrap();
        assert_eq!(result.scores, vec![250.0]);
        assert_eq!(result.pr, 250.0);
    }

    #[test]
    fn test_fractional_weights() {
        let result = score_sets(1, &[22.5], &[4]).unwrap();
        assert_eq!(result.pr, 90.0);
    }

    #[test]
    fn test_short_weights_is_shape_error() {
        let result = score_sets(3, &[10.0, 10.0], &[5, 5, 5]);
        assert!(matches!(result, Err(Error::Shape(_))));
    }

    #[test]
    fn test_short_reps_is_shape_error() {
        let result = score_sets(2, &[10.0, 10.0], &[5]);
        assert!(matches!(result, Err(Error::Shape(_))));
    }

    #[test]
    fn test_zero_sets_rejected() {
        let result = score_sets(0, &[], &[]);
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
