//! Request validation.
//!
//! Turns the parallel `eNames`/`eSets`/`eWeights`/`eReps` arrays of a
//! [`WorkoutRequest`] into a zipped list of typed [`ExerciseEntry`] values.
//! Every length and range check happens here, before any store is touched.

use crate::{
    Error, ExerciseBatch, ExerciseEntry, ExerciseId, Result, ValidatedWorkout, WorkoutRequest,
};
use std::collections::HashSet;

/// Allowed length of workout and exercise names, in characters
pub const NAME_LEN: (usize, usize) = (3, 20);

/// Allowed length of user names, in characters
pub const USER_NAME_LEN: (usize, usize) = (1, 15);

/// Check that `value` is between `min` and `max` characters long
pub fn validate_name(field: &str, value: &str, (min, max): (usize, usize)) -> Result<()> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(Error::Validation(format!(
            "{} must be {}-{} characters, got {:?}",
            field, min, max, value
        )));
    }
    Ok(())
}

/// Validate a request that creates a new workout
///
/// The workout name is required, at least one exercise is required and
/// every exercise must carry a name.
pub fn validate_create(req: &WorkoutRequest) -> Result<ValidatedWorkout> {
    let name = req
        .name
        .as_deref()
        .ok_or_else(|| Error::Validation("name is required".into()))?;
    validate_name("name", name, NAME_LEN)?;

    if req.num_exercises == 0 {
        return Err(Error::Validation(
            "numExercises must be at least 1".into(),
        ));
    }

    let existing = existing_ids(req)?;
    let entries = zip_exercises(req, existing.len())?;

    Ok(ValidatedWorkout {
        name: Some(name.trim().to_string()),
        batch: ExerciseBatch { entries, existing },
    })
}

/// Validate a request that updates an existing workout
///
/// The workout name is optional. Names are only required for entries past
/// `numExistingExercises`, since those become new exercise records.
/// A request with `numExercises == 0` is a deletion and never reaches here.
pub fn validate_update(req: &WorkoutRequest) -> Result<ValidatedWorkout> {
    if let Some(name) = req.name.as_deref() {
        validate_name("name", name, NAME_LEN)?;
    }

    if req.num_exercises == 0 {
        return Err(Error::Validation(
            "an update with 0 exercises must be handled as a deletion".into(),
        ));
    }

    let existing = existing_ids(req)?;
    let entries = zip_exercises(req, existing.len())?;

    Ok(ValidatedWorkout {
        name: req.name.as_ref().map(|n| n.trim().to_string()),
        batch: ExerciseBatch { entries, existing },
    })
}

fn check_len(field: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(Error::Shape(format!(
            "{} has {} entries but numExercises is {}",
            field, actual, expected
        )));
    }
    Ok(())
}

fn zip_exercises(req: &WorkoutRequest, num_existing: usize) -> Result<Vec<ExerciseEntry>> {
    let expected = req.num_exercises as usize;
    check_len("eNames", req.e_names.len(), expected)?;
    check_len("eSets", req.e_sets.len(), expected)?;
    check_len("eWeights", req.e_weights.len(), expected)?;
    check_len("eReps", req.e_reps.len(), expected)?;

    req.e_names
        .iter()
        .zip(&req.e_sets)
        .zip(&req.e_weights)
        .zip(&req.e_reps)
        .enumerate()
        .map(|(i, (((name, &sets), weights), reps))| {
            match name.as_deref() {
                Some(name) => validate_name(&format!("eNames[{}]", i), name, NAME_LEN)?,
                None if i >= num_existing => {
                    return Err(Error::Validation(format!(
                        "eNames[{}] is required for a new exercise",
                        i
                    )));
                }
                None => {}
            }

            if sets == 0 {
                return Err(Error::Validation(format!(
                    "eSets[{}] must be at least 1",
                    i
                )));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 1.0) {
                return Err(Error::Validation(format!(
                    "eWeights[{}] entries must be at least 1",
                    i
                )));
            }
            if reps.iter().any(|r| *r < 1) {
                return Err(Error::Validation(format!(
                    "eReps[{}] entries must be at least 1",
                    i
                )));
            }

            let needed = sets as usize;
            if weights.len() < needed || reps.len() < needed {
                return Err(Error::Shape(format!(
                    "exercise {} has {} sets but {} weights and {} reps",
                    i,
                    sets,
                    weights.len(),
                    reps.len()
                )));
            }

            Ok(ExerciseEntry {
                name: name.as_ref().map(|n| n.trim().to_string()),
                sets,
                weights: weights.clone(),
                reps: reps.clone(),
            })
        })
        .collect()
}

fn existing_ids(req: &WorkoutRequest) -> Result<Vec<ExerciseId>> {
    let ids = req.existing_exercises.clone().unwrap_or_default();
    let declared = req
        .num_existing_exercises
        .map(|n| n as usize)
        .unwrap_or(ids.len());

    if ids.len() != declared {
        return Err(Error::Shape(format!(
            "existingExercises has {} entries but numExistingExercises is {}",
            ids.len(),
            declared
        )));
    }
    if declared > req.num_exercises as usize {
        return Err(Error::Shape(format!(
            "numExistingExercises ({}) exceeds numExercises ({})",
            declared, req.num_exercises
        )));
    }

    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(Error::Shape(format!(
            "exercise {} appears more than once in existingExercises",
            dup
        )));
    }

    Ok(ids)
}
