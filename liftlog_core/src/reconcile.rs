//! Exercise reconciliation.
//!
//! Maps an incoming exercise batch onto the exercises currently attached to
//! a workout:
//! - entry `i < existing.len()` updates exercise `existing[i]` in place
//! - every later entry creates a new exercise
//! - every current exercise not named in `existing` is deleted
//!
//! Planning is pure and does all checking up front. Applying the plan records
//! each write in a [`Journal`] so a failed batch can be compensated.

use crate::{
    score_sets, Error, Exercise, ExerciseBatch, ExerciseEntry, ExerciseId, ExerciseStore, Result,
    SetScores,
};
use std::collections::HashSet;

/// Recomputed fields for one exercise
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseDraft {
    pub name: Option<String>,
    pub sets: u32,
    pub weights: Vec<f64>,
    pub reps: Vec<u32>,
    pub scores: SetScores,
}

impl ExerciseDraft {
    fn score(entry: &ExerciseEntry) -> Result<Self> {
        let scores = score_sets(entry.sets, &entry.weights, &entry.reps)?;
        Ok(Self {
            name: entry.name.clone(),
            sets: entry.sets,
            weights: entry.weights.clone(),
            reps: entry.reps.clone(),
            scores,
        })
    }

    /// Build the stored record, keeping `fallback_name` when no name was supplied
    fn into_exercise(self, id: ExerciseId, fallback_name: Option<&str>) -> Result<Exercise> {
        let name = self
            .name
            .or_else(|| fallback_name.map(str::to_string))
            .ok_or_else(|| Error::Validation(format!("exercise {} needs a name", id)))?;

        Ok(Exercise {
            id,
            name,
            sets: self.sets,
            weights: self.weights,
            reps: self.reps,
            scores: self.scores.scores,
            pr: self.scores.pr,
        })
    }
}

/// The create/update/delete actions that turn one exercise list into another
#[derive(Clone, Debug, PartialEq)]
pub struct ReconciliationPlan {
    pub updates: Vec<(ExerciseId, ExerciseDraft)>,
    pub creates: Vec<Exercise>,
    pub deletes: Vec<ExerciseId>,
    /// The workout's exercise list once the plan is applied, in batch order
    pub exercise_ids: Vec<ExerciseId>,
}

impl ReconciliationPlan {
    /// A plan that deletes every exercise in `current`
    pub fn removal(current: &[ExerciseId]) -> Self {
        Self {
            updates: Vec::new(),
            creates: Vec::new(),
            deletes: unique(current),
            exercise_ids: Vec::new(),
        }
    }

    /// Number of store writes the plan will issue
    pub fn planned_writes(&self) -> usize {
        self.updates.len() + self.creates.len() + self.deletes.len()
    }
}

fn unique(ids: &[ExerciseId]) -> Vec<ExerciseId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Plan the reconciliation of `current` against `batch`
///
/// Fails with [`Error::Ownership`] if `batch.existing` names an exercise that
/// is not in `current`, and with [`Error::Shape`] on length problems. Nothing
/// is written.
pub fn plan_reconciliation(
    current: &[ExerciseId],
    batch: &ExerciseBatch,
) -> Result<ReconciliationPlan> {
    if batch.existing.len() > batch.entries.len() {
        return Err(Error::Shape(format!(
            "{} existing exercises named for a batch of {}",
            batch.existing.len(),
            batch.entries.len()
        )));
    }

    let attached: HashSet<ExerciseId> = current.iter().copied().collect();
    let mut kept = HashSet::with_capacity(batch.existing.len());
    for id in &batch.existing {
        if !attached.contains(id) {
            return Err(Error::Ownership(format!(
                "exercise {} does not belong to this workout",
                id
            )));
        }
        if !kept.insert(*id) {
            return Err(Error::Shape(format!(
                "exercise {} is named more than once",
                id
            )));
        }
    }

    let mut updates = Vec::with_capacity(batch.existing.len());
    let mut creates = Vec::new();
    let mut exercise_ids = Vec::with_capacity(batch.entries.len());

    for (i, entry) in batch.entries.iter().enumerate() {
        let draft = ExerciseDraft::score(entry)?;
        match batch.existing.get(i) {
            Some(id) => {
                exercise_ids.push(*id);
                updates.push((*id, draft));
            }
            None => {
                let id = ExerciseId::new();
                exercise_ids.push(id);
                creates.push(draft.into_exercise(id, None)?);
            }
        }
    }

    let deletes: Vec<ExerciseId> = unique(current)
        .into_iter()
        .filter(|id| !kept.contains(id))
        .collect();

    // A deleted id must never also be written or remain referenced
    if let Some(id) = deletes.iter().find(|id| exercise_ids.contains(id)) {
        return Err(Error::Invariant(format!(
            "exercise {} is planned for deletion but still referenced",
            id
        )));
    }

    tracing::debug!(
        "Planned reconciliation: {} updates, {} creates, {} deletes",
        updates.len(),
        creates.len(),
        deletes.len()
    );

    Ok(ReconciliationPlan {
        updates,
        creates,
        deletes,
        exercise_ids,
    })
}

/// A write that can be undone
#[derive(Clone, Debug)]
enum Undo {
    Created(ExerciseId),
    Updated(Exercise),
    Deleted(Exercise),
}

/// Log of the writes applied so far, in order
#[derive(Clone, Debug, Default)]
pub struct Journal {
    undo: Vec<Undo>,
}

impl Journal {
    /// Undo every recorded write, newest first
    ///
    /// Returns true if every compensating write succeeded.
    pub fn rollback<S: ExerciseStore>(&self, store: &S) -> bool {
        let mut complete = true;

        for undo in self.undo.iter().rev() {
            let result = match undo {
                Undo::Created(id) => store.delete_exercise(*id).map(|_| ()),
                Undo::Updated(previous) => store.update_exercise(previous),
                Undo::Deleted(previous) => store.create_exercise(previous),
            };
            if let Err(e) = result {
                tracing::warn!("Rollback step {:?} failed: {}", undo, e);
                complete = false;
            }
        }

        complete
    }

    /// Delete only the records this journal created
    ///
    /// Used when the owning workout disappeared mid-mutation: restoring the
    /// updated or deleted records would leave them unreferenced.
    pub fn discard_created<S: ExerciseStore>(&self, store: &S) -> bool {
        let mut complete = true;

        for undo in self.undo.iter().rev() {
            if let Undo::Created(id) = undo {
                if let Err(e) = store.delete_exercise(*id) {
                    tracing::warn!("Discarding exercise {} failed: {}", id, e);
                    complete = false;
                }
            }
        }

        complete
    }
}

/// Result of a fully applied plan
#[derive(Debug)]
pub struct AppliedPlan {
    pub exercise_ids: Vec<ExerciseId>,
    pub writes: usize,
    pub journal: Journal,
}

/// A plan that stopped part way
#[derive(Debug)]
pub struct ApplyFailure {
    pub journal: Journal,
    pub applied: usize,
    pub planned: usize,
    pub error: Error,
}

/// Issue the plan's writes: updates, then creates, then deletes
///
/// Stops at the first failing write. Already-applied writes are not undone
/// here; the caller decides whether to roll back using the returned journal.
pub fn apply_plan<S: ExerciseStore>(
    store: &S,
    plan: ReconciliationPlan,
) -> std::result::Result<AppliedPlan, ApplyFailure> {
    let planned = plan.planned_writes();
    let mut journal = Journal::default();
    let mut applied = 0;

    macro_rules! bail {
        ($err:expr) => {
            return Err(ApplyFailure {
                journal,
                applied,
                planned,
                error: $err,
            })
        };
    }

    for (id, draft) in plan.updates {
        let previous = match store.find_exercise(id) {
            Ok(Some(previous)) => previous,
            Ok(None) => bail!(Error::NotFound(format!("exercise {}", id))),
            Err(e) => bail!(e),
        };
        let updated = match draft.into_exercise(id, Some(previous.name.as_str())) {
            Ok(updated) => updated,
            Err(e) => bail!(e),
        };
        if let Err(e) = store.update_exercise(&updated) {
            bail!(e);
        }
        tracing::debug!("Updated exercise {} ({})", id, updated.name);
        journal.undo.push(Undo::Updated(previous));
        applied += 1;
    }

    for exercise in plan.creates {
        if let Err(e) = store.create_exercise(&exercise) {
            bail!(e);
        }
        tracing::debug!("Created exercise {} ({})", exercise.id, exercise.name);
        journal.undo.push(Undo::Created(exercise.id));
        applied += 1;
    }

    for id in plan.deletes {
        match store.delete_exercise(id) {
            Ok(Some(previous)) => {
                tracing::debug!("Deleted exercise {}", id);
                journal.undo.push(Undo::Deleted(previous));
            }
            Ok(None) => tracing::warn!("Exercise {} was already gone", id),
            Err(e) => bail!(e),
        }
        applied += 1;
    }

    Ok(AppliedPlan {
        exercise_ids: plan.exercise_ids,
        writes: applied,
        journal,
    })
}
