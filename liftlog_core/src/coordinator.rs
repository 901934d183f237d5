//! Workout mutation coordinator.
//!
//! Orchestrates the workout use cases over the store traits. Each mutation
//! follows the same commit order:
//! 1. validate and plan (no writes)
//! 2. exercise writes
//! 3. workout record write
//! 4. user counter write (create, duplicate and delete only)
//!
//! A failure after step 1 compensates the writes already made and surfaces
//! [`Error::IncompleteReconciliation`].
//!
//! The workout write in step 3 is conditional on the version read before
//! planning. Within a process, mutations of one workout are also serialized
//! by a lock; the version check covers writers in other processes sharing
//! the same store.

use crate::reconcile::{apply_plan, ApplyFailure, Journal, ReconciliationPlan};
use crate::validation::{self, USER_NAME_LEN};
use crate::{
    advance, plan_reconciliation, Error, ExerciseBatch, ExerciseEntry, ExerciseStore,
    ProgressionEvent, ProgressionRules, Result, Units, User, UserId, UserStore, Workout,
    WorkoutId, WorkoutRequest, WorkoutStore, WorkoutView,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// What an update request turned into
#[derive(Clone, Debug)]
pub enum UpdateOutcome {
    /// The workout was rewritten
    Updated(WorkoutView),
    /// `numExercises == 0`: the workout was deleted; the caller's remaining workouts
    Deleted(Vec<WorkoutView>),
}

/// Per-workout mutation locks
#[derive(Debug, Default)]
struct WorkoutLocks {
    locks: Mutex<HashMap<WorkoutId, Arc<Mutex<()>>>>,
}

impl WorkoutLocks {
    fn get(&self, id: WorkoutId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| Error::State("workout lock registry poisoned".into()))?;
        // Drop entries nobody is holding
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(Arc::clone(locks.entry(id).or_default()))
    }
}

/// Entry point for every workout mutation
#[derive(Debug)]
pub struct WorkoutCoordinator<S> {
    store: S,
    rules: ProgressionRules,
    locks: WorkoutLocks,
}

impl<S> WorkoutCoordinator<S>
where
    S: ExerciseStore + WorkoutStore + UserStore,
{
    pub fn new(store: S, rules: ProgressionRules) -> Self {
        Self {
            store,
            rules,
            locks: WorkoutLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rules(&self) -> &ProgressionRules {
        &self.rules
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Register a new user with starting progression counters
    pub fn register_user(&self, name: &str, units: Units) -> Result<User> {
        validation::validate_name("user name", name, USER_NAME_LEN)?;

        let user = User {
            id: UserId::new(),
            name: name.trim().to_string(),
            units,
            progress: self.rules.initial_counters(),
            workouts: Vec::new(),
            created_at: Utc::now(),
        };
        self.store.create_user(&user)?;

        tracing::info!("Registered user {} ({})", user.id, user.name);
        Ok(user)
    }

    pub fn user(&self, user_id: UserId) -> Result<User> {
        self.store
            .find_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
    }

    /// Add `increment` points to a user
    pub fn award_points(&self, user_id: UserId, increment: u64) -> Result<User> {
        if increment == 0 {
            return Err(Error::Validation("increment must be at least 1".into()));
        }
        self.progress(user_id, ProgressionEvent::PointsAwarded(increment))
    }

    /// Grant a star outside the workout-count threshold
    pub fn award_star(&self, user_id: UserId) -> Result<User> {
        self.progress(user_id, ProgressionEvent::StarAwarded)
    }

    fn progress(&self, user_id: UserId, event: ProgressionEvent) -> Result<User> {
        let rules = &self.rules;
        let user = self.store.update_user(user_id, |user| {
            user.progress = advance(&user.progress, event, rules);
            Ok(())
        })?;
        tracing::info!("Applied {:?} to user {}", event, user_id);
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Every workout the user owns, exercises resolved
    pub fn list_workouts(&self, user_id: UserId) -> Result<Vec<WorkoutView>> {
        let user = self.user(user_id)?;
        let mut views = Vec::with_capacity(user.workouts.len());

        for workout_id in user.workouts {
            match self.store.find_workout(workout_id)? {
                Some(workout) => views.push(self.view(workout)?),
                None => tracing::warn!(
                    "User {} lists missing workout {}",
                    user_id,
                    workout_id
                ),
            }
        }

        Ok(views)
    }

    /// One owned workout, exercises resolved
    pub fn get_workout(&self, user_id: UserId, workout_id: WorkoutId) -> Result<WorkoutView> {
        let workout = self.authorize(user_id, workout_id)?;
        self.view(workout)
    }

    fn view(&self, workout: Workout) -> Result<WorkoutView> {
        let mut exercises = Vec::with_capacity(workout.exercises.len());
        for id in &workout.exercises {
            match self.store.find_exercise(*id)? {
                Some(exercise) => exercises.push(exercise),
                None => tracing::warn!("Workout {} references missing exercise {}", workout.id, id),
            }
        }
        Ok(WorkoutView { workout, exercises })
    }

    /// Load a workout and check that `user_id` created it
    fn authorize(&self, user_id: UserId, workout_id: WorkoutId) -> Result<Workout> {
        let workout = self
            .store
            .find_workout(workout_id)?
            .ok_or_else(|| Error::NotFound(format!("workout {}", workout_id)))?;

        if !workout.is_owned_by(user_id) {
            return Err(Error::Ownership(format!(
                "workout {} does not belong to user {}",
                workout_id, user_id
            )));
        }
        Ok(workout)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Create a workout and its exercises, then credit the user
    pub fn create_workout(
        &self,
        user_id: UserId,
        req: &WorkoutRequest,
    ) -> Result<Vec<WorkoutView>> {
        let validated = validation::validate_create(req)?;
        let name = validated
            .name
            .ok_or_else(|| Error::Validation("name is required".into()))?;

        self.insert_workout(user_id, name, &validated.batch)?;
        self.list_workouts(user_id)
    }

    /// Copy an owned workout, exercises included, as a new workout
    pub fn duplicate_workout(
        &self,
        user_id: UserId,
        workout_id: WorkoutId,
    ) -> Result<Vec<WorkoutView>> {
        let (name, batch) = {
            let lock = self.locks.get(workout_id)?;
            let _guard = lock
                .lock()
                .map_err(|_| Error::State(format!("lock for workout {} poisoned", workout_id)))?;

            let source = self.authorize(user_id, workout_id)?;
            let mut entries = Vec::with_capacity(source.exercises.len());
            for id in &source.exercises {
                let exercise = self
                    .store
                    .find_exercise(*id)?
                    .ok_or_else(|| Error::NotFound(format!("exercise {}", id)))?;
                entries.push(ExerciseEntry {
                    name: Some(exercise.name),
                    sets: exercise.sets,
                    weights: exercise.weights,
                    reps: exercise.reps,
                });
            }

            (
                source.name,
                ExerciseBatch {
                    entries,
                    existing: Vec::new(),
                },
            )
        };

        let new_id = self.insert_workout(user_id, name, &batch)?;
        tracing::info!("Duplicated workout {} as {}", workout_id, new_id);
        self.list_workouts(user_id)
    }

    /// Reconcile a workout's exercises against the request
    ///
    /// `numExercises == 0` deletes the workout instead. User counters are
    /// untouched by a plain update.
    pub fn update_workout(
        &self,
        user_id: UserId,
        workout_id: WorkoutId,
        req: &WorkoutRequest,
    ) -> Result<UpdateOutcome> {
        let lock = self.locks.get(workout_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| Error::State(format!("lock for workout {} poisoned", workout_id)))?;

        let workout = self.authorize(user_id, workout_id)?;

        if req.num_exercises == 0 {
            self.remove_workout(&workout)?;
            return Ok(UpdateOutcome::Deleted(self.list_workouts(user_id)?));
        }

        let validated = validation::validate_update(req)?;
        let plan = plan_reconciliation(&workout.exercises, &validated.batch)?;
        let planned = plan.planned_writes() + 1;

        let applied = apply_plan(&self.store, plan)
            .map_err(|failure| self.abandon(workout_id, failure, planned))?;

        let expected_version = workout.version;
        let updated = Workout {
            name: validated.name.unwrap_or_else(|| workout.name.clone()),
            num_exercises: applied.exercise_ids.len() as u32,
            exercises: applied.exercise_ids.clone(),
            ..workout
        };

        let updated = match self.store.update_workout(&updated, expected_version) {
            Ok(stored) => stored,
            Err(e @ Error::NotFound(_)) => {
                // Deleted by another writer along with its exercises
                let discarded = applied.journal.discard_created(&self.store);
                return Err(self.incomplete(workout_id, applied.writes, planned, e, discarded));
            }
            Err(e) => {
                return Err(self.compensate(
                    workout_id,
                    &applied.journal,
                    applied.writes,
                    planned,
                    e,
                    true,
                ));
            }
        };

        tracing::info!(
            "Updated workout {} ({} exercises)",
            workout_id,
            updated.num_exercises
        );
        Ok(UpdateOutcome::Updated(self.view(updated)?))
    }

    /// Delete a workout with all of its exercises
    pub fn delete_workout(
        &self,
        user_id: UserId,
        workout_id: WorkoutId,
    ) -> Result<Vec<WorkoutView>> {
        let lock = self.locks.get(workout_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| Error::State(format!("lock for workout {} poisoned", workout_id)))?;

        let workout = self.authorize(user_id, workout_id)?;
        self.remove_workout(&workout)?;
        self.list_workouts(user_id)
    }

    /// Exercises, then the workout, then the creator's counters
    fn insert_workout(
        &self,
        user_id: UserId,
        name: String,
        batch: &ExerciseBatch,
    ) -> Result<WorkoutId> {
        if batch.entries.is_empty() {
            return Err(Error::Validation(
                "a workout needs at least 1 exercise".into(),
            ));
        }
        self.user(user_id)?;

        let workout_id = WorkoutId::new();
        let plan = plan_reconciliation(&[], batch)?;
        let planned = plan.planned_writes() + 2;

        let applied = apply_plan(&self.store, plan)
            .map_err(|failure| self.abandon(workout_id, failure, planned))?;

        let workout = Workout {
            id: workout_id,
            name,
            num_exercises: applied.exercise_ids.len() as u32,
            exercises: applied.exercise_ids.clone(),
            creator: user_id,
            last_shared: Workout::initial_last_shared(Utc::now()),
            version: 0,
        };

        if let Err(e) = self.store.create_workout(&workout) {
            return Err(self.compensate(
                workout_id,
                &applied.journal,
                applied.writes,
                planned,
                e,
                true,
            ));
        }

        let rules = &self.rules;
        let credited = self.store.update_user(user_id, |user| {
            user.progress = advance(&user.progress, ProgressionEvent::WorkoutAdded, rules);
            user.workouts.push(workout_id);
            Ok(())
        });

        if let Err(e) = credited {
            let unlinked = self.store.delete_workout(workout_id, workout.version).is_ok();
            return Err(self.compensate(
                workout_id,
                &applied.journal,
                applied.writes + 1,
                planned,
                e,
                unlinked,
            ));
        }

        tracing::info!(
            "Created workout {} ({}) with {} exercises for user {}",
            workout_id,
            workout.name,
            workout.num_exercises,
            user_id
        );
        Ok(workout_id)
    }

    /// Caller must hold the workout's lock
    fn remove_workout(&self, workout: &Workout) -> Result<()> {
        // The owner must exist before anything is deleted
        self.user(workout.creator)?;

        let plan = ReconciliationPlan::removal(&workout.exercises);
        let planned = plan.planned_writes() + 2;

        let applied = apply_plan(&self.store, plan)
            .map_err(|failure| self.abandon(workout.id, failure, planned))?;

        match self.store.delete_workout(workout.id, workout.version) {
            Ok(Some(_)) => {}
            Ok(None) => {
                // Another writer finished the same deletion and debited the user
                tracing::warn!("Workout {} was already gone", workout.id);
                return Err(Error::NotFound(format!("workout {}", workout.id)));
            }
            Err(e) => {
                return Err(self.compensate(
                    workout.id,
                    &applied.journal,
                    applied.writes,
                    planned,
                    e,
                    true,
                ));
            }
        }

        let rules = &self.rules;
        let debited = self.store.update_user(workout.creator, |user| {
            user.progress = advance(&user.progress, ProgressionEvent::WorkoutRemoved, rules);
            user.workouts.retain(|id| *id != workout.id);
            Ok(())
        });

        if let Err(e) = debited {
            let relinked = self.store.create_workout(workout).is_ok();
            return Err(self.compensate(
                workout.id,
                &applied.journal,
                applied.writes + 1,
                planned,
                e,
                relinked,
            ));
        }

        tracing::info!(
            "Deleted workout {} and {} exercises",
            workout.id,
            workout.exercises.len()
        );
        Ok(())
    }

    fn abandon(&self, workout: WorkoutId, failure: ApplyFailure, planned: usize) -> Error {
        let ApplyFailure {
            journal,
            applied,
            error,
            ..
        } = failure;
        self.compensate(workout, &journal, applied, planned, error, true)
    }

    /// Undo `journal` and describe the failed mutation
    fn compensate(
        &self,
        workout: WorkoutId,
        journal: &Journal,
        applied: usize,
        planned: usize,
        cause: Error,
        other_steps_undone: bool,
    ) -> Error {
        let rolled_back = journal.rollback(&self.store) && other_steps_undone;
        self.incomplete(workout, applied, planned, cause, rolled_back)
    }

    fn incomplete(
        &self,
        workout: WorkoutId,
        applied: usize,
        planned: usize,
        cause: Error,
        rolled_back: bool,
    ) -> Error {
        if rolled_back {
            tracing::warn!("Mutation of workout {} failed and was rolled back: {}", workout, cause);
        } else {
            tracing::warn!(
                "Mutation of workout {} failed and could not be fully rolled back: {}",
                workout,
                cause
            );
        }

        Error::IncompleteReconciliation {
            workout,
            applied,
            planned,
            rolled_back,
            reason: cause.to_string(),
        }
    }
}
