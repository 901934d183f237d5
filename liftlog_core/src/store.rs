//! Persistence interfaces consumed by the workout coordinator.
//!
//! The coordinator only ever creates, reads, updates and deletes records by
//! id. Concrete stores keep all records in a [`Database`] and expose it
//! through the [`Backend`] trait; the store traits are implemented once for
//! every backend.

use crate::{Error, Exercise, ExerciseId, Result, User, UserId, Workout, WorkoutId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exercise persistence
pub trait ExerciseStore {
    /// Insert a new record under `exercise.id`
    fn create_exercise(&self, exercise: &Exercise) -> Result<()>;
    fn find_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>>;
    /// Replace the record stored under `exercise.id`
    fn update_exercise(&self, exercise: &Exercise) -> Result<()>;
    /// Remove a record, returning it if it existed
    fn delete_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>>;
}

/// Workout persistence
///
/// Rewrites and deletes are compare-and-swap on [`Workout::version`]: they
/// fail with [`Error::Conflict`] when the stored record is no longer at
/// `expected_version`, so a writer that planned against a stale read cannot
/// commit over a newer workout.
pub trait WorkoutStore {
    fn create_workout(&self, workout: &Workout) -> Result<()>;
    fn find_workout(&self, id: WorkoutId) -> Result<Option<Workout>>;
    /// Replace the stored record; returns it as stored, at `expected_version + 1`
    fn update_workout(&self, workout: &Workout, expected_version: u64) -> Result<Workout>;
    /// Remove a record, returning it if it existed
    fn delete_workout(&self, id: WorkoutId, expected_version: u64) -> Result<Option<Workout>>;
}

/// User persistence
pub trait UserStore {
    fn create_user(&self, user: &User) -> Result<()>;
    fn find_user(&self, id: UserId) -> Result<Option<User>>;

    /// Apply `f` to the stored user as one atomic step.
    ///
    /// Concurrent callers never observe each other's intermediate state, so
    /// counter changes cannot be lost to a stale read. If `f` fails the
    /// stored record is left untouched.
    fn update_user<F>(&self, id: UserId, f: F) -> Result<User>
    where
        F: FnOnce(&mut User) -> Result<()>;
}

/// All persisted records
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    #[serde(default)]
    pub workouts: BTreeMap<WorkoutId, Workout>,
    #[serde(default)]
    pub exercises: BTreeMap<ExerciseId, Exercise>,
}

/// Guarded access to a [`Database`]
pub trait Backend {
    /// Run `f` against a consistent view of the records
    fn read<R>(&self, f: impl FnOnce(&Database) -> R) -> Result<R>;

    /// Run `f` with exclusive access; changes are kept only if `f` succeeds
    fn write<R>(&self, f: impl FnOnce(&mut Database) -> Result<R>) -> Result<R>;

    /// Copy of every record, mostly useful for inspection and tests
    fn snapshot(&self) -> Result<Database> {
        self.read(|db| db.clone())
    }
}

impl<B: Backend> ExerciseStore for B {
    fn create_exercise(&self, exercise: &Exercise) -> Result<()> {
        self.write(|db| {
            if db.exercises.contains_key(&exercise.id) {
                return Err(Error::State(format!(
                    "exercise {} already exists",
                    exercise.id
                )));
            }
            db.exercises.insert(exercise.id, exercise.clone());
            Ok(())
        })
    }

    fn find_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>> {
        self.read(|db| db.exercises.get(&id).cloned())
    }

    fn update_exercise(&self, exercise: &Exercise) -> Result<()> {
        self.write(|db| match db.exercises.get_mut(&exercise.id) {
            Some(stored) => {
                *stored = exercise.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("exercise {}", exercise.id))),
        })
    }

    fn delete_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>> {
        self.write(|db| Ok(db.exercises.remove(&id)))
    }
}

impl<B: Backend> WorkoutStore for B {
    fn create_workout(&self, workout: &Workout) -> Result<()> {
        self.write(|db| {
            if db.workouts.contains_key(&workout.id) {
                return Err(Error::State(format!("workout {} already exists", workout.id)));
            }
            db.workouts.insert(workout.id, workout.clone());
            Ok(())
        })
    }

    fn find_workout(&self, id: WorkoutId) -> Result<Option<Workout>> {
        self.read(|db| db.workouts.get(&id).cloned())
    }

    fn update_workout(&self, workout: &Workout, expected_version: u64) -> Result<Workout> {
        self.write(|db| {
            let stored = db
                .workouts
                .get_mut(&workout.id)
                .ok_or_else(|| Error::NotFound(format!("workout {}", workout.id)))?;
            check_version(stored, expected_version)?;

            *stored = Workout {
                version: expected_version + 1,
                ..workout.clone()
            };
            Ok(stored.clone())
        })
    }

    fn delete_workout(&self, id: WorkoutId, expected_version: u64) -> Result<Option<Workout>> {
        self.write(|db| {
            if let Some(stored) = db.workouts.get(&id) {
                check_version(stored, expected_version)?;
            }
            Ok(db.workouts.remove(&id))
        })
    }
}

fn check_version(stored: &Workout, expected_version: u64) -> Result<()> {
    if stored.version != expected_version {
        return Err(Error::Conflict(format!(
            "workout {} is at version {}, expected {}",
            stored.id, stored.version, expected_version
        )));
    }
    Ok(())
}

impl<B: Backend> UserStore for B {
    fn create_user(&self, user: &User) -> Result<()> {
        self.write(|db| {
            if db.users.contains_key(&user.id) {
                return Err(Error::State(format!("user {} already exists", user.id)));
            }
            db.users.insert(user.id, user.clone());
            Ok(())
        })
    }

    fn find_user(&self, id: UserId) -> Result<Option<User>> {
        self.read(|db| db.users.get(&id).cloned())
    }

    fn update_user<F>(&self, id: UserId, f: F) -> Result<User>
    where
        F: FnOnce(&mut User) -> Result<()>,
    {
        self.write(|db| {
            let stored = db
                .users
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("user {}", id)))?;
            let mut updated = stored.clone();
            f(&mut updated)?;
            *stored = updated.clone();
            Ok(updated)
        })
    }
}
