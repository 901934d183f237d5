//! Core domain types for the Liftlog system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Record identifiers
//! - Users and their progression counters
//! - Workouts and exercises
//! - The create/update mutation request and its validated form

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

record_id!(
    /// Identifier of a user record
    UserId
);
record_id!(
    /// Identifier of a workout record
    WorkoutId
);
record_id!(
    /// Identifier of an exercise record
    ExerciseId
);

// ============================================================================
// User Types
// ============================================================================

/// Preferred unit system for displaying weights
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Imperial,
    Metric,
}

/// Gamification counters carried by every user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressionCounters {
    pub points: u64,
    pub num_workouts: u32,
    pub stars: u32,
    pub next_star: u32,
}

/// A registered user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub units: Units,
    pub progress: ProgressionCounters,
    /// Owned workouts, in creation order
    pub workouts: Vec<WorkoutId>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Workout and Exercise Types
// ============================================================================

/// A named collection of exercises owned by one user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    pub id: WorkoutId,
    pub name: String,
    pub num_exercises: u32,
    pub exercises: Vec<ExerciseId>,
    pub creator: UserId,
    pub last_shared: DateTime<Utc>,
    /// Bumped on every stored rewrite; guards against stale writers
    #[serde(default)]
    pub version: u64,
}

impl Workout {
    /// Default `last_shared` stamp: one day before `now`, so a fresh workout
    /// is immediately eligible for sharing.
    pub fn initial_last_shared(now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(1)
    }

    /// The single authorization predicate shared by every workout use case.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.creator == user_id
    }
}

/// One exercise of a workout, with derived per-set scores and PR
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    pub sets: u32,
    pub weights: Vec<f64>,
    pub reps: Vec<u32>,
    pub scores: Vec<f64>,
    pub pr: f64,
}

/// A workout with its exercises resolved, in exercise-list order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutView {
    pub workout: Workout,
    pub exercises: Vec<Exercise>,
}

// ============================================================================
// Mutation Request Types
// ============================================================================

/// Create-or-update request as submitted by the transport layer.
///
/// The exercise fields arrive as parallel arrays (`eNames[i]`, `eSets[i]`, ...)
/// and are only trusted after [`crate::validation`] has zipped them into
/// [`ExerciseEntry`] values.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub num_exercises: u32,
    #[serde(default)]
    pub e_names: Vec<Option<String>>,
    #[serde(default)]
    pub e_sets: Vec<u32>,
    #[serde(default)]
    pub e_weights: Vec<Vec<f64>>,
    #[serde(default)]
    pub e_reps: Vec<Vec<u32>>,
    #[serde(default)]
    pub num_existing_exercises: Option<u32>,
    #[serde(default)]
    pub existing_exercises: Option<Vec<ExerciseId>>,
}

/// One validated exercise tuple from a request
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseEntry {
    /// Required for created exercises; `None` on an update keeps the stored name
    pub name: Option<String>,
    pub sets: u32,
    pub weights: Vec<f64>,
    pub reps: Vec<u32>,
}

/// The exercise part of a validated request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExerciseBatch {
    pub entries: Vec<ExerciseEntry>,
    /// `existing[i]` is the record updated by `entries[i]`
    pub existing: Vec<ExerciseId>,
}

/// A request that passed validation
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedWorkout {
    pub name: Option<String>,
    pub batch: ExerciseBatch,
}
