#![forbid(unsafe_code)]

//! Core domain model and business logic for the Liftlog workout tracker.
//!
//! This crate provides:
//! - Domain types (users, workouts, exercises, mutation requests)
//! - Request validation and per-set scoring
//! - Exercise reconciliation for workout create/update/delete
//! - Progression logic (points, stars, next-star threshold)
//! - Persistence (store traits, in-memory and JSON file stores)
//! - The workout mutation coordinator tying it all together

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod score;
pub mod validation;
pub mod progression;
pub mod store;
pub mod memory;
pub mod file_store;
pub mod reconcile;
pub mod coordinator;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use score::{score_sets, SetScores};
pub use progression::{advance, ProgressionEvent, ProgressionRules};
pub use store::{ExerciseStore, UserStore, WorkoutStore};
pub use memory::MemoryStore;
pub use file_store::FileStore;
pub use reconcile::{plan_reconciliation, ReconciliationPlan};
pub use coordinator::{UpdateOutcome, WorkoutCoordinator};
