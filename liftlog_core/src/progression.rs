//! Progression logic for user points and stars.
//!
//! Every change to a user's gamification counters goes through [`advance`]:
//! - Adding a workout: +1 workout, +points, and a star when the workout
//!   count reaches the next-star threshold
//! - Earning a star: bonus points, +1 star, and the threshold grows
//!   geometrically so each star takes longer than the last
//! - Removing a workout: -1 workout, clamped at zero

use crate::ProgressionCounters;

/// Tunable constants of the progression system
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressionRules {
    pub starting_points: u64,
    pub first_star_at: u32,
    pub points_per_workout: u64,
    pub star_bonus_points: u64,
    pub star_threshold_factor: u32,
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            starting_points: 50,
            first_star_at: 20,
            points_per_workout: 5,
            star_bonus_points: 50,
            star_threshold_factor: 2,
        }
    }
}

impl ProgressionRules {
    /// Counters of a freshly registered user
    pub fn initial_counters(&self) -> ProgressionCounters {
        ProgressionCounters {
            points: self.starting_points,
            num_workouts: 0,
            stars: 0,
            next_star: self.first_star_at.max(1),
        }
    }
}

/// Something that happened to a user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressionEvent {
    WorkoutAdded,
    WorkoutRemoved,
    /// Applied from `WorkoutAdded` when the threshold is met, or directly by
    /// an external reward action
    StarAwarded,
    /// Free-form point reward
    PointsAwarded(u64),
}

/// Compute the counters that follow `event`
pub fn advance(
    counters: &ProgressionCounters,
    event: ProgressionEvent,
    rules: &ProgressionRules,
) -> ProgressionCounters {
    let mut next = counters.clone();

    match event {
        ProgressionEvent::WorkoutAdded => {
            next.num_workouts = next.num_workouts.saturating_add(1);
            next.points = next.points.saturating_add(rules.points_per_workout);
            if next.num_workouts == next.next_star {
                award_star(&mut next, rules);
            }
        }
        ProgressionEvent::WorkoutRemoved => {
            if next.num_workouts == 0 {
                tracing::warn!("Workout removed while numWorkouts is already 0; clamping");
            } else {
                next.num_workouts -= 1;
            }
        }
        ProgressionEvent::StarAwarded => award_star(&mut next, rules),
        ProgressionEvent::PointsAwarded(increment) => {
            next.points = next.points.saturating_add(increment);
        }
    }

    next
}

fn award_star(counters: &mut ProgressionCounters, rules: &ProgressionRules) {
    counters.points = counters.points.saturating_add(rules.star_bonus_points);
    counters.stars = counters.stars.saturating_add(1);
    counters.next_star = counters
        .next_star
        .saturating_mul(rules.star_threshold_factor.max(1))
        .max(1);

    tracing::info!(
        "Star awarded: {} stars, next star at {} workouts",
        counters.stars,
        counters.next_star
    );
}
