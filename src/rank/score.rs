use chrono::{DateTime, Utc};

use crate::board::models::{Issue, Priority};

const BASE_RANK: i64 = 50;
const LIKES_CAP: i64 = 20;
const SECONDS_PER_DAY: i64 = 86_400;

/// Display rank in `0..=100`.
///
/// Additive model: base 50, priority weight, capped likes bonus, the highest
/// applicable cost tier, and a recency bonus from whole days since creation
/// measured at `now`. The sum is clamped, never wrapped.
pub fn ai_rank(issue: &Issue, now: DateTime<Utc>) -> u8 {
    let rank = BASE_RANK
        + priority_weight(issue.priority)
        + likes_weight(issue.likes)
        + cost_weight(issue.cost)
        + recency_weight(age_in_days(issue.created_at, now));

    rank.clamp(0, 100) as u8
}

fn priority_weight(priority: Priority) -> i64 {
    match priority {
        Priority::High => 30,
        Priority::Medium => 15,
        Priority::Low => 5,
    }
}

fn likes_weight(likes: i64) -> i64 {
    likes.saturating_mul(2).clamp(0, LIKES_CAP)
}

fn cost_weight(cost: f64) -> i64 {
    if cost > 1000.0 {
        15
    } else if cost > 500.0 {
        10
    } else if cost > 100.0 {
        5
    } else {
        0
    }
}

fn recency_weight(age_days: i64) -> i64 {
    if age_days <= 1 {
        10
    } else if age_days <= 7 {
        5
    } else {
        0
    }
}

/// Whole days elapsed, floored. Future timestamps give a negative age.
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_seconds().div_euclid(SECONDS_PER_DAY)
}
