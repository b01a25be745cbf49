use crate::board::models::{Issue, Priority};

use super::category::category_name;

/// Likes above this mark the issue as having community interest.
const INTEREST_THRESHOLD: i64 = 5;

/// One-line synthesized description, e.g.
/// `"Critical infrastructure issue requiring immediate attention. High community interest."`
pub fn ai_summary(issue: &Issue) -> String {
    let (adjective, urgency) = match issue.priority {
        Priority::High => ("Critical", "requiring immediate attention"),
        Priority::Medium => ("Important", "needing prompt resolution"),
        Priority::Low => ("Standard", "for community improvement"),
    };
    let category = category_name(issue.category_id).to_lowercase();

    let mut summary = format!("{} {} issue {}.", adjective, category, urgency);
    if issue.likes > INTEREST_THRESHOLD {
        summary.push_str(" High community interest.");
    }
    summary
}
