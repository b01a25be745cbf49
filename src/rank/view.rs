use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::models::{Issue, IssueRecord};

use super::{ai_rank, ai_summary, category_name};

/// Display-facing issue. Recomputed on every read, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueView {
    #[serde(flatten)]
    pub issue: Issue,
    pub category: String,
    #[serde(rename = "reportedBy")]
    pub reported_by: String,
    #[serde(rename = "claimedBy")]
    pub claimed_by: Option<String>,
    pub comments: i64,
    pub upvotes: i64,
    #[serde(rename = "aiSummary")]
    pub ai_summary: String,
    #[serde(rename = "aiRank")]
    pub ai_rank: u8,
}

/// Build the view for one stored issue, evaluated at `now`.
pub fn to_view(record: IssueRecord, now: DateTime<Utc>) -> IssueView {
    let IssueRecord {
        issue,
        comment_count,
    } = record;
    IssueView {
        category: category_name(issue.category_id).to_string(),
        reported_by: issue.created_by.clone(),
        // User id 0 is never a real claimant.
        claimed_by: issue
            .fixed_by
            .filter(|user| *user != 0)
            .map(|user| format!("User {}", user)),
        comments: comment_count,
        upvotes: issue.likes,
        ai_summary: ai_summary(&issue),
        ai_rank: ai_rank(&issue, now),
        issue,
    }
}

pub fn to_views(records: Vec<IssueRecord>, now: DateTime<Utc>) -> Vec<IssueView> {
    records.into_iter().map(|r| to_view(r, now)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// `created_at` descending, as storage returns them.
    #[default]
    Newest,
    /// `aiRank` descending, newest first among equal ranks.
    Rank,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "rank" => Ok(Self::Rank),
            _ => Err(format!("Invalid sort order: {}", s)),
        }
    }
}

pub fn sort_views(views: &mut [IssueView], order: SortOrder) {
    match order {
        SortOrder::Newest => views.sort_by(|a, b| {
            b.issue
                .created_at
                .cmp(&a.issue.created_at)
                .then(b.issue.id.cmp(&a.issue.id))
        }),
        SortOrder::Rank => views.sort_by(|a, b| {
            b.ai_rank
                .cmp(&a.ai_rank)
                .then(b.issue.created_at.cmp(&a.issue.created_at))
                .then(b.issue.id.cmp(&a.issue.id))
        }),
    }
}
