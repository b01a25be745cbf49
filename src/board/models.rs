use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage-level issue status. UI synonyms go through `rank::vocab` first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Claimed,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Claimed => "claimed",
            Self::Resolved => "resolved",
        }
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "claimed" => Ok(Self::Claimed),
            "resolved" => Ok(Self::Resolved),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// A reported community problem, exactly as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub location: String,
    pub cost: f64,
    pub category_id: i64,
    pub created_by: String,
    pub status: IssueStatus,
    pub priority: Priority,
    pub fixed_by: Option<i64>,
    pub likes: i64,
}

/// An issue together with its comment count, as returned by list/get queries.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRecord {
    pub issue: Issue,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub author: String,
    pub issue_id: i64,
}

// Storage inputs

#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub location: String,
    pub cost: f64,
    pub category_id: i64,
    pub created_by: String,
    pub status: IssueStatus,
    pub priority: Priority,
}

impl NewIssue {
    /// A fresh report: open, medium priority, no cost estimate.
    pub fn report(
        title: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
        category_id: i64,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            location: location.into(),
            cost: 0.0,
            category_id,
            created_by: created_by.into(),
            status: IssueStatus::Open,
            priority: Priority::Medium,
        }
    }
}

/// Partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub cost: Option<f64>,
    pub category_id: Option<i64>,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    pub fixed_by: Option<i64>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.cost.is_none()
            && self.category_id.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.fixed_by.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub issue_id: i64,
    pub content: String,
    pub author: String,
}

/// List filter in storage vocabulary. `None` disables a criterion.
///
/// `status` and `priority` are kept as raw strings: a value outside the
/// storage vocabulary is compared as-is and simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<i64>,
}
