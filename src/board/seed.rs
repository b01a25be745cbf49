//! Sample civic issues for demos and local development.
//!
//! Seeding is an operator-only tool: it refuses to touch a table that already
//! has data unless asked to clear it first.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::auth::Credential;
use super::db::BoardDb;
use super::models::IssueStatus::{Claimed, Open, Resolved};
use super::models::Priority::{High, Low, Medium};
use super::models::{IssueStatus, NewIssue, Priority};

struct SampleIssue {
    title: &'static str,
    description: &'static str,
    location: &'static str,
    cost: f64,
    category_id: i64,
    created_by: &'static str,
    status: IssueStatus,
    priority: Priority,
    fixed_by: Option<i64>,
    likes: i64,
    age_days: i64,
}

const SAMPLE_ISSUES: &[SampleIssue] = &[
    SampleIssue {
        title: "Large pothole on Main Street",
        description: "Deep pothole causing damage to vehicles. Located near the intersection with Oak Avenue. Multiple residents have reported tire damage.",
        location: "Main Street & Oak Avenue",
        cost: 500.0,
        category_id: 1,
        created_by: "sarah.johnson@email.com",
        status: Open,
        priority: High,
        fixed_by: None,
        likes: 12,
        age_days: 0,
    },
    SampleIssue {
        title: "Broken water main flooding street",
        description: "Water main burst on Elm Street causing significant flooding and road closure. Water pressure affected in surrounding area.",
        location: "Elm Street, Block 400",
        cost: 2500.0,
        category_id: 1,
        created_by: "mike.chen@email.com",
        status: Open,
        priority: High,
        fixed_by: None,
        likes: 25,
        age_days: 1,
    },
    SampleIssue {
        title: "Damaged sidewalk creating trip hazard",
        description: "Cracked and uneven sidewalk on Pine Avenue. Several elderly residents have nearly fallen.",
        location: "Pine Avenue, near bus stop",
        cost: 800.0,
        category_id: 1,
        created_by: "lisa.wong@email.com",
        status: Claimed,
        priority: Medium,
        fixed_by: Some(2),
        likes: 8,
        age_days: 3,
    },
    SampleIssue {
        title: "Broken playground equipment",
        description: "Swing set has broken chains, potential safety hazard for children. Playground needs immediate attention.",
        location: "Central Park Playground",
        cost: 200.0,
        category_id: 2,
        created_by: "emma.davis@email.com",
        status: Claimed,
        priority: High,
        fixed_by: Some(1),
        likes: 18,
        age_days: 2,
    },
    SampleIssue {
        title: "Missing stop sign at intersection",
        description: "Stop sign was knocked down by vehicle last week. Intersection is now dangerous for pedestrians and drivers.",
        location: "Oak Street & 3rd Avenue",
        cost: 75.0,
        category_id: 2,
        created_by: "david.kim@email.com",
        status: Open,
        priority: High,
        fixed_by: None,
        likes: 22,
        age_days: 5,
    },
    SampleIssue {
        title: "Broken fence around construction site",
        description: "Fence around active construction site has gaps. Children could access dangerous area.",
        location: "Downtown Construction Zone",
        cost: 300.0,
        category_id: 2,
        created_by: "alex.thompson@email.com",
        status: Resolved,
        priority: High,
        fixed_by: Some(4),
        likes: 14,
        age_days: 12,
    },
    SampleIssue {
        title: "Overflowing trash bins in park",
        description: "Trash bins in Riverside Park are consistently overflowing. Attracting pests and creating unsanitary conditions.",
        location: "Riverside Park",
        cost: 50.0,
        category_id: 3,
        created_by: "robert.brown@email.com",
        status: Open,
        priority: Medium,
        fixed_by: None,
        likes: 9,
        age_days: 4,
    },
    SampleIssue {
        title: "Illegal dumping in vacant lot",
        description: "Large appliances and construction debris dumped in vacant lot. Environmental and safety concern.",
        location: "Vacant lot on Maple Street",
        cost: 400.0,
        category_id: 3,
        created_by: "carlos.rivera@email.com",
        status: Claimed,
        priority: Medium,
        fixed_by: Some(6),
        likes: 11,
        age_days: 9,
    },
    SampleIssue {
        title: "Broken traffic signal",
        description: "Traffic light stuck on red, causing significant traffic delays during rush hour.",
        location: "Main Street & 5th Avenue",
        cost: 800.0,
        category_id: 4,
        created_by: "nancy.white@email.com",
        status: Open,
        priority: High,
        fixed_by: None,
        likes: 20,
        age_days: 0,
    },
    SampleIssue {
        title: "Faded crosswalk markings",
        description: "Crosswalk markings at school zone are barely visible. Safety concern for children crossing.",
        location: "School Zone, Elm Street",
        cost: 200.0,
        category_id: 4,
        created_by: "kevin.jones@email.com",
        status: Open,
        priority: Medium,
        fixed_by: None,
        likes: 13,
        age_days: 6,
    },
    SampleIssue {
        title: "Library heating system broken",
        description: "Heating system in public library not working. Building too cold for patrons and staff.",
        location: "Public Library",
        cost: 1200.0,
        category_id: 5,
        created_by: "michael.wilson@email.com",
        status: Claimed,
        priority: High,
        fixed_by: Some(8),
        likes: 16,
        age_days: 2,
    },
    SampleIssue {
        title: "Post office accessibility ramp damaged",
        description: "Wheelchair ramp at post office has large crack. Not safe for wheelchair users.",
        location: "Main Post Office",
        cost: 600.0,
        category_id: 5,
        created_by: "linda.taylor@email.com",
        status: Open,
        priority: Medium,
        fixed_by: None,
        likes: 8,
        age_days: 15,
    },
    SampleIssue {
        title: "Basketball court needs resurfacing",
        description: "Basketball court surface is cracked and uneven. Players risk injury from poor court conditions.",
        location: "Community Recreation Center",
        cost: 2000.0,
        category_id: 6,
        created_by: "michelle.thomas@email.com",
        status: Open,
        priority: Medium,
        fixed_by: None,
        likes: 12,
        age_days: 20,
    },
    SampleIssue {
        title: "Broken water fountain in park",
        description: "Water fountain in Central Park not working. No water source available for park visitors.",
        location: "Central Park",
        cost: 250.0,
        category_id: 6,
        created_by: "daniel.jackson@email.com",
        status: Resolved,
        priority: Low,
        fixed_by: Some(9),
        likes: 7,
        age_days: 30,
    },
    SampleIssue {
        title: "Abandoned house attracting vandalism",
        description: "Abandoned house on Maple Street has broken windows and is attracting vandals and pests.",
        location: "123 Maple Street",
        cost: 800.0,
        category_id: 7,
        created_by: "barbara.martinez@email.com",
        status: Open,
        priority: Medium,
        fixed_by: None,
        likes: 10,
        age_days: 8,
    },
    SampleIssue {
        title: "Stray dog pack in neighborhood",
        description: "Pack of stray dogs roaming residential area. Residents concerned about safety, especially for children.",
        location: "Pine Street Neighborhood",
        cost: 300.0,
        category_id: 8,
        created_by: "sarah.rodriguez@email.com",
        status: Open,
        priority: Medium,
        fixed_by: None,
        likes: 15,
        age_days: 1,
    },
    SampleIssue {
        title: "Community garden vandalism",
        description: "Community garden plots have been vandalized. Plants destroyed and tools stolen.",
        location: "Community Garden, 5th Street",
        cost: 150.0,
        category_id: 8,
        created_by: "mary.johnson@email.com",
        status: Open,
        priority: Low,
        fixed_by: None,
        likes: 5,
        age_days: 10,
    },
];

pub fn sample_count() -> usize {
    SAMPLE_ISSUES.len()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedOutcome {
    pub inserted: usize,
    /// Issues in the table once seeding finished (or was skipped).
    pub total: i64,
    pub skipped: bool,
}

/// Insert the sample issues, backdated relative to `now`.
///
/// Skips when the table already holds issues. With `force`, clears first.
/// The clear and every insert share one transaction, so a failure leaves the
/// table as it was.
pub fn populate(
    db: &BoardDb,
    credential: &Credential,
    force: bool,
    now: DateTime<Utc>,
) -> Result<SeedOutcome> {
    db.policy().authorize_admin(credential, "seeding sample issues")?;
    db.in_transaction(|db| insert_samples(db, credential, force, now))
}

fn insert_samples(
    db: &BoardDb,
    credential: &Credential,
    force: bool,
    now: DateTime<Utc>,
) -> Result<SeedOutcome> {
    if force {
        let cleared = db.clear_issues(credential)?;
        info!(cleared, "Clearing issues before seeding");
    }

    let existing = db.count_issues(credential)?;
    if existing > 0 {
        warn!(existing, "Issues table already has data, skipping seed");
        return Ok(SeedOutcome {
            inserted: 0,
            total: existing,
            skipped: true,
        });
    }

    for sample in SAMPLE_ISSUES {
        let new = NewIssue {
            title: sample.title.to_string(),
            description: sample.description.to_string(),
            location: sample.location.to_string(),
            cost: sample.cost,
            category_id: sample.category_id,
            created_by: sample.created_by.to_string(),
            status: sample.status,
            priority: sample.priority,
        };
        let created_at = now - Duration::days(sample.age_days);
        db.insert_issue_row(&new, sample.fixed_by, sample.likes, created_at)?;
    }

    let total = db.count_issues(credential)?;
    info!(inserted = SAMPLE_ISSUES.len(), total, "Seeded sample issues");
    Ok(SeedOutcome {
        inserted: SAMPLE_ISSUES.len(),
        total,
        skipped: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::models::IssueFilter;

    #[test]
    fn test_populate_inserts_every_sample() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let outcome = populate(&db, &Credential::Operator, false, Utc::now())?;
        assert_eq!(outcome.inserted, sample_count());
        assert_eq!(outcome.total, sample_count() as i64);
        assert!(!outcome.skipped);

        let claimed = db.list_issues(
            &Credential::Operator,
            &IssueFilter {
                status: Some("claimed".into()),
                ..Default::default()
            },
        )?;
        assert!(claimed.iter().all(|r| r.issue.fixed_by.is_some()));
        Ok(())
    }

    #[test]
    fn test_populate_skips_when_data_exists() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        populate(&db, &Credential::Operator, false, Utc::now())?;
        let again = populate(&db, &Credential::Operator, false, Utc::now())?;
        assert!(again.skipped);
        assert_eq!(again.inserted, 0);
        assert_eq!(db.count_issues(&Credential::Operator)?, sample_count() as i64);
        Ok(())
    }

    #[test]
    fn test_force_repopulates() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        populate(&db, &Credential::Operator, false, Utc::now())?;
        let forced = populate(&db, &Credential::Operator, true, Utc::now())?;
        assert!(!forced.skipped);
        assert_eq!(db.count_issues(&Credential::Operator)?, sample_count() as i64);
        Ok(())
    }

    #[test]
    fn test_populate_requires_operator() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        assert!(populate(&db, &Credential::bearer("t"), false, Utc::now()).is_err());
        assert_eq!(db.count_issues(&Credential::Operator)?, 0);
        Ok(())
    }

    const FAIL_ON_FOURTH_SAMPLE: &str = "
        CREATE TRIGGER fail_fourth_sample BEFORE INSERT ON issues
        WHEN NEW.title = 'Broken playground equipment'
        BEGIN SELECT RAISE(ABORT, 'disk full'); END;";

    #[test]
    fn test_failed_seed_inserts_nothing() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        db.conn().execute_batch(FAIL_ON_FOURTH_SAMPLE)?;
        assert!(populate(&db, &Credential::Operator, false, Utc::now()).is_err());
        assert_eq!(db.count_issues(&Credential::Operator)?, 0);
        Ok(())
    }

    #[test]
    fn test_failed_forced_seed_keeps_existing_issues() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        populate(&db, &Credential::Operator, false, Utc::now())?;
        db.conn().execute_batch(FAIL_ON_FOURTH_SAMPLE)?;
        assert!(populate(&db, &Credential::Operator, true, Utc::now()).is_err());
        assert_eq!(db.count_issues(&Credential::Operator)?, sample_count() as i64);
        Ok(())
    }

    #[test]
    fn test_samples_are_backdated() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let now = Utc::now();
        populate(&db, &Credential::Operator, false, now)?;
        let all = db.list_issues(&Credential::Operator, &IssueFilter::default())?;
        let oldest = all.last().expect("seeded issues");
        assert_eq!(oldest.issue.title, "Broken water fountain in park");
        assert!(now - oldest.issue.created_at >= Duration::days(30));
        Ok(())
    }
}
