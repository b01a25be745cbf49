//! Local board maintenance (`civic-hero init|seed|clear|list`).
//!
//! These run against the database file directly with operator rights.

use anyhow::{Context, Result};
use chrono::Utc;

use civic_hero::board::auth::Credential;
use civic_hero::board::models::IssueFilter;
use civic_hero::board::seed;
use civic_hero::board::server::open_db;
use civic_hero::config::{CivicConfig, CivicToml};
use civic_hero::rank::vocab::{priority_filter, status_filter};
use civic_hero::rank::{IssueView, SortOrder, sort_views, to_views};

pub struct ListArgs {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<i64>,
    pub rank: bool,
    pub json: bool,
}

pub fn cmd_init(config: &CivicConfig) -> Result<()> {
    let db_path = &config.server().db_path;
    open_db(db_path, config.access_policy())?;
    println!("Initialized civic-hero database at {}", db_path.display());

    if !config.config_path.exists() {
        CivicToml::default().save(&config.config_path)?;
        println!("Wrote default configuration to {}", config.config_path.display());
    }
    Ok(())
}

pub fn cmd_seed(config: &CivicConfig, force: bool) -> Result<()> {
    let db = open_db(&config.server().db_path, config.access_policy())?;
    let outcome = seed::populate(&db, &Credential::Operator, force, Utc::now())
        .context("Failed to seed sample issues")?;
    if outcome.skipped {
        println!(
            "Database already has {} issues; use --force to replace them.",
            outcome.total
        );
    } else {
        println!(
            "Seeded {} sample issues ({} total).",
            outcome.inserted, outcome.total
        );
    }
    Ok(())
}

pub fn cmd_clear(config: &CivicConfig) -> Result<()> {
    let db = open_db(&config.server().db_path, config.access_policy())?;
    let cleared = db.clear_issues(&Credential::Operator)?;
    println!("Cleared {} issues.", cleared);
    Ok(())
}

pub fn cmd_list(config: &CivicConfig, args: &ListArgs) -> Result<()> {
    let db = open_db(&config.server().db_path, config.access_policy())?;
    let filter = IssueFilter {
        status: status_filter(args.status.as_deref()),
        priority: priority_filter(args.priority.as_deref()),
        category_id: args.category.filter(|c| *c != 0),
    };
    let records = db.list_issues(&Credential::Operator, &filter)?;
    let mut views = to_views(records, Utc::now());
    let order = if args.rank {
        SortOrder::Rank
    } else {
        SortOrder::Newest
    };
    sort_views(&mut views, order);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("No issues found.");
        return Ok(());
    }
    for view in &views {
        print_view(view);
    }
    println!();
    println!("{} issues", views.len());
    Ok(())
}

fn print_view(view: &IssueView) {
    let issue = &view.issue;
    println!(
        "#{:<4} {:<9} {:<7} rank {:>3}  {:<16} {}",
        issue.id,
        issue.status.as_str(),
        issue.priority.as_str(),
        view.ai_rank,
        view.category,
        issue.title
    );
    let claimed = view
        .claimed_by
        .as_deref()
        .map(|c| format!(", claimed by {}", c))
        .unwrap_or_default();
    println!(
        "       {} ({} upvotes, {} comments{})",
        view.ai_summary, view.upvotes, view.comments, claimed
    );
}
