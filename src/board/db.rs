use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::auth::{AccessPolicy, Credential};
use super::models::*;
use crate::errors::BoardError;

/// Async-safe handle to the board database.
///
/// Wraps `BoardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&BoardDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| BoardError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct BoardDb {
    conn: Connection,
    policy: AccessPolicy,
}

const ISSUE_COLUMNS: &str = "i.id, i.created_at, i.title, i.description, i.location, i.cost, \
     i.category_id, i.created_by, i.status, i.priority, i.fixed_by, i.likes, \
     (SELECT COUNT(*) FROM comments c WHERE c.issue_id = i.id)";

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self {
            conn,
            policy: AccessPolicy::default(),
        };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self {
            conn,
            policy: AccessPolicy::default(),
        };
        db.init()?;
        Ok(db)
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Run `f` inside one transaction: everything commits, or nothing does.
    /// `f` must not open a transaction of its own.
    pub fn in_transaction<R>(&self, f: impl FnOnce(&Self) -> Result<R>) -> Result<R> {
        // unchecked_transaction is fine: DbHandle's Mutex serializes access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let out = f(self)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(out)
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS issues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    location TEXT NOT NULL DEFAULT '',
                    cost REAL NOT NULL DEFAULT 0 CHECK (cost >= 0),
                    category_id INTEGER NOT NULL,
                    created_by TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'open'
                        CHECK (status IN ('open', 'claimed', 'resolved')),
                    priority TEXT NOT NULL DEFAULT 'medium'
                        CHECK (priority IN ('low', 'medium', 'high')),
                    fixed_by INTEGER,
                    likes INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0)
                );

                CREATE TABLE IF NOT EXISTS comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                    content TEXT NOT NULL,
                    author TEXT NOT NULL,
                    issue_id INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_issues_created ON issues(created_at);
                CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
                CREATE INDEX IF NOT EXISTS idx_comments_issue ON comments(issue_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Issue CRUD ────────────────────────────────────────────────────

    pub fn create_issue(&self, credential: &Credential, new: &NewIssue) -> Result<IssueRecord> {
        self.policy
            .authorize_write(credential, "reporting an issue")?;
        validate_new_issue(new)?;
        let id = self.insert_issue_row(new, None, 0, Utc::now())?;
        self.fetch_issue(id)?
            .context("Issue not found after insert")
    }

    /// Raw insert used by `create_issue` and the seed loader. Callers are
    /// responsible for authorization and validation.
    pub(crate) fn insert_issue_row(
        &self,
        new: &NewIssue,
        fixed_by: Option<i64>,
        likes: i64,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO issues (created_at, title, description, location, cost, category_id, created_by, status, priority, fixed_by, likes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    format_timestamp(created_at),
                    new.title,
                    new.description,
                    new.location,
                    new.cost,
                    new.category_id,
                    new.created_by,
                    new.status.as_str(),
                    new.priority.as_str(),
                    fixed_by,
                    likes,
                ],
            )
            .context("Failed to insert issue")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Issues matching `filter`, newest first, with their comment counts.
    pub fn list_issues(&self, credential: &Credential, filter: &IssueFilter) -> Result<Vec<IssueRecord>> {
        self.policy.authorize_read(credential, "listing issues")?;
        let sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues i
             WHERE (?1 IS NULL OR i.status = ?1)
               AND (?2 IS NULL OR i.priority = ?2)
               AND (?3 IS NULL OR i.category_id = ?3)
             ORDER BY i.created_at DESC, i.id DESC"
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_issues")?;
        let rows = stmt
            .query_map(
                params![filter.status, filter.priority, filter.category_id],
                IssueRow::from_row,
            )
            .context("Failed to query issues")?;
        let mut issues = Vec::new();
        for row in rows {
            let r = row.context("Failed to read issue row")?;
            issues.push(r.into_record()?);
        }
        Ok(issues)
    }

    pub fn get_issue(&self, credential: &Credential, id: i64) -> Result<Option<IssueRecord>> {
        self.policy.authorize_read(credential, "reading an issue")?;
        self.fetch_issue(id)
    }

    fn fetch_issue(&self, id: i64) -> Result<Option<IssueRecord>> {
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], IssueRow::from_row)
            .optional()
            .context("Failed to query issue")?;
        row.map(IssueRow::into_record).transpose()
    }

    fn require_issue(&self, id: i64) -> Result<IssueRecord> {
        match self.fetch_issue(id)? {
            Some(record) => Ok(record),
            None => Err(BoardError::IssueNotFound { id }.into()),
        }
    }

    pub fn update_issue(
        &self,
        credential: &Credential,
        id: i64,
        update: &IssueUpdate,
    ) -> Result<IssueRecord> {
        self.policy.authorize_write(credential, "updating an issue")?;
        validate_update(update)?;
        self.require_issue(id)?;

        // unchecked_transaction is fine: DbHandle's Mutex serializes access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        if let Some(t) = &update.title {
            tx.execute("UPDATE issues SET title = ?1 WHERE id = ?2", params![t, id])
                .context("Failed to update issue title")?;
        }
        if let Some(d) = &update.description {
            tx.execute(
                "UPDATE issues SET description = ?1 WHERE id = ?2",
                params![d, id],
            )
            .context("Failed to update issue description")?;
        }
        if let Some(l) = &update.location {
            tx.execute("UPDATE issues SET location = ?1 WHERE id = ?2", params![l, id])
                .context("Failed to update issue location")?;
        }
        if let Some(c) = update.cost {
            tx.execute("UPDATE issues SET cost = ?1 WHERE id = ?2", params![c, id])
                .context("Failed to update issue cost")?;
        }
        if let Some(c) = update.category_id {
            tx.execute(
                "UPDATE issues SET category_id = ?1 WHERE id = ?2",
                params![c, id],
            )
            .context("Failed to update issue category")?;
        }
        if let Some(s) = update.status {
            tx.execute(
                "UPDATE issues SET status = ?1 WHERE id = ?2",
                params![s.as_str(), id],
            )
            .context("Failed to update issue status")?;
        }
        if let Some(p) = update.priority {
            tx.execute(
                "UPDATE issues SET priority = ?1 WHERE id = ?2",
                params![p.as_str(), id],
            )
            .context("Failed to update issue priority")?;
        }
        if let Some(f) = update.fixed_by {
            tx.execute("UPDATE issues SET fixed_by = ?1 WHERE id = ?2", params![f, id])
                .context("Failed to update issue fixed_by")?;
        }

        tx.commit().context("Failed to commit issue update")?;
        self.fetch_issue(id)?
            .context("Issue not found after update")
    }

    pub fn delete_issue(&self, credential: &Credential, id: i64) -> Result<bool> {
        self.policy.authorize_write(credential, "deleting an issue")?;
        let count = self
            .conn
            .execute("DELETE FROM issues WHERE id = ?1", params![id])
            .context("Failed to delete issue")?;
        Ok(count > 0)
    }

    /// Single-statement increment, so concurrent likes never lose updates.
    pub fn like_issue(&self, credential: &Credential, id: i64) -> Result<IssueRecord> {
        self.policy.authorize_write(credential, "liking an issue")?;
        let count = self
            .conn
            .execute(
                "UPDATE issues SET likes = likes + 1 WHERE id = ?1",
                params![id],
            )
            .context("Failed to increment likes")?;
        if count == 0 {
            return Err(BoardError::IssueNotFound { id }.into());
        }
        self.fetch_issue(id)?
            .context("Issue not found after like")
    }

    /// Mark the issue claimed by `user_id`. Last write wins between heroes.
    pub fn claim_issue(&self, credential: &Credential, id: i64, user_id: i64) -> Result<IssueRecord> {
        self.update_issue(
            credential,
            id,
            &IssueUpdate {
                status: Some(IssueStatus::Claimed),
                fixed_by: Some(user_id),
                ..Default::default()
            },
        )
    }

    pub fn resolve_issue(&self, credential: &Credential, id: i64) -> Result<IssueRecord> {
        self.update_issue(
            credential,
            id,
            &IssueUpdate {
                status: Some(IssueStatus::Resolved),
                ..Default::default()
            },
        )
    }

    pub fn count_issues(&self, credential: &Credential) -> Result<i64> {
        self.policy.authorize_read(credential, "counting issues")?;
        self.conn
            .query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))
            .context("Failed to count issues")
    }

    /// Delete every issue (comments cascade). Operator only.
    pub fn clear_issues(&self, credential: &Credential) -> Result<usize> {
        self.policy
            .authorize_admin(credential, "clearing all issues")?;
        self.conn
            .execute("DELETE FROM issues", [])
            .context("Failed to clear issues")
    }

    // ── Comments ──────────────────────────────────────────────────────

    /// Comments on an issue, oldest first.
    pub fn list_comments(&self, credential: &Credential, issue_id: i64) -> Result<Vec<Comment>> {
        self.policy.authorize_read(credential, "listing comments")?;
        self.require_issue(issue_id)?;
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, created_at, content, author, issue_id FROM comments
                 WHERE issue_id = ?1 ORDER BY created_at ASC, id ASC",
            )
            .context("Failed to prepare list_comments")?;
        let rows = stmt
            .query_map(params![issue_id], CommentRow::from_row)
            .context("Failed to query comments")?;
        let mut comments = Vec::new();
        for row in rows {
            let r = row.context("Failed to read comment row")?;
            comments.push(r.into_comment()?);
        }
        Ok(comments)
    }

    pub fn create_comment(&self, credential: &Credential, new: &NewComment) -> Result<Comment> {
        self.policy.authorize_write(credential, "commenting")?;
        if new.content.trim().is_empty() {
            return Err(BoardError::validation("content", "must not be empty").into());
        }
        if new.author.trim().is_empty() {
            return Err(BoardError::validation("author", "must not be empty").into());
        }
        self.require_issue(new.issue_id)?;

        self.conn
            .execute(
                "INSERT INTO comments (created_at, content, author, issue_id) VALUES (?1, ?2, ?3, ?4)",
                params![
                    format_timestamp(Utc::now()),
                    new.content,
                    new.author,
                    new.issue_id
                ],
            )
            .context("Failed to insert comment")?;
        let id = self.conn.last_insert_rowid();
        self.fetch_comment(id)?
            .context("Comment not found after insert")
    }

    pub fn get_comment(&self, credential: &Credential, id: i64) -> Result<Option<Comment>> {
        self.policy.authorize_read(credential, "reading a comment")?;
        self.fetch_comment(id)
    }

    fn fetch_comment(&self, id: i64) -> Result<Option<Comment>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, created_at, content, author, issue_id FROM comments WHERE id = ?1",
                params![id],
                CommentRow::from_row,
            )
            .optional()
            .context("Failed to query comment")?;
        row.map(CommentRow::into_comment).transpose()
    }

    pub fn delete_comment(&self, credential: &Credential, id: i64) -> Result<bool> {
        self.policy.authorize_write(credential, "deleting a comment")?;
        let count = self
            .conn
            .execute("DELETE FROM comments WHERE id = ?1", params![id])
            .context("Failed to delete comment")?;
        Ok(count > 0)
    }
}

// ── Validation ────────────────────────────────────────────────────────

fn validate_cost(cost: f64) -> Result<(), BoardError> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(BoardError::validation(
            "cost",
            format!("must be a non-negative number, got {}", cost),
        ));
    }
    Ok(())
}

fn validate_new_issue(new: &NewIssue) -> Result<(), BoardError> {
    if new.title.trim().is_empty() {
        return Err(BoardError::validation("title", "must not be empty"));
    }
    if new.created_by.trim().is_empty() {
        return Err(BoardError::validation("created_by", "must not be empty"));
    }
    validate_cost(new.cost)
}

fn validate_update(update: &IssueUpdate) -> Result<(), BoardError> {
    if update.is_empty() {
        return Err(BoardError::validation("update", "no fields to change"));
    }
    if let Some(title) = &update.title
        && title.trim().is_empty()
    {
        return Err(BoardError::validation("title", "must not be empty"));
    }
    if let Some(cost) = update.cost {
        validate_cost(cost)?;
    }
    Ok(())
}

// ── Row helpers ───────────────────────────────────────────────────────

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts our own RFC 3339 output and SQLite's `datetime('now')` format.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .with_context(|| format!("Invalid timestamp '{}'", raw))
}

/// Intermediate row struct for issues.
struct IssueRow {
    id: i64,
    created_at: String,
    title: String,
    description: String,
    location: String,
    cost: f64,
    category_id: i64,
    created_by: String,
    status: String,
    priority: String,
    fixed_by: Option<i64>,
    likes: i64,
    comment_count: i64,
}

impl IssueRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            location: row.get(4)?,
            cost: row.get(5)?,
            category_id: row.get(6)?,
            created_by: row.get(7)?,
            status: row.get(8)?,
            priority: row.get(9)?,
            fixed_by: row.get(10)?,
            likes: row.get(11)?,
            comment_count: row.get(12)?,
        })
    }

    fn into_record(self) -> Result<IssueRecord> {
        let status = IssueStatus::from_str(&self.status)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse issue status")?;
        let priority = Priority::from_str(&self.priority)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse issue priority")?;
        let created_at = parse_timestamp(&self.created_at)?;

        Ok(IssueRecord {
            issue: Issue {
                id: self.id,
                created_at,
                title: self.title,
                description: self.description,
                location: self.location,
                cost: self.cost,
                category_id: self.category_id,
                created_by: self.created_by,
                status,
                priority,
                fixed_by: self.fixed_by,
                likes: self.likes,
            },
            comment_count: self.comment_count,
        })
    }
}

struct CommentRow {
    id: i64,
    created_at: String,
    content: String,
    author: String,
    issue_id: i64,
}

impl CommentRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            content: row.get(2)?,
            author: row.get(3)?,
            issue_id: row.get(4)?,
        })
    }

    fn into_comment(self) -> Result<Comment> {
        Ok(Comment {
            id: self.id,
            created_at: parse_timestamp(&self.created_at)?,
            content: self.content,
            author: self.author,
            issue_id: self.issue_id,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
