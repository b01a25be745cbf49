//! Optimistic like counters.
//!
//! A like shows up immediately (+1), then the remote call decides: success
//! adopts the server's count, failure applies the compensating −1. The
//! compensation is relative, so other likes that landed meanwhile survive.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use super::http::BoardClient;

/// The confirming side of a like.
#[async_trait]
pub trait LikeRemote: Send + Sync {
    /// Record one like and return the confirmed total.
    async fn like(&self, issue_id: i64) -> Result<i64>;
}

#[async_trait]
impl LikeRemote for BoardClient {
    async fn like(&self, issue_id: i64) -> Result<i64> {
        Ok(self.like_issue(issue_id).await?.upvotes)
    }
}

pub struct OptimisticLikes<R> {
    remote: R,
    counts: Mutex<HashMap<i64, i64>>,
}

impl<R: LikeRemote> OptimisticLikes<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            counts: Mutex::new(HashMap::new()),
        }
    }

    fn counts(&self) -> MutexGuard<'_, HashMap<i64, i64>> {
        // The map holds plain integers; a poisoned guard is still consistent.
        self.counts.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Record a count read from the server.
    pub fn observe(&self, issue_id: i64, likes: i64) {
        self.counts().insert(issue_id, likes);
    }

    /// The count to display right now, including unconfirmed likes.
    pub fn count(&self, issue_id: i64) -> Option<i64> {
        self.counts().get(&issue_id).copied()
    }

    /// Like an issue. Returns the confirmed count, or the remote error after
    /// the local increment has been compensated.
    pub async fn like(&self, issue_id: i64) -> Result<i64> {
        *self.counts().entry(issue_id).or_insert(0) += 1;

        match self.remote.like(issue_id).await {
            Ok(confirmed) => {
                self.counts().insert(issue_id, confirmed);
                Ok(confirmed)
            }
            Err(e) => {
                if let Some(count) = self.counts().get_mut(&issue_id) {
                    *count = (*count - 1).max(0);
                }
                warn!(issue_id, error = %e, "Like was not confirmed, reverted");
                Err(e)
            }
        }
    }
}
