use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::board::models::Comment;
use crate::estimate::ProblemAnalysis;
use crate::rank::IssueView;

/// List parameters in UI vocabulary; the server maps them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueReport {
    pub title: String,
    pub description: String,
    pub location: String,
    pub category_id: i64,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// Typed client for the board's HTTP API.
#[derive(Clone)]
pub struct BoardClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BoardClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Session token sent as `Authorization: Bearer` on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("User-Agent", "civic-hero");
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    pub async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<IssueView>> {
        let resp = self
            .request(reqwest::Method::GET, "/api/issues")
            .query(query)
            .send()
            .await
            .context("Failed to list issues")?;
        read_json(resp).await
    }

    pub async fn get_issue(&self, id: i64) -> Result<IssueView> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/api/issues/{}", id))
            .send()
            .await
            .with_context(|| format!("Failed to fetch issue {}", id))?;
        read_json(resp).await
    }

    pub async fn report_issue(&self, report: &IssueReport) -> Result<IssueView> {
        let resp = self
            .request(reqwest::Method::POST, "/api/issues")
            .json(report)
            .send()
            .await
            .context("Failed to report issue")?;
        read_json(resp).await
    }

    pub async fn like_issue(&self, id: i64) -> Result<IssueView> {
        let resp = self
            .request(reqwest::Method::POST, &format!("/api/issues/{}/like", id))
            .send()
            .await
            .with_context(|| format!("Failed to like issue {}", id))?;
        read_json(resp).await
    }

    pub async fn claim_issue(&self, id: i64, user_id: i64) -> Result<IssueView> {
        let resp = self
            .request(reqwest::Method::POST, &format!("/api/issues/{}/claim", id))
            .json(&serde_json::json!({ "user_id": user_id }))
            .send()
            .await
            .with_context(|| format!("Failed to claim issue {}", id))?;
        read_json(resp).await
    }

    pub async fn resolve_issue(&self, id: i64) -> Result<IssueView> {
        let resp = self
            .request(reqwest::Method::POST, &format!("/api/issues/{}/resolve", id))
            .send()
            .await
            .with_context(|| format!("Failed to resolve issue {}", id))?;
        read_json(resp).await
    }

    pub async fn list_comments(&self, issue_id: i64) -> Result<Vec<Comment>> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/api/issues/{}/comments", issue_id),
            )
            .send()
            .await
            .context("Failed to list comments")?;
        read_json(resp).await
    }

    pub async fn add_comment(&self, issue_id: i64, content: &str, author: &str) -> Result<Comment> {
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/api/issues/{}/comments", issue_id),
            )
            .json(&serde_json::json!({ "content": content, "author": author }))
            .send()
            .await
            .context("Failed to add comment")?;
        read_json(resp).await
    }

    pub async fn summarize(&self, description: &str) -> Result<ProblemAnalysis> {
        let resp = self
            .request(reqwest::Method::POST, "/api/summarize")
            .json(&serde_json::json!({ "description": description }))
            .send()
            .await
            .context("Failed to request estimate")?;
        read_json(resp).await
    }
}

/// Decode a success body, or turn the server's `{"error": ..}` into an error.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<T>().await.context("Failed to decode response");
    }
    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    let message = body
        .get("error")
        .and_then(|e| e.as_str())
        .unwrap_or("request failed");
    anyhow::bail!("Server returned {}: {}", status, message)
}
