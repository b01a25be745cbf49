use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::auth::Credential;
use super::db::DbHandle;
#[cfg(test)]
use super::db::BoardDb;
use super::models::{IssueFilter, IssueStatus, IssueUpdate, NewComment, NewIssue, Priority};
use crate::errors::{BoardError, EstimateError};
use crate::estimate::Estimator;
use crate::rank::vocab::{priority_filter, status_filter};
use crate::rank::{CATEGORIES, SortOrder, map_ui_priority, map_ui_status, sort_views, to_view, to_views};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub estimator: Arc<dyn Estimator>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListIssuesQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<i64>,
    pub sort: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub cost: Option<f64>,
    pub category_id: i64,
    pub created_by: String,
    pub status: Option<String>,
    pub priority: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateIssueRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub cost: Option<f64>,
    pub category_id: Option<i64>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub fixed_by: Option<i64>,
}

#[derive(Deserialize)]
pub struct ClaimIssueRequest {
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub author: String,
}

#[derive(Serialize)]
pub struct CategoryEntry {
    pub id: i64,
    pub name: &'static str,
}

// ── Error handling ────────────────────────────────────────────────────

const INVALID_SUMMARIZE_BODY: &str =
    "Invalid request body. Expected an object with a description property.";
const SUMMARY_FAILED: &str = "Failed to generate summary";

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
    /// The estimator answered, but not in the analysis shape.
    Analysis { generated_text: String, cause: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Analysis {
                generated_text,
                cause,
            } => {
                let body = serde_json::json!({
                    "error": "Error generating structured analysis",
                    "details": { "generatedText": generated_text, "cause": cause },
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<BoardError>() {
            Some(board @ (BoardError::IssueNotFound { .. } | BoardError::CommentNotFound { .. })) => {
                ApiError::NotFound(board.to_string())
            }
            Some(board @ BoardError::Unauthorized { .. }) => ApiError::Unauthorized(board.to_string()),
            Some(board @ BoardError::Validation { .. }) => ApiError::BadRequest(board.to_string()),
            _ => {
                error!(error = %format!("{:#}", e), "Request failed");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<EstimateError> for ApiError {
    fn from(e: EstimateError) -> Self {
        match e {
            EstimateError::MissingCredential => ApiError::Internal(e.to_string()),
            EstimateError::Schema {
                generated_text,
                cause,
            } => ApiError::Analysis {
                generated_text,
                cause,
            },
            EstimateError::Transport(msg) => {
                warn!(error = %msg, "Estimation request failed");
                ApiError::Internal(SUMMARY_FAILED.to_string())
            }
        }
    }
}

// Extractor rejections are client mistakes: 400 with the usual JSON body.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ── Extractors ────────────────────────────────────────────────────────

/// `Json` body whose rejection is an [`ApiError`].
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/categories", get(list_categories))
        .route("/api/issues", get(list_issues).post(create_issue))
        .route(
            "/api/issues/{id}",
            get(get_issue).patch(update_issue).delete(delete_issue),
        )
        .route("/api/issues/{id}/like", post(like_issue))
        .route("/api/issues/{id}/claim", post(claim_issue))
        .route("/api/issues/{id}/resolve", post(resolve_issue))
        .route(
            "/api/issues/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .route("/api/comments/{id}", delete(delete_comment))
        .route("/api/summarize", post(summarize))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// UI status token → storage enum. Unknown values are a bad request on writes.
fn parse_status(ui: &str) -> Result<IssueStatus, ApiError> {
    IssueStatus::from_str(&map_ui_status(ui)).map_err(ApiError::BadRequest)
}

fn parse_priority(ui: &str) -> Result<Priority, ApiError> {
    Priority::from_str(&map_ui_priority(ui)).map_err(ApiError::BadRequest)
}

/// A body that is not JSON at all fails the run (500); JSON without a string
/// `description` is the caller's mistake (400).
fn parse_description(body: &[u8]) -> Result<String, ApiError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Summarize body is not JSON");
        ApiError::Internal(SUMMARY_FAILED.to_string())
    })?;
    value
        .get("description")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest(INVALID_SUMMARIZE_BODY.to_string()))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_categories() -> Json<Vec<CategoryEntry>> {
    Json(
        CATEGORIES
            .iter()
            .map(|&(id, name)| CategoryEntry { id, name })
            .collect(),
    )
}

async fn list_issues(
    State(state): State<SharedState>,
    credential: Credential,
    ApiQuery(query): ApiQuery<ListIssuesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let order = match query.sort.as_deref() {
        Some(sort) => SortOrder::from_str(sort).map_err(ApiError::BadRequest)?,
        None => SortOrder::default(),
    };
    let filter = IssueFilter {
        status: status_filter(query.status.as_deref()),
        priority: priority_filter(query.priority.as_deref()),
        category_id: query.category_id.filter(|c| *c != 0),
    };
    debug!(?filter, ?order, "Listing issues");
    let records = state
        .db
        .call(move |db| db.list_issues(&credential, &filter))
        .await?;
    let mut views = to_views(records, now);
    sort_views(&mut views, order);
    Ok(Json(views))
}

async fn create_issue(
    State(state): State<SharedState>,
    credential: Credential,
    ApiJson(req): ApiJson<CreateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let mut new = NewIssue::report(
        req.title,
        req.description.unwrap_or_default(),
        req.location.unwrap_or_default(),
        req.category_id,
        req.created_by,
    );
    if let Some(cost) = req.cost {
        new.cost = cost;
    }
    if let Some(status) = &req.status {
        new.status = parse_status(status)?;
    }
    if let Some(priority) = &req.priority {
        new.priority = parse_priority(priority)?;
    }
    let record = state
        .db
        .call(move |db| db.create_issue(&credential, &new))
        .await?;
    debug!(id = record.issue.id, "Issue reported");
    Ok((StatusCode::CREATED, Json(to_view(record, now))))
}

async fn get_issue(
    State(state): State<SharedState>,
    credential: Credential,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let record = state
        .db
        .call(move |db| db.get_issue(&credential, id))
        .await?;
    match record {
        Some(record) => Ok(Json(to_view(record, now))),
        None => Err(ApiError::NotFound(format!("Issue {} not found", id))),
    }
}

async fn update_issue(
    State(state): State<SharedState>,
    credential: Credential,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let update = IssueUpdate {
        title: req.title,
        description: req.description,
        location: req.location,
        cost: req.cost,
        category_id: req.category_id,
        status: req.status.as_deref().map(parse_status).transpose()?,
        priority: req.priority.as_deref().map(parse_priority).transpose()?,
        fixed_by: req.fixed_by,
    };
    let record = state
        .db
        .call(move |db| db.update_issue(&credential, id, &update))
        .await?;
    Ok(Json(to_view(record, now)))
}

async fn delete_issue(
    State(state): State<SharedState>,
    credential: Credential,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .call(move |db| db.delete_issue(&credential, id))
        .await?;
    match deleted {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(ApiError::NotFound(format!("Issue {} not found", id))),
    }
}

async fn like_issue(
    State(state): State<SharedState>,
    credential: Credential,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let record = state
        .db
        .call(move |db| db.like_issue(&credential, id))
        .await?;
    Ok(Json(to_view(record, now)))
}

async fn claim_issue(
    State(state): State<SharedState>,
    credential: Credential,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ClaimIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let user_id = req.user_id;
    let record = state
        .db
        .call(move |db| db.claim_issue(&credential, id, user_id))
        .await?;
    debug!(id, user_id, "Issue claimed");
    Ok(Json(to_view(record, now)))
}

async fn resolve_issue(
    State(state): State<SharedState>,
    credential: Credential,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let record = state
        .db
        .call(move |db| db.resolve_issue(&credential, id))
        .await?;
    debug!(id, "Issue resolved");
    Ok(Json(to_view(record, now)))
}

async fn list_comments(
    State(state): State<SharedState>,
    credential: Credential,
    ApiPath(issue_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = state
        .db
        .call(move |db| db.list_comments(&credential, issue_id))
        .await?;
    Ok(Json(comments))
}

async fn create_comment(
    State(state): State<SharedState>,
    credential: Credential,
    ApiPath(issue_id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewComment {
        issue_id,
        content: req.content,
        author: req.author,
    };
    let comment = state
        .db
        .call(move |db| db.create_comment(&credential, &new))
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn delete_comment(
    State(state): State<SharedState>,
    credential: Credential,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .call(move |db| db.delete_comment(&credential, id))
        .await?;
    match deleted {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(ApiError::NotFound(format!("Comment {} not found", id))),
    }
}

/// The body is taken raw so the credential check runs before it is read.
async fn summarize(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if !state.estimator.is_configured() {
        return Err(EstimateError::MissingCredential.into());
    }
    let description = parse_description(&body)?;
    let analysis = state.estimator.analyze(&description).await?;
    Ok(Json(analysis))
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::auth::AccessPolicy;
    use crate::estimate::ProblemAnalysis;
    use crate::estimate::schema::fixtures::analysis_json;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[derive(Clone, Copy)]
    enum Reply {
        Analysis,
        Garbled,
        Offline,
    }

    struct StubEstimator {
        configured: bool,
        reply: Reply,
    }

    #[async_trait]
    impl Estimator for StubEstimator {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn analyze(&self, description: &str) -> Result<ProblemAnalysis, EstimateError> {
            match self.reply {
                Reply::Analysis => {
                    let mut analysis: ProblemAnalysis =
                        serde_json::from_value(analysis_json(3)).unwrap();
                    analysis.summary = format!("Fix: {}", description);
                    Ok(analysis)
                }
                Reply::Garbled => Err(EstimateError::Schema {
                    generated_text: "{\"summary\": 1}".into(),
                    cause: "invalid type".into(),
                }),
                Reply::Offline => Err(EstimateError::Transport("connection refused".into())),
            }
        }
    }

    fn app_with(policy: AccessPolicy, estimator: StubEstimator) -> Router {
        let db = BoardDb::new_in_memory().unwrap().with_policy(policy);
        let state = Arc::new(AppState {
            db: DbHandle::new(db),
            estimator: Arc::new(estimator),
        });
        api_router().with_state(state)
    }

    fn test_app() -> Router {
        app_with(
            AccessPolicy::default(),
            StubEstimator {
                configured: true,
                reply: Reply::Analysis,
            },
        )
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn authed(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("authorization", "Bearer session-token")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create(app: &Router, body: serde_json::Value) -> serde_json::Value {
        let response = app
            .clone()
            .oneshot(authed("POST", "/api/issues", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response.into_body()).await
    }

    fn pothole() -> serde_json::Value {
        serde_json::json!({
            "title": "Pothole on Main St",
            "description": "Deep hole near the crosswalk",
            "location": "Main St & 3rd",
            "category_id": 1,
            "created_by": "ana@example.com"
        })
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = test_app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_list_categories() {
        let response = test_app().oneshot(get("/api/categories")).await.unwrap();
        let categories: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(categories.len(), 8);
        assert_eq!(categories[0]["name"], "Infrastructure");
        assert_eq!(categories[7]["id"], 8);
    }

    #[tokio::test]
    async fn test_create_issue_applies_defaults() {
        let app = test_app();
        let view = create(&app, pothole()).await;
        assert_eq!(view["status"], "open");
        assert_eq!(view["priority"], "medium");
        assert_eq!(view["cost"], 0.0);
        assert_eq!(view["likes"], 0);
        assert_eq!(view["category"], "Infrastructure");
        assert_eq!(view["reportedBy"], "ana@example.com");
        assert_eq!(view["comments"], 0);
        assert!(view["aiRank"].as_u64().unwrap() >= 50);
    }

    async fn assert_json_bad_request(app: &Router, request: Request<Body>) -> String {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let err: serde_json::Value = body_json(response.into_body()).await;
        err["error"].as_str().expect("error message").to_string()
    }

    #[tokio::test]
    async fn test_malformed_requests_are_json_bad_requests() {
        let app = test_app();

        let message = assert_json_bad_request(
            &app,
            authed("POST", "/api/issues", serde_json::json!({"title": "x"})),
        )
        .await;
        assert!(message.contains("category_id"), "{}", message);

        assert_json_bad_request(&app, get("/api/issues?category_id=all")).await;
        assert_json_bad_request(&app, get("/api/issues/abc")).await;

        let no_content_type = Request::builder()
            .method("POST")
            .uri("/api/issues/1/comments")
            .header("authorization", "Bearer session-token")
            .body(Body::from(r#"{"content": "hi", "author": "ana"}"#))
            .unwrap();
        assert_json_bad_request(&app, no_content_type).await;

        let broken = Request::builder()
            .method("PATCH")
            .uri("/api/issues/1")
            .header("content-type", "application/json")
            .header("authorization", "Bearer session-token")
            .body(Body::from("{\"title\": "))
            .unwrap();
        assert_json_bad_request(&app, broken).await;
    }

    #[tokio::test]
    async fn test_create_issue_maps_ui_vocabulary() {
        let app = test_app();
        let mut body = pothole();
        body["priority"] = "urgent".into();
        body["status"] = "in_progress".into();
        let view = create(&app, body).await;
        assert_eq!(view["priority"], "high");
        assert_eq!(view["status"], "claimed");
    }

    #[tokio::test]
    async fn test_create_issue_rejects_unknown_priority() {
        let mut body = pothole();
        body["priority"] = "whenever".into();
        let response = test_app()
            .oneshot(authed("POST", "/api/issues", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(err["error"], "Invalid priority: whenever");
    }

    #[tokio::test]
    async fn test_anonymous_write_is_unauthorized() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/issues")
            .header("content-type", "application/json")
            .body(Body::from(pothole().to_string()))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_open_policy_accepts_anonymous_write() {
        let app = app_with(
            AccessPolicy {
                allow_anonymous_writes: true,
            },
            StubEstimator {
                configured: true,
                reply: Reply::Analysis,
            },
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/issues")
            .header("content-type", "application/json")
            .body(Body::from(pothole().to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_get_issue_not_found() {
        let response = test_app().oneshot(get("/api/issues/999")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(err["error"], "Issue 999 not found");
    }

    #[tokio::test]
    async fn test_list_filters_through_vocabulary() {
        let app = test_app();
        let mut urgent = pothole();
        urgent["priority"] = "high".into();
        create(&app, urgent).await;
        let mut park = pothole();
        park["title"] = "Broken swing".into();
        park["category_id"] = 6.into();
        park["priority"] = "low".into();
        create(&app, park).await;

        let response = app
            .clone()
            .oneshot(get("/api/issues?priority=urgent"))
            .await
            .unwrap();
        let views: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0]["title"], "Pothole on Main St");

        let response = app
            .clone()
            .oneshot(get("/api/issues?status=all&priority=all&category_id=0"))
            .await
            .unwrap();
        let views: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(views.len(), 2);

        let response = app
            .clone()
            .oneshot(get("/api/issues?category_id=6"))
            .await
            .unwrap();
        let views: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0]["category"], "Recreation");

        let response = app
            .oneshot(get("/api/issues?status=archived"))
            .await
            .unwrap();
        let views: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_rank() {
        let app = test_app();
        let mut low = pothole();
        low["priority"] = "low".into();
        create(&app, low).await;
        let mut high = pothole();
        high["title"] = "Water main burst".into();
        high["priority"] = "high".into();
        create(&app, high).await;
        let mut first = pothole();
        first["title"] = "Faded sign".into();
        first["priority"] = "low".into();
        create(&app, first).await;

        let response = app
            .clone()
            .oneshot(get("/api/issues?sort=rank"))
            .await
            .unwrap();
        let views: Vec<serde_json::Value> = body_json(response.into_body()).await;
        let ranks: Vec<u64> = views.iter().map(|v| v["aiRank"].as_u64().unwrap()).collect();
        assert_eq!(views[0]["title"], "Water main burst");
        assert!(ranks.windows(2).all(|w| w[0] >= w[1]));

        let response = app.oneshot(get("/api/issues?sort=loudest")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_like_increments() {
        let app = test_app();
        let id = create(&app, pothole()).await["id"].as_i64().unwrap();
        let uri = format!("/api/issues/{}/like", id);
        for expected in 1..=2 {
            let response = app
                .clone()
                .oneshot(authed("POST", &uri, serde_json::json!({})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let view: serde_json::Value = body_json(response.into_body()).await;
            assert_eq!(view["likes"], expected);
            assert_eq!(view["upvotes"], expected);
        }
    }

    #[tokio::test]
    async fn test_claim_then_resolve() {
        let app = test_app();
        let id = create(&app, pothole()).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(authed(
                "POST",
                &format!("/api/issues/{}/claim", id),
                serde_json::json!({"user_id": 42}),
            ))
            .await
            .unwrap();
        let view: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(view["status"], "claimed");
        assert_eq!(view["fixed_by"], 42);
        assert_eq!(view["claimedBy"], "User 42");

        let response = app
            .oneshot(authed(
                "POST",
                &format!("/api/issues/{}/resolve", id),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        let view: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(view["status"], "resolved");
        assert_eq!(view["fixed_by"], 42);
    }

    #[tokio::test]
    async fn test_update_issue_partial() {
        let app = test_app();
        let id = create(&app, pothole()).await["id"].as_i64().unwrap();
        let response = app
            .clone()
            .oneshot(authed(
                "PATCH",
                &format!("/api/issues/{}", id),
                serde_json::json!({"cost": 1500.0, "priority": "urgent"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let view: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(view["cost"], 1500.0);
        assert_eq!(view["priority"], "high");
        assert_eq!(view["title"], "Pothole on Main St");

        let response = app
            .oneshot(authed(
                "PATCH",
                &format!("/api/issues/{}", id),
                serde_json::json!({"cost": -5.0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_issue() {
        let app = test_app();
        let id = create(&app, pothole()).await["id"].as_i64().unwrap();
        let uri = format!("/api/issues/{}", id);

        let response = app
            .clone()
            .oneshot(authed("DELETE", &uri, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(authed("DELETE", &uri, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_comments_flow() {
        let app = test_app();
        let id = create(&app, pothole()).await["id"].as_i64().unwrap();
        let uri = format!("/api/issues/{}/comments", id);

        for content in ["I saw it too", "Still there today"] {
            let response = app
                .clone()
                .oneshot(authed(
                    "POST",
                    &uri,
                    serde_json::json!({"content": content, "author": "ben"}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app.clone().oneshot(get(&uri)).await.unwrap();
        let comments: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0]["content"], "I saw it too");

        let response = app
            .clone()
            .oneshot(get(&format!("/api/issues/{}", id)))
            .await
            .unwrap();
        let view: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(view["comments"], 2);

        let comment_id = comments[0]["id"].as_i64().unwrap();
        let response = app
            .clone()
            .oneshot(authed(
                "DELETE",
                &format!("/api/comments/{}", comment_id),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(get("/api/issues/999/comments")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_summarize_returns_analysis() {
        let response = test_app()
            .oneshot(authed(
                "POST",
                "/api/summarize",
                serde_json::json!({"description": "Leaking hydrant"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let analysis: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(analysis["summary"], "Fix: Leaking hydrant");
        assert_eq!(analysis["solutions"].as_array().unwrap().len(), 3);
        assert!(analysis["totalEstimatedCost"].is_string());
    }

    #[tokio::test]
    async fn test_summarize_rejects_bad_body() {
        for body in [r#"{"text": "x"}"#, r#"{"description": 5}"#, "[]"] {
            let request = Request::builder()
                .method("POST")
                .uri("/api/summarize")
                .body(Body::from(body))
                .unwrap();
            let response = test_app().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let err: serde_json::Value = body_json(response.into_body()).await;
            assert_eq!(err["error"], INVALID_SUMMARIZE_BODY);
        }
    }

    #[tokio::test]
    async fn test_summarize_unreadable_body_fails_the_run() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/summarize")
            .body(Body::from("not json"))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(err["error"], SUMMARY_FAILED);
    }

    #[tokio::test]
    async fn test_summarize_without_credential() {
        let app = app_with(
            AccessPolicy::default(),
            StubEstimator {
                configured: false,
                reply: Reply::Analysis,
            },
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/summarize")
            .body(Body::from("not even json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(err["error"], "OpenAI API key is not configured");
    }

    #[tokio::test]
    async fn test_summarize_schema_failure_has_details() {
        let app = app_with(
            AccessPolicy::default(),
            StubEstimator {
                configured: true,
                reply: Reply::Garbled,
            },
        );
        let response = app
            .oneshot(authed(
                "POST",
                "/api/summarize",
                serde_json::json!({"description": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(err["error"], "Error generating structured analysis");
        assert_eq!(err["details"]["generatedText"], "{\"summary\": 1}");
        assert_eq!(err["details"]["cause"], "invalid type");
    }

    #[tokio::test]
    async fn test_summarize_transport_failure() {
        let app = app_with(
            AccessPolicy::default(),
            StubEstimator {
                configured: true,
                reply: Reply::Offline,
            },
        );
        let response = app
            .oneshot(authed(
                "POST",
                "/api/summarize",
                serde_json::json!({"description": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(err["error"], "Failed to generate summary");
    }
}
