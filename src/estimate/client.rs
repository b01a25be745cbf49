use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::schema::{ProblemAnalysis, parse_analysis, response_schema};
use crate::config::EstimatorSection;
use crate::errors::EstimateError;

const SYSTEM_PROMPT: &str = "You are an expert developer who analyzes technical problems \
    and provides practical solutions with realistic time and cost estimates.";

fn user_prompt(description: &str) -> String {
    format!(
        "Analyze the following technical problem and provide between 3 and 5 practical solutions. \
         For each solution include: a time estimate in days/weeks/months and a monetary cost \
         estimate in dollars ($). Also provide a brief summary of the overall solution approach \
         in no more than 100 characters. At the end, provide the total estimated time and cost. \
         Problem: \"{}\"",
        description
    )
}

/// Produces a structured solution analysis for a problem description.
#[async_trait]
pub trait Estimator: Send + Sync {
    /// Whether a credential is available. Checked before the request body.
    fn is_configured(&self) -> bool {
        true
    }

    async fn analyze(&self, description: &str) -> Result<ProblemAnalysis, EstimateError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// `Estimator` backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiEstimator {
    http: reqwest::Client,
    settings: EstimatorSection,
    api_key: Option<String>,
}

impl OpenAiEstimator {
    pub fn new(settings: EstimatorSection, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, description: &str) -> serde_json::Value {
        json!({
            "model": self.settings.model,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(description) }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "problem_analysis",
                    "strict": true,
                    "schema": response_schema()
                }
            }
        })
    }
}

#[async_trait]
impl Estimator for OpenAiEstimator {
    fn is_configured(&self) -> bool {
        self.has_credential()
    }

    async fn analyze(&self, description: &str) -> Result<ProblemAnalysis, EstimateError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(EstimateError::MissingCredential)?;

        debug!(model = %self.settings.model, chars = description.len(), "Requesting estimate");
        let completion = self
            .http
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("User-Agent", "civic-hero")
            .json(&self.request_body(description))
            .send()
            .await?
            .error_for_status()?
            .json::<ChatCompletion>()
            .await?;

        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| EstimateError::Schema {
                generated_text: String::new(),
                cause: "response contained no choices".to_string(),
            })?;

        match (message.content, message.refusal) {
            (Some(content), _) => parse_analysis(&content).inspect_err(|e| {
                warn!(error = %e, "Estimate did not match the analysis schema");
            }),
            (None, Some(refusal)) => Err(EstimateError::Schema {
                generated_text: String::new(),
                cause: format!("model refused: {}", refusal),
            }),
            (None, None) => Err(EstimateError::Schema {
                generated_text: String::new(),
                cause: "response contained no content".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::schema::fixtures::analysis_json;
    use axum::{Json, Router, http::StatusCode, routing::post};

    /// Serve `reply` from a local chat-completions stand-in.
    async fn upstream(status: StatusCode, reply: serde_json::Value) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(body): Json<serde_json::Value>| {
                let reply = reply.clone();
                async move {
                    assert_eq!(body["model"], "gpt-4o");
                    assert_eq!(body["response_format"]["type"], "json_schema");
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn estimator(base_url: String) -> OpenAiEstimator {
        OpenAiEstimator::new(
            EstimatorSection {
                base_url,
                ..Default::default()
            },
            Some("sk-test".into()),
        )
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let est = OpenAiEstimator::new(EstimatorSection::default(), Some("  ".into()));
        assert!(!est.has_credential());
        let err = est.analyze("leaky roof").await.unwrap_err();
        assert!(matches!(err, EstimateError::MissingCredential));
    }

    #[test]
    fn test_request_body_carries_settings_and_prompt() {
        let est = OpenAiEstimator::new(EstimatorSection::default(), None);
        let body = est.request_body("Streetlight flickers");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        let prompt = body["messages"][1]["content"].as_str().unwrap();
        assert!(prompt.contains("between 3 and 5 practical solutions"));
        assert!(prompt.ends_with("Problem: \"Streetlight flickers\""));
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let est = estimator("http://localhost:9/v1/".into());
        assert_eq!(est.endpoint(), "http://localhost:9/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_parses_structured_reply() {
        let raw = analysis_json(4).to_string();
        let base = upstream(StatusCode::OK, completion(&raw)).await;
        let analysis = estimator(base).analyze("Pothole on Main St").await.unwrap();
        assert_eq!(analysis.solutions.len(), 4);
        assert_eq!(analysis.summary, "Patch now, resurface later");
    }

    #[tokio::test]
    async fn test_schema_failure_keeps_generated_text() {
        let base = upstream(StatusCode::OK, completion("not json at all")).await;
        let err = estimator(base).analyze("x").await.unwrap_err();
        match err {
            EstimateError::Schema { generated_text, .. } => {
                assert_eq!(generated_text, "not json at all")
            }
            other => panic!("Expected Schema error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_transport() {
        let base = upstream(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": { "message": "rate limited" } }),
        )
        .await;
        let err = estimator(base).analyze("x").await.unwrap_err();
        assert!(matches!(err, EstimateError::Transport(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_is_schema_failure() {
        let base = upstream(StatusCode::OK, json!({ "choices": [] })).await;
        let err = estimator(base).analyze("x").await.unwrap_err();
        assert!(matches!(err, EstimateError::Schema { .. }));
    }
}
