use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::EstimateError;

pub const MAX_SUMMARY_CHARS: usize = 100;
pub const MIN_SOLUTIONS: usize = 3;
pub const MAX_SOLUTIONS: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Solution {
    pub title: String,
    pub description: String,
    pub complexity: Complexity,
    /// Free text, e.g. "2-3 days".
    pub time_estimate: String,
    /// Free text, e.g. "$500-$800".
    pub cost_estimate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProblemAnalysis {
    pub summary: String,
    pub solutions: Vec<Solution>,
    pub total_estimated_time: String,
    pub total_estimated_cost: String,
}

impl ProblemAnalysis {
    /// Checks the constraints serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        let summary_len = self.summary.chars().count();
        if summary_len > MAX_SUMMARY_CHARS {
            return Err(format!(
                "summary is {} characters, at most {} allowed",
                summary_len, MAX_SUMMARY_CHARS
            ));
        }
        let count = self.solutions.len();
        if !(MIN_SOLUTIONS..=MAX_SOLUTIONS).contains(&count) {
            return Err(format!(
                "expected {} to {} solutions, got {}",
                MIN_SOLUTIONS, MAX_SOLUTIONS, count
            ));
        }
        Ok(())
    }
}

/// Parse and validate the model's raw output. Failures keep the raw text.
pub fn parse_analysis(raw: &str) -> Result<ProblemAnalysis, EstimateError> {
    let schema_error = |cause: String| EstimateError::Schema {
        generated_text: raw.to_string(),
        cause,
    };
    let analysis: ProblemAnalysis =
        serde_json::from_str(raw).map_err(|e| schema_error(e.to_string()))?;
    analysis.validate().map_err(schema_error)?;
    Ok(analysis)
}

/// JSON schema sent as the structured-output response format.
pub fn response_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["summary", "solutions", "totalEstimatedTime", "totalEstimatedCost"],
        "properties": {
            "summary": {
                "type": "string",
                "description": "Brief summary of the overall solution approach (max 100 characters)"
            },
            "solutions": {
                "type": "array",
                "description": "List of possible solutions to the problem",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["title", "description", "complexity", "timeEstimate", "costEstimate"],
                    "properties": {
                        "title": { "type": "string", "description": "Brief title of the solution" },
                        "description": { "type": "string", "description": "Detailed description of the solution" },
                        "complexity": {
                            "type": "string",
                            "enum": ["Low", "Medium", "High"],
                            "description": "Implementation complexity level"
                        },
                        "timeEstimate": {
                            "type": "string",
                            "description": "Estimated time to implement this solution (e.g., \"2-3 days\")"
                        },
                        "costEstimate": {
                            "type": "string",
                            "description": "Estimated monetary cost to implement this solution (e.g., \"$500-$800\")"
                        }
                    }
                }
            },
            "totalEstimatedTime": { "type": "string", "description": "Total estimated time to solve the problem" },
            "totalEstimatedCost": {
                "type": "string",
                "description": "Total estimated monetary cost to solve the problem (e.g., \"$2,000-$3,500\")"
            }
        }
    })
}
