//! AI cost/time estimation for a problem description.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `schema` | `ProblemAnalysis` shape, validation and the JSON schema sent upstream |
//! | `client` | `Estimator` trait and the chat-completions implementation |

pub mod client;
pub mod schema;

pub use client::{Estimator, OpenAiEstimator};
pub use schema::{Complexity, ProblemAnalysis, Solution};
