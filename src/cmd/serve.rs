//! HTTP API server command (`civic-hero serve`).

use std::sync::Arc;

use anyhow::Result;

use civic_hero::board::server::{ServerConfig, start_server};
use civic_hero::config::CivicConfig;
use civic_hero::estimate::OpenAiEstimator;

pub async fn cmd_serve(config: &CivicConfig) -> Result<()> {
    let estimator = OpenAiEstimator::new(config.estimator().clone(), CivicConfig::api_key());
    start_server(ServerConfig::from_config(config), Arc::new(estimator)).await
}
