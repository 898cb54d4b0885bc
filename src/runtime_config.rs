
use std::env;

use anyhow::{bail, Context, Result};
use cores::resolver::{MatchPolicy, DEFAULT_MATCH_THRESHOLD};
use tracing::Level;

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:3000",
    "https://team1306.github.io",
];
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Settings read once at cold start and handed to every handler.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub slack_bot_token: String,
    pub slack_api_base: String,
    /// Never empty; the first entry is the fallback CORS origin.
    pub allowed_origins: Vec<String>,
    pub error_channel_id: Option<String>,
    pub match_policy: MatchPolicy,
    pub log_level: Level,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let slack_bot_token = var("SLACK_BOT_TOKEN")
            .context("SLACK_BOT_TOKEN is required but not set")?;
        let slack_api_base = var("SLACK_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string());
        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|origins| parse_origins(&origins))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect());
        let threshold = match var("MATCH_THRESHOLD") {
            Some(value) => value.trim().parse::<f64>()
                .with_context(|| format!("invalid MATCH_THRESHOLD: {value}"))?,
            None => DEFAULT_MATCH_THRESHOLD,
        };
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            bail!("invalid MATCH_THRESHOLD: {threshold} is outside 0..=100");
        }
        let log_level = match var("LOG_LEVEL") {
            Some(value) => value.trim().parse::<Level>()
                .map_err(|_| anyhow::anyhow!("invalid LOG_LEVEL: {value}"))?,
            None => Level::INFO,
        };
        Ok(Self {
            slack_bot_token,
            slack_api_base,
            allowed_origins,
            error_channel_id: var("SLACK_ERROR_CHANNEL_ID"),
            match_policy: MatchPolicy {
                threshold,
                ..MatchPolicy::default()
            },
            log_level,
        })
    }
}

fn parse_origins(origins: &str) -> Vec<String> {
    origins.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
