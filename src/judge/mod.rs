//! Answer Judging
//!
//! The judge is an external service that may be slow, misconfigured, or
//! down. Every failure is converted into a verdict from the local heuristic
//! judge so a round can always complete.

pub mod groq;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::JudgeConfig;
use crate::game::state::{Category, GameInputs, ValidationItem, ValidationResult};

pub use groq::GroqJudge;

/// Judging errors. None of them are fatal to a round.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// No credential configured.
    #[error("judge credential not configured")]
    MissingCredential,
    /// Service answered with a non-success status.
    #[error("HTTP error {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error text from the body, if any.
        message: String,
    },
    /// Request never completed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Service returned no content.
    #[error("empty response from judge")]
    EmptyResponse,
    /// Content was not the expected JSON.
    #[error("malformed verdict: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl JudgeError {
    /// Short reason shown in fallback verdict messages.
    pub fn fallback_reason(&self) -> &'static str {
        match self {
            JudgeError::MissingCredential => "Offline Mode",
            JudgeError::Http { status: 429, .. } => "Quota Limit",
            JudgeError::Http { status: 401 | 403, .. } => "Bad Key",
            JudgeError::Http { status: 500..=599, .. } => "Server Error",
            JudgeError::Transport(e) if e.is_connect() || e.is_timeout() => "No Internet",
            _ => "AI Busy",
        }
    }
}

/// Something that can judge a round.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Judge four answers against a letter.
    async fn judge(&self, letter: char, inputs: &GameInputs) -> Result<ValidationResult, JudgeError>;

    /// Name for logs.
    fn name(&self) -> &'static str;
}

/// Judge used when no credential is configured. Always defers to the
/// local heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineJudge;

#[async_trait]
impl Judge for OfflineJudge {
    async fn judge(&self, _letter: char, _inputs: &GameInputs) -> Result<ValidationResult, JudgeError> {
        Err(JudgeError::MissingCredential)
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

/// Pick the judge for a configuration.
pub fn judge_from_config(config: &JudgeConfig) -> Arc<dyn Judge> {
    if !config.is_configured() {
        warn!("No judge credential set, using local validation");
        return Arc::new(OfflineJudge);
    }

    match GroqJudge::from_config(config) {
        Ok(Some(judge)) => {
            info!("Judging with {} via {}", config.model, config.endpoint);
            Arc::new(judge)
        }
        Ok(None) => Arc::new(OfflineJudge),
        Err(e) => {
            warn!("Judge client unavailable ({}), using local validation", e);
            Arc::new(OfflineJudge)
        }
    }
}

/// Judge a round, falling back to the local heuristic on any error.
pub async fn judge_or_fallback(judge: &dyn Judge, letter: char, inputs: &GameInputs) -> ValidationResult {
    match judge.judge(letter, inputs).await {
        Ok(result) => result,
        Err(e) => {
            let reason = e.fallback_reason();
            warn!("Judge '{}' failed ({}), falling back: {}", judge.name(), e, reason);
            local_validate(letter, inputs, reason)
        }
    }
}

/// Deterministic heuristic judge.
///
/// Empty answers, answers starting with another letter, and answers shorter
/// than two characters score 0. Anything else gets the benefit of the doubt.
pub fn local_validate(letter: char, inputs: &GameInputs, reason: &str) -> ValidationResult {
    let item = |category: Category| validate_item(letter, inputs.get(category), reason);

    ValidationResult::from_items(
        item(Category::Name),
        item(Category::Place),
        item(Category::Animal),
        item(Category::Thing),
    )
}

fn validate_item(letter: char, text: &str, reason: &str) -> ValidationItem {
    let trimmed = text.trim();
    let first = match trimmed.chars().next() {
        Some(c) => c,
        None => return ValidationItem::rejected("Empty"),
    };

    if !first.to_lowercase().eq(letter.to_lowercase()) {
        return ValidationItem::rejected("Wrong Letter");
    }

    if trimmed.chars().count() < 2 {
        return ValidationItem::rejected("Too Short");
    }

    ValidationItem::accepted(format!("Accepted ({})", reason))
}
