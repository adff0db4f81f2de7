//! Configuration
//!
//! Judge credentials come from the environment; everything else has a
//! default and can be overridden from the command line.

use std::time::Duration;

use crate::game::session::SessionError;
use crate::{COUNTDOWN_DELAY, DEFAULT_DURATION_SECS, DEFAULT_TOTAL_ROUNDS};

/// Default chat-completions endpoint.
pub const DEFAULT_JUDGE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default judging model.
pub const DEFAULT_JUDGE_MODEL: &str = "llama-3.1-8b-instant";

/// Judging service configuration.
#[derive(Clone, Debug)]
pub struct JudgeConfig {
    /// API credential. `None` means offline judging.
    pub api_key: Option<String>,
    /// Chat-completions endpoint.
    pub endpoint: String,
    /// Model name.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_JUDGE_URL.to_string(),
            model: DEFAULT_JUDGE_MODEL.to_string(),
            timeout: Duration::from_millis(15_000),
        }
    }
}

impl JudgeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .and_then(usable_key)
            .or_else(|| std::env::var("API_KEY").ok().and_then(usable_key));

        let defaults = Self::default();
        Self {
            api_key,
            endpoint: std::env::var("NPAT_JUDGE_URL").unwrap_or(defaults.endpoint),
            model: std::env::var("NPAT_JUDGE_MODEL").unwrap_or(defaults.model),
            timeout: std::env::var("NPAT_JUDGE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Check if a credential is configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Blank keys and the literal "undefined" count as missing.
fn usable_key(raw: String) -> Option<String> {
    let key = raw.trim();
    if key.is_empty() || key == "undefined" {
        None
    } else {
        Some(key.to_string())
    }
}

/// Peer link configuration.
#[derive(Clone, Debug)]
pub struct PeerConfig {
    /// Address guests dial.
    pub host: String,
    /// Address hosts listen on.
    pub bind: String,
    /// Room code N listens on `base_port + N`.
    pub base_port: u16,
    /// Fixed prefix of every peer identifier.
    pub id_prefix: String,
    /// Room codes tried before giving up on hosting.
    pub max_code_attempts: u32,
    /// How long a dropped peer has before the session is forfeited.
    pub disconnect_grace: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            bind: "0.0.0.0".to_string(),
            base_port: 40_000,
            id_prefix: crate::network::room::ID_PREFIX.to_string(),
            max_code_attempts: 20,
            disconnect_grace: Duration::from_secs(30),
        }
    }
}

impl PeerConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("NPAT_PEER_HOST").unwrap_or(defaults.host),
            base_port: std::env::var("NPAT_BASE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.base_port),
            ..defaults
        }
    }
}

/// Round settings chosen in the menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameConfig {
    /// Round duration in seconds.
    pub duration_secs: u32,
    /// Rounds per session.
    pub total_rounds: u32,
}

impl GameConfig {
    /// Allowed round durations.
    pub const DURATION_RANGE: std::ops::RangeInclusive<u32> = 10..=300;

    /// Allowed round counts.
    pub const ROUNDS_RANGE: std::ops::RangeInclusive<u32> = 1..=20;

    /// Validated settings.
    pub fn new(duration_secs: u32, total_rounds: u32) -> Result<Self, SessionError> {
        let config = Self { duration_secs, total_rounds };
        config.validate()?;
        Ok(config)
    }

    /// Check both values are within range.
    pub fn validate(&self) -> Result<(), SessionError> {
        if !Self::DURATION_RANGE.contains(&self.duration_secs)
            || !Self::ROUNDS_RANGE.contains(&self.total_rounds)
        {
            return Err(SessionError::InvalidSettings {
                duration_secs: self.duration_secs,
                total_rounds: self.total_rounds,
            });
        }
        Ok(())
    }

    /// Delay between showing the letter and PLAYING.
    pub fn countdown_delay(&self) -> Duration {
        COUNTDOWN_DELAY
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
        }
    }
}
