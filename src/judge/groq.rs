//! Chat-completions judge client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::JudgeConfig;
use crate::game::state::{GameInputs, ValidationItem, ValidationResult};
use crate::judge::{Judge, JudgeError};

const SYSTEM_PROMPT: &str = "You are a helpful game judge that outputs only valid JSON.";

/// Judge backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Clone, Debug)]
pub struct GroqJudge {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl GroqJudge {
    /// Build a client, or `None` when no credential is configured.
    pub fn from_config(config: &JudgeConfig) -> Result<Option<Self>, JudgeError> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => return Ok(None),
        };

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Some(Self {
            client,
            api_key,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        }))
    }
}

#[async_trait]
impl Judge for GroqJudge {
    async fn judge(&self, letter: char, inputs: &GameInputs) -> Result<ValidationResult, JudgeError> {
        let body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(letter, inputs),
                },
            ],
            model: &self.model,
            response_format: ResponseFormat { kind: "json_object" },
            temperature: 0.3,
            max_tokens: 1000,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(JudgeError::Http {
                status: status.as_u16(),
                message: error_message(&text).unwrap_or_else(|| format!("HTTP Error {}", status.as_u16())),
            });
        }

        let completion: ChatResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(JudgeError::EmptyResponse)?;

        debug!("Judge returned {} bytes for letter {}", content.len(), letter);
        parse_verdict(&content)
    }

    fn name(&self) -> &'static str {
        "groq"
    }
}

/// Instructions sent as the user message.
pub fn build_prompt(letter: char, inputs: &GameInputs) -> String {
    let answers = serde_json::to_string_pretty(inputs).unwrap_or_default();
    format!(
        r#"You are the judge of a "Name Place Animal Thing" game.
The current letter is "{letter}".

Evaluate the following user inputs:
{answers}

For each category (name, place, animal, thing):
- Check if the word starts with the letter "{letter}" (case-insensitive).
- Check if the word is a valid entry for that category.
- Be lenient with spelling if it is phonetically close.
- If the input is empty or just the letter itself, it is invalid.
- Assign a score: 10 for valid, 0 for invalid.
- Provide a short, fun message explaining why it is valid or invalid (max 6 words).

Return the result in strict JSON format matching this schema:
{{
  "name": {{ "valid": boolean, "score": number, "message": string }},
  "place": {{ "valid": boolean, "score": number, "message": string }},
  "animal": {{ "valid": boolean, "score": number, "message": string }},
  "thing": {{ "valid": boolean, "score": number, "message": string }}
}}"#
    )
}

/// Parse the model's JSON into a verdict.
///
/// Scores are forced onto {0, 10} and the total is recomputed; whatever total
/// the model claims is ignored. Missing categories count as invalid.
pub fn parse_verdict(content: &str) -> Result<ValidationResult, JudgeError> {
    let raw: RawVerdict = serde_json::from_str(content)?;

    Ok(ValidationResult::from_items(
        normalize(raw.name),
        normalize(raw.place),
        normalize(raw.animal),
        normalize(raw.thing),
    ))
}

fn normalize(item: Option<RawItem>) -> ValidationItem {
    match item {
        Some(item) if item.valid && item.score > 0.0 => ValidationItem::accepted(item.message),
        Some(item) => ValidationItem::rejected(item.message),
        None => ValidationItem::rejected("No verdict"),
    }
}

fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.error.and_then(|e| e.message)
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage>,
    model: &'a str,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[derive(Deserialize)]
struct RawVerdict {
    name: Option<RawItem>,
    place: Option<RawItem>,
    animal: Option<RawItem>,
    thing: Option<RawItem>,
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    message: String,
}
