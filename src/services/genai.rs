//! Text generation: sentiment scoring and tip writing.

use crate::constants::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no API key configured for text generation")]
    MissingKey,
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generation service returned HTTP {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    #[error("generation returned no text")]
    Empty,
}

/// Anything that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

/// Google Gemini over the `generateContent` REST endpoint
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<PartOut<'a>>,
}

#[derive(Debug, Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Debug, Deserialize)]
struct PartIn {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts joined
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let key = self.api_key.as_deref().ok_or(GenerateError::MissingKey)?;
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![PartOut { text: prompt }],
            }],
        };
        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Status { status, body });
        }
        let parsed: GenerateResponse = resp.json().await?;
        tracing::debug!(model = %self.model, "generation complete");
        parsed.into_text().ok_or(GenerateError::Empty)
    }
}

pub fn rating_prompt(title: &str, description: &str) -> String {
    format!(
        "Rate how positive this environmental news is for the planet on a scale from 0 to {MAX_RATING}, \
where 0 is neutral or bad news and {MAX_RATING} is the best possible news.\n\n\
Title: {title}\nDescription: {description}\n\n\
Respond with only the number."
    )
}

/// Read a 0-10 rating out of a model answer.
///
/// Out-of-range numbers are clamped; anything unreadable is neutral.
pub fn parse_rating(raw: &str) -> u8 {
    let token = raw
        .trim()
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .trim_end_matches('.');
    let value = match token.parse::<i64>() {
        Ok(v) => v as f64,
        Err(_) => match token.parse::<f64>() {
            Ok(v) if v.is_finite() => v.round(),
            _ => return NEUTRAL_RATING,
        },
    };
    value.clamp(0.0, MAX_RATING as f64) as u8
}
