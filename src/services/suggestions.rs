use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Message attached when the model produced a usable title list
pub const PICKED_MESSAGE: &str = "Here are the movies I picked for you:";

/// Message attached when the model reply could not be read as a title list
pub const FALLBACK_MESSAGE: &str =
    "I couldn't come up with a movie list for that, please try rephrasing.";

/// Message attached when the model could not be reached at all
pub const UNAVAILABLE_MESSAGE: &str = "The AI service is not responding right now.";

/// Movie titles extracted from a model reply, with the message to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub titles: Vec<String>,
    pub message: String,
}

impl Suggestion {
    fn fallback() -> Self {
        Self {
            titles: Vec::new(),
            message: FALLBACK_MESSAGE.to_string(),
        }
    }

    fn unavailable() -> Self {
        Self {
            titles: Vec::new(),
            message: UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}

/// Suggestion engine abstraction
///
/// Turns a free-form user message into concrete movie titles. Engines never
/// resolve titles against the catalog; that stays with the aggregator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SuggestionEngine: Send + Sync {
    async fn suggest_titles(&self, user_message: &str) -> AppResult<Suggestion>;
}

/// Gemini-backed suggestion engine
///
/// Sends a single-turn generateContent request and expects the model to
/// answer with a bare JSON array of title strings. Upstream failures and
/// unreadable replies both degrade to an empty suggestion with an
/// explanatory message instead of erroring, so the chat endpoint stays up
/// when the model misbehaves.
pub struct GeminiSuggestions {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiSuggestions {
    /// Creates a new Gemini suggestion engine
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            api_key: config.gemini_api_key.clone(),
            api_url: config.gemini_api_url.clone(),
            model: config.gemini_model.clone(),
        })
    }

    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Gemini API returned status {}: {}",
                status, body
            )));
        }

        let reply: GenerateResponse = response.json().await?;

        extract_text(reply).ok_or_else(|| {
            AppError::ExternalApi("Gemini response contained no candidates".to_string())
        })
    }
}

#[async_trait]
impl SuggestionEngine for GeminiSuggestions {
    async fn suggest_titles(&self, user_message: &str) -> AppResult<Suggestion> {
        let prompt = build_prompt(user_message);

        let reply = match self.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Suggestion request failed");
                return Ok(Suggestion::unavailable());
            }
        };

        match parse_title_list(&reply) {
            Some(titles) if !titles.is_empty() => {
                tracing::info!(titles = titles.len(), "Suggestion titles parsed");
                Ok(Suggestion {
                    titles,
                    message: PICKED_MESSAGE.to_string(),
                })
            }
            Some(_) => Ok(Suggestion::fallback()),
            None => {
                tracing::warn!(reply = %reply, "Suggestion reply was not a JSON title array");
                Ok(Suggestion::fallback())
            }
        }
    }
}

fn build_prompt(user_message: &str) -> String {
    format!(
        "You are a movie recommendation assistant. The user will describe a mood or a \
         preference and you answer with exactly five fitting movie titles. Respond with \
         ONLY a JSON array of title strings, for example: [\"First Title\", \"Second Title\"]. \
         No other text, no code fences. Answer [] if the request is not about movies. \
         User request: {}",
        user_message
    )
}

/// Reads a model reply as a JSON array of titles, tolerating code fences
fn parse_title_list(raw: &str) -> Option<Vec<String>> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    serde_json::from_str::<Vec<String>>(cleaned.trim()).ok()
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn extract_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    if content.parts.is_empty() {
        return None;
    }

    Some(
        content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title_list_plain_array() {
        let titles = parse_title_list(r#"["Dune", "Arrival"]"#).unwrap();
        assert_eq!(titles, vec!["Dune".to_string(), "Arrival".to_string()]);
    }

    #[test]
    fn test_parse_title_list_strips_code_fences() {
        let raw = "```json\n[\"Dune\", \"Arrival\"]\n```";
        let titles = parse_title_list(raw).unwrap();
        assert_eq!(titles, vec!["Dune".to_string(), "Arrival".to_string()]);
    }

    #[test]
    fn test_parse_title_list_rejects_prose() {
        assert_eq!(parse_title_list("Sure! Here are five movies you may like."), None);
    }

    #[test]
    fn test_parse_title_list_rejects_non_string_items() {
        assert_eq!(parse_title_list("[1, 2, 3]"), None);
    }

    #[test]
    fn test_parse_title_list_accepts_empty_array() {
        assert_eq!(parse_title_list("[]"), Some(Vec::new()));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "[\"Du"}, {"text": "ne\"]"}]}}
            ]
        }"#;

        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_text(response).as_deref(), Some("[\"Dune\"]"));
    }

    #[test]
    fn test_extract_text_handles_missing_candidates() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_text(response), None);
    }

    #[test]
    fn test_build_prompt_embeds_user_message() {
        let prompt = build_prompt("something uplifting");
        assert!(prompt.contains("something uplifting"));
        assert!(prompt.contains("JSON array"));
    }
}
