use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const MODEL: &str = "gemini-2.0-flash";

/// Client for the generateContent endpoint, used for both the
/// screenshot-to-text request and the chat companion.
#[derive(Clone)]
pub struct ModelClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl ModelClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Refresh the key when the config changes.
    pub fn update_api_key(&mut self, api_key: String) {
        self.api_key = api_key;
    }

    /// Send one captured PNG with its prompt and return the raw model text.
    pub async fn generate_from_image(&self, prompt: &str, png: &[u8]) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(prompt),
                    Part::inline_png(encoded),
                ],
            }],
        };
        self.generate(request).await
    }

    /// Send a conversation as role-prefixed lines. Blank messages are
    /// skipped; a conversation with nothing left to send is an error.
    pub async fn send_chat(&self, conversation: &[ChatMessage]) -> Result<String> {
        let lines = chat_lines(conversation);
        if lines.is_empty() {
            anyhow::bail!("No content to send to chat API");
        }
        let request = GenerateRequest {
            contents: vec![Content {
                parts: lines.into_iter().map(|line| Part::text(&line)).collect(),
            }],
        };
        self.generate(request).await
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, MODEL);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to send request to model API")?
            .error_for_status()
            .context("Model API returned an error status")?;

        let response: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse model API response")?;
        response.into_text()
    }
}

/// Role-prefixed text lines for one chat turn.
fn chat_lines(conversation: &[ChatMessage]) -> Vec<String> {
    conversation
        .iter()
        .filter_map(|message| {
            let content = message.content.trim();
            if content.is_empty() {
                return None;
            }
            Some(format!("{}: {}", message.role.prefix(), content))
        })
        .collect()
}

/// Trim the raw model text and strip a wrapping code fence, if any.
pub fn clean_response(raw: &str) -> String {
    let mut text = raw.trim();
    if text.starts_with("```") {
        text = text.split_once('\n').map_or(text, |(_, rest)| rest);
        text = text.rsplit_once('\n').map_or(text, |(body, _)| body);
    }
    text.trim().to_string()
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn inline_png(data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/png".to_string(),
                data,
            }),
        }
    }
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            anyhow::bail!("API returned an empty or invalid response");
        }
        Ok(text)
    }
}
