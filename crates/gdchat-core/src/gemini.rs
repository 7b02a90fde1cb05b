use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ChatError, Result};
use crate::message::{ConversationHistory, Role};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Transport seam between the controller and the generative API.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the conversation and return the model's reply text.
    async fn generate(&self, history: &ConversationHistory) -> Result<String>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request_body(history: &ConversationHistory) -> Value {
        // System notices are local; the API sees only the user/model turns.
        let contents: Vec<Value> = history
            .messages()
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let role = if m.role == Role::User { "user" } else { "model" };
                json!({
                    "role": role,
                    "parts": [{ "text": m.content }],
                })
            })
            .collect();

        json!({
            "contents": contents,
            "generationConfig": {
                "temperature": 0.9,
                "topK": 1,
                "topP": 1,
                "maxOutputTokens": 2048,
                "stopSequences": []
            },
            "safetySettings": [
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" }
            ]
        })
    }
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
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Pull the first candidate's first text part out of a response body.
/// Anything without that shape is a malformed response, not a silent miss.
fn extract_reply(body: &str) -> Result<String> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|_| ChatError::MalformedResponse)?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or(ChatError::MalformedResponse)
}

#[async_trait]
impl ChatTransport for GeminiClient {
    async fn generate(&self, history: &ConversationHistory) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );
        let request_body = Self::build_request_body(history);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(ChatError::Api(format!(
                "API request failed with status {status}"
            )));
        }

        extract_reply(&response_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn sample_history() -> ConversationHistory {
        ConversationHistory::from_messages(vec![
            Message::system("=== Bem-vindo ao GDCHAT ==="),
            Message::user("oi"),
            Message::bot("olá"),
            Message::user("tudo bem?"),
        ])
    }

    #[test]
    fn request_body_drops_system_messages() {
        let body = GeminiClient::build_request_body(&sample_history());
        let contents = body["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "oi");
        assert_eq!(contents[1]["parts"][0]["text"], "olá");
    }

    #[test]
    fn request_body_carries_fixed_generation_config() {
        let body = GeminiClient::build_request_body(&sample_history());
        let config = &body["generationConfig"];

        assert_eq!(config["temperature"], 0.9);
        assert_eq!(config["topK"], 1);
        assert_eq!(config["topP"], 1);
        assert_eq!(config["maxOutputTokens"], 2048);
        assert!(config["stopSequences"].as_array().unwrap().is_empty());
    }

    #[test]
    fn request_body_carries_safety_thresholds() {
        let body = GeminiClient::build_request_body(&sample_history());
        let settings = body["safetySettings"].as_array().unwrap();

        assert_eq!(settings.len(), 4);
        for setting in settings {
            assert_eq!(setting["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
        }
    }

    #[test]
    fn extract_reply_reads_first_candidate_text() {
        let body = r#"{
            "candidates": [
                { "content": { "parts": [{ "text": "resposta" }] } }
            ]
        }"#;

        assert_eq!(extract_reply(body).unwrap(), "resposta");
    }

    #[test]
    fn missing_candidates_is_malformed() {
        let body = r#"{ "promptFeedback": {} }"#;
        assert!(matches!(
            extract_reply(body),
            Err(ChatError::MalformedResponse)
        ));
    }

    #[test]
    fn candidate_without_parts_is_malformed() {
        let body = r#"{ "candidates": [ { "finishReason": "SAFETY" } ] }"#;
        assert!(matches!(
            extract_reply(body),
            Err(ChatError::MalformedResponse)
        ));

        let body = r#"{ "candidates": [ { "content": { "parts": [] } } ] }"#;
        assert!(matches!(
            extract_reply(body),
            Err(ChatError::MalformedResponse)
        ));
    }

    #[test]
    fn non_json_body_is_malformed() {
        assert!(matches!(
            extract_reply("<html>502</html>"),
            Err(ChatError::MalformedResponse)
        ));
    }
}
