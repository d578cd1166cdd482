use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::llm::{GenerationError, TextGenerator};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Local Ollama server, `/api/chat` without streaming.
pub struct OllamaClient {
    http: Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }

    pub fn from_config(cfg: &LlmConfig) -> Result<Self, GenerationError> {
        Self::new(
            &cfg.base_url,
            cfg.model.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }
}

fn request_body<'a>(model: &'a str, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        stream: false,
    }
}

fn parse_response(resp: ChatResponse) -> Result<String, GenerationError> {
    if let Some(err) = resp.error {
        return Err(GenerationError::Other(err));
    }
    let content = resp.message.map(|m| m.content).unwrap_or_default();
    if content.trim().is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(content)
}

impl TextGenerator for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        log::debug!(
            "generating with {} ({} prompt chars)",
            self.model,
            prompt.len()
        );
        let resp: ChatResponse = self
            .http
            .post(&self.endpoint)
            .json(&request_body(&self.model, prompt))
            .send()?
            .json()?;
        parse_response(resp)
    }
}
