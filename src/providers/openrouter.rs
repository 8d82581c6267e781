//! OpenRouter backend (OpenAI-compatible chat completions).
//!
//! Free-text provider: a cheaper alternate model family prompted toward the
//! canonical JSON shape but not guaranteed to honor it. Whatever comes back
//! is handed to the normalizer as text; unparseable replies become a
//! synthetic conservative result there instead of failing the request.

use serde::{Deserialize, Serialize};

use super::{AnalysisProvider, ProviderError, ProviderId, ProviderKind, RawAnalysis};
use crate::config::BackendConfig;

/// Stable identifier for this backend.
pub const OPENROUTER_PROVIDER_ID: &str = "openrouter";

/// Longest document slice sent as the user message. Keeps token spend down;
/// this backend runs on metered credits.
pub const FREE_TEXT_PROMPT_MAX_CHARS: usize = 8_000;

/// Models reachable through OpenRouter that handle this analysis well.
pub const AVAILABLE_MODELS: &[&str] = &[
    "anthropic/claude-3.5-sonnet",
    "anthropic/claude-3-haiku",
    "openai/gpt-4o",
    "openai/gpt-4o-mini",
    "google/gemini-pro-1.5",
    "meta-llama/llama-3.1-70b-instruct",
];

const ANALYSIS_TEMPERATURE: f32 = 0.3;
const ANALYSIS_MAX_TOKENS: u32 = 1000;

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a procurement analysis expert. Analyze the following procurement document and provide a JSON response with this structure:
{
  "extractedMetadata": {
    "title": "procurement title",
    "method": "procurement method",
    "value": 0,
    "currency": "KES"
  },
  "isCompliant": true,
  "overall_compliance_score": 85,
  "summary": "brief analysis summary",
  "checks": [
    {
      "category": "Regulatory",
      "rule": "specific rule",
      "status": "Pass",
      "finding": "what was found",
      "recommendation": "what to do"
    }
  ]
}

Focus on: key procurement items, supplier info, cost analysis, risk assessment, compliance checks, and recommendations. Keep response concise."#;

/// Client for `POST /chat/completions`.
pub struct OpenRouterProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenRouterProvider {
    pub fn new(config: &BackendConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
            timeout_secs: config.timeout_secs,
        }
    }

    /// Override the model, e.g. with an entry from [`AVAILABLE_MODELS`].
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

/// Request body for /chat/completions
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response body from /chat/completions
#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl AnalysisProvider for OpenRouterProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(OPENROUTER_PROVIDER_ID)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::FreeText
    }

    fn analyze(&self, text: &str) -> Result<RawAnalysis, ProviderError> {
        let excerpt = user_excerpt(text);
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ANALYSIS_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &excerpt,
                },
            ],
            temperature: ANALYSIS_TEMPERATURE,
            max_tokens: ANALYSIS_MAX_TOKENS,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    ProviderError::Timeout(self.timeout_secs)
                } else {
                    ProviderError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().map_err(|e| ProviderError::Http(e.to_string()))?;
        let content = parse_chat_response(&body)?;

        Ok(RawAnalysis::FreeText(content))
    }
}

/// Pulls the first choice's message content out of the completion envelope.
fn parse_chat_response(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let content = parsed
        .choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(content)
}

fn user_excerpt(text: &str) -> String {
    text.chars().take(FREE_TEXT_PROMPT_MAX_CHARS).collect()
}
