//! Google Generative Language backend.
//!
//! Structured provider: the model is asked for `application/json` output
//! shaped to the canonical schema, so normalization only has to validate
//! enums and ranges. Uses the `v1` endpoint (not `v1beta`) with a pinned
//! model version for stable output shape.

use serde::{Deserialize, Serialize};

use super::{AnalysisProvider, ProviderError, ProviderId, ProviderKind, RawAnalysis};
use crate::config::BackendConfig;

/// Stable identifier for this backend.
pub const GEMINI_PROVIDER_ID: &str = "gemini";

/// Longest document slice interpolated into the audit prompt.
pub const STRUCTURED_PROMPT_MAX_CHARS: usize = 15_000;

/// Sampling temperature: audits should be repeatable, not creative.
const AUDIT_TEMPERATURE: f32 = 0.2;

/// Client for `POST /v1/models/{model}:generateContent`.
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiProvider {
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
}

/// Request body for :generateContent
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

/// Response body from :generateContent
#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl AnalysisProvider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(GEMINI_PROVIDER_ID)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Structured
    }

    fn analyze(&self, text: &str) -> Result<RawAnalysis, ProviderError> {
        let prompt = build_audit_prompt(text);
        let url = format!("{}/v1/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: AUDIT_TEMPERATURE,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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
        let payload_text = parse_generate_response(&body)?;

        // The model was asked for application/json; anything else means the
        // backend misbehaved and the next provider should take over.
        let payload: serde_json::Value = serde_json::from_str(payload_text.trim())
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        Ok(RawAnalysis::Structured(payload))
    }
}

/// Pulls the first candidate's text out of the generateContent envelope.
fn parse_generate_response(body: &str) -> Result<String, ProviderError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let text = parsed
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|part| part.text)
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
}

/// Build the PPADA audit prompt for a document.
fn build_audit_prompt(document_text: &str) -> String {
    let excerpt: String = document_text
        .chars()
        .take(STRUCTURED_PROMPT_MAX_CHARS)
        .collect();

    format!(
        r#"You are a Senior Strategic Procurement Consultant and Compliance Auditor.
Your audit must be comprehensive, covering regulatory compliance, financial feasibility, and global best practices.

Primary Framework: Kenyan Public Procurement and Asset Disposal Act (PPADA) 2015 (Rev. 2022) and the 2024 Amendments.
Extended Framework: ISO 20400 (Sustainable Procurement), Generally Accepted Accounting Principles (GAAP) for financial feasibility, and modern Risk Management standards.

Document Content:
{excerpt}

Tasks:
1. Extract Metadata: Identify the Procurement Title, Method, Estimated Value, and Currency directly from the document.
   - If the document is an RFQ, the method is "Request for Quotation".
   - If it mentions a public tender, it is "Open Tender".
   - If no value is found, use 0 but flag it in the summary.
2. Multi-Dimensional Audit: Review the document against these categories:
   - Regulatory (PPADA): Local Preference (contracts < KES 1B for local firms), AGPO Reservation (30% for Women/Youth/PWDs), Local Content (minimum 40%), Advance Payment (capped at 20%), Non-corruption declaration (Section 62).
   - Financial Feasibility: Are payment terms clearly defined and market-standard? Is there a clear budget breakdown or pricing structure? Are there hidden costs or financial risks?
   - Global Best Practices & Risk: Ethical sourcing and sustainability (ISO 20400), clarity of technical specifications and terms of reference, high-risk legal or commercial clauses (unfair termination, indemnity).
3. Scoring and Categorization: Calculate an overall_compliance_score (0-100) reflecting all dimensions. Categorize EVERY check correctly: PPADA items are "Regulatory", payment and budget items are "Financial", everything else is "Risk/Best Practice".

Respond with ONLY a JSON object of exactly this shape:
{{
  "extractedMetadata": {{ "title": "...", "method": "...", "value": 0, "currency": "KES" }},
  "isCompliant": true,
  "overall_compliance_score": 0,
  "summary": "...",
  "checks": [
    {{
      "category": "Regulatory",
      "rule": "...",
      "status": "Pass",
      "finding": "...",
      "recommendation": "..."
    }}
  ]
}}
Every "category" must be exactly one of "Regulatory", "Financial", "Risk/Best Practice" and every "status" exactly one of "Pass", "Fail", "Warning"."#
    )
}
