//! Offline heuristic analyzer: the terminal fallback.
//!
//! Pure keyword and pattern extraction over the document text, no network.
//! `analyze_text` is total: any input yields a schema-complete result, so
//! every fallback chain ends in an answer. Not an
//! [`AnalysisProvider`](super::AnalysisProvider); the orchestrator holds it
//! directly and relies on the infallible signature.

use std::sync::LazyLock;

use regex::Regex;

use super::ProviderId;
use crate::models::{
    AnalysisResult, CheckCategory, CheckStatus, ComplianceCheck, ExtractedMetadata,
};

/// Identifier recorded on outcomes and cache entries produced offline.
pub const OFFLINE_PROVIDER_ID: &str = "offline-heuristic";

/// Conservative score for offline results: above the critical band, below
/// anything an actual audit would award.
pub const OFFLINE_COMPLIANCE_SCORE: u8 = 70;

/// Longest title taken from the document's first line.
pub const TITLE_MAX_CHARS: usize = 120;

/// PPADA procurement methods, matched first-wins against lowercased text.
const METHOD_KEYWORDS: &[(&[&str], &str)] = &[
    (&["request for quotation", "rfq"], "Request for Quotation"),
    (&["open tender", "public tender"], "Open Tender"),
    (&["restricted tender"], "Restricted Tender"),
    (&["direct procurement", "single source"], "Direct Procurement"),
    (&["framework agreement"], "Framework Agreement"),
    (&["expression of interest", "eoi"], "Expression of Interest"),
    (&["request for proposal", "rfp"], "Request for Proposal"),
];

// Currency-prefixed amounts: "KES 45,000", "Ksh. 1,200.50", "USD 300".
static VALUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(KES|KSH|USD|EUR|GBP)\.?\s*([0-9][0-9,]*(?:\.[0-9]+)?)").unwrap()
});

/// Deterministic, network-free document analysis.
#[derive(Debug, Default)]
pub struct OfflineHeuristicAnalyzer;

impl OfflineHeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn id(&self) -> ProviderId {
        ProviderId::new(OFFLINE_PROVIDER_ID)
    }

    /// Analyzes the text. Total: any input, including empty, yields a
    /// schema-complete result with a non-empty check list.
    pub fn analyze_text(&self, text: &str) -> AnalysisResult {
        let lower = text.to_lowercase();
        let title = extract_title(text);
        let method = extract_method(&lower);
        let amount = extract_value(text);

        let method_name = method.unwrap_or("Unspecified");
        let (value, currency) = amount.clone().unwrap_or((0.0, "KES".to_string()));

        let checks = vec![
            ComplianceCheck {
                category: CheckCategory::Regulatory,
                rule: "Basic Compliance".to_string(),
                status: CheckStatus::Warning,
                finding: "Document reviewed offline without AI assistance; regulatory \
                          conformance was not verified in depth."
                    .to_string(),
                recommendation: "Re-run the analysis when an AI provider is available."
                    .to_string(),
            },
            ComplianceCheck {
                category: CheckCategory::Financial,
                rule: "Estimated Value Stated".to_string(),
                status: if amount.is_some() {
                    CheckStatus::Pass
                } else {
                    CheckStatus::Warning
                },
                finding: match &amount {
                    Some((value, currency)) => {
                        format!("Estimated value {currency} {value} stated in the document.")
                    }
                    None => "No monetary value found in the document text.".to_string(),
                },
                recommendation: match &amount {
                    Some(_) => "Verify the figure against the approved budget.".to_string(),
                    None => "Confirm the estimated value from the source document.".to_string(),
                },
            },
            ComplianceCheck {
                category: CheckCategory::RiskBestPractice,
                rule: "Procurement Method Identified".to_string(),
                status: if method.is_some() {
                    CheckStatus::Pass
                } else {
                    CheckStatus::Warning
                },
                finding: match method {
                    Some(name) => format!("Procurement method \"{name}\" identified from document keywords."),
                    None => "No recognized procurement method found in the text.".to_string(),
                },
                recommendation: match method {
                    Some(_) => "Confirm the method suits the procurement value and category."
                        .to_string(),
                    None => "State the procurement method explicitly.".to_string(),
                },
            },
        ];

        let summary = format!(
            "Offline keyword review: method {method_name}, estimated value {currency} {value}. \
             AI-backed audit unavailable; findings are limited to surface checks."
        );

        AnalysisResult {
            extracted_metadata: ExtractedMetadata {
                title,
                method: method_name.to_string(),
                value,
                currency,
            },
            is_compliant: true,
            compliance_score: OFFLINE_COMPLIANCE_SCORE,
            summary,
            checks,
        }
    }
}

/// First non-empty line, trimmed and bounded.
fn extract_title(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(TITLE_MAX_CHARS).collect())
        .unwrap_or_else(|| "Untitled Document".to_string())
}

fn extract_method(lower: &str) -> Option<&'static str> {
    METHOD_KEYWORDS.iter().find_map(|(patterns, name)| {
        patterns
            .iter()
            .any(|pattern| lower.contains(pattern))
            .then_some(*name)
    })
}

/// First currency-prefixed amount; KSH folds to KES.
fn extract_value(text: &str) -> Option<(f64, String)> {
    VALUE_PATTERN.captures_iter(text).find_map(|caps| {
        let currency = match caps[1].to_uppercase().as_str() {
            "KSH" => "KES".to_string(),
            other => other.to_string(),
        };
        let number = caps[2].replace(',', "");
        number.parse::<f64>().ok().map(|value| (value, currency))
    })
}
