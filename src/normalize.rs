//! Result normalization: raw provider output into the canonical schema.
//!
//! Total function, never fails. Structured output gets strict enum and
//! range validation; free text goes through a JSON extraction ladder first.
//! Anything that cannot be validated becomes a fixed synthetic result, so
//! the schema invariants (score in range, checks never empty) hold for
//! every result this crate emits regardless of what a backend sent.

use serde::Deserialize;

use crate::models::{
    AnalysisResult, CheckCategory, CheckStatus, ComplianceCheck, ExtractedMetadata,
};
use crate::providers::RawAnalysis;

/// Score assigned when output had to be replaced with a synthetic result.
pub const SYNTHETIC_COMPLIANCE_SCORE: u8 = 50;

/// Longest raw excerpt carried as the synthetic result's summary.
pub const SYNTHETIC_SUMMARY_MAX_CHARS: usize = 400;

/// Normalization output: the canonical result plus everything that had to
/// be repaired, defaulted, or substituted along the way.
#[derive(Debug)]
pub struct Normalized {
    pub result: AnalysisResult,
    pub warnings: Vec<String>,
}

/// Permissive mirror of the canonical schema: every field optional, enums
/// as plain strings. Validation decides what survives.
#[derive(Deserialize)]
struct RawResultPayload {
    #[serde(rename = "extractedMetadata", alias = "extracted_metadata")]
    extracted_metadata: Option<RawMetadata>,
    #[serde(rename = "isCompliant", alias = "is_compliant")]
    is_compliant: Option<bool>,
    #[serde(
        rename = "overall_compliance_score",
        alias = "complianceScore",
        alias = "compliance_score"
    )]
    compliance_score: Option<f64>,
    summary: Option<String>,
    checks: Option<Vec<RawCheck>>,
}

#[derive(Deserialize)]
struct RawMetadata {
    title: Option<String>,
    method: Option<String>,
    value: Option<f64>,
    currency: Option<String>,
}

#[derive(Deserialize)]
struct RawCheck {
    category: Option<String>,
    rule: Option<String>,
    status: Option<String>,
    finding: Option<String>,
    recommendation: Option<String>,
}

/// Converts raw provider output into a canonical result.
pub fn normalize(raw: RawAnalysis) -> Normalized {
    match raw {
        RawAnalysis::Structured(value) => {
            let raw_text = value.to_string();
            match validate_value(value) {
                Ok((result, warnings)) => Normalized { result, warnings },
                Err(reason) => Normalized {
                    result: synthetic_result(&raw_text),
                    warnings: vec![format!("structured payload rejected: {reason}")],
                },
            }
        }
        RawAnalysis::FreeText(text) => match extract_json(&text) {
            Some(value) => match validate_value(value) {
                Ok((result, warnings)) => Normalized { result, warnings },
                Err(reason) => Normalized {
                    result: synthetic_result(&text),
                    warnings: vec![format!("extracted JSON rejected: {reason}")],
                },
            },
            None => Normalized {
                result: synthetic_result(&text),
                warnings: vec!["no JSON found in free-text output".to_string()],
            },
        },
    }
}

/// Strict validation of a parsed payload. `Err` carries the first reason
/// the payload cannot be trusted; salvage is limited to metadata defaults,
/// which only warn.
fn validate_value(value: serde_json::Value) -> Result<(AnalysisResult, Vec<String>), String> {
    let payload: RawResultPayload =
        serde_json::from_value(value).map_err(|e| format!("schema mismatch: {e}"))?;

    let mut warnings = Vec::new();

    let is_compliant = payload
        .is_compliant
        .ok_or_else(|| "missing isCompliant".to_string())?;

    let score_raw = payload
        .compliance_score
        .ok_or_else(|| "missing overall_compliance_score".to_string())?;
    let rounded = score_raw.round();
    if !(0.0..=100.0).contains(&rounded) {
        return Err(format!("overall_compliance_score {score_raw} outside 0-100"));
    }
    let compliance_score = rounded as u8;

    let raw_checks = payload.checks.unwrap_or_default();
    if raw_checks.is_empty() {
        return Err("checks list missing or empty".to_string());
    }
    let mut checks = Vec::with_capacity(raw_checks.len());
    for (index, raw_check) in raw_checks.into_iter().enumerate() {
        checks.push(validate_check(index, raw_check)?);
    }

    let extracted_metadata = match payload.extracted_metadata {
        Some(raw) => validate_metadata(raw, &mut warnings)?,
        None => {
            warnings.push("extractedMetadata missing; defaulted".to_string());
            ExtractedMetadata::default()
        }
    };

    let summary = payload.summary.unwrap_or_default();
    if summary.is_empty() {
        warnings.push("summary missing; left empty".to_string());
    }

    Ok((
        AnalysisResult {
            extracted_metadata,
            is_compliant,
            compliance_score,
            summary,
            checks,
        },
        warnings,
    ))
}

fn validate_check(index: usize, raw: RawCheck) -> Result<ComplianceCheck, String> {
    let category_text = raw
        .category
        .ok_or_else(|| format!("check {index} missing category"))?;
    let category = CheckCategory::parse(&category_text)
        .ok_or_else(|| format!("check {index} has unknown category \"{category_text}\""))?;

    let status_text = raw
        .status
        .ok_or_else(|| format!("check {index} missing status"))?;
    let status = CheckStatus::parse(&status_text)
        .ok_or_else(|| format!("check {index} has unknown status \"{status_text}\""))?;

    Ok(ComplianceCheck {
        category,
        rule: raw.rule.unwrap_or_default(),
        status,
        finding: raw.finding.unwrap_or_default(),
        recommendation: raw.recommendation.unwrap_or_default(),
    })
}

fn validate_metadata(
    raw: RawMetadata,
    warnings: &mut Vec<String>,
) -> Result<ExtractedMetadata, String> {
    let value = raw.value.unwrap_or(0.0);
    if value < 0.0 {
        return Err(format!("metadata value {value} is negative"));
    }

    if raw.title.is_none() || raw.method.is_none() || raw.value.is_none() || raw.currency.is_none()
    {
        warnings.push("incomplete extractedMetadata; missing fields defaulted".to_string());
    }

    Ok(ExtractedMetadata {
        title: raw.title.unwrap_or_default(),
        method: raw.method.unwrap_or_default(),
        value,
        currency: raw.currency.unwrap_or_default(),
    })
}

/// JSON extraction ladder for free-text replies: the whole string, then a
/// fenced ```json block, then the outermost brace span.
fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return Some(value);
    }

    if let Some(fenced) = extract_fenced_json(trimmed) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(fenced) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(&trimmed[start..=end]).ok()
}

fn extract_fenced_json(text: &str) -> Option<&str> {
    let start = text.find("```json")? + 7;
    let end = text[start..].find("```")? + start;
    Some(text[start..end].trim())
}

/// Fixed conservative result substituted when output cannot be normalized.
/// Compliant by default: an unparseable reply must not flag a document as
/// non-compliant on its own.
fn synthetic_result(raw_output: &str) -> AnalysisResult {
    let summary: String = raw_output
        .trim()
        .chars()
        .take(SYNTHETIC_SUMMARY_MAX_CHARS)
        .collect();

    AnalysisResult {
        extracted_metadata: ExtractedMetadata::default(),
        is_compliant: true,
        compliance_score: SYNTHETIC_COMPLIANCE_SCORE,
        summary,
        checks: vec![ComplianceCheck {
            category: CheckCategory::RiskBestPractice,
            rule: "Result Normalization".to_string(),
            status: CheckStatus::Warning,
            finding: "The analysis backend returned output that could not be parsed into \
                      the compliance schema."
                .to_string(),
            recommendation: "Review the document manually or re-run the analysis.".to_string(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> serde_json::Value {
        json!({
            "extractedMetadata": {
                "title": "Supply of Office Chairs",
                "method": "Request for Quotation",
                "value": 45000.0,
                "currency": "KES"
            },
            "isCompliant": true,
            "overall_compliance_score": 85,
            "summary": "Largely compliant RFQ.",
            "checks": [
                {
                    "category": "Regulatory",
                    "rule": "AGPO Reservation",
                    "status": "Pass",
                    "finding": "30% reservation stated.",
                    "recommendation": "None."
                },
                {
                    "category": "Risk/Best Practice",
                    "rule": "Specification Clarity",
                    "status": "Warning",
                    "finding": "Specs are vague.",
                    "recommendation": "Tighten the specification."
                }
            ]
        })
    }

    // ── Structured validation ───────────────────────────────────────────

    #[test]
    fn valid_structured_payload_passes_through() {
        let normalized = normalize(RawAnalysis::Structured(valid_payload()));
        assert!(normalized.warnings.is_empty());
        let result = normalized.result;
        assert_eq!(result.compliance_score, 85);
        assert_eq!(result.extracted_metadata.method, "Request for Quotation");
        assert_eq!(result.checks.len(), 2);
        assert_eq!(result.checks[1].category, CheckCategory::RiskBestPractice);
    }

    #[test]
    fn fractional_score_is_rounded() {
        let mut payload = valid_payload();
        payload["overall_compliance_score"] = json!(85.4);
        let normalized = normalize(RawAnalysis::Structured(payload));
        assert_eq!(normalized.result.compliance_score, 85);
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn compliance_score_alias_is_accepted() {
        let mut payload = valid_payload();
        let score = payload["overall_compliance_score"].take();
        payload.as_object_mut().unwrap().remove("overall_compliance_score");
        payload["complianceScore"] = score;
        let normalized = normalize(RawAnalysis::Structured(payload));
        assert_eq!(normalized.result.compliance_score, 85);
    }

    #[test]
    fn out_of_range_score_becomes_synthetic() {
        let mut payload = valid_payload();
        payload["overall_compliance_score"] = json!(105);
        let normalized = normalize(RawAnalysis::Structured(payload));
        assert_eq!(normalized.result.compliance_score, SYNTHETIC_COMPLIANCE_SCORE);
        assert_eq!(normalized.result.checks.len(), 1);
        assert!(normalized.warnings[0].contains("rejected"));
    }

    #[test]
    fn unknown_category_becomes_synthetic() {
        let mut payload = valid_payload();
        payload["checks"][0]["category"] = json!("Procedural");
        let normalized = normalize(RawAnalysis::Structured(payload));
        assert_eq!(normalized.result.compliance_score, SYNTHETIC_COMPLIANCE_SCORE);
    }

    #[test]
    fn unknown_status_becomes_synthetic() {
        let mut payload = valid_payload();
        payload["checks"][1]["status"] = json!("Skipped");
        let normalized = normalize(RawAnalysis::Structured(payload));
        assert_eq!(normalized.result.compliance_score, SYNTHETIC_COMPLIANCE_SCORE);
    }

    #[test]
    fn empty_checks_become_synthetic() {
        let mut payload = valid_payload();
        payload["checks"] = json!([]);
        let normalized = normalize(RawAnalysis::Structured(payload));
        assert_eq!(normalized.result.checks.len(), 1);
        assert_eq!(normalized.result.checks[0].status, CheckStatus::Warning);
    }

    #[test]
    fn missing_is_compliant_becomes_synthetic() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("isCompliant");
        let normalized = normalize(RawAnalysis::Structured(payload));
        assert_eq!(normalized.result.compliance_score, SYNTHETIC_COMPLIANCE_SCORE);
    }

    #[test]
    fn negative_metadata_value_becomes_synthetic() {
        let mut payload = valid_payload();
        payload["extractedMetadata"]["value"] = json!(-5.0);
        let normalized = normalize(RawAnalysis::Structured(payload));
        assert_eq!(normalized.result.compliance_score, SYNTHETIC_COMPLIANCE_SCORE);
    }

    #[test]
    fn missing_metadata_defaults_with_warning() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("extractedMetadata");
        let normalized = normalize(RawAnalysis::Structured(payload));
        // Still a valid result, not synthetic.
        assert_eq!(normalized.result.compliance_score, 85);
        assert_eq!(normalized.result.extracted_metadata, ExtractedMetadata::default());
        assert!(normalized.warnings.iter().any(|w| w.contains("extractedMetadata")));
    }

    // ── Free-text extraction ladder ─────────────────────────────────────

    #[test]
    fn pure_json_free_text_is_parsed() {
        let text = valid_payload().to_string();
        let normalized = normalize(RawAnalysis::FreeText(text));
        assert_eq!(normalized.result.compliance_score, 85);
    }

    #[test]
    fn fenced_json_free_text_is_parsed() {
        let text = format!(
            "Here is the analysis you asked for:\n```json\n{}\n```\nLet me know.",
            valid_payload()
        );
        let normalized = normalize(RawAnalysis::FreeText(text));
        assert_eq!(normalized.result.compliance_score, 85);
    }

    #[test]
    fn embedded_json_between_prose_is_parsed() {
        let text = format!("Sure! {} Hope that helps.", valid_payload());
        let normalized = normalize(RawAnalysis::FreeText(text));
        assert_eq!(normalized.result.compliance_score, 85);
    }

    // ── Synthetic fallback ──────────────────────────────────────────────

    #[test]
    fn prose_becomes_synthetic_with_exactly_one_warning_check() {
        let prose = "The document looks mostly fine but I could not assess the budget.";
        let normalized = normalize(RawAnalysis::FreeText(prose.to_string()));

        let result = normalized.result;
        assert!(result.is_compliant);
        assert_eq!(result.compliance_score, SYNTHETIC_COMPLIANCE_SCORE);
        assert_eq!(result.summary, prose);
        assert_eq!(result.checks.len(), 1);
        assert_eq!(result.checks[0].category, CheckCategory::RiskBestPractice);
        assert_eq!(result.checks[0].status, CheckStatus::Warning);
        assert!(!normalized.warnings.is_empty());
    }

    #[test]
    fn synthetic_summary_is_truncated() {
        let prose = "word ".repeat(200);
        let normalized = normalize(RawAnalysis::FreeText(prose));
        assert_eq!(
            normalized.result.summary.chars().count(),
            SYNTHETIC_SUMMARY_MAX_CHARS
        );
    }

    #[test]
    fn fence_extraction_handles_surrounding_text() {
        let text = "prefix ```json {\"a\": 1} ``` suffix";
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn no_json_anywhere_returns_none() {
        assert!(extract_json("plain prose, no braces at all").is_none());
    }
}
