//! Canonical compliance-analysis result schema.
//!
//! Wire spellings follow the JSON the analysis backends are prompted to
//! produce (`extractedMetadata`, `isCompliant`, `overall_compliance_score`,
//! `"Risk/Best Practice"`), so a result round-trips between providers, the
//! cache, and downstream consumers without a mapping layer.

use serde::{Deserialize, Serialize};

/// Document facts pulled out of the text ahead of compliance scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub title: String,
    /// Procurement method, e.g. "Request for Quotation" or "Open Tender".
    pub method: String,
    /// Estimated monetary value; 0 when the document states none.
    pub value: f64,
    /// Currency code, e.g. "KES".
    pub currency: String,
}

/// Audit dimension a compliance check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckCategory {
    Regulatory,
    Financial,
    #[serde(rename = "Risk/Best Practice")]
    RiskBestPractice,
}

impl CheckCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regulatory => "Regulatory",
            Self::Financial => "Financial",
            Self::RiskBestPractice => "Risk/Best Practice",
        }
    }

    /// Case-insensitive parse, tolerant of separator drift in the
    /// composite category ("Risk/Best-Practice", "risk best practice").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "regulatory" => Some(Self::Regulatory),
            "financial" => Some(Self::Financial),
            "risk/best practice" | "risk/best-practice" | "risk best practice" => {
                Some(Self::RiskBestPractice)
            }
            _ => None,
        }
    }
}

/// Verdict of a single compliance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Pass,
    Fail,
    Warning,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Warning => "Warning",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pass" => Some(Self::Pass),
            "fail" => Some(Self::Fail),
            "warning" => Some(Self::Warning),
            _ => None,
        }
    }
}

/// One categorized, rule-scoped finding with a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub category: CheckCategory,
    pub rule: String,
    pub status: CheckStatus,
    pub finding: String,
    pub recommendation: String,
}

/// Complete compliance analysis of one document.
///
/// `checks` is never empty on a result this crate produces: when a backend
/// returns nothing usable, the normalizer substitutes a synthetic
/// single-check result instead of an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub extracted_metadata: ExtractedMetadata,
    pub is_compliant: bool,
    /// 0 (non-compliant) to 100 (fully compliant).
    #[serde(rename = "overall_compliance_score")]
    pub compliance_score: u8,
    pub summary: String,
    pub checks: Vec<ComplianceCheck>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            extracted_metadata: ExtractedMetadata {
                title: "Supply of Office Chairs".to_string(),
                method: "Request for Quotation".to_string(),
                value: 45000.0,
                currency: "KES".to_string(),
            },
            is_compliant: true,
            compliance_score: 85,
            summary: "Largely compliant.".to_string(),
            checks: vec![ComplianceCheck {
                category: CheckCategory::Regulatory,
                rule: "AGPO Reservation".to_string(),
                status: CheckStatus::Pass,
                finding: "30% reservation stated.".to_string(),
                recommendation: "None.".to_string(),
            }],
        }
    }

    #[test]
    fn result_uses_canonical_wire_names() {
        let value = serde_json::to_value(sample_result()).unwrap();
        assert!(value.get("extractedMetadata").is_some());
        assert!(value.get("isCompliant").is_some());
        assert_eq!(value["overall_compliance_score"], json!(85));
        assert_eq!(value["checks"][0]["category"], json!("Regulatory"));
        assert_eq!(value["checks"][0]["status"], json!("Pass"));
    }

    #[test]
    fn composite_category_wire_name_keeps_slash_and_spaces() {
        let value = serde_json::to_value(CheckCategory::RiskBestPractice).unwrap();
        assert_eq!(value, json!("Risk/Best Practice"));
    }

    #[test]
    fn result_round_trips_through_json() {
        let original = sample_result();
        let text = serde_json::to_string(&original).unwrap();
        let back: AnalysisResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn category_parse_accepts_case_and_separator_variants() {
        assert_eq!(CheckCategory::parse("Regulatory"), Some(CheckCategory::Regulatory));
        assert_eq!(CheckCategory::parse("  financial "), Some(CheckCategory::Financial));
        assert_eq!(
            CheckCategory::parse("Risk/Best Practice"),
            Some(CheckCategory::RiskBestPractice)
        );
        assert_eq!(
            CheckCategory::parse("risk/best-practice"),
            Some(CheckCategory::RiskBestPractice)
        );
        assert_eq!(CheckCategory::parse("Procedural"), None);
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(CheckStatus::parse("PASS"), Some(CheckStatus::Pass));
        assert_eq!(CheckStatus::parse("warning"), Some(CheckStatus::Warning));
        assert_eq!(CheckStatus::parse("fail"), Some(CheckStatus::Fail));
        assert_eq!(CheckStatus::parse("skipped"), None);
    }

    #[test]
    fn as_str_round_trips_through_parse() {
        for category in [
            CheckCategory::Regulatory,
            CheckCategory::Financial,
            CheckCategory::RiskBestPractice,
        ] {
            assert_eq!(CheckCategory::parse(category.as_str()), Some(category));
        }
        for status in [CheckStatus::Pass, CheckStatus::Fail, CheckStatus::Warning] {
            assert_eq!(CheckStatus::parse(status.as_str()), Some(status));
        }
    }
}
