//! Deterministic cache keys for analysis results.
//!
//! A fingerprint is SHA-256 over the normalized document text, a NUL
//! separator, and the provider the caller asked for, encoded as standard
//! base64. It is a dedup key, not a security boundary: no salt, stable
//! across runs and machines.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

use crate::providers::ProviderId;

/// Opaque cache key derived from `(normalized text, provider hint)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derives the key for `text` analyzed under `provider_hint`.
    ///
    /// Normalization is minimal (trim surrounding whitespace, fold CRLF to
    /// LF) so extractor drift in line endings does not defeat the memo,
    /// while any real text change produces a new key. The hint is hashed
    /// in so results are never shared across providers, whose output
    /// quality and shape differ.
    pub fn compute(text: &str, provider_hint: &ProviderId) -> Self {
        let normalized = normalize_text(text);
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hasher.update([0u8]);
        hasher.update(provider_hint.as_str().as_bytes());
        Fingerprint(general_purpose::STANDARD.encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize_text(text: &str) -> String {
    text.trim().replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(id: &str) -> ProviderId {
        ProviderId::new(id)
    }

    #[test]
    fn fingerprint_deterministic() {
        let a = Fingerprint::compute("Tender for road maintenance", &hint("gemini"));
        let b = Fingerprint::compute("Tender for road maintenance", &hint("gemini"));
        assert_eq!(a, b);
    }

    #[test]
    fn different_text_different_fingerprint() {
        let a = Fingerprint::compute("Tender A", &hint("gemini"));
        let b = Fingerprint::compute("Tender B", &hint("gemini"));
        assert_ne!(a, b);
    }

    #[test]
    fn provider_hint_partitions_keys() {
        let text = "Request for Quotation for office chairs";
        let a = Fingerprint::compute(text, &hint("gemini"));
        let b = Fingerprint::compute(text, &hint("openrouter"));
        assert_ne!(a, b);
    }

    #[test]
    fn whitespace_and_crlf_drift_map_to_same_key() {
        let unix = Fingerprint::compute("line one\nline two", &hint("gemini"));
        let windows = Fingerprint::compute("  line one\r\nline two \n", &hint("gemini"));
        assert_eq!(unix, windows);
    }

    #[test]
    fn fingerprint_is_base64_of_sha256() {
        let key = Fingerprint::compute("anything", &hint("gemini"));
        // 32 digest bytes -> 44 base64 chars including padding.
        assert_eq!(key.as_str().len(), 44);
        assert!(key.as_str().ends_with('='));
    }
}
