//! Failure classification for provider errors.
//!
//! Pure predicates over status codes and error-body phrases. The fallback
//! policy only needs the class of a failure, and backends report quota
//! exhaustion in incompatible ways (HTTP 402, HTTP 429, or an error body
//! mentioning "credits" or "tokens"), so classification lives here as one
//! extensible predicate instead of per-backend error types.

use super::ProviderError;

/// Phrases backends use for exhausted allowances. Matched against the
/// lowercased error body.
const QUOTA_PHRASES: &[&str] = &[
    "quota",
    "credits",
    "tokens",
    "rate limit",
    "limit exceeded",
    "limit reached",
    "insufficient",
];

/// What a provider failure means to the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Usage allowance exhausted: rate limits, spent credits or tokens.
    Quota,
    /// Connectivity, timeout, or server-side trouble likely to pass.
    Transient,
    /// The call itself landed but the payload was unusable.
    Malformed,
    /// Anything else: bad request, auth failure, unknown.
    Fatal,
}

/// Classifies a provider error. Every class advances the fallback chain;
/// the distinction feeds logging and the caller's alerting.
pub fn classify_failure(error: &ProviderError) -> FailureKind {
    match error {
        ProviderError::Connection(_) | ProviderError::Timeout(_) | ProviderError::Http(_) => {
            FailureKind::Transient
        }
        ProviderError::MalformedResponse(_) | ProviderError::EmptyResponse => {
            FailureKind::Malformed
        }
        ProviderError::Api { status, body } => classify_api_failure(*status, body),
    }
}

/// Classifies an HTTP-level backend error from status code and body text.
/// Status codes win over body phrases; body phrases catch backends that
/// report quota trouble under a generic status.
pub fn classify_api_failure(status: u16, body: &str) -> FailureKind {
    if status == 402 || status == 429 {
        return FailureKind::Quota;
    }
    if status == 408 || (500..600).contains(&status) {
        return FailureKind::Transient;
    }

    let body = body.to_lowercase();
    if QUOTA_PHRASES.iter().any(|phrase| body.contains(phrase)) {
        return FailureKind::Quota;
    }
    if body.contains("timeout") || body.contains("timed out") {
        return FailureKind::Transient;
    }

    FailureKind::Fatal
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Status-code classification ──────────────────────────────────────

    #[test]
    fn payment_and_rate_limit_statuses_are_quota() {
        assert_eq!(classify_api_failure(402, ""), FailureKind::Quota);
        assert_eq!(classify_api_failure(429, ""), FailureKind::Quota);
    }

    #[test]
    fn server_errors_and_request_timeout_are_transient() {
        assert_eq!(classify_api_failure(500, ""), FailureKind::Transient);
        assert_eq!(classify_api_failure(502, "Bad Gateway"), FailureKind::Transient);
        assert_eq!(classify_api_failure(503, ""), FailureKind::Transient);
        assert_eq!(classify_api_failure(408, ""), FailureKind::Transient);
    }

    #[test]
    fn auth_failures_are_fatal() {
        assert_eq!(classify_api_failure(401, "Unauthorized"), FailureKind::Fatal);
        assert_eq!(classify_api_failure(403, "API key not valid"), FailureKind::Fatal);
    }

    // ── Body-phrase classification ──────────────────────────────────────

    #[test]
    fn quota_phrases_in_body_are_quota() {
        assert_eq!(
            classify_api_failure(400, "Insufficient credits to complete request"),
            FailureKind::Quota
        );
        assert_eq!(
            classify_api_failure(400, "You have run out of tokens"),
            FailureKind::Quota
        );
        assert_eq!(
            classify_api_failure(403, "Quota exceeded for this project"),
            FailureKind::Quota
        );
        assert_eq!(
            classify_api_failure(400, "Rate limit reached, retry later"),
            FailureKind::Quota
        );
    }

    #[test]
    fn body_phrase_match_is_case_insensitive() {
        assert_eq!(classify_api_failure(400, "QUOTA EXCEEDED"), FailureKind::Quota);
    }

    #[test]
    fn timeout_phrase_is_transient() {
        assert_eq!(
            classify_api_failure(400, "upstream request timed out"),
            FailureKind::Transient
        );
    }

    #[test]
    fn plain_bad_request_is_fatal() {
        assert_eq!(
            classify_api_failure(400, "Invalid request payload"),
            FailureKind::Fatal
        );
    }

    // ── Error-variant classification ────────────────────────────────────

    #[test]
    fn connection_and_timeout_errors_are_transient() {
        let connection = ProviderError::Connection("http://localhost:11434".to_string());
        let timeout = ProviderError::Timeout(60);
        let http = ProviderError::Http("builder error".to_string());
        assert_eq!(classify_failure(&connection), FailureKind::Transient);
        assert_eq!(classify_failure(&timeout), FailureKind::Transient);
        assert_eq!(classify_failure(&http), FailureKind::Transient);
    }

    #[test]
    fn unusable_payloads_are_malformed() {
        let malformed = ProviderError::MalformedResponse("not JSON".to_string());
        assert_eq!(classify_failure(&malformed), FailureKind::Malformed);
        assert_eq!(classify_failure(&ProviderError::EmptyResponse), FailureKind::Malformed);
    }

    #[test]
    fn api_errors_delegate_to_status_and_body() {
        let quota = ProviderError::Api {
            status: 429,
            body: String::new(),
        };
        let fatal = ProviderError::Api {
            status: 400,
            body: "malformed JSON in request".to_string(),
        };
        assert_eq!(classify_failure(&quota), FailureKind::Quota);
        assert_eq!(classify_failure(&fatal), FailureKind::Fatal);
    }
}
