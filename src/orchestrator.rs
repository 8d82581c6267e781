//! Fallback orchestration: fingerprint → cache → provider chain →
//! normalize → cache write-back.
//!
//! Providers are attempted in fixed registration order; the caller's hint
//! only picks where the walk starts. The offline analyzer terminates every
//! walk, so a request that is not cancelled always produces a result.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::cache::{CacheEntry, CacheError, ResultCache, SqliteCache};
use crate::config::AnalysisConfig;
use crate::fingerprint::Fingerprint;
use crate::models::AnalysisResult;
use crate::normalize::normalize;
use crate::providers::{
    classify_failure, GeminiProvider, OfflineHeuristicAnalyzer, OpenRouterProvider, ProviderId,
    ProviderRegistry,
};

/// One analysis request. The hint selects the starting provider and the
/// cache partition; the text is expected pre-extracted and non-trivial
/// (the extraction collaborator enforces that upstream).
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub text: String,
    pub provider_hint: ProviderId,
}

/// What the caller gets back. `fallback_used` is true when at least one
/// provider was attempted and failed before the one that answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub provider_used: ProviderId,
    pub fallback_used: bool,
}

/// Returned only by [`AnalysisOrchestrator::analyze_with_cancel`], only
/// when the caller set the flag.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Analysis cancelled by caller")]
pub struct AnalysisCancelled;

/// Drives a request through cache lookup, the provider chain,
/// normalization, and best-effort write-back.
pub struct AnalysisOrchestrator {
    registry: ProviderRegistry,
    cache: Box<dyn ResultCache>,
    offline: OfflineHeuristicAnalyzer,
}

impl AnalysisOrchestrator {
    pub fn new(registry: ProviderRegistry, cache: Box<dyn ResultCache>) -> Self {
        Self {
            registry,
            cache,
            offline: OfflineHeuristicAnalyzer::new(),
        }
    }

    /// Production chain: Gemini first, OpenRouter second, SQLite cache.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, CacheError> {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(GeminiProvider::new(&config.gemini)));
        registry.register(Box::new(OpenRouterProvider::new(&config.openrouter)));
        let cache = SqliteCache::open(&config.cache_path)?;
        Ok(Self::new(registry, Box::new(cache)))
    }

    /// Analyzes the request. Infallible: the offline analyzer terminates
    /// every chain.
    pub fn analyze(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let never_cancelled = AtomicBool::new(false);
        match self.analyze_with_cancel(request, &never_cancelled) {
            Ok(outcome) => outcome,
            // The local flag is never set, so this arm is unreachable.
            Err(AnalysisCancelled) => {
                let key = Fingerprint::compute(&request.text, &request.provider_hint);
                self.offline_outcome(request, &key, 0)
            }
        }
    }

    /// Cancellable variant. The flag is checked before each provider
    /// attempt and before the terminal offline attempt; an in-flight HTTP
    /// call runs to its own timeout. A cancelled request writes nothing.
    pub fn analyze_with_cancel(
        &self,
        request: &AnalysisRequest,
        cancel: &AtomicBool,
    ) -> Result<AnalysisOutcome, AnalysisCancelled> {
        let request_id = Uuid::new_v4();
        let _span = tracing::info_span!(
            "analyze_document",
            request_id = %request_id,
            provider_hint = %request.provider_hint
        )
        .entered();

        // Step 1: Fingerprint and cache lookup. A failed read is a miss.
        let key = Fingerprint::compute(&request.text, &request.provider_hint);
        match self.cache.get(&key) {
            Ok(Some(entry)) => {
                tracing::info!(provider = %entry.provider_used, "Cache hit");
                return Ok(AnalysisOutcome {
                    result: entry.result,
                    provider_used: entry.provider_used,
                    fallback_used: false,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Cache read failed, treating as miss");
            }
        }

        // Step 2: Resolve the starting provider. The hint picks where to
        // start; it never reorders the chain.
        let start = match self.registry.position(&request.provider_hint) {
            Some(index) => index,
            None => {
                if !self.registry.is_empty() {
                    tracing::warn!(
                        hint = %request.provider_hint,
                        "Unknown provider hint, starting at the front of the chain"
                    );
                }
                0
            }
        };

        // Step 3: Walk the chain. One attempt per provider; every failure
        // class advances.
        let mut attempts = 0usize;
        for provider in self.registry.providers_from(start) {
            if cancel.load(Ordering::Relaxed) {
                return Err(AnalysisCancelled);
            }

            let provider_id = provider.id();
            match provider.analyze(&request.text) {
                Ok(raw) => {
                    let normalized = normalize(raw);
                    for warning in &normalized.warnings {
                        tracing::warn!(
                            provider = %provider_id,
                            warning = %warning,
                            "Normalization repair"
                        );
                    }
                    tracing::info!(
                        provider = %provider_id,
                        fallback_used = attempts > 0,
                        "Analysis complete"
                    );
                    return Ok(self.finish(request, key, normalized.result, provider_id, attempts));
                }
                Err(e) => {
                    let kind = classify_failure(&e);
                    tracing::warn!(
                        provider = %provider_id,
                        failure = ?kind,
                        error = %e,
                        "Provider failed, advancing fallback chain"
                    );
                    attempts += 1;
                }
            }
        }

        // Step 4: Terminal offline analysis. Cannot fail.
        if cancel.load(Ordering::Relaxed) {
            return Err(AnalysisCancelled);
        }
        Ok(self.offline_outcome(request, &key, attempts))
    }

    /// Assembles the outcome and writes it back. Caching is best-effort: a
    /// failed write is logged, never surfaced.
    fn finish(
        &self,
        request: &AnalysisRequest,
        key: Fingerprint,
        result: AnalysisResult,
        provider_used: ProviderId,
        attempts: usize,
    ) -> AnalysisOutcome {
        let entry = CacheEntry::new(key, result, provider_used, &request.text);
        if let Err(e) = self.cache.put(&entry) {
            tracing::warn!(error = %e, "Cache write failed, continuing");
        }
        AnalysisOutcome {
            result: entry.result,
            provider_used: entry.provider_used,
            fallback_used: attempts > 0,
        }
    }

    fn offline_outcome(
        &self,
        request: &AnalysisRequest,
        key: &Fingerprint,
        attempts: usize,
    ) -> AnalysisOutcome {
        let result = self.offline.analyze_text(&request.text);
        tracing::info!(
            provider = %self.offline.id(),
            fallback_used = attempts > 0,
            "Offline analysis complete"
        );
        self.finish(request, key.clone(), result, self.offline.id(), attempts)
    }
}
