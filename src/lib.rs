//! Zabuni compliance analysis engine.
//!
//! Takes extracted procurement-document text and produces a structured
//! compliance result via a chain of AI backends ending in a deterministic
//! offline analyzer. Results are memoized by content fingerprint, so a
//! document is never paid for twice.

pub mod cache; // Fingerprint-keyed result memo, SQLite-backed
pub mod config;
pub mod fingerprint;
pub mod models;
pub mod normalize; // Raw backend output → canonical result schema
pub mod orchestrator; // Cache → provider chain → offline terminal
pub mod providers;

use tracing_subscriber::EnvFilter;

pub use cache::{CacheEntry, CacheError, InMemoryCache, ResultCache, SqliteCache};
pub use config::{AnalysisConfig, BackendConfig};
pub use fingerprint::Fingerprint;
pub use models::{
    AnalysisResult, CheckCategory, CheckStatus, ComplianceCheck, ExtractedMetadata,
};
pub use normalize::{normalize, Normalized};
pub use orchestrator::{
    AnalysisCancelled, AnalysisOrchestrator, AnalysisOutcome, AnalysisRequest,
};
pub use providers::{
    classify_failure, AnalysisProvider, FailureKind, GeminiProvider, OfflineHeuristicAnalyzer,
    OpenRouterProvider, ProviderError, ProviderId, ProviderKind, ProviderRegistry, RawAnalysis,
};

/// Installs the global tracing subscriber. Later calls are no-ops, so
/// embedders and tests can call it unconditionally.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
