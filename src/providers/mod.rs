//! Analysis provider port and registry.
//!
//! Every backend that can turn document text into a compliance result
//! implements [`AnalysisProvider`]. The orchestrator walks an ordered
//! [`ProviderRegistry`] of them; raw output stays heterogeneous
//! ([`RawAnalysis`]) until the normalizer shapes it into the canonical
//! schema.

pub mod classify;
pub mod gemini;
pub mod heuristic;
pub mod openrouter;

pub use classify::*;
pub use gemini::*;
pub use heuristic::*;
pub use openrouter::*;

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable provider identifier. Doubles as the cache-partition component of
/// the fingerprint, so renaming a provider invalidates its cached results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        ProviderId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape of output a provider produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Returns JSON already shaped to the canonical schema.
    Structured,
    /// Returns prose or loosely structured text that must be parsed.
    FreeText,
    /// Deterministic local analysis, no network.
    Heuristic,
}

/// Raw provider output before normalization.
#[derive(Debug, Clone)]
pub enum RawAnalysis {
    Structured(serde_json::Value),
    FreeText(String),
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Cannot reach analysis backend at {0}")]
    Connection(String),

    #[error("Analysis request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Backend returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Backend returned an empty response")]
    EmptyResponse,
}

/// A pluggable analysis backend.
pub trait AnalysisProvider: Send + Sync {
    /// Stable identifier, e.g. "gemini".
    fn id(&self) -> ProviderId;

    /// What shape of output to expect from [`analyze`](Self::analyze).
    fn kind(&self) -> ProviderKind;

    /// Analyze the document text. One shot: retry policy belongs to the
    /// orchestrator's fallback chain, not to individual providers.
    fn analyze(&self, text: &str) -> Result<RawAnalysis, ProviderError>;
}

// Forwarding impl so an embedder (or test) can keep a handle on a provider
// after registering it.
impl<T: AnalysisProvider + ?Sized> AnalysisProvider for std::sync::Arc<T> {
    fn id(&self) -> ProviderId {
        (**self).id()
    }

    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    fn analyze(&self, text: &str) -> Result<RawAnalysis, ProviderError> {
        (**self).analyze(text)
    }
}

/// Ordered chain of providers. Order is fallback preference: the
/// orchestrator attempts providers strictly in registration order, a
/// caller's hint only selects where in the chain to start.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn AnalysisProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Box<dyn AnalysisProvider>) {
        self.providers.push(provider);
    }

    /// Index of the provider with this id, if registered.
    pub fn position(&self, id: &ProviderId) -> Option<usize> {
        self.providers.iter().position(|p| p.id() == *id)
    }

    /// The chain from `start` onward; empty when `start` is past the end.
    pub fn providers_from(&self, start: usize) -> &[Box<dyn AnalysisProvider>] {
        self.providers.get(start..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

// ─── Mock provider for tests ────────────────────────────────────────────────

enum MockOutcome {
    Structured(serde_json::Value),
    FreeText(String),
    Fail { status: u16, body: String },
    Unreachable,
}

/// Scriptable provider for orchestrator and downstream tests. Counts calls
/// so tests can assert cache short-circuits and fallback order.
pub struct MockProvider {
    id: ProviderId,
    kind: ProviderKind,
    outcome: MockOutcome,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn structured(id: &str, payload: serde_json::Value) -> Self {
        MockProvider {
            id: ProviderId::new(id),
            kind: ProviderKind::Structured,
            outcome: MockOutcome::Structured(payload),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn free_text(id: &str, text: &str) -> Self {
        MockProvider {
            id: ProviderId::new(id),
            kind: ProviderKind::FreeText,
            outcome: MockOutcome::FreeText(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(id: &str, status: u16, body: &str) -> Self {
        MockProvider {
            id: ProviderId::new(id),
            kind: ProviderKind::Structured,
            outcome: MockOutcome::Fail {
                status,
                body: body.to_string(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable(id: &str) -> Self {
        MockProvider {
            id: ProviderId::new(id),
            kind: ProviderKind::Structured,
            outcome: MockOutcome::Unreachable,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl AnalysisProvider for MockProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn analyze(&self, _text: &str) -> Result<RawAnalysis, ProviderError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.outcome {
            MockOutcome::Structured(payload) => Ok(RawAnalysis::Structured(payload.clone())),
            MockOutcome::FreeText(text) => Ok(RawAnalysis::FreeText(text.clone())),
            MockOutcome::Fail { status, body } => Err(ProviderError::Api {
                status: *status,
                body: body.clone(),
            }),
            MockOutcome::Unreachable => Err(ProviderError::Connection(
                "http://localhost:0".to_string(),
            )),
        }
    }
}
