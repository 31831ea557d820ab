//! Ordered provider chains.
//!
//! Delivery and gateway startup both pick an implementation from an ordered
//! list of optional candidates: the first one that is present wins and the
//! rest are never consulted. Failures of the chosen provider are not a
//! reason to move on to the next candidate.

use std::sync::Arc;

/// Where a selected provider came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSource {
    /// Supplied with the individual call.
    CallScoped,
    /// Injected into the plugin when it was built.
    Injected,
    /// Built-in logging fallback.
    Fallback,
}

impl std::fmt::Display for ProviderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderSource::CallScoped => write!(f, "call_scoped"),
            ProviderSource::Injected => write!(f, "injected"),
            ProviderSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// Ordered list of candidate providers.
pub struct ProviderChain<T: ?Sized> {
    candidates: Vec<(ProviderSource, Option<Arc<T>>)>,
}

impl<T: ?Sized> ProviderChain<T> {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    /// Append a candidate. Absent candidates are kept so the chain can be
    /// inspected, but they are skipped by [`ProviderChain::select`].
    pub fn then(mut self, source: ProviderSource, candidate: Option<Arc<T>>) -> Self {
        self.candidates.push((source, candidate));
        self
    }

    /// First present candidate, with its source.
    pub fn select(self) -> Option<(ProviderSource, Arc<T>)> {
        self.candidates
            .into_iter()
            .find_map(|(source, candidate)| candidate.map(|c| (source, c)))
    }
}

impl<T: ?Sized> Default for ProviderChain<T> {
    fn default() -> Self {
        Self::new()
    }
}
