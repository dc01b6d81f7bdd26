//! Per-session state carried between actions.

use crate::types::SelectionPolicy;

/// State that outlives a single action.
///
/// A session starts with no normalized addresses. Only the Normalize action
/// writes to it, via [`Session::record_normalized`]; the distance action
/// reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    normalized: Vec<String>,
}

impl Session {
    /// Start an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent normalized variants, in expander order.
    pub fn normalized_addresses(&self) -> &[String] {
        &self.normalized
    }

    /// Replace the stored variants with the latest expansion.
    pub fn record_normalized(&mut self, variants: Vec<String>) {
        self.normalized = variants;
    }

    /// Pair a depot with the canonical normalized address.
    ///
    /// Returns `None` until a normalization has produced at least one
    /// variant.
    pub fn delivery_pair(&self, depot: &str, policy: SelectionPolicy) -> Option<[String; 2]> {
        policy
            .select(&self.normalized)
            .map(|canonical| [depot.to_string(), canonical.to_string()])
    }
}
