//! The Parse and Normalize actions.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::postal::AddressBackend;
use crate::session::Session;
use crate::types::{Diagnostic, ParsedComponent, RawAddress};

/// Heading shown above parsed components.
pub const PARSED_HEADING: &str = "Parsed Address:";
/// Heading shown above normalized variants.
pub const NORMALIZED_HEADING: &str = "Normalized Address Variations:";
/// Message shown when expansion yields nothing.
pub const NO_NORMALIZED: &str = "No normalized address found.";

/// Result of running an action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// There was no address to act on
    Skipped,
    /// The action ran; `lines` is the text to display
    Output {
        /// Heading, if the output has one
        heading: Option<&'static str>,
        /// Display lines in order
        lines: Vec<String>,
    },
    /// A collaborator failed
    Failed(Diagnostic),
}

impl ActionOutcome {
    /// Display lines, empty unless the action produced output.
    pub fn lines(&self) -> &[String] {
        match self {
            ActionOutcome::Output { lines, .. } => lines,
            _ => &[],
        }
    }
}

/// Run a collaborator call, turning panics into errors.
pub(crate) fn contain<T>(what: &str, call: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(Error::backend(format!("{what} panicked: {detail}")))
        }
    }
}

/// Parse `raw` into labeled components, one `label: value` line each.
pub fn parse_action<B: AddressBackend + ?Sized>(backend: &B, raw: &RawAddress) -> ActionOutcome {
    if !raw.is_present() {
        return ActionOutcome::Skipped;
    }

    match contain("address parser", || backend.parse(raw.as_str())) {
        Ok(components) => {
            debug!(count = components.len(), "parsed address");
            ActionOutcome::Output {
                heading: Some(PARSED_HEADING),
                lines: components.iter().map(ParsedComponent::to_string).collect(),
            }
        }
        Err(e) => {
            warn!(error = %e, "parse failed");
            ActionOutcome::Failed(Diagnostic::collaborator_fault("Parsing", e))
        }
    }
}

/// Expand `raw` into normalized variants and store them in the session.
///
/// A successful expansion always replaces the session's list, even with an
/// empty one. A failed expansion leaves the session untouched.
pub fn normalize_action<B: AddressBackend + ?Sized>(
    backend: &B,
    session: &mut Session,
    raw: &RawAddress,
) -> ActionOutcome {
    if !raw.is_present() {
        return ActionOutcome::Skipped;
    }

    match contain("address expander", || backend.expand(raw.as_str())) {
        Ok(variants) => {
            debug!(count = variants.len(), "normalized address");
            let outcome = if variants.is_empty() {
                ActionOutcome::Output {
                    heading: None,
                    lines: vec![NO_NORMALIZED.to_string()],
                }
            } else {
                ActionOutcome::Output {
                    heading: Some(NORMALIZED_HEADING),
                    lines: variants.iter().map(|v| format!("- {v}")).collect(),
                }
            };
            session.record_normalized(variants);
            outcome
        }
        Err(e) => {
            warn!(error = %e, "normalize failed");
            ActionOutcome::Failed(Diagnostic::collaborator_fault("Normalization", e))
        }
    }
}
