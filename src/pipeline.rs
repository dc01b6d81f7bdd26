//! The distance action: depot + canonical address → coordinates → map.

use tracing::info;

use crate::geocoder::{ForwardGeocoder, Geocoder};
use crate::map::{Visualization, Visualizer};
use crate::session::Session;
use crate::types::{Diagnostic, DiagnosticKind, Level, SelectionPolicy};

/// Message reported when geocoding does not yield both endpoints.
pub const INCOMPLETE_COORDINATES: &str = "Failed to retrieve valid coordinates for both addresses.";

/// Result of one distance action.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// Nothing has been normalized yet
    Skipped,
    /// The action ran
    Completed {
        /// Geocoding reports followed by any visualization failure
        diagnostics: Vec<Diagnostic>,
        /// The map, when both addresses resolved
        visualization: Option<Visualization>,
    },
}

/// Runs the distance action against a session.
#[derive(Debug, Clone)]
pub struct DeliveryPlanner<G> {
    geocoder: Geocoder<G>,
    visualizer: Visualizer,
    policy: SelectionPolicy,
}

impl<G: ForwardGeocoder> DeliveryPlanner<G> {
    /// Create a planner that picks the first normalized variant.
    pub fn new(geocoder: Geocoder<G>, visualizer: Visualizer) -> Self {
        Self {
            geocoder,
            visualizer,
            policy: SelectionPolicy::First,
        }
    }

    /// Choose how the canonical normalized address is picked.
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The geocoder used for lookups.
    pub fn geocoder(&self) -> &Geocoder<G> {
        &self.geocoder
    }

    /// Geocode `depot` and the session's canonical address and map them.
    pub async fn plan(&self, session: &Session, depot: &str) -> PlanOutcome {
        let Some(addresses) = session.delivery_pair(depot, self.policy) else {
            return PlanOutcome::Skipped;
        };
        info!(depot, destination = %addresses[1], "planning delivery distance");

        let outcome = self.geocoder.geocode(&addresses).await;
        let mut diagnostics = outcome.diagnostics;

        if outcome.entries.len() != 2 {
            diagnostics.push(Diagnostic::new(
                Level::Error,
                DiagnosticKind::CountMismatch,
                INCOMPLETE_COORDINATES,
            ));
            return PlanOutcome::Completed {
                diagnostics,
                visualization: None,
            };
        }

        let visualization = match self.visualizer.visualize(&outcome.entries) {
            Ok(viz) => Some(viz),
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                None
            }
        };
        PlanOutcome::Completed {
            diagnostics,
            visualization,
        }
    }
}
