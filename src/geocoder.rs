//! Forward geocoding with a region filter.
//!
//! [`Geocoder`] resolves address strings through a [`ForwardGeocoder`]
//! collaborator and keeps only results that have coordinates and fall inside
//! the expected region. Every non-blank address produces exactly one
//! [`Diagnostic`], and no failure aborts the batch.

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::GeocoderConfig;
use crate::error::{Error, Result};
use crate::types::{CoordinateEntry, Diagnostic, DiagnosticKind, Level};

/// A single place returned by the geocoding service.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Place {
    /// Latitude, when the service knows it
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude, when the service knows it
    #[serde(default)]
    pub longitude: Option<f64>,
    /// State or province name (e.g. "Andhra Pradesh")
    #[serde(default)]
    pub region: Option<String>,
    /// Formatted place label
    #[serde(default)]
    pub label: Option<String>,
}

/// Answer to a forward-geocoding request.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The service returned a place
    Found(Place),
    /// The service answered but had nothing usable
    NotFound {
        /// HTTP status, when it was not 200
        status: Option<u16>,
    },
}

/// Forward-geocoding collaborator.
#[allow(async_fn_in_trait)]
pub trait ForwardGeocoder {
    /// Look up one address.
    ///
    /// # Errors
    ///
    /// Transport failures and undecodable bodies. "No result" is
    /// [`Lookup::NotFound`], not an error.
    async fn forward(&self, query: &str) -> Result<Lookup>;
}

#[derive(Debug, Deserialize)]
struct ForwardResponse {
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
}

/// Classify a 200 response body from positionstack.
///
/// The service reports "no match" as `{"data": []}` and sometimes as
/// `{"data": [[]]}`; both are [`Lookup::NotFound`].
pub fn classify_body(body: &str) -> Result<Lookup> {
    let response: ForwardResponse =
        serde_json::from_str(body).map_err(|e| Error::decode(e.to_string()))?;

    let first = response.data.and_then(|data| data.into_iter().next());
    match first.and_then(|value| serde_json::from_value::<Place>(value).ok()) {
        Some(place) => Ok(Lookup::Found(place)),
        None => Ok(Lookup::NotFound { status: None }),
    }
}

/// positionstack forward-geocoding client.
#[derive(Debug, Clone)]
pub struct PositionStack {
    client: reqwest::Client,
    config: GeocoderConfig,
}

impl PositionStack {
    /// Create a client with the configured timeout.
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }
}

impl ForwardGeocoder for PositionStack {
    async fn forward(&self, query: &str) -> Result<Lookup> {
        let limit = self.config.limit.to_string();
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("access_key", self.config.api_key.as_str()),
                ("query", query),
                ("limit", limit.as_str()),
                ("country", self.config.country.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            debug!(%status, "geocoder returned non-200");
            return Ok(Lookup::NotFound {
                status: Some(status.as_u16()),
            });
        }

        let body = response.text().await?;
        classify_body(&body)
    }
}

/// Entries and diagnostics from one geocoding batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeOutcome {
    /// Accepted entries, in input order
    pub entries: Vec<CoordinateEntry>,
    /// One diagnostic per non-blank input, in input order
    pub diagnostics: Vec<Diagnostic>,
}

/// Region-filtering batch geocoder.
#[derive(Debug, Clone)]
pub struct Geocoder<G> {
    provider: G,
    expected_region: Option<String>,
    max_in_flight: usize,
}

impl<G: ForwardGeocoder> Geocoder<G> {
    /// Wrap a provider with the default "Andhra Pradesh" filter and
    /// sequential lookups.
    pub fn new(provider: G) -> Self {
        Self {
            provider,
            expected_region: Some("Andhra Pradesh".to_string()),
            max_in_flight: 1,
        }
    }

    /// Wrap a provider using the filter and concurrency from `config`.
    pub fn from_config(provider: G, config: &GeocoderConfig) -> Self {
        Self::new(provider)
            .with_expected_region(config.expected_region.clone())
            .with_max_in_flight(config.max_in_flight)
    }

    /// Set the region filter; `None` accepts every region.
    pub fn with_expected_region(mut self, region: Option<String>) -> Self {
        self.expected_region = region;
        self
    }

    /// Allow up to `n` lookups at once.
    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n.max(1);
        self
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &G {
        &self.provider
    }

    /// Geocode a batch of addresses.
    ///
    /// Blank addresses are skipped without a lookup. Output order follows
    /// input order regardless of concurrency.
    pub async fn geocode(&self, addresses: &[String]) -> GeocodeOutcome {
        let results: Vec<_> = stream::iter(addresses.iter().filter(|a| !a.trim().is_empty()))
            .map(|address| self.resolve(address))
            .buffered(self.max_in_flight)
            .collect()
            .await;

        let mut outcome = GeocodeOutcome::default();
        for (entry, diagnostic) in results {
            outcome.entries.extend(entry);
            outcome.diagnostics.push(diagnostic);
        }
        outcome
    }

    async fn resolve(&self, address: &str) -> (Option<CoordinateEntry>, Diagnostic) {
        let place = match self.provider.forward(address).await {
            Ok(Lookup::Found(place)) => place,
            Ok(Lookup::NotFound { status }) => {
                warn!(address, ?status, "no geocoding result");
                return (None, not_found(address, None));
            }
            Err(e) => {
                warn!(address, error = %e, "geocoding request failed");
                let diagnostic = Diagnostic::new(
                    Level::Error,
                    DiagnosticKind::Transport,
                    format!("Error fetching data for {address}: {e}"),
                )
                .for_address(address);
                return (None, diagnostic);
            }
        };

        let (latitude, longitude) = match (place.latitude, place.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => (lat, lon),
            _ => {
                warn!(address, "geocoding result has no coordinates");
                return (None, not_found(address, Some("result has no coordinates")));
            }
        };

        if let Some(expected) = &self.expected_region {
            let in_region = place
                .region
                .as_deref()
                .is_some_and(|region| region.contains(expected.as_str()));
            if !in_region {
                let got = place.region.as_deref().unwrap_or("None");
                warn!(address, region = got, expected = %expected, "region mismatch");
                let diagnostic = Diagnostic::new(
                    Level::Warning,
                    DiagnosticKind::RegionMismatch,
                    format!("Coordinates not found accurately for: {address} (Got {got})"),
                )
                .for_address(address);
                return (None, diagnostic);
            }
        }

        let entry = CoordinateEntry::new(address, latitude, longitude);
        info!(address, latitude, longitude, "geocoded");
        let diagnostic = Diagnostic::new(Level::Info, DiagnosticKind::Resolved, entry.to_string())
            .for_address(address);
        (Some(entry), diagnostic)
    }
}

fn not_found(address: &str, detail: Option<&str>) -> Diagnostic {
    let message = match detail {
        Some(detail) => format!("No data found for {address} ({detail})."),
        None => format!("No data found for {address}."),
    };
    Diagnostic::new(Level::Error, DiagnosticKind::NotFound, message).for_address(address)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone)]
    pub(crate) enum Reply {
        Place(f64, f64, &'static str),
        Empty,
        Status(u16),
        Down,
    }

    /// Canned geocoder that records every query it receives.
    #[derive(Default)]
    pub(crate) struct FakeGeocoder {
        replies: HashMap<String, Reply>,
        pub queries: Mutex<Vec<String>>,
    }

    impl FakeGeocoder {
        pub(crate) fn reply(mut self, query: &str, reply: Reply) -> Self {
            self.replies.insert(query.to_string(), reply);
            self
        }

        pub(crate) fn query_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    impl ForwardGeocoder for FakeGeocoder {
        async fn forward(&self, query: &str) -> Result<Lookup> {
            self.queries.lock().unwrap().push(query.to_string());
            match self.replies.get(query).cloned().unwrap_or(Reply::Empty) {
                Reply::Place(lat, lon, region) => Ok(Lookup::Found(Place {
                    latitude: Some(lat),
                    longitude: Some(lon),
                    region: Some(region.to_string()),
                    label: None,
                })),
                Reply::Empty => Ok(Lookup::NotFound { status: None }),
                Reply::Status(code) => Ok(Lookup::NotFound { status: Some(code) }),
                Reply::Down => Err(Error::transport("connection refused")),
            }
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blank_addresses_are_not_requested() {
        let geocoder = Geocoder::new(FakeGeocoder::default());
        let outcome = tokio_test::block_on(geocoder.geocode(&strings(&["", "   ", "Gajuwaka", "\t"])));

        assert_eq!(geocoder.provider().query_count(), 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.entries.is_empty());
    }

    #[test]
    fn test_failures_do_not_abort_batch() {
        let provider = FakeGeocoder::default()
            .reply("down", Reply::Down)
            .reply("missing", Reply::Status(404))
            .reply("Gajuwaka", Reply::Place(17.69, 83.21, "Andhra Pradesh, India"));
        let geocoder = Geocoder::new(provider);

        let outcome =
            tokio_test::block_on(geocoder.geocode(&strings(&["down", "missing", "Gajuwaka"])));

        assert_eq!(geocoder.provider().query_count(), 3);
        let kinds: Vec<_> = outcome.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            [
                DiagnosticKind::Transport,
                DiagnosticKind::NotFound,
                DiagnosticKind::Resolved
            ]
        );
        assert!(outcome.diagnostics[0].message.contains("down"));
        assert!(outcome.diagnostics[0].message.contains("connection refused"));
        assert_eq!(outcome.diagnostics[1].message, "No data found for missing.");
        assert_eq!(outcome.entries, [CoordinateEntry::new("Gajuwaka", 17.69, 83.21)]);
    }

    #[test]
    fn test_region_filter() {
        let provider = FakeGeocoder::default()
            .reply("Sontyam", Reply::Place(17.86, 83.25, "Andhra Pradesh, India"))
            .reply("Secunderabad", Reply::Place(17.44, 78.50, "Telangana, India"));
        let geocoder = Geocoder::new(provider);

        let outcome =
            tokio_test::block_on(geocoder.geocode(&strings(&["Sontyam", "Secunderabad"])));

        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].address, "Sontyam");
        let mismatch = &outcome.diagnostics[1];
        assert_eq!(mismatch.kind, DiagnosticKind::RegionMismatch);
        assert_eq!(mismatch.level, Level::Warning);
        assert_eq!(
            mismatch.message,
            "Coordinates not found accurately for: Secunderabad (Got Telangana, India)"
        );
    }

    #[test]
    fn test_region_filter_disabled() {
        let provider = FakeGeocoder::default()
            .reply("Secunderabad", Reply::Place(17.44, 78.50, "Telangana, India"));
        let geocoder = Geocoder::new(provider).with_expected_region(None);
        let outcome = tokio_test::block_on(geocoder.geocode(&strings(&["Secunderabad"])));
        assert_eq!(outcome.entries.len(), 1);
    }

    #[test]
    fn test_concurrent_lookups_keep_input_order() {
        let provider = FakeGeocoder::default()
            .reply("a", Reply::Place(17.0, 83.0, "Andhra Pradesh"))
            .reply("b", Reply::Place(17.1, 83.1, "Andhra Pradesh"))
            .reply("c", Reply::Place(17.2, 83.2, "Andhra Pradesh"));
        let geocoder = Geocoder::new(provider).with_max_in_flight(3);

        let outcome = tokio_test::block_on(geocoder.geocode(&strings(&["a", "b", "c"])));
        let addresses: Vec<_> = outcome.entries.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(addresses, ["a", "b", "c"]);
    }

    #[test]
    fn test_classify_body() {
        let found = classify_body(
            r#"{"data":[{"latitude":17.6868,"longitude":83.2185,"region":"Andhra Pradesh","label":"Visakhapatnam, AP, India"}]}"#,
        )
        .unwrap();
        assert_matches!(found, Lookup::Found(Place { region: Some(ref r), .. }) if r == "Andhra Pradesh");

        assert_eq!(
            classify_body(r#"{"data":[]}"#).unwrap(),
            Lookup::NotFound { status: None }
        );
        assert_eq!(
            classify_body(r#"{"data":[[]]}"#).unwrap(),
            Lookup::NotFound { status: None }
        );
        assert_eq!(
            classify_body(r#"{"error":{"code":"invalid_access_key"}}"#).unwrap(),
            Lookup::NotFound { status: None }
        );
        assert_matches!(classify_body("<html>"), Err(Error::Decode { .. }));
    }

    #[test]
    fn test_place_without_coordinates_is_not_found() {
        struct NoCoordinates;
        impl ForwardGeocoder for NoCoordinates {
            async fn forward(&self, _query: &str) -> Result<Lookup> {
                classify_body(r#"{"data":[{"latitude":null,"longitude":null,"region":"Andhra Pradesh"}]}"#)
            }
        }

        let outcome = tokio_test::block_on(Geocoder::new(NoCoordinates).geocode(&strings(&["x"])));
        assert!(outcome.entries.is_empty());
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::NotFound);
    }

    #[test]
    fn test_position_stack_unreachable_endpoint() {
        // port 9 (discard) has no listener
        let config = GeocoderConfig::builder()
            .api_key("SUPERSECRETKEY123")
            .endpoint("http://127.0.0.1:9/v1/forward")
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        let geocoder = Geocoder::from_config(PositionStack::new(config.clone()).unwrap(), &config);

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = rt.block_on(geocoder.geocode(&strings(&["Gajuwaka"])));
        assert!(outcome.entries.is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
        let diagnostic = &outcome.diagnostics[0];
        assert!(diagnostic.is_error());
        assert!(diagnostic.message.starts_with("Error fetching data for Gajuwaka: "));
        assert!(!diagnostic.message.contains("SUPERSECRETKEY123"), "{}", diagnostic.message);
        assert!(!diagnostic.message.contains("access_key"), "{}", diagnostic.message);
    }
}
