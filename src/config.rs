//! Geocoder configuration and output locations.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default positionstack forward-geocoding endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://api.positionstack.com/v1/forward";

/// Environment variable holding the positionstack access key.
pub const API_KEY_VAR: &str = "POSITIONSTACK_API_KEY";

/// Configuration for geocoding lookups.
///
/// The access key has no default and must come from the environment or the
/// command line. It is redacted from `Debug` output.
#[derive(Clone, PartialEq)]
pub struct GeocoderConfig {
    /// positionstack access key
    pub api_key: String,
    /// Forward-geocoding endpoint URL
    pub endpoint: String,
    /// ISO 3166 country code the search is restricted to
    pub country: String,
    /// Substring the returned region must contain; `None` accepts any region
    pub expected_region: Option<String>,
    /// Number of results requested per address
    pub limit: u32,
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum number of lookups in flight at once
    pub max_in_flight: usize,
}

impl fmt::Debug for GeocoderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeocoderConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("country", &self.country)
            .field("expected_region", &self.expected_region)
            .field("limit", &self.limit)
            .field("timeout", &self.timeout)
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}

impl GeocoderConfig {
    /// Create a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use postal_distance::GeocoderConfig;
    ///
    /// let config = GeocoderConfig::builder()
    ///     .api_key("secret")
    ///     .expected_region(Some("Andhra Pradesh"))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.country, "IN");
    /// ```
    pub fn builder() -> GeocoderConfigBuilder {
        GeocoderConfigBuilder::new()
    }

    /// Load configuration from `POSITIONSTACK_API_KEY` and the
    /// `POSTAL_DISTANCE_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::builder().env(|key| std::env::var(key).ok())?.build()
    }
}

/// Builder for [`GeocoderConfig`].
#[derive(Clone)]
pub struct GeocoderConfigBuilder {
    api_key: Option<String>,
    endpoint: String,
    country: String,
    expected_region: Option<String>,
    limit: u32,
    timeout: Duration,
    max_in_flight: usize,
}

impl GeocoderConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            country: "IN".to_string(),
            expected_region: Some("Andhra Pradesh".to_string()),
            limit: 1,
            timeout: Duration::from_secs(10),
            max_in_flight: 1,
        }
    }

    /// Set the access key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the country restriction.
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Set the region filter. `None` or an empty string disables it.
    pub fn expected_region(mut self, region: Option<impl Into<String>>) -> Self {
        self.expected_region = region.map(Into::into).filter(|r: &String| !r.is_empty());
        self
    }

    /// Set the result limit per address.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many lookups may run concurrently.
    pub fn max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n;
        self
    }

    /// Apply values from an environment lookup function.
    ///
    /// Unset variables leave the current value alone. Malformed numbers are
    /// reported rather than ignored.
    pub fn env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_VAR) {
            self = self.api_key(key);
        }
        if let Some(endpoint) = lookup("POSTAL_DISTANCE_ENDPOINT") {
            self = self.endpoint(endpoint);
        }
        if let Some(country) = lookup("POSTAL_DISTANCE_COUNTRY") {
            self = self.country(country);
        }
        if let Some(region) = lookup("POSTAL_DISTANCE_REGION") {
            self = self.expected_region(Some(region));
        }
        if let Some(limit) = lookup("POSTAL_DISTANCE_LIMIT") {
            self = self.limit(parse_number("POSTAL_DISTANCE_LIMIT", &limit)?);
        }
        if let Some(secs) = lookup("POSTAL_DISTANCE_TIMEOUT_SECS") {
            self = self.timeout(Duration::from_secs(parse_number(
                "POSTAL_DISTANCE_TIMEOUT_SECS",
                &secs,
            )?));
        }
        if let Some(n) = lookup("POSTAL_DISTANCE_MAX_IN_FLIGHT") {
            self = self.max_in_flight(parse_number("POSTAL_DISTANCE_MAX_IN_FLIGHT", &n)?);
        }
        Ok(self)
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Fails when the access key is missing or blank, or when a numeric
    /// setting is zero.
    pub fn build(self) -> Result<GeocoderConfig> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config(format!("{API_KEY_VAR} is not set")))?;
        if self.limit == 0 {
            return Err(Error::config("result limit must be at least 1"));
        }
        if self.max_in_flight == 0 {
            return Err(Error::config("max_in_flight must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(Error::config("timeout must be greater than zero"));
        }

        Ok(GeocoderConfig {
            api_key,
            endpoint: self.endpoint,
            country: self.country,
            expected_region: self.expected_region,
            limit: self.limit,
            timeout: self.timeout,
            max_in_flight: self.max_in_flight,
        })
    }
}

impl Default for GeocoderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{name} must be a number, got {value:?}")))
}

/// Get the default directory rendered maps are written to.
pub fn default_output_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("POSTAL_DISTANCE_OUTPUT_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(cache_dir) = dirs::cache_dir() {
        cache_dir.join("postal-distance")
    } else {
        PathBuf::from(".postal-distance")
    }
}
