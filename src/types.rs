//! Common types shared by the address, geocoding and mapping stages.

use std::fmt;

/// Candidate postal addresses a delivery distance is measured from.
pub const DEPOTS: [&str; 3] = [
    "Sontyam, Visakhapatnam, Andhra Pradesh, India",
    "Gajuwaka, Visakhapatnam, Andhra Pradesh, India",
    "Madhurawada, Visakhapatnam, Andhra Pradesh, India",
];

/// Unparsed address text, typed by the user or extracted by OCR.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawAddress(String);

impl RawAddress {
    /// Wrap address text as-is.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The text exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether there is any address to act on.
    ///
    /// Whitespace-only text (a common OCR result for blank images) counts as
    /// missing.
    pub fn is_present(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl From<&str> for RawAddress {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for RawAddress {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for RawAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One labeled piece of a parsed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedComponent {
    /// Text of the component (e.g. "visakhapatnam")
    pub value: String,
    /// Component label (e.g. "city", "road", "house_number")
    pub label: String,
}

impl ParsedComponent {
    /// Create a component from a value and its label.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for ParsedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl LatLon {
    /// Create a new coordinate pair.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Arithmetic midpoint of two pairs.
    pub fn midpoint(self, other: LatLon) -> LatLon {
        LatLon {
            lat: (self.lat + other.lat) / 2.0,
            lon: (self.lon + other.lon) / 2.0,
        }
    }
}

/// A geocoded, region-validated address.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateEntry {
    /// Address text as it was submitted for geocoding
    pub address: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl CoordinateEntry {
    /// Create a new entry.
    pub fn new(address: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            address: address.into(),
            latitude,
            longitude,
        }
    }

    /// Coordinates of this entry.
    pub fn position(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

impl fmt::Display for CoordinateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ({}, {})", self.address, self.latitude, self.longitude)
    }
}

/// How the canonical address is picked from the normalized variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// First variant returned by the expander
    #[default]
    First,
    /// Shortest variant; ties go to the earlier one
    Shortest,
}

impl SelectionPolicy {
    /// Apply the policy to a list of variants.
    pub fn select<'a>(&self, variants: &'a [String]) -> Option<&'a str> {
        match self {
            SelectionPolicy::First => variants.first(),
            SelectionPolicy::Shortest => variants.iter().min_by_key(|v| v.chars().count()),
        }
        .map(|s| s.as_str())
    }
}

/// Severity of a user-facing diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Progress or success
    Info,
    /// Result produced but discarded
    Warning,
    /// Action failed
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        };
        f.write_str(name)
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// No address text to act on
    InputMissing,
    /// Network or HTTP failure during geocoding
    Transport,
    /// Geocoding returned no usable result
    NotFound,
    /// Geocoding result outside the expected region
    RegionMismatch,
    /// Visualization requested with the wrong number of entries
    CountMismatch,
    /// OCR, parser, expander or renderer failed
    CollaboratorFault,
    /// Geocoding accepted an entry
    Resolved,
}

/// A user-facing report produced by an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Severity
    pub level: Level,
    /// Category
    pub kind: DiagnosticKind,
    /// Address the report concerns, if any
    pub address: Option<String>,
    /// Text shown to the user
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic not tied to an address.
    pub fn new(level: Level, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            address: None,
            message: message.into(),
        }
    }

    /// Attach the address this diagnostic concerns.
    pub fn for_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Report a failed collaborator call.
    pub fn collaborator_fault(what: &str, err: impl fmt::Display) -> Self {
        Self::new(
            Level::Error,
            DiagnosticKind::CollaboratorFault,
            format!("{what} failed: {err}"),
        )
    }

    /// Whether this diagnostic reports a failure.
    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_address_presence() {
        assert!(RawAddress::from("Sontyam, Visakhapatnam").is_present());
        assert!(!RawAddress::from("").is_present());
        assert!(!RawAddress::from(" \n\x0c").is_present());
    }

    #[test]
    fn test_component_display() {
        let component = ParsedComponent::new("visakhapatnam", "city");
        assert_eq!(component.to_string(), "city: visakhapatnam");
    }

    #[test]
    fn test_midpoint() {
        let a = LatLon::new(17.0, 83.0);
        let b = LatLon::new(18.0, 84.0);
        assert_eq!(a.midpoint(b), LatLon::new(17.5, 83.5));
    }

    #[test]
    fn test_selection_policy() {
        let variants = vec![
            "sontyam visakhapatnam andhra pradesh india".to_string(),
            "sontyam vizag ap india".to_string(),
        ];
        assert_eq!(
            SelectionPolicy::First.select(&variants),
            Some("sontyam visakhapatnam andhra pradesh india")
        );
        assert_eq!(
            SelectionPolicy::Shortest.select(&variants),
            Some("sontyam vizag ap india")
        );
        assert_eq!(SelectionPolicy::First.select(&[]), None);
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::new(
            Level::Warning,
            DiagnosticKind::RegionMismatch,
            "Coordinates not found accurately",
        )
        .for_address("Gajuwaka");
        assert_eq!(diagnostic.to_string(), "[warning] Coordinates not found accurately");
        assert_eq!(diagnostic.address.as_deref(), Some("Gajuwaka"));
        assert!(!diagnostic.is_error());
    }
}
