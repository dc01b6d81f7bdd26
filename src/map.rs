//! Distance visualization: a map document with two markers, the line
//! between them and a distance label, rendered as a Leaflet page.

use std::fmt::Write as _;

use tracing::debug;

use crate::distance::{format_km, geodesic_km};
use crate::error::{Error, Result};
use crate::types::{CoordinateEntry, Diagnostic, DiagnosticKind, LatLon, Level};

/// Zoom level for the two-point overview.
pub const DEFAULT_ZOOM: u8 = 5;

/// Message reported when the entry count is not two.
pub const COUNT_MISMATCH: &str = "Please enter exactly two addresses.";

/// A point marker with popup and tooltip text.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Marker position
    pub location: LatLon,
    /// Text shown when the marker is clicked
    pub popup: String,
    /// Text shown on hover
    pub tooltip: String,
}

/// A line through an ordered list of points.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    /// Vertices in drawing order
    pub locations: Vec<LatLon>,
    /// CSS color name or hex value
    pub color: String,
    /// Stroke width in pixels
    pub weight: f64,
    /// Stroke opacity, 0 to 1
    pub opacity: f64,
}

/// Free HTML placed at a location with no marker icon.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    /// Anchor position
    pub location: LatLon,
    /// HTML content of the label
    pub html: String,
}

/// Everything needed to draw a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    /// Initial center
    pub center: LatLon,
    /// Initial zoom level
    pub zoom: u8,
    /// Point markers
    pub markers: Vec<Marker>,
    /// Lines
    pub polylines: Vec<Polyline>,
    /// Text overlays
    pub labels: Vec<TextLabel>,
}

impl MapDocument {
    /// Create an empty map.
    pub fn new(center: LatLon, zoom: u8) -> Self {
        Self {
            center,
            zoom,
            markers: Vec::new(),
            polylines: Vec::new(),
            labels: Vec::new(),
        }
    }

    fn positions(&self) -> impl Iterator<Item = LatLon> + '_ {
        std::iter::once(self.center)
            .chain(self.markers.iter().map(|m| m.location))
            .chain(self.polylines.iter().flat_map(|l| l.locations.iter().copied()))
            .chain(self.labels.iter().map(|l| l.location))
    }

    /// Render a standalone HTML page using Leaflet and OpenStreetMap tiles.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Render`] when any coordinate is not finite.
    pub fn to_html(&self) -> Result<String> {
        if let Some(bad) = self.positions().find(|p| !p.lat.is_finite() || !p.lon.is_finite()) {
            return Err(Error::render(format!(
                "cannot place ({}, {}) on a map",
                bad.lat, bad.lon
            )));
        }

        let mut script = String::new();
        writeln!(
            script,
            "var map = L.map('map').setView({}, {});",
            js_latlon(self.center),
            self.zoom
        )
        .map_err(write_failed)?;
        script.push_str(
            "L.tileLayer('https://tile.openstreetmap.org/{z}/{x}/{y}.png', {\n  \
             maxZoom: 19,\n  \
             attribution: '&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors'\n\
             }).addTo(map);\n",
        );
        for marker in &self.markers {
            // popup and tooltip content is inserted as HTML
            writeln!(
                script,
                "L.marker({}).bindPopup({}).bindTooltip({}).addTo(map);",
                js_latlon(marker.location),
                js_string(&html_escape(&marker.popup)),
                js_string(&html_escape(&marker.tooltip))
            )
            .map_err(write_failed)?;
        }
        for line in &self.polylines {
            let points: Vec<String> = line.locations.iter().map(|p| js_latlon(*p)).collect();
            writeln!(
                script,
                "L.polyline([{}], {{color: {}, weight: {}, opacity: {}}}).addTo(map);",
                points.join(", "),
                js_string(&line.color),
                line.weight,
                line.opacity
            )
            .map_err(write_failed)?;
        }
        for label in &self.labels {
            writeln!(
                script,
                "L.marker({}, {{icon: L.divIcon({{className: 'distance-label', html: {}}})}}).addTo(map);",
                js_latlon(label.location),
                js_string(&label.html)
            )
            .map_err(write_failed)?;
        }

        Ok(format!(
            r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Postal delivery distance</title>
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css" crossorigin="anonymous" />
  <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js" crossorigin="anonymous"></script>
  <style>
    html, body {{ height: 100%; margin: 0; }}
    #map {{ height: 100%; width: 100%; }}
    .distance-label {{ background: none; border: none; white-space: nowrap; }}
  </style>
</head>
<body>
  <div id="map"></div>
  <script>
{script}  </script>
</body>
</html>
"#
        ))
    }
}

fn js_latlon(p: LatLon) -> String {
    format!("[{}, {}]", p.lat, p.lon)
}

fn write_failed(err: std::fmt::Error) -> Error {
    Error::render(format!("failed to build map script: {err}"))
}

/// Escape text for use as HTML content.
fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Quote text as a JavaScript string literal that is safe inside `<script>`.
fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_owned())
        .to_string()
        .replace("</", "<\\/")
}

/// Computed distance and the map that shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Visualization {
    /// Geodesic distance in kilometers
    pub distance_km: f64,
    /// Map to render
    pub map: MapDocument,
}

impl Visualization {
    /// Distance formatted with two decimals, e.g. `"19.52 km"`.
    pub fn distance_label(&self) -> String {
        format_km(self.distance_km)
    }
}

/// Builds distance maps for pairs of coordinate entries.
#[derive(Debug, Clone)]
pub struct Visualizer {
    zoom: u8,
    line_color: String,
    line_weight: f64,
    line_opacity: f64,
}

impl Visualizer {
    /// Overview zoom, 2.5px opaque blue connecting line.
    pub fn new() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            line_color: "blue".to_string(),
            line_weight: 2.5,
            line_opacity: 1.0,
        }
    }

    /// Override the zoom level.
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    /// Build the map for exactly two entries.
    ///
    /// Any other count is reported as a `CountMismatch` diagnostic and no map
    /// is produced.
    pub fn visualize(&self, entries: &[CoordinateEntry]) -> std::result::Result<Visualization, Diagnostic> {
        let [first, second] = entries else {
            return Err(Diagnostic::new(
                Level::Error,
                DiagnosticKind::CountMismatch,
                COUNT_MISMATCH,
            ));
        };

        let (a, b) = (first.position(), second.position());
        let distance_km = geodesic_km(a, b);
        let midpoint = a.midpoint(b);
        debug!(distance_km, "built distance map");

        let mut map = MapDocument::new(midpoint, self.zoom);
        for entry in [first, second] {
            map.markers.push(Marker {
                location: entry.position(),
                popup: entry.address.clone(),
                tooltip: entry.address.clone(),
            });
        }
        map.polylines.push(Polyline {
            locations: vec![a, b],
            color: self.line_color.clone(),
            weight: self.line_weight,
            opacity: self.line_opacity,
        });
        map.labels.push(TextLabel {
            location: midpoint,
            html: format!(
                r#"<div style="font-size: 12pt; color: red;">{}</div>"#,
                format_km(distance_km)
            ),
        });

        Ok(Visualization { distance_km, map })
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
