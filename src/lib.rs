//! # postal-distance
//!
//! Parse and normalize postal addresses, geocode them, and map the distance
//! between a depot and a delivery address.
//!
//! Address parsing and expansion are delegated to libpostal (feature
//! `libpostal`), OCR to `tesseract`, geocoding to positionstack and geodesy to
//! the `geo` crate. This crate wires them together, contains their failures,
//! and turns the results into user-facing output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use postal_distance::{
//!     DEPOTS, DeliveryPlanner, Geocoder, GeocoderConfig, PlanOutcome, PositionStack, Session,
//!     UnavailableBackend, Visualizer, normalize_action,
//! };
//!
//! # async fn run() -> postal_distance::Result<()> {
//! let config = GeocoderConfig::from_env()?;
//! let geocoder = Geocoder::from_config(PositionStack::new(config.clone())?, &config);
//! let planner = DeliveryPlanner::new(geocoder, Visualizer::new());
//!
//! let mut session = Session::new();
//! normalize_action(&UnavailableBackend, &mut session, &"Sontyam, Visakhapatnam".into());
//!
//! if let PlanOutcome::Completed { visualization: Some(viz), .. } =
//!     planner.plan(&session, DEPOTS[1]).await
//! {
//!     println!("{}", viz.distance_label());
//!     std::fs::write("distance.html", viz.map.to_html()?)?;
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod actions;
pub mod config;
pub mod distance;
pub mod error;
pub mod geocoder;
pub mod map;
pub mod pipeline;
pub mod postal;
pub mod session;
pub mod source;
pub mod types;

// Re-export main API
pub use actions::{ActionOutcome, normalize_action, parse_action};
pub use config::{GeocoderConfig, GeocoderConfigBuilder, default_output_dir};
pub use error::{Error, Result};
pub use geocoder::{ForwardGeocoder, GeocodeOutcome, Geocoder, Lookup, Place, PositionStack};
pub use map::{MapDocument, Visualization, Visualizer};
pub use pipeline::{DeliveryPlanner, PlanOutcome};
#[cfg(feature = "libpostal")]
pub use postal::LibpostalBackend;
pub use postal::{AddressBackend, UnavailableBackend};
pub use session::Session;
pub use source::{AddressSource, TesseractOcr, TextExtractor};
pub use types::*;
