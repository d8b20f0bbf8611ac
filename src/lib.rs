//! # mapcluster
//!
//! Hierarchical geospatial point clustering for interactive map rendering.
//!
//! The engine ingests point features once, projects them into normalized
//! Web-Mercator space and precomputes a cluster hierarchy across the whole
//! zoom range. Every query afterwards is a cheap read against a static
//! per-zoom spatial index, so panning and zooming a map of hundreds of
//! thousands of markers stays interactive.
//!
//! ## Quick start
//!
//! ```rust
//! use mapcluster::{ClusterEngine, ClusterOptions, Feature};
//!
//! let features = vec![
//!     Feature::new(-73.9857, 40.7484), // midtown Manhattan
//!     Feature::new(-73.9851, 40.7489), // a block away
//!     Feature::new(2.3522, 48.8566),   // Paris
//! ];
//! let engine = ClusterEngine::new(features, ClusterOptions::default())?;
//!
//! // Zoomed all the way out the two Manhattan points collapse into one
//! // cluster while Paris stays an individual marker.
//! let world = engine.clusters([-180.0, -90.0, 180.0, 90.0], 0);
//! assert_eq!(world.len(), 2);
//! # Ok::<(), mapcluster::ClusterError>(())
//! ```
//!
//! ## Features
//!
//! - `geojson` (default): parse inputs from and serialize results to GeoJSON
//!   feature collections.

pub mod config;
pub mod engine;
pub mod error;
pub mod feature;
#[cfg(feature = "geojson")]
pub mod geojson;
mod level;
pub mod projection;
pub mod spatial_index;

pub use config::{ClusterOptions, MapHook, ReduceHook, MAX_ZOOM};
pub use engine::ClusterEngine;
pub use error::{ClusterError, Result};
pub use feature::{Feature, FeatureId, PropertyMap, PropertyValue, TileFeature, TilePoint};
pub use spatial_index::SpatialIndex;

// Re-export the geographic point type used throughout the public API.
pub use geo::Point;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for working with the engine.
pub mod prelude {
    pub use crate::config::ClusterOptions;
    pub use crate::engine::ClusterEngine;
    pub use crate::error::{ClusterError, Result};
    pub use crate::feature::{Feature, FeatureId, PropertyMap, PropertyValue};
    pub use geo::Point;
}
