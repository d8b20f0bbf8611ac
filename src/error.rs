//! Error types for the clustering engine.

use thiserror::Error;

/// Errors surfaced by [`ClusterEngine`](crate::ClusterEngine).
///
/// Internal consistency failures (a level or cluster index that should exist
/// but does not) are engine bugs and panic instead of being reported here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// A query referenced a cluster id that does not resolve to any cluster,
    /// or to a cluster without recorded children.
    #[error("no cluster with id {0}")]
    ClusterNotFound(u32),

    /// The engine was constructed with an invalid option set.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[cfg(feature = "geojson")]
    #[error("invalid geojson: {0}")]
    InvalidGeoJson(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
