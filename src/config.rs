//! Engine configuration.
//!
//! [`ClusterOptions`] is serializable so option sets can be loaded from JSON,
//! while the two aggregation hooks are runtime-only closures and are skipped
//! during (de)serialization.

use crate::feature::PropertyMap;
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Largest accepted `max_zoom`: `zoom + 1` must fit the 5-bit zoom field of
/// the packed cluster id, and the level above `max_zoom` also needs an id.
pub const MAX_ZOOM: u8 = 30;

/// Derives the per-point property summary stored on leaf clusters when a
/// reduce hook is configured.
pub type MapHook = Arc<dyn Fn(&PropertyMap) -> PropertyMap + Send + Sync>;

/// Folds a consumed cluster's property summary into the accumulator of the
/// cluster absorbing it.
pub type ReduceHook = Arc<dyn Fn(&mut PropertyMap, &PropertyMap) + Send + Sync>;

/// Clustering options.
///
/// # Example
///
/// ```rust
/// use mapcluster::ClusterOptions;
///
/// let options = ClusterOptions::default()
///     .with_radius(60)
///     .with_zoom_range(2, 14)
///     .with_min_points(3);
/// assert!(options.validate().is_ok());
///
/// // Load from JSON
/// let json = r#"{"radius": 80, "max_zoom": 12}"#;
/// let options = ClusterOptions::from_json(json).unwrap();
/// assert_eq!(options.radius, 80);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct ClusterOptions {
    /// Coarsest zoom level to generate clusters for.
    #[serde(default = "ClusterOptions::default_min_zoom")]
    pub min_zoom: u8,

    /// Finest zoom level to cluster points on; one level finer holds the
    /// unclustered input points.
    #[serde(default = "ClusterOptions::default_max_zoom")]
    pub max_zoom: u8,

    /// Cluster radius in pixels, relative to `extent`.
    #[serde(default = "ClusterOptions::default_radius")]
    pub radius: u16,

    /// Tile extent in pixels.
    #[serde(default = "ClusterOptions::default_extent")]
    pub extent: u16,

    /// Minimum number of points required to form a cluster.
    #[serde(default = "ClusterOptions::default_min_points")]
    pub min_points: usize,

    /// Generate sequential ids for singleton tile features that have none.
    #[serde(default)]
    pub generate_id: bool,

    /// Bucket size of the per-level spatial index.
    #[serde(default = "ClusterOptions::default_node_size")]
    pub node_size: usize,

    /// Per-point property summary hook; identity when unset. Only consulted
    /// when `reduce` is configured.
    #[serde(skip)]
    pub map: Option<MapHook>,

    /// Property aggregation hook applied while merging clusters.
    #[serde(skip)]
    pub reduce: Option<ReduceHook>,
}

impl ClusterOptions {
    const fn default_min_zoom() -> u8 {
        0
    }

    const fn default_max_zoom() -> u8 {
        16
    }

    const fn default_radius() -> u16 {
        40
    }

    const fn default_extent() -> u16 {
        512
    }

    const fn default_min_points() -> usize {
        2
    }

    const fn default_node_size() -> usize {
        64
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_radius(mut self, radius: u16) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_extent(mut self, extent: u16) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub fn with_generate_id(mut self, generate_id: bool) -> Self {
        self.generate_id = generate_id;
        self
    }

    pub fn with_node_size(mut self, node_size: usize) -> Self {
        self.node_size = node_size;
        self
    }

    /// Set the per-point property summary hook.
    pub fn with_map(mut self, map: impl Fn(&PropertyMap) -> PropertyMap + Send + Sync + 'static) -> Self {
        self.map = Some(Arc::new(map));
        self
    }

    /// Set the property aggregation hook, enabling property summaries.
    pub fn with_reduce(
        mut self,
        reduce: impl Fn(&mut PropertyMap, &PropertyMap) + Send + Sync + 'static,
    ) -> Self {
        self.reduce = Some(Arc::new(reduce));
        self
    }

    /// Validate option values.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_zoom > self.max_zoom {
            return Err("min_zoom must not exceed max_zoom".to_string());
        }
        if self.max_zoom > MAX_ZOOM {
            return Err(format!(
                "max_zoom must be at most {MAX_ZOOM} so zoom + 1 fits the id zoom field"
            ));
        }
        if self.radius == 0 {
            return Err("radius must be greater than zero".to_string());
        }
        if self.extent == 0 {
            return Err("extent must be greater than zero".to_string());
        }
        if self.min_points == 0 {
            return Err("min_points must be greater than zero".to_string());
        }
        if self.node_size == 0 {
            return Err("node_size must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Load options from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let options: ClusterOptions = serde_json::from_str(json)?;
        if let Err(e) = options.validate() {
            return Err(Error::custom(e));
        }
        Ok(options)
    }

    /// Save options as a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            min_zoom: Self::default_min_zoom(),
            max_zoom: Self::default_max_zoom(),
            radius: Self::default_radius(),
            extent: Self::default_extent(),
            min_points: Self::default_min_points(),
            generate_id: false,
            node_size: Self::default_node_size(),
            map: None,
            reduce: None,
        }
    }
}

impl fmt::Debug for ClusterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterOptions")
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .field("radius", &self.radius)
            .field("extent", &self.extent)
            .field("min_points", &self.min_points)
            .field("generate_id", &self.generate_id)
            .field("node_size", &self.node_size)
            .field("map", &self.map.is_some())
            .field("reduce", &self.reduce.is_some())
            .finish()
    }
}
