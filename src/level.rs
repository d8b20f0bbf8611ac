//! Per-zoom cluster layers and the bottom-up aggregation pass.
//!
//! Each zoom level owns an array of clusters plus a spatial index over their
//! normalized positions. The finest level wraps the input features one to
//! one; every coarser level is produced by a single greedy pass over the
//! level below: each unvisited cluster becomes a pivot and, if it and its
//! unvisited radius neighbors together reach `min_points`, is minted into a
//! new cluster; otherwise the pivot and those neighbors pass through as
//! singletons. Two points therefore only ever merge through a shared pivot,
//! never transitively within one pass. A cluster that meets the threshold on
//! its own is minted anew at every coarser level, so a cluster id seen at one
//! zoom chains to a fresh id per level until the cluster gains members or
//! splits; the expansion-zoom walk follows these single-child chains.
//!
//! Building a level writes exactly two fields of the finer level: `visited`
//! (scoped to the pass) and `parent_id` (the id of the absorbing cluster,
//! which the child-navigation queries rely on afterwards).

use crate::config::ClusterOptions;
use crate::feature::{Feature, PropertyMap};
use crate::projection;
use crate::spatial_index::SpatialIndex;
use smallvec::SmallVec;

/// Number of low id bits holding `zoom + 1`; the remaining high bits hold the
/// cluster's index in the child level, capping usable indices at 2^27 - 1.
pub(crate) const ZOOM_BITS: u32 = 5;
pub(crate) const ZOOM_MASK: u32 = (1 << ZOOM_BITS) - 1;
const MAX_INDEXED: usize = (u32::MAX >> ZOOM_BITS) as usize;

/// One node of the aggregation hierarchy.
#[derive(Debug, Clone)]
pub(crate) struct Cluster {
    /// Centroid in normalized space.
    pub x: f64,
    pub y: f64,
    /// Number of source features represented, >= 1.
    pub num_points: u32,
    /// Source feature index for pass-throughs, packed (index, zoom) otherwise.
    pub id: u32,
    /// Id of the cluster one zoom coarser that absorbed this one; 0 until then.
    pub parent_id: u32,
    /// Scratch flag used only while the next coarser level is being built.
    pub visited: bool,
    /// Aggregated property summary; present only with a configured reduce hook.
    pub properties: Option<PropertyMap>,
}

impl Cluster {
    fn new(x: f64, y: f64, num_points: u32, id: u32, properties: Option<PropertyMap>) -> Self {
        Self {
            x,
            y,
            num_points,
            id,
            parent_id: 0,
            visited: false,
            properties,
        }
    }
}

/// All clusters existing at one zoom level, with their spatial index.
#[derive(Debug)]
pub(crate) struct ClusterLevel {
    pub clusters: Vec<Cluster>,
    pub index: SpatialIndex,
}

impl ClusterLevel {
    /// The finest level: one cluster per input feature, in input order.
    pub fn from_features(features: &[Feature], options: &ClusterOptions) -> Self {
        let mut clusters = Vec::with_capacity(features.len());
        for (i, feature) in features.iter().enumerate() {
            let (x, y) = projection::project(&feature.geometry);
            let properties = if options.reduce.is_some() {
                let summary = match &options.map {
                    Some(map) => map(&feature.properties),
                    None => feature.properties.clone(),
                };
                (!summary.is_empty()).then_some(summary)
            } else {
                None
            };
            clusters.push(Cluster::new(x, y, 1, i as u32, properties));
        }
        let index = build_index(&clusters, options);
        Self { clusters, index }
    }

    /// Build the level at `zoom` by aggregating the level one zoom finer.
    ///
    /// `r` is the clustering radius in normalized units at `zoom`. The finer
    /// level is mutated in its `visited` and `parent_id` fields only.
    pub fn from_finer(
        finer: &mut ClusterLevel,
        r: f64,
        zoom: u8,
        options: &ClusterOptions,
    ) -> Self {
        debug_assert_eq!((zoom as u32 + 1) & ZOOM_MASK, zoom as u32 + 1);

        let mut clusters = Vec::new();
        let ClusterLevel { clusters: prev, index } = finer;
        let clusterable = prev.len().min(MAX_INDEXED);

        for i in 0..clusterable {
            if prev[i].visited {
                continue;
            }
            prev[i].visited = true;

            let (px, py) = (prev[i].x, prev[i].y);
            let origin_points = prev[i].num_points;
            let origin_id = prev[i].id;
            let mut merged_props = prev[i].properties.clone().unwrap_or_default();

            let mut neighbors: SmallVec<[u32; 32]> = SmallVec::new();
            index.within(px, py, r, |id| neighbors.push(id));

            let mut num_points = origin_points;
            for &n in &neighbors {
                let b = &prev[n as usize];
                if !b.visited {
                    num_points += b.num_points;
                }
            }

            if num_points as usize >= options.min_points {
                // Absorb every unvisited neighbor into a freshly minted cluster.
                let id = ((i as u32) << ZOOM_BITS) + (zoom as u32 + 1);
                let mut wx = px * origin_points as f64;
                let mut wy = py * origin_points as f64;

                for &n in &neighbors {
                    let b = &mut prev[n as usize];
                    if b.visited {
                        continue;
                    }
                    b.visited = true;
                    b.parent_id = id;
                    wx += b.x * b.num_points as f64;
                    wy += b.y * b.num_points as f64;
                    if let Some(reduce) = &options.reduce {
                        if let Some(props) = &b.properties {
                            reduce(&mut merged_props, props);
                        }
                    }
                }
                prev[i].parent_id = id;

                clusters.push(Cluster::new(
                    wx / num_points as f64,
                    wy / num_points as f64,
                    num_points,
                    id,
                    (!merged_props.is_empty()).then_some(merged_props),
                ));
            } else {
                // Below the threshold: the pivot and every neighbor it would
                // have claimed pass through as singletons. Only count-1
                // entries can land here, since an existing cluster already
                // met the threshold when it was minted.
                clusters.push(Cluster::new(
                    px,
                    py,
                    1,
                    origin_id,
                    (!merged_props.is_empty()).then_some(merged_props),
                ));

                if num_points > 1 {
                    for &n in &neighbors {
                        let b = &mut prev[n as usize];
                        if b.visited {
                            continue;
                        }
                        b.visited = true;
                        let passthrough = Cluster::new(b.x, b.y, 1, b.id, b.properties.clone());
                        clusters.push(passthrough);
                    }
                }
            }
        }

        let index = build_index(&clusters, options);
        Self { clusters, index }
    }
}

fn build_index(clusters: &[Cluster], options: &ClusterOptions) -> SpatialIndex {
    let points: Vec<(f64, f64)> = clusters.iter().map(|c| (c.x, c.y)).collect();
    SpatialIndex::with_node_size(&points, options.node_size)
}
