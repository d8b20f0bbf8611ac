//! The clustering engine: index construction and the query surface.
//!
//! [`ClusterEngine::new`] projects the input once, then builds one cluster
//! level per zoom from `max_zoom + 1` (raw points) down to `min_zoom`,
//! aggregating greedily with a radius that doubles per zoom step. All queries
//! afterwards are read-only lookups against the prebuilt levels.
//!
//! Cluster ids pack the mint site into 32 bits: the low 5 bits hold the zoom
//! of the level containing the cluster's children plus nothing (it is already
//! `zoom + 1`), the high 27 bits hold the pivot's index in that level. Child
//! navigation decodes the id, queries the child level around the stored
//! centroid and keeps the entries whose `parent_id` matches.

use crate::config::ClusterOptions;
use crate::error::{ClusterError, Result};
use crate::feature::{Feature, FeatureId, PropertyMap, PropertyValue, TileFeature, TilePoint};
use crate::level::{Cluster, ClusterLevel, ZOOM_BITS, ZOOM_MASK};
use crate::projection;
use log::debug;
use std::time::Instant;

/// Hierarchical point clustering index over a fixed feature set.
#[derive(Debug)]
pub struct ClusterEngine {
    options: ClusterOptions,
    features: Vec<Feature>,
    /// Levels indexed by `zoom - min_zoom`, finest last.
    levels: Vec<ClusterLevel>,
}

impl ClusterEngine {
    /// Build the full cluster hierarchy for `features`.
    ///
    /// Runs in O(n log n) per level. The input order is significant: ties in
    /// the greedy aggregation resolve in favor of earlier features, so the
    /// same input always produces the same hierarchy.
    pub fn new(features: Vec<Feature>, options: ClusterOptions) -> Result<Self> {
        options.validate().map_err(ClusterError::InvalidOptions)?;

        let started = Instant::now();
        debug!(
            "clustering {} points over zoom {}..={}",
            features.len(),
            options.min_zoom,
            options.max_zoom
        );

        let span = (options.max_zoom - options.min_zoom) as usize + 2;
        let mut levels = Vec::with_capacity(span);

        let mut finest = ClusterLevel::from_features(&features, &options);
        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let r = options.radius as f64 / (options.extent as f64 * f64::powi(2.0, zoom as i32));
            let coarser = ClusterLevel::from_finer(&mut finest, r, zoom, &options);
            debug!("z{zoom}: {} clusters", coarser.clusters.len());
            levels.push(finest);
            finest = coarser;
        }
        levels.push(finest);
        levels.reverse();

        debug!(
            "built {} levels in {:.1?}",
            levels.len(),
            started.elapsed()
        );

        Ok(Self {
            options,
            features,
            levels,
        })
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Number of input features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Clusters and points inside `bbox = [west, south, east, north]`
    /// (degrees) at the given zoom.
    ///
    /// Longitudes are wrapped into [-180, 180]; a box spanning 360 degrees or
    /// more covers the whole world, and a box crossing the antimeridian is
    /// answered as the union of its eastern and western halves.
    pub fn clusters(&self, bbox: [f64; 4], zoom: u8) -> Vec<Feature> {
        let mut min_lng = (bbox[0] + 180.0).rem_euclid(360.0) - 180.0;
        let min_lat = bbox[1].clamp(-90.0, 90.0);
        let mut max_lng = if bbox[2] == 180.0 {
            180.0
        } else {
            (bbox[2] + 180.0).rem_euclid(360.0) - 180.0
        };
        let max_lat = bbox[3].clamp(-90.0, 90.0);

        if bbox[2] - bbox[0] >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            let mut eastern = self.clusters([min_lng, min_lat, 180.0, max_lat], zoom);
            let western = self.clusters([-180.0, min_lat, max_lng, max_lat], zoom);
            eastern.extend(western);
            return eastern;
        }

        let level = self.level(zoom);
        let mut out = Vec::new();
        level.index.range(
            projection::lng_x(min_lng),
            projection::lat_y(max_lat),
            projection::lng_x(max_lng),
            projection::lat_y(min_lat),
            |id| {
                let c = &level.clusters[id as usize];
                out.push(if c.num_points > 1 {
                    self.cluster_to_feature(c)
                } else {
                    self.features[c.id as usize].clone()
                });
            },
        );
        out
    }

    /// The tile `(zoom, x, y)` in tile-local integer pixel coordinates, or
    /// `None` when nothing intersects it.
    ///
    /// The query box is padded by the cluster radius so markers straddling a
    /// tile edge appear in both tiles, and tiles in the first and last column
    /// also pick up features from across the antimeridian.
    pub fn tile(&self, zoom: u8, x: u32, y: u32) -> Option<Vec<TileFeature>> {
        let level = self.level(zoom);
        let z2 = f64::powi(2.0, zoom as i32);
        let p = self.options.radius as f64 / self.options.extent as f64;
        let top = (y as f64 - p) / z2;
        let bottom = (y as f64 + 1.0 + p) / z2;

        let mut features = Vec::new();
        let mut emit = |id: u32, tile_x: f64| {
            let c = &level.clusters[id as usize];
            features.push(self.to_tile_feature(c, tile_x, y as f64, z2));
        };

        level.index.range(
            (x as f64 - p) / z2,
            top,
            (x as f64 + 1.0 + p) / z2,
            bottom,
            |id| emit(id, x as f64),
        );
        if x == 0 {
            level
                .index
                .range(1.0 - p / z2, top, 1.0, bottom, |id| emit(id, z2));
        }
        if x as f64 == z2 - 1.0 {
            level
                .index
                .range(0.0, top, p / z2, bottom, |id| emit(id, -1.0));
        }

        (!features.is_empty()).then_some(features)
    }

    /// The direct children of a cluster, one zoom level finer.
    pub fn children(&self, cluster_id: u32) -> Result<Vec<Feature>> {
        let children = self.children_of(cluster_id)?;
        Ok(children
            .into_iter()
            .map(|c| {
                if c.num_points > 1 {
                    self.cluster_to_feature(c)
                } else {
                    self.features[c.id as usize].clone()
                }
            })
            .collect())
    }

    /// Up to `limit` of the original features inside a cluster, skipping the
    /// first `offset`, in hierarchy order.
    ///
    /// Descends the hierarchy depth first and skips whole subtrees that fall
    /// entirely inside the offset, so deep pagination never materializes the
    /// leaves it skips.
    pub fn leaves(&self, cluster_id: u32, limit: usize, offset: usize) -> Result<Vec<Feature>> {
        let mut leaves = Vec::new();
        self.append_leaves(&mut leaves, cluster_id, limit, offset, 0)?;
        Ok(leaves)
    }

    /// The smallest zoom at which the cluster splits into multiple parts,
    /// clamped into the configured zoom range.
    pub fn expansion_zoom(&self, cluster_id: u32) -> Result<u8> {
        let mut id = cluster_id;
        let mut zoom = ((cluster_id & ZOOM_MASK) as u8).saturating_sub(1);
        while zoom <= self.options.max_zoom {
            let children = self.children_of(id)?;
            zoom += 1;
            if children.len() != 1 || children[0].num_points == 1 {
                break;
            }
            id = children[0].id;
        }
        Ok(zoom.clamp(self.options.min_zoom, self.options.max_zoom))
    }

    fn limit_zoom(&self, zoom: u8) -> u8 {
        zoom.clamp(self.options.min_zoom, self.options.max_zoom + 1)
    }

    fn level(&self, zoom: u8) -> &ClusterLevel {
        &self.levels[(self.limit_zoom(zoom) - self.options.min_zoom) as usize]
    }

    fn level_at(&self, zoom: u8) -> Option<&ClusterLevel> {
        if zoom <= self.options.min_zoom {
            return None;
        }
        self.levels.get((zoom - self.options.min_zoom) as usize)
    }

    /// Decode a cluster id and collect its children from the level it was
    /// minted against.
    fn children_of(&self, cluster_id: u32) -> Result<Vec<&Cluster>> {
        let origin_zoom = (cluster_id & ZOOM_MASK) as u8;
        let origin_index = (cluster_id >> ZOOM_BITS) as usize;

        let level = self
            .level_at(origin_zoom)
            .ok_or(ClusterError::ClusterNotFound(cluster_id))?;
        let origin = level
            .clusters
            .get(origin_index)
            .ok_or(ClusterError::ClusterNotFound(cluster_id))?;

        let r = self.options.radius as f64
            / (self.options.extent as f64 * f64::powi(2.0, origin_zoom as i32 - 1));
        let mut children = Vec::new();
        level.index.within(origin.x, origin.y, r, |id| {
            let c = &level.clusters[id as usize];
            if c.parent_id == cluster_id {
                children.push(c);
            }
        });

        if children.is_empty() {
            return Err(ClusterError::ClusterNotFound(cluster_id));
        }
        Ok(children)
    }

    fn append_leaves(
        &self,
        out: &mut Vec<Feature>,
        cluster_id: u32,
        limit: usize,
        offset: usize,
        mut skipped: usize,
    ) -> Result<usize> {
        for child in self.children_of(cluster_id)? {
            if out.len() >= limit {
                break;
            }
            let size = child.num_points as usize;
            if size > 1 {
                if skipped + size <= offset {
                    // The whole subtree lands before the page; skip it as one.
                    skipped += size;
                } else {
                    skipped = self.append_leaves(out, child.id, limit, offset, skipped)?;
                }
            } else if skipped < offset {
                skipped += 1;
            } else {
                out.push(self.features[child.id as usize].clone());
            }
        }
        Ok(skipped)
    }

    fn cluster_to_feature(&self, c: &Cluster) -> Feature {
        Feature {
            geometry: projection::unproject(c.x, c.y),
            properties: self.cluster_properties(c),
            id: Some(FeatureId::Uint(c.id as u64)),
        }
    }

    fn to_tile_feature(&self, c: &Cluster, tile_x: f64, tile_y: f64, z2: f64) -> TileFeature {
        let extent = self.options.extent as f64;
        let geometry = TilePoint {
            x: (extent * (c.x * z2 - tile_x)).round() as i16,
            y: (extent * (c.y * z2 - tile_y)).round() as i16,
        };

        if c.num_points > 1 {
            TileFeature {
                geometry,
                properties: self.cluster_properties(c),
                id: Some(FeatureId::Uint(c.id as u64)),
            }
        } else {
            let source = &self.features[c.id as usize];
            let id = if self.options.generate_id {
                Some(FeatureId::Uint(c.id as u64))
            } else {
                source.id.clone()
            };
            TileFeature {
                geometry,
                properties: source.properties.clone(),
                id,
            }
        }
    }

    /// Reduced properties never displace the synthesized cluster fields.
    fn cluster_properties(&self, c: &Cluster) -> PropertyMap {
        let mut props = PropertyMap::default();
        props.insert("cluster".to_string(), PropertyValue::Bool(true));
        props.insert("cluster_id".to_string(), PropertyValue::Uint(c.id as u64));
        props.insert(
            "point_count".to_string(),
            PropertyValue::Uint(c.num_points as u64),
        );
        props.insert(
            "point_count_abbreviated".to_string(),
            abbreviate_count(c.num_points),
        );
        if let Some(reduced) = &c.properties {
            for (key, value) in reduced {
                props.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        props
    }
}

/// Human-readable point count: `1234` becomes `1.2k`, `987` stays numeric.
fn abbreviate_count(count: u32) -> PropertyValue {
    if count >= 10_000 {
        let thousands = (count as f64 / 1000.0).round() as u32;
        PropertyValue::String(format!("{thousands}k"))
    } else if count >= 1000 {
        let tenths = (count as f64 / 100.0).round() / 10.0;
        if tenths.fract() == 0.0 {
            PropertyValue::String(format!("{}k", tenths as u32))
        } else {
            PropertyValue::String(format!("{tenths}k"))
        }
    } else {
        PropertyValue::Uint(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD: [f64; 4] = [-180.0, -90.0, 180.0, 90.0];

    fn nearby_pair() -> Vec<Feature> {
        vec![
            Feature::new(-73.9857, 40.7484),
            Feature::new(-73.9851, 40.7489),
        ]
    }

    #[test]
    fn test_pair_clusters_at_low_zoom() {
        let engine = ClusterEngine::new(nearby_pair(), ClusterOptions::default()).unwrap();
        let clusters = engine.clusters(WORLD, 0);
        assert_eq!(clusters.len(), 1);
        let props = &clusters[0].properties;
        assert_eq!(props["cluster"], PropertyValue::Bool(true));
        assert_eq!(props["point_count"], PropertyValue::Uint(2));
    }

    #[test]
    fn test_pair_splits_at_high_zoom() {
        let engine = ClusterEngine::new(nearby_pair(), ClusterOptions::default()).unwrap();
        let clusters = engine.clusters(WORLD, 16);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|f| !f.properties.contains_key("cluster")));
    }

    fn id_of(f: &Feature) -> u32 {
        match &f.properties["cluster_id"] {
            PropertyValue::Uint(id) => *id as u32,
            other => panic!("unexpected cluster_id {other:?}"),
        }
    }

    #[test]
    fn test_children_walk_down_the_hierarchy() {
        let engine = ClusterEngine::new(nearby_pair(), ClusterOptions::default()).unwrap();

        // Coarse levels mint the unchanged cluster anew, so its child there
        // is the same cluster one zoom finer.
        let top = engine.clusters(WORLD, 0);
        let chained = engine.children(id_of(&top[0])).unwrap();
        assert_eq!(chained.len(), 1);
        assert_eq!(chained[0].properties["point_count"], PropertyValue::Uint(2));

        // Where the pair first merges, the children are the two points.
        let minted = engine.clusters(WORLD, 14);
        let children = engine.children(id_of(&minted[0])).unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|f| !f.properties.contains_key("cluster")));
    }

    #[test]
    fn test_unknown_cluster_id() {
        let engine = ClusterEngine::new(nearby_pair(), ClusterOptions::default()).unwrap();
        assert_eq!(
            engine.children(9999 << 5 | 3),
            // an id pointing past the level's clusters
            Err(ClusterError::ClusterNotFound(9999 << 5 | 3))
        );
        assert!(engine.leaves(77, 10, 0).is_err());
        assert!(engine.expansion_zoom(77).is_err());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = ClusterOptions::default().with_zoom_range(8, 2);
        let err = ClusterEngine::new(Vec::new(), options).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidOptions(_)));
    }

    #[test]
    fn test_abbreviate_count() {
        assert_eq!(abbreviate_count(7), PropertyValue::Uint(7));
        assert_eq!(abbreviate_count(999), PropertyValue::Uint(999));
        assert_eq!(abbreviate_count(1000), PropertyValue::String("1k".into()));
        assert_eq!(abbreviate_count(1234), PropertyValue::String("1.2k".into()));
        assert_eq!(abbreviate_count(9512), PropertyValue::String("9.5k".into()));
        assert_eq!(abbreviate_count(10400), PropertyValue::String("10k".into()));
        assert_eq!(abbreviate_count(250000), PropertyValue::String("250k".into()));
    }

    #[test]
    fn test_tile_of_empty_region_is_none() {
        let engine = ClusterEngine::new(nearby_pair(), ClusterOptions::default()).unwrap();
        // Both points sit in the north-western quadrant at zoom 1.
        assert!(engine.tile(1, 0, 0).is_some());
        assert!(engine.tile(1, 1, 1).is_none());
    }
}
