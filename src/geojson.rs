//! GeoJSON interchange, behind the default `geojson` feature.
//!
//! Only `Point` features are accepted as input. Output features carry the
//! same property maps the engine produces, so cluster markers keep their
//! `cluster_id` and `point_count` fields through a serialization roundtrip.

use crate::error::{ClusterError, Result};
use crate::feature::{Feature, FeatureId, PropertyMap, PropertyValue};
use geo::Point;
use geojson::{feature::Id, FeatureCollection, GeoJson, JsonObject, Value};

/// Parse a GeoJSON `FeatureCollection` of points into input features.
pub fn features_from_geojson(input: &str) -> Result<Vec<Feature>> {
    let geojson: GeoJson = input
        .parse()
        .map_err(|e: geojson::Error| ClusterError::InvalidGeoJson(e.to_string()))?;
    let collection = FeatureCollection::try_from(geojson)
        .map_err(|e| ClusterError::InvalidGeoJson(e.to_string()))?;
    collection.features.iter().map(feature_from_geojson).collect()
}

/// Convert a single GeoJSON feature; anything but a point is rejected.
pub fn feature_from_geojson(feature: &geojson::Feature) -> Result<Feature> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| ClusterError::InvalidGeoJson("feature has no geometry".to_string()))?;
    let (lng, lat) = match &geometry.value {
        Value::Point(position) => {
            if position.len() < 2 {
                return Err(ClusterError::InvalidGeoJson(
                    "Point must have at least 2 coordinates".to_string(),
                ));
            }
            (position[0], position[1])
        }
        _ => {
            return Err(ClusterError::InvalidGeoJson(
                "GeoJSON geometry is not a Point".to_string(),
            ));
        }
    };

    let properties = feature
        .properties
        .as_ref()
        .map(properties_from_json)
        .unwrap_or_default();
    let id = feature.id.as_ref().map(feature_id_from_geojson);

    Ok(Feature {
        geometry: Point::new(lng, lat),
        properties,
        id,
    })
}

/// Convert an output feature back to GeoJSON.
pub fn feature_to_geojson(feature: &Feature) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(Value::Point(vec![
            feature.geometry.x(),
            feature.geometry.y(),
        ]))),
        id: feature.id.as_ref().map(feature_id_to_geojson),
        properties: Some(properties_to_json(&feature.properties)),
        foreign_members: None,
    }
}

/// Wrap output features into a serializable `FeatureCollection`.
pub fn features_to_geojson(features: &[Feature]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: features.iter().map(feature_to_geojson).collect(),
        foreign_members: None,
    }
}

fn properties_from_json(object: &JsonObject) -> PropertyMap {
    object
        .iter()
        .map(|(k, v)| (k.clone(), PropertyValue::from(v.clone())))
        .collect()
}

fn properties_to_json(properties: &PropertyMap) -> JsonObject {
    properties
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::from(v.clone())))
        .collect()
}

fn feature_id_from_geojson(id: &Id) -> FeatureId {
    match id {
        Id::String(s) => FeatureId::String(s.clone()),
        Id::Number(n) => {
            if let Some(u) = n.as_u64() {
                FeatureId::Uint(u)
            } else if let Some(i) = n.as_i64() {
                FeatureId::Int(i)
            } else {
                FeatureId::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
    }
}

fn feature_id_to_geojson(id: &FeatureId) -> Id {
    match id {
        FeatureId::Uint(u) => Id::Number((*u).into()),
        FeatureId::Int(i) => Id::Number((*i).into()),
        FeatureId::Double(d) => serde_json::Number::from_f64(*d)
            .map_or_else(|| Id::String(d.to_string()), Id::Number),
        FeatureId::String(s) => Id::String(s.clone()),
    }
}
