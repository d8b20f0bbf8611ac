//! Input and output record types: features, property values, tile features.

use geo::Point;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Property map attached to features and clusters.
///
/// `FxHashMap` keeps hashing deterministic, so two engines built from the
/// same input produce byte-for-byte identical serialized output.
pub type PropertyMap = FxHashMap<String, PropertyValue>;

/// A property value: a closed union mirroring the JSON data model.
///
/// Numbers keep their source representation: `Uint` for positive integers,
/// `Int` for negative integers, `Double` for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Uint(u64),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(PropertyMap),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PropertyValue::Uint(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Uint(n) => Some(*n as f64),
            PropertyValue::Int(n) => Some(*n as f64),
            PropertyValue::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<u64> for PropertyValue {
    fn from(v: u64) -> Self {
        PropertyValue::Uint(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<PropertyValue> for serde_json::Value {
    fn from(v: PropertyValue) -> Self {
        use serde_json::{Number, Value};
        match v {
            PropertyValue::Null => Value::Null,
            PropertyValue::Bool(b) => Value::Bool(b),
            PropertyValue::Uint(n) => Value::Number(Number::from(n)),
            PropertyValue::Int(n) => Value::Number(Number::from(n)),
            PropertyValue::Double(n) => Number::from_f64(n).map_or(Value::Null, Value::Number),
            PropertyValue::String(s) => Value::String(s),
            PropertyValue::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            PropertyValue::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Bool(b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    PropertyValue::Uint(u)
                } else if let Some(i) = n.as_i64() {
                    PropertyValue::Int(i)
                } else {
                    PropertyValue::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => PropertyValue::String(s),
            Value::Array(items) => {
                PropertyValue::Array(items.into_iter().map(PropertyValue::from).collect())
            }
            Value::Object(map) => PropertyValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, PropertyValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Feature identifier, either supplied with the input or generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Uint(u64),
    Int(i64),
    Double(f64),
    String(String),
}

/// An input point feature in geographic degrees, and the shape of
/// geographic query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Location as (longitude, latitude) degrees.
    pub geometry: Point,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FeatureId>,
}

impl Feature {
    /// A feature at the given longitude/latitude with no properties.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            geometry: Point::new(lng, lat),
            properties: PropertyMap::default(),
            id: None,
        }
    }

    /// A feature with an initial property map.
    pub fn with_properties(lng: f64, lat: f64, properties: PropertyMap) -> Self {
        Self {
            geometry: Point::new(lng, lat),
            properties,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<FeatureId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<u64> for FeatureId {
    fn from(v: u64) -> Self {
        FeatureId::Uint(v)
    }
}

impl From<i64> for FeatureId {
    fn from(v: i64) -> Self {
        FeatureId::Int(v)
    }
}

impl From<&str> for FeatureId {
    fn from(v: &str) -> Self {
        FeatureId::String(v.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(v: String) -> Self {
        FeatureId::String(v)
    }
}

/// Integer pixel position inside a tile, scaled by the configured extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePoint {
    pub x: i16,
    pub y: i16,
}

/// A feature in tile-local pixel coordinates, as returned by
/// [`ClusterEngine::tile`](crate::ClusterEngine::tile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileFeature {
    pub geometry: TilePoint,
    pub properties: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FeatureId>,
}
