//! GeoJSON point features built from records.

use serde::Serialize;

use crate::record::{Fields, Record};

/// Point geometry. Coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A single position.
    Point {
        /// `[longitude, latitude]`.
        coordinates: [f64; 2],
    },
}

impl Geometry {
    /// `(longitude, latitude)` of the point.
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        match self {
            Self::Point { coordinates } => (coordinates[0], coordinates[1]),
        }
    }
}

/// One record placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    /// Record id.
    pub id: String,
    /// Where to draw it.
    pub geometry: Geometry,
    /// The record's fields.
    pub properties: Fields,
}

impl Feature {
    /// Place a record, or `None` when it lacks either coordinate.
    #[must_use]
    pub fn from_record(record: &Record) -> Option<Self> {
        let (lon, lat) = record.coordinates()?;
        Some(Self {
            id: record.id.clone(),
            geometry: Geometry::Point {
                coordinates: [lon, lat],
            },
            properties: record.fields.clone(),
        })
    }
}

/// The features of one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    /// Features in record order.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Build from records, silently skipping those without coordinates.
    #[must_use]
    pub fn from_records(records: &[Record]) -> Self {
        Self {
            features: records.iter().filter_map(Feature::from_record).collect(),
        }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True when no record had coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A feature found under the pointer, with the layer it was drawn on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoveredFeature {
    /// Layer (and dataset) id.
    pub layer: String,
    /// The feature.
    pub feature: Feature,
}

/// Features currently under the pointer.
///
/// Compared by content: two sets are equal when they hold equal features in
/// the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HoverSet(Vec<HoveredFeature>);

impl HoverSet {
    /// Wrap a query result.
    #[must_use]
    pub fn new(features: Vec<HoveredFeature>) -> Self {
        Self(features)
    }

    /// Hovered features.
    #[must_use]
    pub fn features(&self) -> &[HoveredFeature] {
        &self.0
    }

    /// Number of hovered features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing is under the pointer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Record ids under the pointer.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|h| h.feature.id.as_str()).collect()
    }
}
