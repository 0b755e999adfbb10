//! In-memory map backend.
//!
//! Keeps sources and layers in plain collections, projects positions with
//! Web Mercator and hit-tests circles the way a GPU map would. Used by the
//! CLI to export layers and by tests to observe how a surface drives a map.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde_json::Value;

use super::feature::{FeatureCollection, HoveredFeature};
use super::surface::{MapBackend, ScreenPoint};
use crate::config::{CircleStyle, MapConfig};
use crate::error::{Error, Result};

/// Pixel size of one tile at zoom 0.
const TILE_SIZE: f64 = 512.0;

#[derive(Debug, Clone)]
struct CircleLayer {
    id: String,
    source: String,
    style: CircleStyle,
}

/// A [`MapBackend`] without a renderer.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    center: [f64; 2],
    zoom: f64,
    width: f64,
    height: f64,
    sources: BTreeMap<String, FeatureCollection>,
    layers: Vec<CircleLayer>,
    pointer_cursor: bool,
    sources_added: usize,
    layers_added: usize,
    data_updates: usize,
}

/// Web Mercator world coordinates in pixels at `zoom`.
fn world_pixels(lon: f64, lat: f64, zoom: f64) -> (f64, f64) {
    let size = TILE_SIZE * zoom.exp2();
    let x = (lon + 180.0) / 360.0 * size;
    let sin = lat.to_radians().sin().clamp(-0.9999, 0.9999);
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * size;
    (x, y)
}

impl InMemoryBackend {
    /// A `width` × `height` pixel viewport using the configured view.
    #[must_use]
    pub fn new(config: &MapConfig, width: f64, height: f64) -> Self {
        Self {
            center: config.center,
            zoom: config.zoom,
            width,
            height,
            sources: BTreeMap::new(),
            layers: Vec::new(),
            pointer_cursor: false,
            sources_added: 0,
            layers_added: 0,
            data_updates: 0,
        }
    }

    /// Screen position of a longitude/latitude.
    #[must_use]
    pub fn project(&self, lon: f64, lat: f64) -> ScreenPoint {
        let (cx, cy) = world_pixels(self.center[0], self.center[1], self.zoom);
        let (x, y) = world_pixels(lon, lat, self.zoom);
        ScreenPoint::new(
            x - cx + self.width / 2.0,
            y - cy + self.height / 2.0,
        )
    }

    /// Screen position of the view center.
    #[must_use]
    pub fn center_point(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Data of a source.
    #[must_use]
    pub fn source(&self, id: &str) -> Option<&FeatureCollection> {
        self.sources.get(id)
    }

    /// Source ids.
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Whether the pointer cursor is showing.
    #[must_use]
    pub fn pointer_cursor(&self) -> bool {
        self.pointer_cursor
    }

    /// Sources created so far.
    #[must_use]
    pub fn sources_added(&self) -> usize {
        self.sources_added
    }

    /// Layers created so far.
    #[must_use]
    pub fn layers_added(&self) -> usize {
        self.layers_added
    }

    /// In-place data replacements so far.
    #[must_use]
    pub fn data_updates(&self) -> usize {
        self.data_updates
    }

    /// Every source as one JSON object keyed by source id.
    ///
    /// # Errors
    ///
    /// Returns an error if a collection cannot be serialized.
    pub fn to_geojson(&self) -> Result<Value> {
        let mut out = serde_json::Map::new();
        for (id, collection) in &self.sources {
            out.insert(id.clone(), serde_json::to_value(collection)?);
        }
        Ok(Value::Object(out))
    }
}

impl MapBackend for InMemoryBackend {
    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<()> {
        if self.sources.contains_key(id) {
            return Err(Error::internal(format!("source '{id}' already exists")));
        }
        self.sources.insert(id.to_string(), data);
        self.sources_added += 1;
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: FeatureCollection) -> Result<()> {
        let slot = self
            .sources
            .get_mut(id)
            .ok_or_else(|| Error::internal(format!("source '{id}' does not exist")))?;
        *slot = data;
        self.data_updates += 1;
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|layer| layer.id == id)
    }

    fn add_circle_layer(&mut self, id: &str, source: &str, style: &CircleStyle) -> Result<()> {
        if self.has_layer(id) {
            return Err(Error::internal(format!("layer '{id}' already exists")));
        }
        if !self.has_source(source) {
            return Err(Error::internal(format!(
                "layer '{id}' references missing source '{source}'"
            )));
        }
        self.layers.push(CircleLayer {
            id: id.to_string(),
            source: source.to_string(),
            style: style.clone(),
        });
        self.layers_added += 1;
        Ok(())
    }

    fn query_rendered_features(&self, point: ScreenPoint, layers: &[String]) -> Vec<HoveredFeature> {
        let mut hits = Vec::new();
        for layer in layers {
            let Some(drawn) = self.layers.iter().find(|l| &l.id == layer) else {
                continue;
            };
            let Some(collection) = self.sources.get(&drawn.source) else {
                continue;
            };
            let reach = drawn.style.radius + drawn.style.stroke_width;
            for feature in &collection.features {
                let (lon, lat) = feature.geometry.position();
                if self.project(lon, lat).distance(point) <= reach {
                    hits.push(HoveredFeature {
                        layer: drawn.id.clone(),
                        feature: feature.clone(),
                    });
                }
            }
        }
        hits
    }

    fn set_pointer_cursor(&mut self, pointer: bool) {
        self.pointer_cursor = pointer;
    }
}
