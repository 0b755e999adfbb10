//! Map surface capabilities.
//!
//! [`MapBackend`] mirrors the imperative, stateful API a map library exposes
//! (sources, layers, rendered-feature queries, cursor). [`MapSurface`] is the
//! small contract the renderer depends on. [`LayeredSurface`] implements the
//! latter on top of any backend.

use std::fmt;

use tracing::{debug, trace};

use super::feature::{FeatureCollection, HoverSet, HoveredFeature};
use crate::config::CircleStyle;
use crate::error::{Error, Result};

/// A position on the rendered surface, in pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    /// Pixels from the left edge.
    pub x: f64,
    /// Pixels from the top edge.
    pub y: f64,
}

impl ScreenPoint {
    /// Create a point.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in pixels.
    #[must_use]
    pub fn distance(&self, other: ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Callback receiving the hover set whenever it changes.
pub type HoverListener = Box<dyn FnMut(&HoverSet)>;

/// The vendor-facing map API.
///
/// Sources hold data, layers draw a source. None of these calls are safe to
/// make from more than one place at a time; the surface owns the backend.
pub trait MapBackend {
    /// Whether a source with this id exists.
    fn has_source(&self, id: &str) -> bool;

    /// Create a GeoJSON source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source already exists.
    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<()>;

    /// Replace the data of an existing source in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the source does not exist.
    fn set_source_data(&mut self, id: &str, data: FeatureCollection) -> Result<()>;

    /// Whether a layer with this id exists.
    fn has_layer(&self, id: &str) -> bool;

    /// Add a circle layer drawing `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer already exists or the source is missing.
    fn add_circle_layer(&mut self, id: &str, source: &str, style: &CircleStyle) -> Result<()>;

    /// Features drawn at `point` on any of `layers`.
    fn query_rendered_features(&self, point: ScreenPoint, layers: &[String]) -> Vec<HoveredFeature>;

    /// Show the pointer cursor (`true`) or the default cursor.
    fn set_pointer_cursor(&mut self, pointer: bool);
}

/// What the map renderer needs from a map.
pub trait MapSurface {
    /// Create or update the point layer for a dataset.
    ///
    /// The first call for a key creates its source and layer; later calls
    /// replace the data in place.
    ///
    /// # Errors
    ///
    /// Returns an error from the underlying map.
    fn upsert_point_layer(&mut self, key: &str, features: FeatureCollection) -> Result<()>;

    /// Register the listener told about hover changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ListenerAlreadyRegistered`] on a second registration.
    fn on_hover_change(&mut self, listener: HoverListener) -> Result<()>;
}

/// [`MapSurface`] over a [`MapBackend`].
pub struct LayeredSurface<B> {
    backend: B,
    style: CircleStyle,
    layers: Vec<String>,
    listener: Option<HoverListener>,
    hovered: HoverSet,
    published: u64,
}

impl<B: fmt::Debug> fmt::Debug for LayeredSurface<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredSurface")
            .field("backend", &self.backend)
            .field("style", &self.style)
            .field("layers", &self.layers)
            .field("listener", &self.listener.is_some())
            .field("hovered", &self.hovered.len())
            .field("published", &self.published)
            .finish()
    }
}

impl<B: MapBackend> LayeredSurface<B> {
    /// Wrap a backend; point layers are painted with `style`.
    pub fn new(backend: B, style: CircleStyle) -> Self {
        Self {
            backend,
            style,
            layers: Vec::new(),
            listener: None,
            hovered: HoverSet::default(),
            published: 0,
        }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Layer ids in creation order.
    #[must_use]
    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    /// Last hover set published to the listener.
    #[must_use]
    pub fn hovered(&self) -> &HoverSet {
        &self.hovered
    }

    /// How many hover changes have been published to the listener.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Whether a hover listener is attached.
    #[must_use]
    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Handle a pointer move.
    ///
    /// Queries every point layer, updates the cursor, and publishes the new
    /// hover set only if it differs from the last one. Returns whether a
    /// change was published.
    pub fn pointer_moved(&mut self, point: ScreenPoint) -> bool {
        let features = self.backend.query_rendered_features(point, &self.layers);
        self.update_hover(HoverSet::new(features))
    }

    /// Handle the pointer leaving the surface.
    pub fn pointer_left(&mut self) -> bool {
        self.update_hover(HoverSet::default())
    }

    fn update_hover(&mut self, next: HoverSet) -> bool {
        self.backend.set_pointer_cursor(!next.is_empty());
        // Nothing counts as published until someone is listening.
        let Some(listener) = self.listener.as_mut() else {
            return false;
        };
        if next == self.hovered {
            return false;
        }
        trace!(hovered = next.len(), "hover changed");
        self.hovered = next;
        listener(&self.hovered);
        self.published += 1;
        true
    }
}

impl<B: MapBackend> MapSurface for LayeredSurface<B> {
    fn upsert_point_layer(&mut self, key: &str, features: FeatureCollection) -> Result<()> {
        let count = features.len();
        if self.backend.has_source(key) {
            self.backend.set_source_data(key, features)?;
        } else {
            self.backend.add_source(key, features)?;
        }
        if !self.backend.has_layer(key) {
            self.backend.add_circle_layer(key, key, &self.style)?;
        }
        if !self.layers.iter().any(|layer| layer == key) {
            self.layers.push(key.to_string());
        }
        debug!(layer = key, features = count, "point layer updated");
        Ok(())
    }

    fn on_hover_change(&mut self, listener: HoverListener) -> Result<()> {
        if self.listener.is_some() {
            return Err(Error::ListenerAlreadyRegistered);
        }
        self.listener = Some(listener);
        Ok(())
    }
}
