//! Map rendering.
//!
//! [`MapRenderer`] keeps one point layer per dataset in sync with the
//! timeline and reports which features are under the pointer. It talks to
//! the map only through [`MapSurface`]:
//!
//! - the surface is created once per mount;
//! - the hover listener is attached once, when the surface finishes loading;
//! - each render upserts only the datasets whose features changed.

mod feature;
mod memory;
mod surface;

use std::collections::BTreeMap;

use tokio::sync::watch;
use tracing::debug;

pub use feature::{Feature, FeatureCollection, Geometry, HoverSet, HoveredFeature};
pub use memory::InMemoryBackend;
pub use surface::{HoverListener, LayeredSurface, MapBackend, MapSurface, ScreenPoint};

use crate::error::{Error, Result};
use crate::record::Record;

/// Dataset used when records are not partitioned.
pub const DEFAULT_DATASET: &str = "records";

/// Records grouped by dataset name.
pub type Datasets = BTreeMap<String, Vec<Record>>;

/// Group records into datasets by the value of `field`.
///
/// Without a field every record lands in [`DEFAULT_DATASET`]. Records whose
/// field is missing also land there. For list fields the first entry names
/// the dataset. Record order is preserved within each dataset.
#[must_use]
pub fn partition_datasets(records: &[Record], field: Option<&str>) -> Datasets {
    let mut datasets = Datasets::new();
    for record in records {
        let key = field
            .and_then(|name| record.list(name).first().map(|value| (*value).to_string()))
            .unwrap_or_else(|| DEFAULT_DATASET.to_string());
        datasets.entry(key).or_default().push(record.clone());
    }
    datasets
}

/// Drives a [`MapSurface`] from timeline records.
#[derive(Debug)]
pub struct MapRenderer<S> {
    surface: Option<S>,
    loaded: bool,
    applied: BTreeMap<String, FeatureCollection>,
    pending: Option<BTreeMap<String, FeatureCollection>>,
    hover_tx: Option<watch::Sender<HoverSet>>,
    hover_rx: watch::Receiver<HoverSet>,
}

impl<S> Default for MapRenderer<S> {
    fn default() -> Self {
        let (tx, rx) = watch::channel(HoverSet::default());
        Self {
            surface: None,
            loaded: false,
            applied: BTreeMap::new(),
            pending: None,
            hover_tx: Some(tx),
            hover_rx: rx,
        }
    }
}

impl<S: MapSurface> MapRenderer<S> {
    /// An unmounted renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the surface. Only the first call creates anything; later calls
    /// return `Ok(false)` and leave the existing surface alone.
    ///
    /// # Errors
    ///
    /// Returns the error from `create`.
    pub fn mount<F>(&mut self, create: F) -> Result<bool>
    where
        F: FnOnce() -> Result<S>,
    {
        if self.surface.is_some() {
            return Ok(false);
        }
        self.surface = Some(create()?);
        debug!("map surface created");
        Ok(true)
    }

    /// Whether a surface exists.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    /// Whether the surface has finished loading.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The surface, for routing pointer events.
    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// The surface.
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Signal that the surface finished loading.
    ///
    /// Attaches the hover listener (first call only) and applies any data
    /// rendered before the load completed.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is mounted or the surface rejects an update.
    pub fn surface_loaded(&mut self) -> Result<()> {
        let surface = self
            .surface
            .as_mut()
            .ok_or_else(|| Error::internal("map surface is not mounted"))?;

        if let Some(tx) = self.hover_tx.take() {
            surface.on_hover_change(Box::new(move |set: &HoverSet| {
                tx.send_replace(set.clone());
            }))?;
            debug!("hover listener attached");
        }
        self.loaded = true;

        if let Some(pending) = self.pending.take() {
            self.apply(pending)?;
        }
        Ok(())
    }

    /// Reflect `datasets` on the map.
    ///
    /// Returns the number of layers upserted. Datasets rendered earlier but
    /// absent from `datasets` have their layer emptied. Before the surface
    /// has loaded nothing is upserted; the latest datasets are kept and
    /// applied on load.
    ///
    /// # Errors
    ///
    /// Returns the error from the surface.
    pub fn render(&mut self, datasets: &Datasets) -> Result<usize> {
        let collections: BTreeMap<String, FeatureCollection> = datasets
            .iter()
            .map(|(key, records)| (key.clone(), FeatureCollection::from_records(records)))
            .collect();

        if !self.loaded {
            self.pending = Some(collections);
            return Ok(0);
        }
        self.apply(collections)
    }

    /// Partition `records` by `field` and render them.
    ///
    /// # Errors
    ///
    /// Returns the error from the surface.
    pub fn render_records(&mut self, records: &[Record], field: Option<&str>) -> Result<usize> {
        self.render(&partition_datasets(records, field))
    }

    fn apply(&mut self, collections: BTreeMap<String, FeatureCollection>) -> Result<usize> {
        let surface = self
            .surface
            .as_mut()
            .ok_or_else(|| Error::internal("map surface is not mounted"))?;

        let stale: Vec<String> = self
            .applied
            .keys()
            .filter(|key| !collections.contains_key(*key))
            .cloned()
            .collect();

        let mut upserted = 0;
        for key in stale {
            surface.upsert_point_layer(&key, FeatureCollection::default())?;
            self.applied.remove(&key);
            debug!(layer = %key, "dataset gone; layer cleared");
            upserted += 1;
        }
        for (key, collection) in collections {
            if self.applied.get(&key) == Some(&collection) {
                continue;
            }
            surface.upsert_point_layer(&key, collection.clone())?;
            self.applied.insert(key, collection);
            upserted += 1;
        }
        Ok(upserted)
    }

    /// Features currently reported under the pointer.
    #[must_use]
    pub fn hovered(&self) -> HoverSet {
        self.hover_rx.borrow().clone()
    }

    /// A receiver notified on every published hover change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HoverSet> {
        self.hover_rx.clone()
    }

    /// Feature count per dataset as last applied.
    #[must_use]
    pub fn feature_counts(&self) -> BTreeMap<&str, usize> {
        self.applied
            .iter()
            .map(|(key, collection)| (key.as_str(), collection.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::config::MapConfig;

    type Renderer = MapRenderer<LayeredSurface<InMemoryBackend>>;

    fn record(id: &str, fields: Value) -> Record {
        let Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        Record::new(id, fields)
    }

    fn at_center(id: &str, extra: Value) -> Record {
        let [lon, lat] = MapConfig::default().center;
        let mut fields = json!({"longitude": lon, "latitude": lat});
        if let (Some(target), Value::Object(more)) = (fields.as_object_mut(), extra) {
            target.extend(more);
        }
        record(id, fields)
    }

    fn mounted() -> Renderer {
        let mut renderer = Renderer::new();
        let config = MapConfig::default();
        renderer
            .mount(|| {
                Ok(LayeredSurface::new(
                    InMemoryBackend::new(&config, 800.0, 600.0),
                    config.circle.clone(),
                ))
            })
            .unwrap();
        renderer
    }

    fn backend(renderer: &Renderer) -> &InMemoryBackend {
        renderer.surface().unwrap().backend()
    }

    #[test]
    fn test_partition_without_field() {
        let records = vec![record("r1", json!({})), record("r2", json!({}))];
        let datasets = partition_datasets(&records, None);
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[DEFAULT_DATASET].len(), 2);
    }

    #[test]
    fn test_partition_by_field() {
        let records = vec![
            record("r1", json!({"Incident_Type": ["Airstrike", "Shelling"]})),
            record("r2", json!({"Incident_Type": "Shelling"})),
            record("r3", json!({})),
            record("r4", json!({"Incident_Type": ["Airstrike"]})),
        ];
        let datasets = partition_datasets(&records, Some("Incident_Type"));

        let ids = |key: &str| -> Vec<String> {
            datasets[key].iter().map(|r| r.id.clone()).collect()
        };
        assert_eq!(ids("Airstrike"), vec!["r1", "r4"]);
        assert_eq!(ids("Shelling"), vec!["r2"]);
        assert_eq!(ids(DEFAULT_DATASET), vec!["r3"]);
    }

    #[test]
    fn test_mount_creates_surface_once() {
        let mut renderer = mounted();
        let created = renderer
            .mount(|| panic!("surface must not be recreated"))
            .unwrap();
        assert!(!created);
        assert!(renderer.is_mounted());
    }

    #[test]
    fn test_surface_loaded_requires_mount() {
        let mut renderer = Renderer::new();
        assert!(renderer.surface_loaded().is_err());
    }

    #[test]
    fn test_render_before_load_is_deferred() {
        let mut renderer = mounted();
        let records = vec![at_center("r1", json!({}))];

        assert_eq!(renderer.render_records(&records, None).unwrap(), 0);
        assert_eq!(backend(&renderer).sources_added(), 0);

        renderer.surface_loaded().unwrap();
        assert_eq!(backend(&renderer).sources_added(), 1);
        assert_eq!(renderer.feature_counts()[DEFAULT_DATASET], 1);
    }

    #[test]
    fn test_feature_count_matches_located_records() {
        let mut renderer = mounted();
        renderer.surface_loaded().unwrap();
        let records = vec![
            at_center("r1", json!({})),
            record("r2", json!({"latitude": 31.4})),
            record("r3", json!({"description": "nowhere"})),
            at_center("r4", json!({})),
        ];
        renderer.render_records(&records, None).unwrap();

        assert_eq!(renderer.feature_counts()[DEFAULT_DATASET], 2);
        assert_eq!(
            backend(&renderer).source(DEFAULT_DATASET).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_rerender_updates_in_place_and_skips_unchanged() {
        let mut renderer = mounted();
        renderer.surface_loaded().unwrap();

        let mut records = vec![at_center("r1", json!({}))];
        assert_eq!(renderer.render_records(&records, None).unwrap(), 1);
        assert_eq!(renderer.render_records(&records, None).unwrap(), 0);

        records.push(at_center("r2", json!({})));
        assert_eq!(renderer.render_records(&records, None).unwrap(), 1);

        let backend = backend(&renderer);
        assert_eq!(backend.sources_added(), 1);
        assert_eq!(backend.layers_added(), 1);
        assert_eq!(backend.data_updates(), 1);
        assert_eq!(backend.source(DEFAULT_DATASET).unwrap().len(), 2);
    }

    #[test]
    fn test_one_layer_per_dataset() {
        let mut renderer = mounted();
        renderer.surface_loaded().unwrap();
        let records = vec![
            at_center("r1", json!({"Incident_Type": ["Airstrike"]})),
            at_center("r2", json!({"Incident_Type": ["Shelling"]})),
        ];
        assert_eq!(
            renderer
                .render_records(&records, Some("Incident_Type"))
                .unwrap(),
            2
        );
        assert_eq!(backend(&renderer).layers_added(), 2);
    }

    #[test]
    fn test_listener_attached_once_across_updates() {
        let mut renderer = mounted();
        renderer.surface_loaded().unwrap();
        renderer.surface_loaded().unwrap();

        for n in 0..5 {
            let records: Vec<Record> = (0..=n)
                .map(|i| at_center(&format!("r{i}"), json!({})))
                .collect();
            renderer.render_records(&records, None).unwrap();
        }

        let surface = renderer.surface().unwrap();
        assert!(surface.has_listener());

        // One pointer move publishes exactly once however many renders ran.
        let over = surface.backend().center_point();
        let mut rx = renderer.subscribe();
        let surface = renderer.surface_mut().unwrap();
        assert!(surface.pointer_moved(over));
        assert!(!surface.pointer_moved(over));
        assert_eq!(surface.published(), 1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 5);
    }

    #[test]
    fn test_hovered_reflects_published_set() {
        let mut renderer = mounted();
        renderer.surface_loaded().unwrap();
        renderer
            .render_records(&[at_center("r1", json!({}))], None)
            .unwrap();
        assert!(renderer.hovered().is_empty());

        let over = renderer.surface().unwrap().backend().center_point();
        renderer.surface_mut().unwrap().pointer_moved(over);
        assert_eq!(renderer.hovered().ids(), vec!["r1"]);

        renderer.surface_mut().unwrap().pointer_left();
        assert!(renderer.hovered().is_empty());
    }

    #[test]
    fn test_vanished_dataset_is_cleared() {
        let mut renderer = mounted();
        renderer.surface_loaded().unwrap();
        renderer
            .render_records(&[at_center("r1", json!({}))], None)
            .unwrap();

        assert_eq!(renderer.render(&partition_datasets(&[], None)).unwrap(), 1);
        assert!(renderer.feature_counts().is_empty());
        assert_eq!(backend(&renderer).source(DEFAULT_DATASET).unwrap().len(), 0);

        let over = backend(&renderer).center_point();
        renderer.surface_mut().unwrap().pointer_moved(over);
        assert!(renderer.hovered().is_empty());
        assert!(!backend(&renderer).pointer_cursor());

        // Clearing happens once.
        assert_eq!(renderer.render(&partition_datasets(&[], None)).unwrap(), 0);
    }

    #[test]
    fn test_regrouped_dataset_is_cleared() {
        let mut renderer = mounted();
        renderer.surface_loaded().unwrap();
        renderer
            .render_records(
                &[at_center("r1", json!({"Incident_Type": ["Airstrike"]}))],
                Some("Incident_Type"),
            )
            .unwrap();
        renderer
            .render_records(
                &[at_center("r1", json!({"Incident_Type": ["Shelling"]}))],
                Some("Incident_Type"),
            )
            .unwrap();

        let counts = renderer.feature_counts();
        assert_eq!(counts.get("Shelling"), Some(&1));
        assert!(!counts.contains_key("Airstrike"));
        assert!(backend(&renderer).source("Airstrike").unwrap().is_empty());
    }
}
