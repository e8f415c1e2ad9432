//! The map facade: construction, drawing, data updates, interaction and
//! time. One `Map` owns one scene and everything drawn into it.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use thema_shared::{structural_key, ArcMark, Bubble, RegionRecord, RegionUpdate};

use crate::arcs::ArcOps;
use crate::bubbles::BubbleOps;
use crate::choropleth::ChoroplethState;
use crate::errors::MapError;
use crate::geography::{self, GeographyOps};
use crate::graticule::{GraticuleOps, GRATICULE_KEY};
use crate::interact;
use crate::labels::LabelOps;
use crate::layers::{Layer, LayerKind, LayerRegistry};
use crate::options::{
    ArcsOverrides, BubblesOverrides, GraticuleOverrides, LabelsOverrides, MapOptions,
};
use crate::projection::Projector;
use crate::reconcile::{reconcile, ReconcileOutcome};
use crate::scene::{Attr, AttrValue, SceneGraph};
use crate::source::{self, Fetcher};
use crate::topology::{FeatureSet, TopologyDecoder};
use crate::transitions::{Effect, TransitionScheduler};

pub const GEOGRAPHY_LAYER: &str = "geography";
pub const BUBBLES_LAYER: &str = "bubbles";
pub const ARCS_LAYER: &str = "arcs";
pub const LABELS_LAYER: &str = "labels";
pub const GRATICULE_LAYER: &str = "graticule";

/// Choropleth fill changes blend over this long.
const RECOLOR_DURATION_MS: f64 = 250.0;

/// Renders a popup's markup from the hovered datum and the region's
/// retained record, once per hover.
pub type PopupTemplate = Box<dyn Fn(&Value, Option<&RegionRecord>) -> String>;

type DoneFn<S> = Box<dyn FnOnce(&Map<S>)>;

pub struct MapBuilder<S: SceneGraph> {
    scene: S,
    options: MapOptions,
    projector: Option<Box<dyn Projector>>,
    decoder: Option<Box<dyn TopologyDecoder>>,
    fetcher: Option<Box<dyn Fetcher>>,
}

impl<S: SceneGraph> MapBuilder<S> {
    pub fn projector(mut self, projector: impl Projector + 'static) -> Self {
        self.projector = Some(Box::new(projector));
        self
    }

    pub fn decoder(mut self, decoder: impl TopologyDecoder + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    pub fn fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Validate the collaborator set and produce the map. Inline
    /// choropleth data from the options is applied to the region store
    /// here; it shows up as fills on the first draw.
    pub fn build(self) -> Result<Map<S>, MapError> {
        let projector = self.projector.ok_or(MapError::MissingProjector)?;
        let decoder = self.decoder.ok_or(MapError::MissingDecoder)?;
        if self.fetcher.is_none() {
            let remote = self
                .options
                .geography
                .data_url
                .as_deref()
                .or(self.options.data_url.as_deref());
            if let Some(url) = remote {
                return Err(MapError::MissingFetcher { url: url.to_string() });
            }
        }

        let mut handlers = HashMap::new();
        handlers.insert(BUBBLES_LAYER.to_string(), LayerKind::Bubbles);
        handlers.insert(ARCS_LAYER.to_string(), LayerKind::Arcs);
        handlers.insert(LABELS_LAYER.to_string(), LayerKind::Labels);
        handlers.insert(GRATICULE_LAYER.to_string(), LayerKind::Graticule);

        let mut map = Map {
            scene: self.scene,
            options: self.options,
            projector,
            decoder,
            fetcher: self.fetcher,
            handlers,
            layers: LayerRegistry::new(),
            choropleth: ChoroplethState::new(),
            scheduler: TransitionScheduler::new(),
            features: FeatureSet::default(),
            templates: HashMap::new(),
            done: None,
            clock: 0.0,
        };
        if !map.options.data.is_empty() {
            map.choropleth.apply_update(&map.options.data, &map.options.fills);
        }
        Ok(map)
    }
}

pub struct Map<S: SceneGraph> {
    scene: S,
    options: MapOptions,
    projector: Box<dyn Projector>,
    decoder: Box<dyn TopologyDecoder>,
    fetcher: Option<Box<dyn Fetcher>>,
    /// Layer-name to handler table, per map instance.
    handlers: HashMap<String, LayerKind>,
    layers: LayerRegistry,
    choropleth: ChoroplethState,
    scheduler: TransitionScheduler,
    features: FeatureSet,
    templates: HashMap<String, PopupTemplate>,
    done: Option<DoneFn<S>>,
    clock: f64,
}

impl<S: SceneGraph> Map<S> {
    pub fn builder(scene: S, options: MapOptions) -> MapBuilder<S> {
        MapBuilder { scene, options, projector: None, decoder: None, fetcher: None }
    }

    /// Decode the topology and reconcile the geography layer against it,
    /// then merge in the remote dataset if one is configured. The done
    /// callback runs at the end of the first successful draw.
    pub fn draw(&mut self) -> Result<(), MapError> {
        let topology = self.load_topology()?;
        let decoded = self.decoder.decode(&topology, &self.options.scope)?;
        self.features = FeatureSet::new(decoded);
        info!(scope = %self.options.scope, features = self.features.len(), "drawing map");

        self.draw_geography()?;

        if let Some(url) = self.options.data_url.clone() {
            let raw = self.fetch(&url)?;
            let update = source::parse_dataset(&raw, self.options.data_type)?;
            self.update_choropleth(&update);
        }

        if let Some(done) = self.done.take() {
            done(self);
        }
        Ok(())
    }

    /// Merge a keyed update into the region store and animate the fills
    /// of drawn regions. Ids without a drawable keep their records but
    /// change nothing on screen.
    pub fn update_choropleth(&mut self, update: &HashMap<String, RegionUpdate>) {
        let recolors = self.choropleth.apply_update(update, &self.options.fills);
        let Some(layer) = self.layers.get(GEOGRAPHY_LAYER) else {
            debug!("choropleth update before geography drawn, records retained");
            return;
        };
        for recolor in recolors {
            match layer.items.get(&recolor.region) {
                Some(item) => self.scheduler.schedule(
                    item.node,
                    Attr::Fill,
                    AttrValue::Str(recolor.color),
                    self.clock,
                    RECOLOR_DURATION_MS,
                    None,
                ),
                None => debug!(region = %recolor.region, "no drawable for region, recolor skipped"),
            }
        }
    }

    pub fn bubbles(&mut self, data: &[Bubble]) -> Result<ReconcileOutcome, MapError> {
        self.bubbles_with(data, &BubblesOverrides::default(), false)
    }

    pub fn bubbles_with(
        &mut self,
        data: &[Bubble],
        overrides: &BubblesOverrides,
        create_new_layer: bool,
    ) -> Result<ReconcileOutcome, MapError> {
        let keyed = keyed_data(data, |bubble| bubble.id.as_deref())?;
        self.reconcile_bubbles(BUBBLES_LAYER, keyed, overrides, create_new_layer)
    }

    pub fn arcs(&mut self, data: &[ArcMark]) -> Result<ReconcileOutcome, MapError> {
        self.arcs_with(data, &ArcsOverrides::default(), false)
    }

    pub fn arcs_with(
        &mut self,
        data: &[ArcMark],
        overrides: &ArcsOverrides,
        create_new_layer: bool,
    ) -> Result<ReconcileOutcome, MapError> {
        let keyed = keyed_data(data, |arc| arc.id.as_deref())?;
        self.reconcile_arcs(ARCS_LAYER, keyed, overrides, create_new_layer)
    }

    /// Letter every drawn region with its id.
    pub fn labels(&mut self) -> Result<ReconcileOutcome, MapError> {
        self.labels_with(&LabelsOverrides::default(), false)
    }

    pub fn labels_with(
        &mut self,
        overrides: &LabelsOverrides,
        create_new_layer: bool,
    ) -> Result<ReconcileOutcome, MapError> {
        self.reconcile_labels(LABELS_LAYER, overrides, create_new_layer)
    }

    pub fn graticule(&mut self) -> Result<ReconcileOutcome, MapError> {
        self.graticule_with(&GraticuleOverrides::default(), false)
    }

    pub fn graticule_with(
        &mut self,
        overrides: &GraticuleOverrides,
        create_new_layer: bool,
    ) -> Result<ReconcileOutcome, MapError> {
        self.reconcile_graticule(GRATICULE_LAYER, overrides, create_new_layer)
    }

    /// Route a named layer through its registered handler, with data and
    /// overrides as JSON documents. Bubble and arc layers insist on an
    /// array before anything is drawn.
    pub fn draw_layer(
        &mut self,
        name: &str,
        data: &Value,
        options: Option<&Value>,
        create_new_layer: bool,
    ) -> Result<ReconcileOutcome, MapError> {
        let kind = self
            .handlers
            .get(name)
            .copied()
            .ok_or_else(|| MapError::UnknownLayer { name: name.to_string() })?;
        match kind {
            LayerKind::Bubbles => {
                let marks: Vec<Bubble> = mark_array(name, data)?;
                let overrides = parse_overrides::<BubblesOverrides>(name, options)?;
                let keyed = keyed_data(&marks, |bubble| bubble.id.as_deref())?;
                self.reconcile_bubbles(name, keyed, &overrides, create_new_layer)
            }
            LayerKind::Arcs => {
                let marks: Vec<ArcMark> = mark_array(name, data)?;
                let overrides = parse_overrides::<ArcsOverrides>(name, options)?;
                let keyed = keyed_data(&marks, |arc| arc.id.as_deref())?;
                self.reconcile_arcs(name, keyed, &overrides, create_new_layer)
            }
            LayerKind::Labels => {
                let overrides = parse_overrides::<LabelsOverrides>(name, options)?;
                self.reconcile_labels(name, &overrides, create_new_layer)
            }
            LayerKind::Graticule => {
                let overrides = parse_overrides::<GraticuleOverrides>(name, options)?;
                self.reconcile_graticule(name, &overrides, create_new_layer)
            }
            LayerKind::Geography => self.draw_geography(),
        }
    }

    /// Register (or alias) a layer name to a handler for [`Map::draw_layer`].
    pub fn register_layer(&mut self, name: &str, kind: LayerKind) {
        self.handlers.insert(name.to_string(), kind);
    }

    /// Install a popup renderer for one layer. Layers without a template
    /// fall back to the built-in hoverinfo box.
    pub fn set_popup_template(
        &mut self,
        layer: &str,
        template: impl Fn(&Value, Option<&RegionRecord>) -> String + 'static,
    ) {
        self.templates.insert(layer.to_string(), Box::new(template));
    }

    /// Run once at the end of the first successful draw.
    pub fn on_done(&mut self, callback: impl FnOnce(&Map<S>) + 'static) {
        self.done = Some(Box::new(callback));
    }

    /// Pointer entered the item `key` of `layer` at scene coordinates
    /// (`x`, `y`).
    pub fn on_pointer_enter(&mut self, layer: &str, key: &str, x: f64, y: f64) {
        let Some(layer_state) = self.layers.get_mut(layer) else {
            debug!(layer, key, "pointer enter on unknown layer");
            return;
        };
        let hover = layer_state.hover.clone();
        if !hover.highlight_on_hover && !hover.popup_on_hover {
            return;
        }
        let Some(item) = layer_state.items.get_mut(key) else {
            debug!(layer, key, "pointer enter on unknown item");
            return;
        };
        let content = if hover.popup_on_hover {
            let record = self.choropleth.record(key);
            Some(match self.templates.get(layer) {
                Some(template) => template(&item.datum, record),
                None => interact::default_popup_content(&item.datum, record),
            })
        } else {
            None
        };
        interact::pointer_enter(&mut self.scene, item, &hover, content, x, y);
    }

    /// Pointer travel; repositions the popup when one is showing.
    pub fn on_pointer_move(&mut self, x: f64, y: f64) {
        interact::pointer_move(&mut self.scene, x, y);
    }

    /// Pointer left the item. Restores the pre-hover style and hides the
    /// popup; a second leave for the same item is a no-op.
    pub fn on_pointer_leave(&mut self, layer: &str, key: &str) {
        let Some(layer_state) = self.layers.get_mut(layer) else {
            self.scene.hide_popup();
            return;
        };
        let Some(item) = layer_state.items.get_mut(key) else {
            self.scene.hide_popup();
            return;
        };
        interact::pointer_leave(&mut self.scene, &mut self.scheduler, item);
    }

    /// Advance animation time to `now` (milliseconds, monotonic) and run
    /// any completions that came due.
    pub fn tick(&mut self, now: f64) {
        self.clock = now;
        let effects = self.scheduler.tick(now, &mut self.scene);
        for effect in effects {
            match effect {
                Effect::RemoveItem { layer, node } => {
                    if let Some(layer_state) = self.layers.get_mut(&layer) {
                        if layer_state.take_exiting(node).is_some() {
                            self.scene.remove_node(node);
                        }
                    }
                }
            }
        }
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn region_record(&self, region: &str) -> Option<&RegionRecord> {
        self.choropleth.record(region)
    }

    pub fn pending_transitions(&self) -> usize {
        self.scheduler.pending()
    }

    fn load_topology(&self) -> Result<Value, MapError> {
        if let Some(url) = &self.options.geography.data_url {
            let raw = self.fetch(url)?;
            return source::parse_topology(&raw);
        }
        match &self.options.geography.data {
            Some(document) => Ok(document.clone()),
            None => Err(MapError::MissingTopology { scope: self.options.scope.clone() }),
        }
    }

    fn fetch(&self, url: &str) -> Result<String, MapError> {
        match &self.fetcher {
            Some(fetcher) => fetcher.fetch(url),
            None => Err(MapError::MissingFetcher { url: url.to_string() }),
        }
    }

    fn draw_geography(&mut self) -> Result<ReconcileOutcome, MapError> {
        let data = geography::feature_data(&self.features, self.options.geography.hide_antarctica);
        let layer = self.layers.get_or_create(
            &mut self.scene,
            GEOGRAPHY_LAYER,
            LayerKind::Geography,
            false,
        );
        layer.hover = self.options.geography.hover();
        let group = layer.group;
        let mut ops = GeographyOps {
            scene: &mut self.scene,
            projector: self.projector.as_ref(),
            features: &self.features,
            choropleth: &self.choropleth,
            fills: &self.options.fills,
            config: &self.options.geography,
            group,
        };
        reconcile(layer, &data, &mut ops)
    }

    fn reconcile_bubbles(
        &mut self,
        name: &str,
        keyed: Vec<(String, Value)>,
        overrides: &BubblesOverrides,
        create_new: bool,
    ) -> Result<ReconcileOutcome, MapError> {
        let config = overrides.merged(&self.options.bubbles);
        self.forget_layer_transitions(name, create_new);
        let layer = self.layers.get_or_create(&mut self.scene, name, LayerKind::Bubbles, create_new);
        layer.hover = config.hover();
        let group = layer.group;
        let mut ops = BubbleOps {
            scene: &mut self.scene,
            scheduler: &mut self.scheduler,
            projector: self.projector.as_ref(),
            features: &self.features,
            fills: &self.options.fills,
            config,
            layer_name: name.to_string(),
            group,
            now: self.clock,
        };
        reconcile(layer, &keyed, &mut ops)
    }

    fn reconcile_arcs(
        &mut self,
        name: &str,
        keyed: Vec<(String, Value)>,
        overrides: &ArcsOverrides,
        create_new: bool,
    ) -> Result<ReconcileOutcome, MapError> {
        let config = overrides.merged(&self.options.arcs);
        self.forget_layer_transitions(name, create_new);
        let layer = self.layers.get_or_create(&mut self.scene, name, LayerKind::Arcs, create_new);
        let group = layer.group;
        let mut ops = ArcOps {
            scene: &mut self.scene,
            scheduler: &mut self.scheduler,
            projector: self.projector.as_ref(),
            config,
            layer_name: name.to_string(),
            group,
            now: self.clock,
        };
        reconcile(layer, &keyed, &mut ops)
    }

    fn reconcile_labels(
        &mut self,
        name: &str,
        overrides: &LabelsOverrides,
        create_new: bool,
    ) -> Result<ReconcileOutcome, MapError> {
        let config = overrides.merged(&self.options.labels);
        let data = geography::feature_data(&self.features, self.options.geography.hide_antarctica);
        self.forget_layer_transitions(name, create_new);
        let layer = self.layers.get_or_create(&mut self.scene, name, LayerKind::Labels, create_new);
        let group = layer.group;
        let mut ops = LabelOps {
            scene: &mut self.scene,
            projector: self.projector.as_ref(),
            features: &self.features,
            config,
            group,
        };
        reconcile(layer, &data, &mut ops)
    }

    fn reconcile_graticule(
        &mut self,
        name: &str,
        overrides: &GraticuleOverrides,
        create_new: bool,
    ) -> Result<ReconcileOutcome, MapError> {
        let config = overrides.merged(&self.options.graticule);
        let data = vec![(GRATICULE_KEY.to_string(), Value::Null)];
        self.forget_layer_transitions(name, create_new);
        let layer =
            self.layers.get_or_create(&mut self.scene, name, LayerKind::Graticule, create_new);
        let group = layer.group;
        let mut ops = GraticuleOps {
            scene: &mut self.scene,
            projector: self.projector.as_ref(),
            config,
            group,
        };
        reconcile(layer, &data, &mut ops)
    }

    /// A replaced layer takes its pending transitions with it.
    fn forget_layer_transitions(&mut self, name: &str, create_new: bool) {
        if !create_new {
            return;
        }
        if let Some(old) = self.layers.get(name) {
            for item in old.items.values() {
                self.scheduler.cancel_node(item.node);
            }
            for item in &old.exiting {
                self.scheduler.cancel_node(item.node);
            }
        }
    }
}

fn keyed_data<T: serde::Serialize>(
    items: &[T],
    explicit_id: impl Fn(&T) -> Option<&str>,
) -> Result<Vec<(String, Value)>, MapError> {
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let value = serde_json::to_value(item)
            .map_err(|err| MapError::DatasetParse { detail: err.to_string() })?;
        let key = match explicit_id(item) {
            Some(id) => id.to_string(),
            None => structural_key(&value),
        };
        keyed.push((key, value));
    }
    Ok(keyed)
}

fn mark_array<T: DeserializeOwned>(layer: &str, data: &Value) -> Result<Vec<T>, MapError> {
    let Some(members) = data.as_array() else {
        return Err(MapError::InvalidLayerData { layer: layer.to_string() });
    };
    members
        .iter()
        .map(|member| {
            serde_json::from_value(member.clone())
                .map_err(|err| MapError::DatasetParse { detail: format!("{layer}: {err}") })
        })
        .collect()
}

fn parse_overrides<T: DeserializeOwned + Default>(
    layer: &str,
    options: Option<&Value>,
) -> Result<T, MapError> {
    match options {
        None => Ok(T::default()),
        Some(document) => serde_json::from_value(document.clone())
            .map_err(|err| MapError::DatasetParse { detail: format!("{layer} options: {err}") }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;
    use crate::options::DataFormat;
    use crate::projection::Equirectangular;
    use crate::scene::{NodeId, NodeKind};
    use crate::topology::FeatureCollectionDecoder;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn world_topology() -> Value {
        json!({
            "objects": {
                "world": {
                    "features": [
                        {
                            "id": "USA",
                            "properties": {"name": "United States"},
                            "geometry": {"type": "Polygon", "coordinates": [[[-120.0, 30.0], [-80.0, 30.0], [-80.0, 50.0], [-120.0, 50.0]]]}
                        },
                        {
                            "id": "CAN",
                            "properties": {"name": "Canada"},
                            "geometry": {"type": "Polygon", "coordinates": [[[-120.0, 50.0], [-80.0, 50.0], [-80.0, 70.0], [-120.0, 70.0]]]}
                        }
                    ]
                }
            }
        })
    }

    fn test_options() -> MapOptions {
        let mut options = MapOptions::default();
        options.geography.data = Some(world_topology());
        options.fills = serde_json::from_value(json!({
            "defaultFill": "#ccc",
            "high": "#f00",
            "low": "#00f"
        }))
        .unwrap();
        options
    }

    fn built_map(options: MapOptions) -> Map<HeadlessScene> {
        Map::builder(HeadlessScene::new(), options)
            .projector(Equirectangular::new(800.0, 400.0))
            .decoder(FeatureCollectionDecoder)
            .build()
            .unwrap()
    }

    fn drawn_map() -> Map<HeadlessScene> {
        let mut map = built_map(test_options());
        map.draw().unwrap();
        map
    }

    /// Tick far past every delay and duration in play.
    fn settle(map: &mut Map<HeadlessScene>) {
        let now = map.clock + 60_000.0;
        map.tick(now);
    }

    fn geography_node(map: &Map<HeadlessScene>, id: &str) -> NodeId {
        map.layer(GEOGRAPHY_LAYER).unwrap().items[id].node
    }

    fn update_of(raw: Value) -> HashMap<String, RegionUpdate> {
        serde_json::from_value(raw).unwrap()
    }

    fn bubble(raw: Value) -> Bubble {
        serde_json::from_value(raw).unwrap()
    }

    fn arc(raw: Value) -> ArcMark {
        serde_json::from_value(raw).unwrap()
    }

    struct StubFetcher {
        body: &'static str,
    }

    impl Fetcher for StubFetcher {
        fn fetch(&self, _url: &str) -> Result<String, MapError> {
            Ok(self.body.to_string())
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn fetch(&self, url: &str) -> Result<String, MapError> {
            Err(MapError::Fetch {
                url: url.to_string(),
                source: Box::new(std::io::Error::other("connection refused")),
            })
        }
    }

    #[test]
    fn build_requires_projector_and_decoder() {
        let missing_projector = Map::builder(HeadlessScene::new(), test_options())
            .decoder(FeatureCollectionDecoder)
            .build()
            .err();
        assert!(matches!(missing_projector, Some(MapError::MissingProjector)));

        let missing_decoder = Map::builder(HeadlessScene::new(), test_options())
            .projector(Equirectangular::new(800.0, 400.0))
            .build()
            .err();
        assert!(matches!(missing_decoder, Some(MapError::MissingDecoder)));
    }

    #[test]
    fn build_rejects_remote_sources_without_a_fetcher() {
        let mut options = test_options();
        options.data_url = Some("https://example.com/data.json".to_string());
        let err = built_map_err(options);
        assert!(matches!(err, MapError::MissingFetcher { url } if url.contains("example.com")));
    }

    fn built_map_err(options: MapOptions) -> MapError {
        match Map::builder(HeadlessScene::new(), options)
            .projector(Equirectangular::new(800.0, 400.0))
            .decoder(FeatureCollectionDecoder)
            .build()
        {
            Ok(_) => panic!("build unexpectedly succeeded"),
            Err(err) => err,
        }
    }

    #[test]
    fn draw_without_topology_is_an_error() {
        let mut options = test_options();
        options.geography.data = None;
        let mut map = built_map(options);
        let err = map.draw().err();
        assert!(matches!(err, Some(MapError::MissingTopology { scope }) if scope == "world"));
        assert!(map.layer(GEOGRAPHY_LAYER).is_none());
    }

    #[test]
    fn draw_renders_one_styled_path_per_feature() {
        let map = drawn_map();
        let layer = map.layer(GEOGRAPHY_LAYER).unwrap();
        assert_eq!(layer.items.len(), 2);

        let node = geography_node(&map, "USA");
        assert_eq!(map.scene().kind(node), Some(NodeKind::Path));
        assert_eq!(map.scene().str_attr(node, Attr::Fill), Some("#ccc"));
        assert_eq!(map.scene().str_attr(node, Attr::Stroke), Some("#FDFDFD"));
        assert_eq!(map.scene().num_attr(node, Attr::StrokeWidth), Some(1.0));
        assert_eq!(map.scene().num_attr(node, Attr::FillOpacity), Some(1.0));
        assert_eq!(layer.items["USA"].datum["properties"]["name"], "United States");
    }

    #[test]
    fn redraw_reuses_existing_feature_nodes() {
        let mut map = drawn_map();
        let before = geography_node(&map, "USA");
        map.draw().unwrap();
        assert_eq!(geography_node(&map, "USA"), before);
        assert_eq!(map.layer(GEOGRAPHY_LAYER).unwrap().items.len(), 2);
    }

    #[test]
    fn inline_option_data_colors_the_first_draw() {
        let mut options = test_options();
        options.data = update_of(json!({"USA": {"fillKey": "high"}}));
        let mut map = built_map(options);
        map.draw().unwrap();

        let node = geography_node(&map, "USA");
        assert_eq!(map.scene().str_attr(node, Attr::Fill), Some("#f00"));
    }

    #[test]
    fn choropleth_update_recolors_exactly_the_named_regions() {
        let mut map = drawn_map();
        map.update_choropleth(&update_of(json!({
            "USA": {"fillKey": "high"},
            "CAN": {"fillKey": "low"}
        })));
        settle(&mut map);

        let usa = geography_node(&map, "USA");
        let can = geography_node(&map, "CAN");
        assert_eq!(map.scene().str_attr(usa, Attr::Fill), Some("#f00"));
        assert_eq!(map.scene().str_attr(can, Attr::Fill), Some("#00f"));
    }

    #[test]
    fn recolors_blend_before_settling() {
        let mut map = drawn_map();
        map.update_choropleth(&update_of(json!({"USA": {"fillKey": "high"}})));
        map.tick(125.0);

        let usa = geography_node(&map, "USA");
        let mid = map.scene().str_attr(usa, Attr::Fill).unwrap();
        assert!(mid.starts_with("rgb("), "expected a blended color, got {mid}");

        settle(&mut map);
        assert_eq!(map.scene().str_attr(usa, Attr::Fill), Some("#f00"));
    }

    #[test]
    fn updates_for_regions_without_drawables_keep_records_only() {
        let mut map = drawn_map();
        let nodes_before = map.scene().node_count();
        map.update_choropleth(&update_of(json!({"ZZZ": {"fillKey": "low"}})));
        settle(&mut map);

        assert_eq!(map.scene().node_count(), nodes_before);
        assert_eq!(map.region_record("ZZZ").unwrap().fill_key.as_deref(), Some("low"));
        assert_eq!(map.pending_transitions(), 0);
    }

    #[test]
    fn highlight_restores_the_settled_fill_exactly() {
        let mut map = drawn_map();
        map.update_choropleth(&update_of(json!({"USA": {"fillKey": "high"}})));
        settle(&mut map);

        let usa = geography_node(&map, "USA");
        map.on_pointer_enter(GEOGRAPHY_LAYER, "USA", 100.0, 50.0);
        assert_eq!(map.scene().str_attr(usa, Attr::Fill), Some("#FC8D59"));
        assert_eq!(
            map.scene().str_attr(usa, Attr::Stroke),
            Some("rgba(250, 15, 160, 0.2)")
        );
        // Highlighted items paint above their siblings.
        let group = map.scene().find_group(GEOGRAPHY_LAYER).unwrap();
        assert_eq!(map.scene().nodes_in(group).last(), Some(&usa));

        map.on_pointer_leave(GEOGRAPHY_LAYER, "USA");
        assert_eq!(map.scene().str_attr(usa, Attr::Fill), Some("#f00"));
        assert_eq!(map.scene().str_attr(usa, Attr::Stroke), Some("#FDFDFD"));
    }

    #[test]
    fn restore_beats_a_recolor_that_landed_mid_hover() {
        let mut map = drawn_map();
        let usa = geography_node(&map, "USA");

        map.on_pointer_enter(GEOGRAPHY_LAYER, "USA", 0.0, 0.0);
        map.update_choropleth(&update_of(json!({"USA": {"fillKey": "high"}})));
        map.on_pointer_leave(GEOGRAPHY_LAYER, "USA");

        assert_eq!(map.scene().str_attr(usa, Attr::Fill), Some("#ccc"));
        settle(&mut map);
        assert_eq!(map.scene().str_attr(usa, Attr::Fill), Some("#ccc"));
    }

    #[test]
    fn second_pointer_leave_does_not_disturb_later_state() {
        let mut map = drawn_map();
        let usa = geography_node(&map, "USA");

        map.on_pointer_enter(GEOGRAPHY_LAYER, "USA", 0.0, 0.0);
        map.on_pointer_leave(GEOGRAPHY_LAYER, "USA");
        map.update_choropleth(&update_of(json!({"USA": {"fillKey": "high"}})));
        settle(&mut map);
        map.on_pointer_leave(GEOGRAPHY_LAYER, "USA");

        assert_eq!(map.scene().str_attr(usa, Attr::Fill), Some("#f00"));
        assert!(!map.scene().popup().visible);
    }

    #[test]
    fn popup_renders_once_and_follows_the_pointer() {
        let mut map = drawn_map();
        map.on_pointer_enter(GEOGRAPHY_LAYER, "USA", 40.0, 25.0);

        let popup = map.scene().popup();
        assert!(popup.visible);
        assert!(popup.content.contains("United States"));
        assert_eq!((popup.x, popup.y), (40.0, 55.0));

        map.on_pointer_move(42.0, 26.0);
        let popup = map.scene().popup();
        assert_eq!((popup.x, popup.y), (42.0, 56.0));
        assert!(popup.content.contains("United States"));

        map.on_pointer_leave(GEOGRAPHY_LAYER, "USA");
        assert!(!map.scene().popup().visible);
    }

    #[test]
    fn custom_popup_template_sees_datum_and_record() {
        let mut map = drawn_map();
        map.update_choropleth(&update_of(json!({"USA": {"fillKey": "high", "gdp": 21000}})));
        settle(&mut map);
        map.set_popup_template(GEOGRAPHY_LAYER, |datum, record| {
            let gdp = record
                .and_then(|r| r.extra.get("gdp"))
                .cloned()
                .unwrap_or(Value::Null);
            format!("{} gdp={gdp}", datum["id"].as_str().unwrap_or("?"))
        });

        map.on_pointer_enter(GEOGRAPHY_LAYER, "USA", 0.0, 0.0);
        assert_eq!(map.scene().popup().content, "USA gdp=21000");
    }

    #[test]
    fn bubbles_update_in_place_and_keep_their_node() {
        let mut map = drawn_map();
        let outcome = map
            .bubbles(&[bubble(json!({"id": "hq", "latitude": 40.0, "longitude": -100.0, "radius": 5}))])
            .unwrap();
        assert_eq!(outcome.entered, vec!["hq"]);
        settle(&mut map);

        let node = map.layer(BUBBLES_LAYER).unwrap().items["hq"].node;
        assert_eq!(map.scene().num_attr(node, Attr::R), Some(5.0));

        let outcome = map
            .bubbles(&[bubble(json!({"id": "hq", "latitude": 40.0, "longitude": -100.0, "radius": 9}))])
            .unwrap();
        assert_eq!(outcome.updated, vec!["hq"]);
        assert!(outcome.entered.is_empty() && outcome.exited.is_empty());
        settle(&mut map);

        assert_eq!(map.layer(BUBBLES_LAYER).unwrap().items["hq"].node, node);
        assert_eq!(map.scene().num_attr(node, Attr::R), Some(9.0));
    }

    #[test]
    fn bubble_sets_partition_into_enter_update_exit() {
        let mut map = drawn_map();
        map.bubbles(&[
            bubble(json!({"id": "1", "latitude": 10.0, "longitude": 10.0, "radius": 3})),
            bubble(json!({"id": "2", "latitude": 20.0, "longitude": 20.0, "radius": 3})),
        ])
        .unwrap();
        settle(&mut map);

        let outcome = map
            .bubbles(&[
                bubble(json!({"id": "2", "latitude": 20.0, "longitude": 20.0, "radius": 4})),
                bubble(json!({"id": "3", "latitude": 30.0, "longitude": 30.0, "radius": 3})),
            ])
            .unwrap();
        assert_eq!(outcome.entered, vec!["3"]);
        assert_eq!(outcome.updated, vec!["2"]);
        assert_eq!(outcome.exited, vec!["1"]);
    }

    #[test]
    fn bubbles_grow_in_after_a_short_delay() {
        let mut map = drawn_map();
        map.bubbles(&[bubble(json!({"id": "a", "latitude": 0.0, "longitude": 0.0, "radius": 10}))])
            .unwrap();
        let node = map.layer(BUBBLES_LAYER).unwrap().items["a"].node;

        assert_eq!(map.scene().num_attr(node, Attr::R), Some(0.0));
        map.tick(50.0);
        assert_eq!(map.scene().num_attr(node, Attr::R), Some(0.0));
        map.tick(300.0);
        let mid = map.scene().num_attr(node, Attr::R).unwrap();
        assert!(mid > 0.0 && mid < 10.0, "mid-grow radius, got {mid}");
        settle(&mut map);
        assert_eq!(map.scene().num_attr(node, Attr::R), Some(10.0));
    }

    #[test]
    fn exiting_bubbles_shrink_then_disappear() {
        let mut map = drawn_map();
        map.bubbles(&[bubble(json!({"id": "a", "latitude": 0.0, "longitude": 0.0, "radius": 10}))])
            .unwrap();
        settle(&mut map);
        let node = map.layer(BUBBLES_LAYER).unwrap().items["a"].node;

        let outcome = map.bubbles(&[]).unwrap();
        assert_eq!(outcome.exited, vec!["a"]);
        // Still on screen while the exit transition runs.
        assert_eq!(map.scene().kind(node), Some(NodeKind::Circle));
        assert_eq!(map.layer(BUBBLES_LAYER).unwrap().exiting.len(), 1);

        settle(&mut map);
        assert_eq!(map.scene().kind(node), None);
        assert!(map.layer(BUBBLES_LAYER).unwrap().exiting.is_empty());
    }

    #[test]
    fn reentering_key_mid_exit_gets_a_fresh_bubble() {
        let mut map = drawn_map();
        let datum = json!({"id": "a", "latitude": 0.0, "longitude": 0.0, "radius": 10});
        map.bubbles(&[bubble(datum.clone())]).unwrap();
        settle(&mut map);
        let old_node = map.layer(BUBBLES_LAYER).unwrap().items["a"].node;

        map.bubbles(&[]).unwrap();
        let outcome = map.bubbles(&[bubble(datum)]).unwrap();
        assert_eq!(outcome.entered, vec!["a"]);
        let new_node = map.layer(BUBBLES_LAYER).unwrap().items["a"].node;
        assert_ne!(new_node, old_node);

        settle(&mut map);
        assert_eq!(map.scene().kind(old_node), None);
        assert_eq!(map.scene().num_attr(new_node, Attr::R), Some(10.0));
        let group = map.scene().find_group(BUBBLES_LAYER).unwrap();
        assert_eq!(map.scene().nodes_in(group).len(), 1);
    }

    #[test]
    fn identical_anonymous_bubbles_alias_to_one_item() {
        let mut map = drawn_map();
        let datum = json!({"latitude": 5.0, "longitude": 5.0, "radius": 2});
        let outcome = map
            .bubbles(&[bubble(datum.clone()), bubble(datum.clone())])
            .unwrap();
        assert_eq!(outcome.entered.len(), 1);

        // Same array again: a stable structural key, so pure updates.
        let outcome = map.bubbles(&[bubble(datum.clone()), bubble(datum)]).unwrap();
        assert_eq!(outcome.updated.len(), 1);
        assert!(outcome.entered.is_empty() && outcome.exited.is_empty());
    }

    #[test]
    fn centered_bubbles_anchor_to_region_centroids() {
        let mut map = drawn_map();
        map.bubbles(&[bubble(json!({"id": "c", "centered": "USA", "radius": 4}))]).unwrap();
        settle(&mut map);

        let node = map.layer(BUBBLES_LAYER).unwrap().items["c"].node;
        let projector = Equirectangular::new(800.0, 400.0);
        let expected = projector.centroid_of(map.features().get("USA").unwrap());
        assert_eq!(map.scene().num_attr(node, Attr::Cx), Some(expected.0));
        assert_eq!(map.scene().num_attr(node, Attr::Cy), Some(expected.1));
        assert_eq!(map.scene().num_attr(node, Attr::R), Some(4.0));
    }

    #[test]
    fn unresolvable_bubble_positions_are_skipped() {
        let mut map = drawn_map();
        let outcome = map
            .bubbles(&[bubble(json!({"id": "ghost", "centered": "ZZZ", "radius": 4}))])
            .unwrap();
        assert!(outcome.entered.is_empty());
        assert!(map.layer(BUBBLES_LAYER).unwrap().items.is_empty());
    }

    #[test]
    fn animate_false_renders_final_attributes_directly() {
        let mut map = drawn_map();
        let overrides = BubblesOverrides { animate: Some(false), ..BubblesOverrides::default() };
        map.bubbles_with(
            &[bubble(json!({"id": "a", "latitude": 0.0, "longitude": 0.0, "radius": 6}))],
            &overrides,
            false,
        )
        .unwrap();

        let node = map.layer(BUBBLES_LAYER).unwrap().items["a"].node;
        assert_eq!(map.scene().num_attr(node, Attr::R), Some(6.0));
        assert_eq!(map.pending_transitions(), 0);

        map.bubbles_with(&[], &overrides, false).unwrap();
        assert_eq!(map.scene().kind(node), None);
        assert!(map.layer(BUBBLES_LAYER).unwrap().exiting.is_empty());
    }

    #[test]
    fn replacing_a_layer_discards_items_and_their_transitions() {
        let mut map = drawn_map();
        map.bubbles(&[bubble(json!({"id": "a", "latitude": 0.0, "longitude": 0.0, "radius": 6}))])
            .unwrap();
        assert_eq!(map.pending_transitions(), 1);

        let overrides = BubblesOverrides::default();
        map.bubbles_with(
            &[bubble(json!({"id": "b", "latitude": 9.0, "longitude": 9.0, "radius": 2}))],
            &overrides,
            true,
        )
        .unwrap();

        assert_eq!(map.pending_transitions(), 1);
        let layer = map.layer(BUBBLES_LAYER).unwrap();
        assert_eq!(layer.items.len(), 1);
        assert!(layer.items.contains_key("b"));
        let group = map.scene().find_group(BUBBLES_LAYER).unwrap();
        assert_eq!(map.scene().nodes_in(group).len(), 1);
    }

    #[test]
    fn arcs_draw_on_through_dash_offset() {
        let mut map = drawn_map();
        map.arcs(&[arc(json!({
            "id": "route",
            "origin": {"latitude": 40.7, "longitude": -74.0},
            "destination": {"latitude": 51.5, "longitude": -0.1}
        }))])
        .unwrap();

        let node = map.layer(ARCS_LAYER).unwrap().items["route"].node;
        let length = map.scene().path_length(node);
        assert!(length > 0.0);
        assert_eq!(
            map.scene().str_attr(node, Attr::StrokeDasharray),
            Some(format!("{length} {length}").as_str())
        );
        assert_eq!(map.scene().num_attr(node, Attr::StrokeDashoffset), Some(length));
        assert_eq!(map.scene().str_attr(node, Attr::Fill), Some("none"));
        assert_eq!(map.scene().str_attr(node, Attr::StrokeLinecap), Some("round"));
        assert_eq!(map.scene().str_attr(node, Attr::Stroke), Some("#DD1C77"));

        settle(&mut map);
        assert_eq!(map.scene().num_attr(node, Attr::StrokeDashoffset), Some(0.0));
    }

    #[test]
    fn removed_arcs_fade_out_before_removal() {
        let mut map = drawn_map();
        let route = |id: &str, lon: f64| {
            arc(json!({
                "id": id,
                "origin": {"latitude": 0.0, "longitude": 0.0},
                "destination": {"latitude": 10.0, "longitude": lon}
            }))
        };
        map.arcs(&[route("a", 10.0), route("b", 20.0)]).unwrap();
        settle(&mut map);

        let doomed = map.layer(ARCS_LAYER).unwrap().items["b"].node;
        let outcome = map.arcs(&[route("a", 10.0)]).unwrap();
        assert_eq!(outcome.exited, vec!["b"]);
        assert_eq!(map.scene().kind(doomed), Some(NodeKind::Path));

        settle(&mut map);
        assert_eq!(map.scene().kind(doomed), None);
    }

    #[test]
    fn great_arc_routes_sample_the_sphere() {
        let mut map = drawn_map();
        let overrides: ArcsOverrides = serde_json::from_value(json!({"greatArc": true})).unwrap();
        map.arcs_with(
            &[arc(json!({
                "id": "polar",
                "origin": {"latitude": 10.0, "longitude": 0.0},
                "destination": {"latitude": 80.0, "longitude": 0.0}
            }))],
            &overrides,
            false,
        )
        .unwrap();

        let node = map.layer(ARCS_LAYER).unwrap().items["polar"].node;
        let d = map.scene().str_attr(node, Attr::D).unwrap();
        assert_eq!(d.matches('L').count(), 32);
    }

    #[test]
    fn labels_letter_each_drawn_region() {
        let mut map = drawn_map();
        map.labels().unwrap();

        let layer = map.layer(LABELS_LAYER).unwrap();
        assert_eq!(layer.items.len(), 2);
        let node = layer.items["USA"].node;
        assert_eq!(map.scene().kind(node), Some(NodeKind::Text));
        assert_eq!(map.scene().str_attr(node, Attr::Text), Some("USA"));
        assert_eq!(map.scene().num_attr(node, Attr::FontSize), Some(10.0));
        assert_eq!(map.scene().str_attr(node, Attr::FontFamily), Some("Verdana"));

        let projector = Equirectangular::new(800.0, 400.0);
        let (cx, cy) = projector.centroid_of(map.features().get("USA").unwrap());
        assert_eq!(map.scene().num_attr(node, Attr::X), Some(cx - 7.5));
        assert_eq!(map.scene().num_attr(node, Attr::Y), Some(cy + 5.0));
    }

    #[test]
    fn graticule_is_a_single_path_above_geography() {
        let mut map = drawn_map();
        map.graticule().unwrap();

        assert_eq!(map.scene().group_names(), vec![GEOGRAPHY_LAYER, GRATICULE_LAYER]);
        let layer = map.layer(GRATICULE_LAYER).unwrap();
        assert_eq!(layer.items.len(), 1);
        let node = layer.items[GRATICULE_KEY].node;
        assert_eq!(map.scene().str_attr(node, Attr::Stroke), Some("#777"));
        assert_eq!(map.scene().num_attr(node, Attr::StrokeOpacity), Some(0.5));

        // Redrawing with a coarser grid reuses the node.
        let overrides: GraticuleOverrides = serde_json::from_value(json!({"step": 30})).unwrap();
        let outcome = map.graticule_with(&overrides, false).unwrap();
        assert_eq!(outcome.updated, vec![GRATICULE_KEY]);
        assert_eq!(map.layer(GRATICULE_LAYER).unwrap().items[GRATICULE_KEY].node, node);
    }

    #[test]
    fn geography_slots_beneath_layers_drawn_before_it() {
        let mut map = built_map(test_options());
        map.bubbles(&[bubble(json!({"id": "early", "latitude": 0.0, "longitude": 0.0, "radius": 1}))])
            .unwrap();
        map.draw().unwrap();
        assert_eq!(map.scene().group_names(), vec![GEOGRAPHY_LAYER, BUBBLES_LAYER]);
    }

    #[test]
    fn draw_layer_rejects_non_array_mark_data() {
        let mut map = drawn_map();
        let err = map
            .draw_layer(BUBBLES_LAYER, &json!({"not": "an array"}), None, false)
            .err();
        assert!(matches!(err, Some(MapError::InvalidLayerData { layer }) if layer == BUBBLES_LAYER));
        // Validation happens before anything is drawn.
        assert!(map.layer(BUBBLES_LAYER).is_none());
    }

    #[test]
    fn draw_layer_routes_through_the_handler_table() {
        let mut map = drawn_map();
        let err = map.draw_layer("airports", &json!([]), None, false).err();
        assert!(matches!(err, Some(MapError::UnknownLayer { name }) if name == "airports"));

        map.register_layer("airports", LayerKind::Bubbles);
        let outcome = map
            .draw_layer(
                "airports",
                &json!([{"id": "JFK", "latitude": 40.6, "longitude": -73.8, "radius": 3}]),
                Some(&json!({"fillOpacity": 0.3})),
                false,
            )
            .unwrap();
        assert_eq!(outcome.entered, vec!["JFK"]);

        let node = map.layer("airports").unwrap().items["JFK"].node;
        assert_eq!(map.scene().num_attr(node, Attr::FillOpacity), Some(0.3));
    }

    #[test]
    fn done_callback_runs_once_after_the_first_draw() {
        let mut map = built_map(test_options());
        let calls = Rc::new(Cell::new(0u32));
        let drawn_features = Rc::new(Cell::new(0usize));
        let calls_in = Rc::clone(&calls);
        let features_in = Rc::clone(&drawn_features);
        map.on_done(move |map| {
            calls_in.set(calls_in.get() + 1);
            features_in.set(map.layer(GEOGRAPHY_LAYER).map_or(0, |l| l.items.len()));
        });

        map.draw().unwrap();
        map.draw().unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(drawn_features.get(), 2);
    }

    #[test]
    fn remote_csv_dataset_merges_after_the_first_draw() {
        let mut options = test_options();
        options.data_url = Some("https://example.com/data.csv".to_string());
        options.data_type = DataFormat::Csv;
        let mut map = Map::builder(HeadlessScene::new(), options)
            .projector(Equirectangular::new(800.0, 400.0))
            .decoder(FeatureCollectionDecoder)
            .fetcher(StubFetcher { body: "id,fillKey,name\nUSA,high,United States\n" })
            .build()
            .unwrap();
        map.draw().unwrap();
        settle(&mut map);

        let usa = geography_node(&map, "USA");
        assert_eq!(map.scene().str_attr(usa, Attr::Fill), Some("#f00"));
        assert_eq!(map.region_record("USA").unwrap().extra["name"], "United States");
    }

    #[test]
    fn dataset_fetch_failure_leaves_the_drawn_geography() {
        let mut options = test_options();
        options.data_url = Some("https://example.com/data.json".to_string());
        let mut map = Map::builder(HeadlessScene::new(), options)
            .projector(Equirectangular::new(800.0, 400.0))
            .decoder(FeatureCollectionDecoder)
            .fetcher(FailingFetcher)
            .build()
            .unwrap();

        let err = map.draw().err();
        assert!(matches!(err, Some(MapError::Fetch { .. })));
        assert_eq!(map.layer(GEOGRAPHY_LAYER).unwrap().items.len(), 2);
    }

    #[test]
    fn pointer_events_on_unknown_targets_are_harmless() {
        let mut map = drawn_map();
        map.on_pointer_enter("nope", "USA", 0.0, 0.0);
        map.on_pointer_enter(GEOGRAPHY_LAYER, "ZZZ", 0.0, 0.0);
        assert!(!map.scene().popup().visible);
        map.on_pointer_leave("nope", "USA");
        map.on_pointer_leave(GEOGRAPHY_LAYER, "ZZZ");
    }
}
