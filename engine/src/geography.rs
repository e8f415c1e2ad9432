//! Geography layer: one path per feature of the active topology.

use serde_json::{json, Value};

use thema_shared::Fills;

use crate::choropleth::ChoroplethState;
use crate::errors::MapError;
use crate::options::GeographyConfig;
use crate::projection::Projector;
use crate::reconcile::ItemOps;
use crate::scene::{Attr, GroupId, NodeId, NodeKind, SceneGraph};
use crate::topology::FeatureSet;

/// Feature id the `hide_antarctica` flag filters out.
pub const ANTARCTICA_ID: &str = "ATA";

/// Keyed datum list for the feature set, in draw order.
pub fn feature_data(features: &FeatureSet, hide_antarctica: bool) -> Vec<(String, Value)> {
    features
        .iter()
        .filter(|feature| !(hide_antarctica && feature.id == ANTARCTICA_ID))
        .map(|feature| {
            (
                feature.id.clone(),
                json!({"id": feature.id, "properties": feature.properties}),
            )
        })
        .collect()
}

pub struct GeographyOps<'a, S: SceneGraph> {
    pub scene: &'a mut S,
    pub projector: &'a dyn Projector,
    pub features: &'a FeatureSet,
    pub choropleth: &'a ChoroplethState,
    pub fills: &'a Fills,
    pub config: &'a GeographyConfig,
    pub group: GroupId,
}

impl<S: SceneGraph> GeographyOps<'_, S> {
    fn apply_style(&mut self, node: NodeId, region: &str) {
        let fill = self.choropleth.base_color(region, self.fills).to_string();
        self.scene.set_str(node, Attr::Fill, &fill);
        self.scene.set_str(node, Attr::Stroke, &self.config.border_color);
        self.scene.set_num(node, Attr::StrokeWidth, self.config.border_width);
        self.scene.set_num(node, Attr::FillOpacity, 1.0);
    }
}

impl<S: SceneGraph> ItemOps for GeographyOps<'_, S> {
    fn enter(&mut self, key: &str, _datum: &Value) -> Result<Option<NodeId>, MapError> {
        let Some(feature) = self.features.get(key) else {
            return Ok(None);
        };
        let node = self.scene.create_node(self.group, NodeKind::Path);
        let d = self.projector.path_for(feature);
        self.scene.set_str(node, Attr::D, &d);
        self.apply_style(node, key);
        Ok(Some(node))
    }

    fn update(&mut self, node: NodeId, datum: &Value) {
        let Some(id) = datum.get("id").and_then(Value::as_str) else {
            return;
        };
        if let Some(feature) = self.features.get(id) {
            let d = self.projector.path_for(feature);
            self.scene.set_str(node, Attr::D, &d);
        }
        self.apply_style(node, id);
    }

    fn exit(&mut self, node: NodeId, _key: &str) -> bool {
        // Regions leave without ceremony; only marks animate out.
        self.scene.remove_node(node);
        false
    }
}
