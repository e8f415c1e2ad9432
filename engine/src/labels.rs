//! Label layer: region ids lettered near their centroids.

use serde_json::Value;

use crate::errors::MapError;
use crate::options::LabelsConfig;
use crate::projection::Projector;
use crate::reconcile::ItemOps;
use crate::scene::{Attr, GroupId, NodeId, NodeKind, SceneGraph};
use crate::topology::FeatureSet;

pub struct LabelOps<'a, S: SceneGraph> {
    pub scene: &'a mut S,
    pub projector: &'a dyn Projector,
    pub features: &'a FeatureSet,
    pub config: LabelsConfig,
    pub group: GroupId,
}

impl<S: SceneGraph> LabelOps<'_, S> {
    fn place(&mut self, node: NodeId, key: &str) {
        let Some(feature) = self.features.get(key) else {
            return;
        };
        let (cx, cy) = self.projector.centroid_of(feature);
        self.scene.set_num(node, Attr::X, cx - self.config.x_offset);
        self.scene.set_num(node, Attr::Y, cy + self.config.y_offset);
        self.scene.set_str(node, Attr::Text, key);
        self.scene.set_num(node, Attr::FontSize, self.config.font_size);
        self.scene.set_str(node, Attr::FontFamily, &self.config.font_family);
        self.scene.set_str(node, Attr::Fill, &self.config.label_color);
    }
}

impl<S: SceneGraph> ItemOps for LabelOps<'_, S> {
    fn enter(&mut self, key: &str, _datum: &Value) -> Result<Option<NodeId>, MapError> {
        if self.features.get(key).is_none() {
            return Ok(None);
        }
        let node = self.scene.create_node(self.group, NodeKind::Text);
        self.place(node, key);
        Ok(Some(node))
    }

    fn update(&mut self, node: NodeId, datum: &Value) {
        if let Some(id) = datum.get("id").and_then(Value::as_str) {
            self.place(node, id);
        }
    }

    fn exit(&mut self, node: NodeId, _key: &str) -> bool {
        self.scene.remove_node(node);
        false
    }
}
