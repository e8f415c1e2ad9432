//! Layer registry: one drawing group per layer name.

use std::collections::HashMap;

use serde_json::Value;

use crate::interact::HoverConfig;
use crate::scene::{GroupId, NodeId, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Geography,
    Bubbles,
    Arcs,
    Labels,
    Graticule,
}

/// Style snapshot taken when a hover highlight is applied, restored
/// verbatim on pointer-leave.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedStyle {
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
    pub fill_opacity: f64,
}

#[derive(Debug)]
pub struct RenderedItem {
    pub node: NodeId,
    pub key: String,
    /// Source datum, retained for popup rendering.
    pub datum: Value,
    /// Present only between highlight-enter and highlight-leave.
    pub saved_style: Option<SavedStyle>,
}

#[derive(Debug)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
    pub group: GroupId,
    /// Live items by key.
    pub items: HashMap<String, RenderedItem>,
    /// Items whose exit transition is still running. No longer keyed;
    /// dropped when the transition's completion effect fires.
    pub exiting: Vec<RenderedItem>,
    /// Effective hover behavior, fixed when the layer is drawn.
    pub hover: HoverConfig,
}

impl Layer {
    pub fn take_exiting(&mut self, node: NodeId) -> Option<RenderedItem> {
        let position = self.exiting.iter().position(|item| item.node == node)?;
        Some(self.exiting.remove(position))
    }
}

/// Named layers over a scene. Geography sits at the bottom of the paint
/// order; every other layer stacks on top in creation order.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: HashMap<String, Layer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.get_mut(name)
    }

    /// Reuse the named layer, or create it at the z-position its kind
    /// dictates. `create_new` discards any previous layer of that name
    /// along with its group.
    pub fn get_or_create<S: SceneGraph>(
        &mut self,
        scene: &mut S,
        name: &str,
        kind: LayerKind,
        create_new: bool,
    ) -> &mut Layer {
        if create_new {
            if let Some(old) = self.layers.remove(name) {
                scene.remove_group(old.group);
            }
        }
        self.layers.entry(name.to_string()).or_insert_with(|| {
            let group = scene.create_group(name, matches!(kind, LayerKind::Geography));
            Layer {
                name: name.to_string(),
                kind,
                group,
                items: HashMap::new(),
                exiting: Vec::new(),
                hover: HoverConfig::disabled(),
            }
        })
    }
}
