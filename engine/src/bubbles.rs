//! Bubble layer: sized circles anchored to coordinates or region centroids.

use serde_json::Value;
use tracing::debug;

use thema_shared::{Bubble, Fills};

use crate::errors::MapError;
use crate::options::BubblesConfig;
use crate::projection::Projector;
use crate::reconcile::ItemOps;
use crate::scene::{Attr, AttrValue, GroupId, NodeId, NodeKind, SceneGraph};
use crate::topology::FeatureSet;
use crate::transitions::{Effect, TransitionScheduler};

const GROW_DELAY_MS: f64 = 100.0;
const GROW_DURATION_MS: f64 = 400.0;
const SHRINK_DURATION_MS: f64 = 250.0;

pub struct BubbleOps<'a, S: SceneGraph> {
    pub scene: &'a mut S,
    pub scheduler: &'a mut TransitionScheduler,
    pub projector: &'a dyn Projector,
    pub features: &'a FeatureSet,
    pub fills: &'a Fills,
    pub config: BubblesConfig,
    pub layer_name: String,
    pub group: GroupId,
    pub now: f64,
}

impl<S: SceneGraph> BubbleOps<'_, S> {
    /// Explicit coordinates win; `centered` anchors to a region centroid.
    /// `None` when neither resolves.
    fn position(&self, bubble: &Bubble) -> Option<(f64, f64)> {
        if let (Some(lat), Some(lon)) = (bubble.latitude, bubble.longitude) {
            return Some(self.projector.project(lon, lat));
        }
        let region = bubble.centered.as_deref()?;
        let feature = self.features.get(region)?;
        Some(self.projector.centroid_of(feature))
    }

    fn apply_style(&mut self, node: NodeId, bubble: &Bubble) {
        let fill = self.fills.resolve(bubble.fill_key.as_deref()).to_string();
        let stroke = bubble
            .border_color
            .clone()
            .unwrap_or_else(|| self.config.border_color.clone());
        self.scene.set_str(node, Attr::Fill, &fill);
        self.scene.set_str(node, Attr::Stroke, &stroke);
        self.scene.set_num(
            node,
            Attr::StrokeWidth,
            bubble.border_width.unwrap_or(self.config.border_width),
        );
        self.scene.set_num(
            node,
            Attr::FillOpacity,
            bubble.fill_opacity.unwrap_or(self.config.fill_opacity),
        );
    }
}

impl<S: SceneGraph> ItemOps for BubbleOps<'_, S> {
    fn enter(&mut self, key: &str, datum: &Value) -> Result<Option<NodeId>, MapError> {
        let Ok(bubble) = serde_json::from_value::<Bubble>(datum.clone()) else {
            debug!(key, "bubble datum failed to parse, skipped");
            return Ok(None);
        };
        let Some((cx, cy)) = self.position(&bubble) else {
            debug!(key, "bubble position unresolved, skipped");
            return Ok(None);
        };

        let node = self.scene.create_node(self.group, NodeKind::Circle);
        self.scene.set_num(node, Attr::Cx, cx);
        self.scene.set_num(node, Attr::Cy, cy);
        self.apply_style(node, &bubble);
        if self.config.animate {
            self.scene.set_num(node, Attr::R, 0.0);
            self.scheduler.schedule(
                node,
                Attr::R,
                AttrValue::Num(bubble.radius),
                self.now + GROW_DELAY_MS,
                GROW_DURATION_MS,
                None,
            );
        } else {
            self.scene.set_num(node, Attr::R, bubble.radius);
        }
        Ok(Some(node))
    }

    fn update(&mut self, node: NodeId, datum: &Value) {
        let Ok(bubble) = serde_json::from_value::<Bubble>(datum.clone()) else {
            return;
        };
        let Some((cx, cy)) = self.position(&bubble) else {
            return;
        };
        self.scene.set_num(node, Attr::Cx, cx);
        self.scene.set_num(node, Attr::Cy, cy);
        self.apply_style(node, &bubble);
        if self.config.animate {
            self.scheduler.schedule(
                node,
                Attr::R,
                AttrValue::Num(bubble.radius),
                self.now,
                GROW_DURATION_MS,
                None,
            );
        } else {
            self.scheduler.cancel(node, Attr::R);
            self.scene.set_num(node, Attr::R, bubble.radius);
        }
    }

    fn exit(&mut self, node: NodeId, _key: &str) -> bool {
        if !self.config.animate {
            self.scene.remove_node(node);
            return false;
        }
        self.scheduler.schedule(
            node,
            Attr::R,
            AttrValue::Num(0.0),
            self.now + self.config.exit_delay,
            SHRINK_DURATION_MS,
            Some(Effect::RemoveItem { layer: self.layer_name.clone(), node }),
        );
        true
    }
}
