//! Hover highlighting and the popup overlay.
//!
//! Each hoverable item is a two-state machine, idle or highlighted. The
//! highlight-enter edge snapshots the item's current paint attributes and
//! the leave edge writes that snapshot back verbatim, so whatever fill the
//! choropleth had settled on survives a hover round-trip exactly.

use serde_json::Value;

use thema_shared::RegionRecord;

use crate::layers::{RenderedItem, SavedStyle};
use crate::scene::{Attr, AttrValue, NodeId, SceneGraph};
use crate::transitions::TransitionScheduler;

/// Vertical offset keeping the popup clear of the pointer.
pub const POPUP_OFFSET_Y: f64 = 30.0;

/// Effective hover behavior for one layer, fixed at draw time.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverConfig {
    pub highlight_on_hover: bool,
    pub popup_on_hover: bool,
    pub highlight_fill_color: String,
    pub highlight_border_color: String,
    pub highlight_border_width: f64,
    pub highlight_fill_opacity: f64,
}

impl HoverConfig {
    /// Inert configuration for layers that do not react to the pointer.
    pub fn disabled() -> Self {
        HoverConfig {
            highlight_on_hover: false,
            popup_on_hover: false,
            highlight_fill_color: String::new(),
            highlight_border_color: String::new(),
            highlight_border_width: 0.0,
            highlight_fill_opacity: 1.0,
        }
    }
}

/// Idle to highlighted. Applies the highlight style over a snapshot of the
/// current one, raises the item above its siblings, and shows the popup
/// with content rendered once for the whole hover.
pub fn pointer_enter<S: SceneGraph>(
    scene: &mut S,
    item: &mut RenderedItem,
    hover: &HoverConfig,
    popup_content: Option<String>,
    x: f64,
    y: f64,
) {
    if hover.highlight_on_hover && item.saved_style.is_none() {
        let saved = snapshot(scene, item.node);
        scene.set_str(item.node, Attr::Fill, &hover.highlight_fill_color);
        scene.set_str(item.node, Attr::Stroke, &hover.highlight_border_color);
        scene.set_num(item.node, Attr::StrokeWidth, hover.highlight_border_width);
        scene.set_num(item.node, Attr::FillOpacity, hover.highlight_fill_opacity);
        scene.raise(item.node);
        item.saved_style = Some(saved);
    }
    if let Some(content) = popup_content {
        scene.show_popup(x, y + POPUP_OFFSET_Y, &content);
    }
}

/// Pointer travel while highlighted repositions the popup, nothing else.
pub fn pointer_move<S: SceneGraph>(scene: &mut S, x: f64, y: f64) {
    scene.move_popup(x, y + POPUP_OFFSET_Y);
}

/// Highlighted to idle. Restores the exact snapshot and hides the popup.
/// Pending transitions on the restored attributes are canceled so the
/// snapshot wins over any recolor that started mid-hover. A leave without
/// a live snapshot still hides the popup and is otherwise a no-op.
pub fn pointer_leave<S: SceneGraph>(
    scene: &mut S,
    scheduler: &mut TransitionScheduler,
    item: &mut RenderedItem,
) {
    if let Some(saved) = item.saved_style.take() {
        for attr in [Attr::Fill, Attr::Stroke, Attr::StrokeWidth, Attr::FillOpacity] {
            scheduler.cancel(item.node, attr);
        }
        scene.set_str(item.node, Attr::Fill, &saved.fill);
        scene.set_str(item.node, Attr::Stroke, &saved.stroke);
        scene.set_num(item.node, Attr::StrokeWidth, saved.stroke_width);
        scene.set_num(item.node, Attr::FillOpacity, saved.fill_opacity);
    }
    scene.hide_popup();
}

/// Fallback popup markup: the datum's display name in a hoverinfo box.
pub fn default_popup_content(datum: &Value, record: Option<&RegionRecord>) -> String {
    let name = datum
        .get("properties")
        .and_then(|properties| properties.get("name"))
        .and_then(Value::as_str)
        .or_else(|| datum.get("name").and_then(Value::as_str))
        .or_else(|| record.and_then(|r| r.extra.get("name")).and_then(Value::as_str))
        .unwrap_or("");
    format!("<div class=\"hoverinfo\"><strong>{name}</strong></div>")
}

fn snapshot<S: SceneGraph>(scene: &S, node: NodeId) -> SavedStyle {
    SavedStyle {
        fill: str_attr_or(scene, node, Attr::Fill, "#000"),
        stroke: str_attr_or(scene, node, Attr::Stroke, "none"),
        stroke_width: num_attr_or(scene, node, Attr::StrokeWidth, 1.0),
        fill_opacity: num_attr_or(scene, node, Attr::FillOpacity, 1.0),
    }
}

fn str_attr_or<S: SceneGraph>(scene: &S, node: NodeId, attr: Attr, fallback: &str) -> String {
    match scene.attr(node, attr) {
        Some(AttrValue::Str(value)) => value,
        _ => fallback.to_string(),
    }
}

fn num_attr_or<S: SceneGraph>(scene: &S, node: NodeId, attr: Attr, fallback: f64) -> f64 {
    match scene.attr(node, attr) {
        Some(AttrValue::Num(value)) => value,
        _ => fallback,
    }
}
