//! Arc layer: connections drawn on with a stroke-dash sweep.
//!
//! Geometry first, then measurement, then animation: the path is attached
//! and styled, its length measured through the scene, and only then is the
//! dash offset swept from full length to zero. At no point is the bare
//! path visible undashed.

use serde_json::Value;
use tracing::debug;

use thema_shared::{ArcMark, ArcStyle, GeoPoint};

use crate::errors::MapError;
use crate::options::ArcsConfig;
use crate::projection::Projector;
use crate::reconcile::ItemOps;
use crate::scene::{Attr, AttrValue, GroupId, NodeId, NodeKind, SceneGraph};
use crate::transitions::{Effect, TransitionScheduler};

const SWEEP_DELAY_MS: f64 = 100.0;
const FADE_DURATION_MS: f64 = 250.0;
const GREAT_ARC_SAMPLES: u32 = 32;

pub struct ArcOps<'a, S: SceneGraph> {
    pub scene: &'a mut S,
    pub scheduler: &'a mut TransitionScheduler,
    pub projector: &'a dyn Projector,
    pub config: ArcsConfig,
    pub layer_name: String,
    pub group: GroupId,
    pub now: f64,
}

impl<S: SceneGraph> ArcOps<'_, S> {
    fn path(&self, arc: &ArcMark, style: &ArcStyle) -> String {
        if style.great_arc.unwrap_or(self.config.great_arc) {
            return self.great_arc_path(arc);
        }
        let (ox, oy) = self.projector.project(arc.origin.longitude, arc.origin.latitude);
        let (dx, dy) = self.projector.project(arc.destination.longitude, arc.destination.latitude);
        let (mx, my) = ((ox + dx) / 2.0, (oy + dy) / 2.0);
        let sharpness = self.config.arc_sharpness;
        format!(
            "M{ox},{oy}S{},{},{dx},{dy}",
            mx + 50.0 * sharpness,
            my - 75.0 * sharpness,
        )
    }

    /// Sample the great circle between the endpoints and project each
    /// sample. Antipodal or coincident endpoints blend linearly.
    fn great_arc_path(&self, arc: &ArcMark) -> String {
        let from = unit_vector(arc.origin);
        let to = unit_vector(arc.destination);
        let angle = (dot(from, to)).clamp(-1.0, 1.0).acos();
        let sin_angle = angle.sin();

        let mut d = String::new();
        for i in 0..=GREAT_ARC_SAMPLES {
            let t = f64::from(i) / f64::from(GREAT_ARC_SAMPLES);
            let point = if sin_angle.abs() < 1e-9 {
                lerp3(from, to, t)
            } else {
                let a = (((1.0 - t) * angle).sin()) / sin_angle;
                let b = ((t * angle).sin()) / sin_angle;
                (
                    a * from.0 + b * to.0,
                    a * from.1 + b * to.1,
                    a * from.2 + b * to.2,
                )
            };
            let (lon, lat) = to_lon_lat(point);
            let (x, y) = self.projector.project(lon, lat);
            if i == 0 {
                d.push_str(&format!("M{x},{y}"));
            } else {
                d.push_str(&format!(" L{x},{y}"));
            }
        }
        d
    }

    fn apply_style(&mut self, node: NodeId, style: &ArcStyle) {
        let stroke = style
            .stroke_color
            .clone()
            .unwrap_or_else(|| self.config.stroke_color.clone());
        self.scene.set_str(node, Attr::Stroke, &stroke);
        self.scene
            .set_num(node, Attr::StrokeWidth, style.stroke_width.unwrap_or(self.config.stroke_width));
        self.scene.set_str(node, Attr::Fill, "none");
        self.scene.set_str(node, Attr::StrokeLinecap, "round");
    }
}

impl<S: SceneGraph> ItemOps for ArcOps<'_, S> {
    fn enter(&mut self, key: &str, datum: &Value) -> Result<Option<NodeId>, MapError> {
        let Ok(arc) = serde_json::from_value::<ArcMark>(datum.clone()) else {
            debug!(key, "arc datum failed to parse, skipped");
            return Ok(None);
        };
        let style = arc.options.clone().unwrap_or_default();

        let node = self.scene.create_node(self.group, NodeKind::Path);
        let d = self.path(&arc, &style);
        self.scene.set_str(node, Attr::D, &d);
        self.apply_style(node, &style);

        let length = self.scene.path_length(node);
        self.scene.set_str(node, Attr::StrokeDasharray, &format!("{length} {length}"));
        self.scene.set_num(node, Attr::StrokeDashoffset, length);
        self.scheduler.schedule(
            node,
            Attr::StrokeDashoffset,
            AttrValue::Num(0.0),
            self.now + SWEEP_DELAY_MS,
            self.config.animation_speed,
            None,
        );
        Ok(Some(node))
    }

    fn update(&mut self, node: NodeId, datum: &Value) {
        let Ok(arc) = serde_json::from_value::<ArcMark>(datum.clone()) else {
            return;
        };
        let style = arc.options.clone().unwrap_or_default();
        let d = self.path(&arc, &style);
        self.scene.set_str(node, Attr::D, &d);
        self.apply_style(node, &style);

        // Re-keyed geometry shows fully drawn; only fresh arcs sweep on.
        let length = self.scene.path_length(node);
        self.scheduler.cancel(node, Attr::StrokeDashoffset);
        self.scene.set_str(node, Attr::StrokeDasharray, &format!("{length} {length}"));
        self.scene.set_num(node, Attr::StrokeDashoffset, 0.0);
    }

    fn exit(&mut self, node: NodeId, _key: &str) -> bool {
        self.scene.set_num(node, Attr::Opacity, 1.0);
        self.scheduler.schedule(
            node,
            Attr::Opacity,
            AttrValue::Num(0.0),
            self.now,
            FADE_DURATION_MS,
            Some(Effect::RemoveItem { layer: self.layer_name.clone(), node }),
        );
        true
    }
}

fn unit_vector(point: GeoPoint) -> (f64, f64, f64) {
    let lat = point.latitude.to_radians();
    let lon = point.longitude.to_radians();
    (lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

fn dot(a: (f64, f64, f64), b: (f64, f64, f64)) -> f64 {
    a.0 * b.0 + a.1 * b.1 + a.2 * b.2
}

fn lerp3(a: (f64, f64, f64), b: (f64, f64, f64), t: f64) -> (f64, f64, f64) {
    (
        a.0 + (b.0 - a.0) * t,
        a.1 + (b.1 - a.1) * t,
        a.2 + (b.2 - a.2) * t,
    )
}

fn to_lon_lat(v: (f64, f64, f64)) -> (f64, f64) {
    let length = (v.0 * v.0 + v.1 * v.1 + v.2 * v.2).sqrt();
    if length < 1e-12 {
        return (0.0, 0.0);
    }
    let lat = (v.2 / length).asin();
    let lon = v.1.atan2(v.0);
    (lon.to_degrees(), lat.to_degrees())
}
