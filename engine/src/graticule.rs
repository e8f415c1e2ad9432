//! Graticule layer: meridian/parallel grid as a single path.

use serde_json::Value;

use crate::errors::MapError;
use crate::options::GraticuleConfig;
use crate::projection::Projector;
use crate::reconcile::ItemOps;
use crate::scene::{Attr, GroupId, NodeId, NodeKind, SceneGraph};

/// Key of the one item a graticule layer holds.
pub const GRATICULE_KEY: &str = "graticule";

/// Sampling interval along each grid line, in degrees. Fine enough that
/// curved projections stay smooth.
const SAMPLE_STEP_DEG: f64 = 2.5;

/// Full-globe grid at `step` degree spacing. Empty for a non-positive step.
pub fn graticule_path(projector: &dyn Projector, step: f64) -> String {
    if !(step > 0.0) {
        return String::new();
    }
    let mut d = String::new();

    let meridians = (360.0 / step).floor() as u32;
    for i in 0..=meridians {
        let lon = -180.0 + step * f64::from(i);
        append_line(&mut d, projector, |t| (lon, -90.0 + 180.0 * t));
    }

    let parallels = (180.0 / step).floor() as u32;
    for i in 0..=parallels {
        let lat = -90.0 + step * f64::from(i);
        append_line(&mut d, projector, |t| (-180.0 + 360.0 * t, lat));
    }
    d
}

fn append_line(d: &mut String, projector: &dyn Projector, point_at: impl Fn(f64) -> (f64, f64)) {
    let samples = (180.0 / SAMPLE_STEP_DEG) as u32;
    for i in 0..=samples {
        let t = f64::from(i) / f64::from(samples);
        let (lon, lat) = point_at(t);
        let (x, y) = projector.project(lon, lat);
        if i == 0 {
            d.push_str(&format!("M{x},{y}"));
        } else {
            d.push_str(&format!(" L{x},{y}"));
        }
    }
}

pub struct GraticuleOps<'a, S: SceneGraph> {
    pub scene: &'a mut S,
    pub projector: &'a dyn Projector,
    pub config: GraticuleConfig,
    pub group: GroupId,
}

impl<S: SceneGraph> GraticuleOps<'_, S> {
    fn render(&mut self, node: NodeId) {
        let d = graticule_path(self.projector, self.config.step);
        self.scene.set_str(node, Attr::D, &d);
        self.scene.set_str(node, Attr::Fill, "none");
        self.scene.set_str(node, Attr::Stroke, &self.config.stroke_color);
        self.scene.set_num(node, Attr::StrokeWidth, self.config.stroke_width);
        self.scene.set_num(node, Attr::StrokeOpacity, self.config.stroke_opacity);
    }
}

impl<S: SceneGraph> ItemOps for GraticuleOps<'_, S> {
    fn enter(&mut self, _key: &str, _datum: &Value) -> Result<Option<NodeId>, MapError> {
        let node = self.scene.create_node(self.group, NodeKind::Path);
        self.render(node);
        Ok(Some(node))
    }

    fn update(&mut self, node: NodeId, _datum: &Value) {
        self.render(node);
    }

    fn exit(&mut self, node: NodeId, _key: &str) -> bool {
        self.scene.remove_node(node);
        false
    }
}
