//! Geographic coordinates to scene coordinates.

use thema_shared::Feature;

pub trait Projector {
    /// Project a lon/lat pair into scene space.
    fn project(&self, lon: f64, lat: f64) -> (f64, f64);

    /// Path string for a feature's rings, in the M/L/Z vocabulary.
    fn path_for(&self, feature: &Feature) -> String;

    /// Representative point of a feature in scene space. Anchors centered
    /// bubbles and labels.
    fn centroid_of(&self, feature: &Feature) -> (f64, f64);
}

/// Linear lon/lat grid. Good enough for previews and state-only hosts;
/// anything cartographically serious comes in through the [`Projector`] seam.
#[derive(Debug, Clone, Copy)]
pub struct Equirectangular {
    width: f64,
    height: f64,
}

impl Equirectangular {
    pub fn new(width: f64, height: f64) -> Self {
        Equirectangular { width, height }
    }
}

impl Projector for Equirectangular {
    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = (lon + 180.0) / 360.0 * self.width;
        let y = (90.0 - lat) / 180.0 * self.height;
        (x, y)
    }

    fn path_for(&self, feature: &Feature) -> String {
        let mut d = String::new();
        for ring in feature.geometry.rings() {
            let mut first = true;
            for &[lon, lat] in ring {
                let (x, y) = self.project(lon, lat);
                if first {
                    d.push_str(&format!("M{x},{y}"));
                    first = false;
                } else {
                    d.push_str(&format!(" L{x},{y}"));
                }
            }
            if !first {
                d.push_str(" Z");
            }
        }
        d
    }

    fn centroid_of(&self, feature: &Feature) -> (f64, f64) {
        let Some(ring) = feature.geometry.outer_ring() else {
            return (0.0, 0.0);
        };
        let projected: Vec<(f64, f64)> = ring
            .iter()
            .map(|&[lon, lat]| self.project(lon, lat))
            .collect();
        if projected.is_empty() {
            return (0.0, 0.0);
        }

        let mut doubled_area = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..projected.len() {
            let (x0, y0) = projected[i];
            let (x1, y1) = projected[(i + 1) % projected.len()];
            let cross = x0 * y1 - x1 * y0;
            doubled_area += cross;
            cx += (x0 + x1) * cross;
            cy += (y0 + y1) * cross;
        }

        if doubled_area.abs() < 1e-9 {
            // Degenerate ring, average the vertices instead.
            let n = projected.len() as f64;
            let (sx, sy) = projected
                .iter()
                .fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
            return (sx / n, sy / n);
        }
        (cx / (3.0 * doubled_area), cy / (3.0 * doubled_area))
    }
}
