use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded geographic region. Produced by a topology decoder once per
/// draw cycle; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
    pub geometry: Geometry,
}

/// GeoJSON-shaped geometry. Coordinates are `[longitude, latitude]` pairs;
/// the first ring of each polygon is the outer boundary, the rest are holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

impl Geometry {
    /// Every ring in the geometry, outer boundaries and holes alike.
    pub fn rings(&self) -> Vec<&[[f64; 2]]> {
        match self {
            Geometry::Polygon { coordinates } => coordinates.iter().map(Vec::as_slice).collect(),
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .flat_map(|polygon| polygon.iter().map(Vec::as_slice))
                .collect(),
        }
    }

    /// Outer boundary of the first (for multipolygons, largest-by-vertex-count)
    /// polygon. Used as the anchor ring for centroid estimates.
    pub fn outer_ring(&self) -> Option<&[[f64; 2]]> {
        match self {
            Geometry::Polygon { coordinates } => coordinates.first().map(Vec::as_slice),
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .filter_map(|polygon| polygon.first())
                .max_by_key(|ring| ring.len())
                .map(Vec::as_slice),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Feature, Geometry};

    #[test]
    fn deserializes_tagged_polygon_geometry() {
        let raw = r#"{
            "id": "USA",
            "properties": {"name": "United States"},
            "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]}
        }"#;

        let feature: Feature = serde_json::from_str(raw).unwrap();
        assert_eq!(feature.id, "USA");
        assert_eq!(feature.properties["name"], "United States");
        match &feature.geometry {
            Geometry::Polygon { coordinates } => assert_eq!(coordinates[0].len(), 3),
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn rings_flattens_multipolygons() {
        let geometry = Geometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0]]],
                vec![
                    vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 6.0]],
                    vec![[5.2, 5.2], [5.8, 5.2], [5.8, 5.8]],
                ],
            ],
        };

        let rings = geometry.rings();
        assert_eq!(rings.len(), 3);
        assert_eq!(rings[0].len(), 3);
        assert_eq!(rings[2].len(), 3);
    }

    #[test]
    fn outer_ring_picks_largest_multipolygon_boundary() {
        let geometry = Geometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]],
                vec![vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 6.0]]],
            ],
        };

        let outer = geometry.outer_ring().unwrap();
        assert_eq!(outer.len(), 4);
        assert_eq!(outer[0], [5.0, 5.0]);
    }

    #[test]
    fn properties_default_to_empty() {
        let raw = r#"{
            "id": "CAN",
            "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]]}
        }"#;

        let feature: Feature = serde_json::from_str(raw).unwrap();
        assert!(feature.properties.is_empty());
    }
}
