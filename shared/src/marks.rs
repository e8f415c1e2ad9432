use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A point mark sized by `radius`, anchored either at explicit coordinates
/// or at the centroid of a drawn region (`centered`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bubble {
    /// Stable identity across redraws. When absent, a structural hash of
    /// the whole datum is used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Region id whose centroid anchors the bubble when no coordinates
    /// are given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centered: Option<String>,
    pub radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_key: Option<String>,
    // Per-datum style overrides; layer config fills the gaps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A connection drawn between two geographic points, either as a stylized
/// curve or along the great circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcMark {
    /// Stable identity across redraws; structural hash fallback when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ArcStyle>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub great_arc: Option<bool>,
}
