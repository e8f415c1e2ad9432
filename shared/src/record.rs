use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-region display data supplied by the host alongside a dataset.
///
/// Updates merge right-biased: fields present in the incoming record
/// overwrite, absent fields keep their previous values. Records are never
/// deleted; a region not mentioned again keeps its last known state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionRecord {
    #[serde(rename = "fillKey", default, skip_serializing_if = "Option::is_none")]
    pub fill_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RegionRecord {
    pub fn merge_from(&mut self, incoming: &RegionRecord) {
        if let Some(fill_key) = &incoming.fill_key {
            self.fill_key = Some(fill_key.clone());
        }
        if let Some(color) = &incoming.color {
            self.color = Some(color.clone());
        }
        for (key, value) in &incoming.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// One entry of a choropleth update: a bare color string, or a structured
/// record that merges into the region's retained state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionUpdate {
    Color(String),
    Record(RegionRecord),
}
