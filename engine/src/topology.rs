//! Topology documents to drawable features.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use thema_shared::Feature;

use crate::errors::MapError;

pub trait TopologyDecoder {
    /// Decode `raw` into the ordered feature list for `object`.
    fn decode(&self, raw: &Value, object: &str) -> Result<Vec<Feature>, MapError>;
}

/// Decoder for documents whose geometries are already expanded: either
/// `{"objects": {<name>: {"features": [...]}}}` or a bare feature
/// collection. Shared-arc topologies need a host-supplied decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureCollectionDecoder;

impl TopologyDecoder for FeatureCollectionDecoder {
    fn decode(&self, raw: &Value, object: &str) -> Result<Vec<Feature>, MapError> {
        let collection = match raw.get("objects") {
            Some(objects) => objects.get(object).ok_or_else(|| MapError::UnknownTopologyObject {
                object: object.to_string(),
            })?,
            None => raw,
        };
        let members = collection
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| MapError::Topology {
                detail: format!("object {object:?} has no feature array"),
            })?;

        let mut features = Vec::with_capacity(members.len());
        for member in members {
            match serde_json::from_value::<Feature>(member.clone()) {
                Ok(feature) => features.push(feature),
                Err(err) => warn!(%err, "skipping undecodable feature"),
            }
        }
        Ok(features)
    }
}

/// Decoded features in draw order, with an id index on the side. Duplicate
/// ids keep the first occurrence.
#[derive(Debug, Default)]
pub struct FeatureSet {
    list: Vec<Feature>,
    index: HashMap<String, usize>,
}

impl FeatureSet {
    pub fn new(features: Vec<Feature>) -> Self {
        let mut index = HashMap::with_capacity(features.len());
        for (position, feature) in features.iter().enumerate() {
            if index.contains_key(&feature.id) {
                debug!(id = %feature.id, "duplicate feature id, keeping the first");
                continue;
            }
            index.insert(feature.id.clone(), position);
        }
        FeatureSet { list: features, index }
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.index.get(id).map(|&position| &self.list[position])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
