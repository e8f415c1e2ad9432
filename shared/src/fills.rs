use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Palette mapping fill keys to colors. `default_fill` covers every datum
/// whose key is absent or unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fills {
    #[serde(rename = "defaultFill", default = "default_fill")]
    pub default_fill: String,
    #[serde(flatten)]
    pub keys: HashMap<String, String>,
}

fn default_fill() -> String {
    "#ABDDA4".to_string()
}

impl Default for Fills {
    fn default() -> Self {
        Fills {
            default_fill: default_fill(),
            keys: HashMap::new(),
        }
    }
}

impl Fills {
    pub fn resolve(&self, fill_key: Option<&str>) -> &str {
        fill_key
            .and_then(|key| self.keys.get(key))
            .map(String::as_str)
            .unwrap_or(&self.default_fill)
    }
}
