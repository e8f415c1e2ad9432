//! Map configuration.
//!
//! Defaults mirror the classic thematic-map option set, so a host feeding
//! the engine the same JSON options an existing integration used gets the
//! same behavior. Per-call layer overrides come as `*Overrides` twins whose
//! set fields win over the construction-time config.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use thema_shared::{Fills, RegionUpdate};

use crate::interact::HoverConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapOptions {
    /// Topology object to draw, e.g. `"world"`.
    pub scope: String,
    /// Projection name, advisory: the projector seam decides what it means.
    pub projection: String,
    pub responsive: bool,
    /// Initial choropleth data, applied at build time.
    pub data: HashMap<String, RegionUpdate>,
    /// Remote dataset merged in at the end of the first draw.
    pub data_url: Option<String>,
    pub data_type: DataFormat,
    pub fills: Fills,
    #[serde(rename = "geographyConfig")]
    pub geography: GeographyConfig,
    #[serde(rename = "bubblesConfig")]
    pub bubbles: BubblesConfig,
    #[serde(rename = "arcConfig")]
    pub arcs: ArcsConfig,
    #[serde(rename = "labelsConfig")]
    pub labels: LabelsConfig,
    #[serde(rename = "graticuleConfig")]
    pub graticule: GraticuleConfig,
}

impl Default for MapOptions {
    fn default() -> Self {
        MapOptions {
            scope: "world".to_string(),
            projection: "equirectangular".to_string(),
            responsive: false,
            data: HashMap::new(),
            data_url: None,
            data_type: DataFormat::Json,
            fills: Fills::default(),
            geography: GeographyConfig::default(),
            bubbles: BubblesConfig::default(),
            arcs: ArcsConfig::default(),
            labels: LabelsConfig::default(),
            graticule: GraticuleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeographyConfig {
    /// Inline topology document.
    #[serde(rename = "dataJson")]
    pub data: Option<Value>,
    /// Remote topology document, fetched at draw time.
    pub data_url: Option<String>,
    pub hide_antarctica: bool,
    pub border_width: f64,
    pub border_color: String,
    pub popup_on_hover: bool,
    pub highlight_on_hover: bool,
    pub highlight_fill_color: String,
    pub highlight_border_color: String,
    pub highlight_border_width: f64,
    pub highlight_fill_opacity: f64,
}

impl Default for GeographyConfig {
    fn default() -> Self {
        GeographyConfig {
            data: None,
            data_url: None,
            hide_antarctica: true,
            border_width: 1.0,
            border_color: "#FDFDFD".to_string(),
            popup_on_hover: true,
            highlight_on_hover: true,
            highlight_fill_color: "#FC8D59".to_string(),
            highlight_border_color: "rgba(250, 15, 160, 0.2)".to_string(),
            highlight_border_width: 2.0,
            highlight_fill_opacity: 1.0,
        }
    }
}

impl GeographyConfig {
    pub fn hover(&self) -> HoverConfig {
        HoverConfig {
            highlight_on_hover: self.highlight_on_hover,
            popup_on_hover: self.popup_on_hover,
            highlight_fill_color: self.highlight_fill_color.clone(),
            highlight_border_color: self.highlight_border_color.clone(),
            highlight_border_width: self.highlight_border_width,
            highlight_fill_opacity: self.highlight_fill_opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BubblesConfig {
    pub border_width: f64,
    pub border_color: String,
    pub popup_on_hover: bool,
    pub fill_opacity: f64,
    pub animate: bool,
    pub highlight_on_hover: bool,
    pub highlight_fill_color: String,
    pub highlight_border_color: String,
    pub highlight_border_width: f64,
    pub highlight_fill_opacity: f64,
    /// Milliseconds an exiting bubble waits before shrinking.
    pub exit_delay: f64,
}

impl Default for BubblesConfig {
    fn default() -> Self {
        BubblesConfig {
            border_width: 2.0,
            border_color: "#FFFFFF".to_string(),
            popup_on_hover: true,
            fill_opacity: 0.75,
            animate: true,
            highlight_on_hover: true,
            highlight_fill_color: "#FC8D59".to_string(),
            highlight_border_color: "rgba(250, 15, 160, 0.2)".to_string(),
            highlight_border_width: 2.0,
            highlight_fill_opacity: 0.85,
            exit_delay: 100.0,
        }
    }
}

impl BubblesConfig {
    pub fn hover(&self) -> HoverConfig {
        HoverConfig {
            highlight_on_hover: self.highlight_on_hover,
            popup_on_hover: self.popup_on_hover,
            highlight_fill_color: self.highlight_fill_color.clone(),
            highlight_border_color: self.highlight_border_color.clone(),
            highlight_border_width: self.highlight_border_width,
            highlight_fill_opacity: self.highlight_fill_opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArcsConfig {
    pub stroke_color: String,
    pub stroke_width: f64,
    /// Bend of the schematic S-curve; 0 is a straight line.
    pub arc_sharpness: f64,
    /// Draw-on duration in milliseconds.
    pub animation_speed: f64,
    /// Sample along the great circle instead of the schematic curve.
    pub great_arc: bool,
}

impl Default for ArcsConfig {
    fn default() -> Self {
        ArcsConfig {
            stroke_color: "#DD1C77".to_string(),
            stroke_width: 1.0,
            arc_sharpness: 1.0,
            animation_speed: 600.0,
            great_arc: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelsConfig {
    pub font_size: f64,
    pub font_family: String,
    pub label_color: String,
    /// Subtracted from the centroid x.
    pub x_offset: f64,
    /// Added to the centroid y.
    pub y_offset: f64,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        LabelsConfig {
            font_size: 10.0,
            font_family: "Verdana".to_string(),
            label_color: "#000".to_string(),
            x_offset: 7.5,
            y_offset: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraticuleConfig {
    /// Grid spacing in degrees.
    pub step: f64,
    pub stroke_color: String,
    pub stroke_width: f64,
    pub stroke_opacity: f64,
}

impl Default for GraticuleConfig {
    fn default() -> Self {
        GraticuleConfig {
            step: 10.0,
            stroke_color: "#777".to_string(),
            stroke_width: 0.5,
            stroke_opacity: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BubblesOverrides {
    pub border_width: Option<f64>,
    pub border_color: Option<String>,
    pub popup_on_hover: Option<bool>,
    pub fill_opacity: Option<f64>,
    pub animate: Option<bool>,
    pub highlight_on_hover: Option<bool>,
    pub highlight_fill_color: Option<String>,
    pub highlight_border_color: Option<String>,
    pub highlight_border_width: Option<f64>,
    pub highlight_fill_opacity: Option<f64>,
    pub exit_delay: Option<f64>,
}

impl BubblesOverrides {
    /// Set fields win; everything else falls back to `base`.
    pub fn merged(&self, base: &BubblesConfig) -> BubblesConfig {
        BubblesConfig {
            border_width: self.border_width.unwrap_or(base.border_width),
            border_color: self.border_color.clone().unwrap_or_else(|| base.border_color.clone()),
            popup_on_hover: self.popup_on_hover.unwrap_or(base.popup_on_hover),
            fill_opacity: self.fill_opacity.unwrap_or(base.fill_opacity),
            animate: self.animate.unwrap_or(base.animate),
            highlight_on_hover: self.highlight_on_hover.unwrap_or(base.highlight_on_hover),
            highlight_fill_color: self
                .highlight_fill_color
                .clone()
                .unwrap_or_else(|| base.highlight_fill_color.clone()),
            highlight_border_color: self
                .highlight_border_color
                .clone()
                .unwrap_or_else(|| base.highlight_border_color.clone()),
            highlight_border_width: self.highlight_border_width.unwrap_or(base.highlight_border_width),
            highlight_fill_opacity: self.highlight_fill_opacity.unwrap_or(base.highlight_fill_opacity),
            exit_delay: self.exit_delay.unwrap_or(base.exit_delay),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArcsOverrides {
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f64>,
    pub arc_sharpness: Option<f64>,
    pub animation_speed: Option<f64>,
    pub great_arc: Option<bool>,
}

impl ArcsOverrides {
    pub fn merged(&self, base: &ArcsConfig) -> ArcsConfig {
        ArcsConfig {
            stroke_color: self.stroke_color.clone().unwrap_or_else(|| base.stroke_color.clone()),
            stroke_width: self.stroke_width.unwrap_or(base.stroke_width),
            arc_sharpness: self.arc_sharpness.unwrap_or(base.arc_sharpness),
            animation_speed: self.animation_speed.unwrap_or(base.animation_speed),
            great_arc: self.great_arc.unwrap_or(base.great_arc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelsOverrides {
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub label_color: Option<String>,
    pub x_offset: Option<f64>,
    pub y_offset: Option<f64>,
}

impl LabelsOverrides {
    pub fn merged(&self, base: &LabelsConfig) -> LabelsConfig {
        LabelsConfig {
            font_size: self.font_size.unwrap_or(base.font_size),
            font_family: self.font_family.clone().unwrap_or_else(|| base.font_family.clone()),
            label_color: self.label_color.clone().unwrap_or_else(|| base.label_color.clone()),
            x_offset: self.x_offset.unwrap_or(base.x_offset),
            y_offset: self.y_offset.unwrap_or(base.y_offset),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraticuleOverrides {
    pub step: Option<f64>,
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f64>,
    pub stroke_opacity: Option<f64>,
}

impl GraticuleOverrides {
    pub fn merged(&self, base: &GraticuleConfig) -> GraticuleConfig {
        GraticuleConfig {
            step: self.step.unwrap_or(base.step),
            stroke_color: self.stroke_color.clone().unwrap_or_else(|| base.stroke_color.clone()),
            stroke_width: self.stroke_width.unwrap_or(base.stroke_width),
            stroke_opacity: self.stroke_opacity.unwrap_or(base.stroke_opacity),
        }
    }
}
