pub mod arcs;
pub mod bubbles;
pub mod choropleth;
pub mod errors;
pub mod geography;
pub mod graticule;
pub mod headless;
pub mod interact;
pub mod labels;
pub mod layers;
pub mod map;
pub mod options;
pub mod projection;
pub mod reconcile;
pub mod scene;
pub mod source;
pub mod topology;
pub mod transitions;

pub use errors::MapError;
pub use headless::HeadlessScene;
pub use interact::HoverConfig;
pub use layers::{Layer, LayerKind};
pub use map::{Map, MapBuilder, PopupTemplate};
pub use map::{ARCS_LAYER, BUBBLES_LAYER, GEOGRAPHY_LAYER, GRATICULE_LAYER, LABELS_LAYER};
pub use options::{
    ArcsConfig, ArcsOverrides, BubblesConfig, BubblesOverrides, DataFormat, GeographyConfig,
    GraticuleConfig, GraticuleOverrides, LabelsConfig, LabelsOverrides, MapOptions,
};
pub use projection::{Equirectangular, Projector};
pub use reconcile::{ItemOps, ReconcileOutcome};
pub use scene::{Attr, AttrValue, GroupId, NodeId, NodeKind, SceneGraph};
pub use source::Fetcher;
pub use topology::{FeatureCollectionDecoder, FeatureSet, TopologyDecoder};
pub use transitions::{Effect, TransitionScheduler};

#[cfg(feature = "remote")]
pub use source::HttpFetcher;
