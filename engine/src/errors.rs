use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("no projector configured")]
    MissingProjector,

    #[error("no topology decoder configured")]
    MissingDecoder,

    #[error("remote source {url:?} requires a fetcher, none configured")]
    MissingFetcher { url: String },

    #[error("no topology supplied for scope {scope:?}")]
    MissingTopology { scope: String },

    #[error("no handler registered for layer {name:?}")]
    UnknownLayer { name: String },

    #[error("{layer} layer expects an array of data")]
    InvalidLayerData { layer: String },

    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("topology object {object:?} not found")]
    UnknownTopologyObject { object: String },

    #[error("invalid topology document: {detail}")]
    Topology { detail: String },

    #[error("invalid dataset: {detail}")]
    DatasetParse { detail: String },
}
