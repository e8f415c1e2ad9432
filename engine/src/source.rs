//! Remote document retrieval and dataset parsing.

use std::collections::HashMap;

use serde_json::Value;

use thema_shared::{RegionRecord, RegionUpdate};

use crate::errors::MapError;
use crate::options::DataFormat;

/// Synchronous retrieval of topology and dataset documents. The engine
/// stays transport-agnostic; hosts plug in whatever client they run.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<String, MapError>;
}

/// Blocking HTTP fetcher (feature `remote`).
#[cfg(feature = "remote")]
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl HttpFetcher {
    pub fn new() -> Self {
        HttpFetcher { client: reqwest::blocking::Client::new() }
    }
}

#[cfg(feature = "remote")]
impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "remote")]
impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, MapError> {
        let wrap = |source: reqwest::Error| MapError::Fetch {
            url: url.to_string(),
            source: Box::new(source),
        };
        let response = self.client.get(url).send().map_err(wrap)?;
        let response = response.error_for_status().map_err(wrap)?;
        response.text().map_err(wrap)
    }
}

pub fn parse_topology(raw: &str) -> Result<Value, MapError> {
    serde_json::from_str(raw).map_err(|err| MapError::Topology { detail: err.to_string() })
}

/// Parse a fetched dataset document into a keyed choropleth update.
pub fn parse_dataset(raw: &str, format: DataFormat) -> Result<HashMap<String, RegionUpdate>, MapError> {
    match format {
        DataFormat::Json => serde_json::from_str(raw)
            .map_err(|err| MapError::DatasetParse { detail: err.to_string() }),
        DataFormat::Csv => csv_dataset(raw),
    }
}

/// Index delimited rows on their `id` column. A `fillKey` column feeds the
/// palette lookup; every other column (id included) lands in the record's
/// extra fields as a string.
fn csv_dataset(raw: &str) -> Result<HashMap<String, RegionUpdate>, MapError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| MapError::DatasetParse { detail: err.to_string() })?
        .clone();
    let id_column = headers
        .iter()
        .position(|header| header == "id")
        .ok_or_else(|| MapError::DatasetParse { detail: "csv dataset needs an id column".to_string() })?;

    let mut update = HashMap::new();
    for row in reader.records() {
        let row = row.map_err(|err| MapError::DatasetParse { detail: err.to_string() })?;
        let Some(id) = row.get(id_column) else { continue };
        if id.is_empty() {
            continue;
        }
        let mut record = RegionRecord::default();
        for (column, value) in headers.iter().zip(row.iter()) {
            if column == "fillKey" {
                record.fill_key = Some(value.to_string());
            } else {
                record.extra.insert(column.to_string(), Value::String(value.to_string()));
            }
        }
        update.insert(id.to_string(), RegionUpdate::Record(record));
    }
    Ok(update)
}
