//! Region color state.
//!
//! The authoritative region-id to record store behind choropleth updates.
//! Structured entries merge into retained records; bare color strings
//! recolor without touching them. Records are kept even for ids the
//! current topology has no drawable for, so data can arrive before (or
//! outlive) the geography that displays it.

use std::collections::HashMap;

use thema_shared::{Fills, RegionRecord, RegionUpdate};

/// A fill change to animate onto a drawn region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recolor {
    pub region: String,
    pub color: String,
}

#[derive(Debug, Default)]
pub struct ChoroplethState {
    records: HashMap<String, RegionRecord>,
}

impl ChoroplethState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, region: &str) -> Option<&RegionRecord> {
        self.records.get(region)
    }

    /// Draw-time fill for a region: palette lookup through the record's
    /// fill key, default fill when there is no record or no match.
    pub fn base_color<'a>(&'a self, region: &str, fills: &'a Fills) -> &'a str {
        let fill_key = self.records.get(region).and_then(|record| record.fill_key.as_deref());
        fills.resolve(fill_key)
    }

    /// Apply one keyed update and report the resulting fill per region,
    /// sorted by region id. Update-time resolution reads the incoming
    /// entry: an explicit color wins, then its fill key through the
    /// palette, then the default fill.
    pub fn apply_update(
        &mut self,
        update: &HashMap<String, RegionUpdate>,
        fills: &Fills,
    ) -> Vec<Recolor> {
        let mut recolors = Vec::with_capacity(update.len());
        for (region, entry) in update {
            let color = match entry {
                RegionUpdate::Color(color) => color.clone(),
                RegionUpdate::Record(incoming) => {
                    let color = match &incoming.color {
                        Some(explicit) => explicit.clone(),
                        None => fills.resolve(incoming.fill_key.as_deref()).to_string(),
                    };
                    self.records
                        .entry(region.clone())
                        .or_default()
                        .merge_from(incoming);
                    color
                }
            };
            recolors.push(Recolor { region: region.clone(), color });
        }
        recolors.sort_by(|a, b| a.region.cmp(&b.region));
        recolors
    }
}
