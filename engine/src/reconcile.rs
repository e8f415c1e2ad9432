//! Keyed reconciliation of layer data against rendered items.
//!
//! One pass diffs the incoming keyed data against a layer's item index and
//! drives the layer's [`ItemOps`] for each difference: unmatched incoming
//! keys enter, matched keys update in place (the item and its primitive are
//! reused, never recreated), and existing keys absent from the input exit.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::errors::MapError;
use crate::layers::{Layer, RenderedItem};
use crate::scene::NodeId;

/// Keys partitioned by what happened to them in one pass. Enters and
/// updates are in input order, exits sorted by key.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub entered: Vec<String>,
    pub updated: Vec<String>,
    pub exited: Vec<String>,
}

/// Per-layer primitive operations driven by [`reconcile`].
pub trait ItemOps {
    /// Create the primitive for a datum at its pre-animation state.
    /// `None` skips the datum, for data whose position cannot be resolved.
    fn enter(&mut self, key: &str, datum: &Value) -> Result<Option<NodeId>, MapError>;

    /// Recompute an existing primitive's attributes from a new datum.
    fn update(&mut self, node: NodeId, datum: &Value);

    /// Begin removal. Return `true` when an exit transition now owns the
    /// item; it stays in the layer's exiting list until the transition's
    /// completion effect fires. `false` means the primitive is already gone.
    fn exit(&mut self, node: NodeId, key: &str) -> bool;
}

/// The first occurrence of a key wins; later duplicates in the same pass
/// are dropped. Enter and update mutate the index synchronously. An
/// exiting item leaves the index immediately (a re-entering key gets a
/// fresh item while the old one animates out) but is only finalized when
/// its exit transition completes.
pub fn reconcile(
    layer: &mut Layer,
    incoming: &[(String, Value)],
    ops: &mut dyn ItemOps,
) -> Result<ReconcileOutcome, MapError> {
    let mut outcome = ReconcileOutcome::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(incoming.len());

    for (key, datum) in incoming {
        if !seen.insert(key.as_str()) {
            debug!(layer = %layer.name, key = %key, "duplicate key, first match wins");
            continue;
        }
        if let Some(item) = layer.items.get_mut(key) {
            ops.update(item.node, datum);
            item.datum = datum.clone();
            outcome.updated.push(key.clone());
        } else if let Some(node) = ops.enter(key, datum)? {
            layer.items.insert(
                key.clone(),
                RenderedItem {
                    node,
                    key: key.clone(),
                    datum: datum.clone(),
                    saved_style: None,
                },
            );
            outcome.entered.push(key.clone());
        }
    }

    let mut leaving: Vec<String> = layer
        .items
        .keys()
        .filter(|key| !seen.contains(key.as_str()))
        .cloned()
        .collect();
    leaving.sort();

    for key in leaving {
        if let Some(item) = layer.items.remove(&key) {
            if ops.exit(item.node, &key) {
                layer.exiting.push(item);
            }
            outcome.exited.push(key);
        }
    }

    debug!(
        layer = %layer.name,
        entered = outcome.entered.len(),
        updated = outcome.updated.len(),
        exited = outcome.exited.len(),
        "layer reconciled"
    );
    Ok(outcome)
}
