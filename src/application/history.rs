//! Per-session trail of collected programmes.

use std::collections::BTreeMap;

use tracing::{debug, error, instrument};

use crate::application::registry::NodeId;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DecisionTree, NodeIndex, Programme};

/// Leaves collected by answering each node, keyed by that node's id.
///
/// Ids are handed out in increasing order and later keys are cancelled before
/// an earlier one is re-answered, so key order equals insertion order.
#[derive(Debug, Default)]
pub struct HistoryTracker {
    entries: BTreeMap<NodeId, Vec<NodeIndex>>,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "trace", skip(self))]
    pub fn add_entry(&mut self, node_id: NodeId, leaf: NodeIndex) {
        self.entries.entry(node_id).or_default().push(leaf);
    }

    /// All collected leaves, in the order they were added.
    pub fn leaves(&self) -> Vec<NodeIndex> {
        self.entries.values().flatten().copied().collect()
    }

    /// Collected programmes, resolved against the tree.
    ///
    /// A recorded index that is not a leaf of `tree` fails with `NodeNotFound`
    /// for the node whose answer recorded it.
    pub fn results(&self, tree: &DecisionTree) -> ApplicationResult<Vec<Programme>> {
        self.entries
            .iter()
            .flat_map(|(node_id, leaves)| leaves.iter().map(move |idx| (*node_id, *idx)))
            .map(|(node_id, idx)| {
                tree.node(idx)
                    .and_then(|n| n.programme())
                    .cloned()
                    .ok_or_else(|| {
                        error!("history entry of {} is not a leaf of the tree", node_id);
                        ApplicationError::NodeNotFound(node_id)
                    })
            })
            .collect()
    }

    /// Drop every entry keyed at or after `node_id`.
    #[instrument(level = "debug", skip(self))]
    pub fn cancel_after(&mut self, node_id: NodeId) {
        let dropped = self.entries.split_off(&node_id);
        if !dropped.is_empty() {
            debug!("cancelled {} history entries", dropped.len());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
