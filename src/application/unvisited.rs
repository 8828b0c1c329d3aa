//! Deferred branches of fan-out answers.
//!
//! When one answer leads to several questions, only the first becomes live;
//! the rest wait here, bucketed by the id of the node whose answer produced them.
//! Buckets are served oldest first, each in FIFO order.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::application::registry::NodeId;
use crate::domain::NodeIndex;

#[derive(Debug, Clone)]
struct Pending {
    node: NodeIndex,
    /// Id the node received when it was promoted to live
    promoted_as: Option<NodeId>,
}

/// Per-session queue of questions still to be asked.
///
/// Promoted entries are kept (marked with the id they went live as) so that
/// invalidating that id puts them back in line at their original position.
#[derive(Debug, Default)]
pub struct UnvisitedQueue {
    buckets: BTreeMap<NodeId, Vec<Pending>>,
}

impl UnvisitedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "trace", skip(self))]
    pub fn enqueue(&mut self, parent: NodeId, node: NodeIndex) {
        self.buckets.entry(parent).or_default().push(Pending {
            node,
            promoted_as: None,
        });
        debug!("queued node under {}", parent);
    }

    /// Take the next pending node, recording the id it will be promoted as.
    #[instrument(level = "trace", skip(self))]
    pub fn dequeue_next(&mut self, promoted_as: NodeId) -> Option<NodeIndex> {
        let pending = self
            .buckets
            .values_mut()
            .flat_map(|bucket| bucket.iter_mut())
            .find(|p| p.promoted_as.is_none())?;
        pending.promoted_as = Some(promoted_as);
        debug!("promoting queued node as {}", promoted_as);
        Some(pending.node)
    }

    /// Drop every bucket keyed at or after `node_id`; entries promoted after
    /// `node_id` become pending again.
    #[instrument(level = "debug", skip(self))]
    pub fn clear_from(&mut self, node_id: NodeId) {
        let dropped = self.buckets.split_off(&node_id);
        if !dropped.is_empty() {
            debug!("dropped {} queue bucket(s) from {}", dropped.len(), node_id);
        }
        for pending in self.buckets.values_mut().flat_map(|b| b.iter_mut()) {
            if matches!(pending.promoted_as, Some(id) if id > node_id) {
                pending.promoted_as = None;
            }
        }
    }

    /// True when no node is waiting to be promoted.
    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }

    pub fn pending_count(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|b| b.iter())
            .filter(|p| p.promoted_as.is_none())
            .count()
    }
}
