//! Node registry: per-session ids for visited questions and answer tokens.
//!
//! Clients only ever see opaque tokens. The registry translates a token back to
//! the session-local node id and the answer label it was issued for.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DecisionTree, NodeIndex};

/// Session-local id of a visited question. Ids start at 1 and grow strictly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A token issued to the client and the answer it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerChoice {
    pub token: String,
    pub label: String,
}

/// The live question as presented to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentQuestion {
    pub question: String,
    /// token -> label, in the order the answers were issued
    pub answers: Vec<AnswerChoice>,
}

impl CurrentQuestion {
    pub fn token_for(&self, label: &str) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.token.as_str())
    }

    pub fn label_for(&self, token: &str) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.token == token)
            .map(|a| a.label.as_str())
    }

    pub fn labels(&self) -> Vec<&str> {
        self.answers.iter().map(|a| a.label.as_str()).collect()
    }
}

#[derive(Debug)]
struct RegisteredNode {
    node: NodeIndex,
    answers: Vec<AnswerChoice>,
}

#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<NodeId, RegisteredNode>,
    tokens: HashMap<String, NodeId>,
    counter: u32,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "trace", skip(self))]
    pub fn add_node(&mut self, node: NodeIndex) -> NodeId {
        self.counter += 1;
        let id = NodeId(self.counter);
        self.nodes.insert(
            id,
            RegisteredNode {
                node,
                answers: Vec::new(),
            },
        );
        trace!("registered node {}", id);
        id
    }

    /// Id the next `add_node` call will hand out.
    pub fn peek_next_id(&self) -> NodeId {
        NodeId(self.counter + 1)
    }

    /// Issue a fresh token for answering `node_id` with `label`.
    #[instrument(level = "trace", skip(self))]
    pub fn add_answer_option(&mut self, node_id: NodeId, label: &str) -> ApplicationResult<String> {
        let entry = self
            .nodes
            .get_mut(&node_id)
            .ok_or(ApplicationError::NodeNotFound(node_id))?;
        let token = Uuid::new_v4().to_string();
        entry.answers.push(AnswerChoice {
            token: token.clone(),
            label: label.to_string(),
        });
        self.tokens.insert(token.clone(), node_id);
        Ok(token)
    }

    pub fn resolve_token(&self, token: &str) -> ApplicationResult<NodeId> {
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| ApplicationError::TokenNotFound(token.to_string()))
    }

    pub fn answer_label_for_token(&self, token: &str) -> ApplicationResult<&str> {
        let node_id = self.resolve_token(token)?;
        self.nodes
            .get(&node_id)
            .and_then(|entry| entry.answers.iter().find(|a| a.token == token))
            .map(|a| a.label.as_str())
            .ok_or(ApplicationError::NodeNotFound(node_id))
    }

    pub fn node_by_id(&self, node_id: NodeId) -> ApplicationResult<NodeIndex> {
        self.nodes
            .get(&node_id)
            .map(|entry| entry.node)
            .ok_or(ApplicationError::NodeNotFound(node_id))
    }

    /// Highest live id: the question the client is expected to answer.
    pub fn current_node_id(&self) -> Option<NodeId> {
        self.nodes.keys().next_back().copied()
    }

    /// Format the live question with all tokens pointing at it.
    ///
    /// An empty registry reports `NodeNotFound(#0)`.
    pub fn current_node(&self, tree: &DecisionTree) -> ApplicationResult<CurrentQuestion> {
        let (id, entry) = self
            .nodes
            .iter()
            .next_back()
            .ok_or(ApplicationError::NodeNotFound(NodeId(0)))?;
        let question = tree
            .node(entry.node)
            .and_then(|node| node.text())
            .ok_or(ApplicationError::NodeNotFound(*id))?;
        Ok(CurrentQuestion {
            question: question.to_string(),
            answers: entry.answers.clone(),
        })
    }

    /// Drop every node and token with an id strictly greater than `node_id`
    /// and continue numbering right after it.
    #[instrument(level = "debug", skip(self))]
    pub fn invalidate_from(&mut self, node_id: NodeId) {
        let removed = self.nodes.split_off(&NodeId(node_id.0 + 1));
        self.tokens.retain(|_, id| *id <= node_id);
        self.counter = node_id.0;
        if !removed.is_empty() {
            debug!("invalidated {} node(s) after {}", removed.len(), node_id);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TreeBuilder;

    fn tree() -> (DecisionTree, NodeIndex, NodeIndex) {
        let mut b = TreeBuilder::new();
        let p1 = b.leaf("P1", "P1");
        let p2 = b.leaf("P2", "P2");
        let inner = b.binary("Inner?", p1, p2);
        let root = b.binary("Root?", inner, p2);
        (b.build(root).unwrap(), root, inner)
    }

    #[test]
    fn given_new_nodes_when_adding_then_ids_increase_from_one() {
        let (_, root, inner) = tree();
        let mut registry = NodeRegistry::new();
        assert_eq!(registry.add_node(root), NodeId::new(1));
        assert_eq!(registry.add_node(inner), NodeId::new(2));
        assert_eq!(registry.peek_next_id(), NodeId::new(3));
        assert_eq!(registry.current_node_id(), Some(NodeId::new(2)));
    }

    #[test]
    fn given_tokens_when_resolving_then_maps_to_node_and_label() {
        let (_, root, _) = tree();
        let mut registry = NodeRegistry::new();
        let id = registry.add_node(root);
        let yes = registry.add_answer_option(id, "yes").unwrap();
        let no = registry.add_answer_option(id, "no").unwrap();

        assert_ne!(yes, no);
        assert_eq!(registry.resolve_token(&yes).unwrap(), id);
        assert_eq!(registry.answer_label_for_token(&no).unwrap(), "no");
        assert!(matches!(
            registry.resolve_token("bogus"),
            Err(ApplicationError::TokenNotFound(_))
        ));
    }

    #[test]
    fn given_unknown_node_when_adding_option_then_fails() {
        let mut registry = NodeRegistry::new();
        assert!(matches!(
            registry.add_answer_option(NodeId::new(7), "yes"),
            Err(ApplicationError::NodeNotFound(_))
        ));
    }

    #[test]
    fn given_two_nodes_when_formatting_current_then_uses_highest_id() {
        let (tree, root, inner) = tree();
        let mut registry = NodeRegistry::new();
        let first = registry.add_node(root);
        registry.add_answer_option(first, "yes").unwrap();
        let second = registry.add_node(inner);
        let token = registry.add_answer_option(second, "no").unwrap();

        let current = registry.current_node(&tree).unwrap();
        assert_eq!(current.question, "Inner?");
        assert_eq!(current.labels(), vec!["no"]);
        assert_eq!(current.token_for("no"), Some(token.as_str()));
    }

    #[test]
    fn given_later_nodes_when_invalidating_then_drops_them_and_resets_counter() {
        let (_, root, inner) = tree();
        let mut registry = NodeRegistry::new();
        let first = registry.add_node(root);
        let kept = registry.add_answer_option(first, "yes").unwrap();
        let second = registry.add_node(inner);
        let dropped = registry.add_answer_option(second, "yes").unwrap();

        registry.invalidate_from(first);

        assert_eq!(registry.len(), 1);
        assert!(registry.resolve_token(&kept).is_ok());
        assert!(matches!(
            registry.resolve_token(&dropped),
            Err(ApplicationError::TokenNotFound(_))
        ));
        assert!(matches!(
            registry.node_by_id(second),
            Err(ApplicationError::NodeNotFound(_))
        ));
        assert_eq!(registry.add_node(inner), NodeId::new(2));
    }

    #[test]
    fn given_empty_registry_when_formatting_current_then_reports_missing_node() {
        let (tree, _, _) = tree();
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.current_node(&tree),
            Err(ApplicationError::NodeNotFound(_))
        ));
    }
}
