//! Traversal engine: the per-session state machine.
//!
//! An answer token is resolved to the node it was issued for, everything
//! registered after that node is invalidated, and the chosen branches are
//! merged back: leaves go to the history, the first question becomes live,
//! further questions are queued. When neither a new question nor a queued one
//! is left, the collected programmes are the result.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::application::history::HistoryTracker;
use crate::application::registry::{CurrentQuestion, NodeId, NodeRegistry};
use crate::application::unvisited::UnvisitedQueue;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DecisionTree, NodeIndex, Programme, TreeNode};

pub const YES: &str = "yes";
pub const NO: &str = "no";
/// Meta-answer of binary questions: follow both branches.
pub const PROBABLY: &str = "probably";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalOptions {
    /// Offer `probably` next to `yes`/`no` on binary questions
    pub offer_probably: bool,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            offer_probably: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalState {
    AtNode(NodeId),
    Complete(Vec<Programme>),
}

#[derive(Debug)]
pub struct TraversalEngine {
    tree: Arc<DecisionTree>,
    options: TraversalOptions,
    registry: NodeRegistry,
    queue: UnvisitedQueue,
    history: HistoryTracker,
    state: TraversalState,
}

impl TraversalEngine {
    /// Start at the root. A tree whose root is a leaf has nothing to ask.
    #[instrument(level = "debug", skip(tree))]
    pub fn start(tree: Arc<DecisionTree>, options: TraversalOptions) -> ApplicationResult<Self> {
        if tree.root_node().is_leaf() {
            return Err(ApplicationError::InvalidTree(
                "root must be a question, not a leaf".to_string(),
            ));
        }
        let mut engine = Self {
            tree,
            options,
            registry: NodeRegistry::new(),
            queue: UnvisitedQueue::new(),
            history: HistoryTracker::new(),
            state: TraversalState::AtNode(NodeId::new(0)),
        };
        let root = engine.tree.root();
        let id = engine.promote(root)?;
        engine.state = TraversalState::AtNode(id);
        Ok(engine)
    }

    pub fn state(&self) -> &TraversalState {
        &self.state
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, TraversalState::Complete(_))
    }

    pub fn tree(&self) -> &Arc<DecisionTree> {
        &self.tree
    }

    pub fn current_node_id(&self) -> Option<NodeId> {
        match self.state {
            TraversalState::AtNode(id) => Some(id),
            TraversalState::Complete(_) => None,
        }
    }

    pub fn current_question(&self) -> ApplicationResult<CurrentQuestion> {
        if self.is_complete() {
            return Err(ApplicationError::TraversalComplete);
        }
        self.registry.current_node(&self.tree)
    }

    /// Programmes collected so far on the active path.
    pub fn collected(&self) -> ApplicationResult<Vec<Programme>> {
        self.history.results(&self.tree)
    }

    /// Number of questions waiting in the queue.
    pub fn pending_questions(&self) -> usize {
        self.queue.pending_count()
    }

    /// Apply an answer. Returns the programmes once the traversal is complete,
    /// `None` while questions remain.
    ///
    /// Tokens of earlier questions are accepted and roll the session back to
    /// that question. The answer is validated before any state changes.
    #[instrument(level = "debug", skip(self))]
    pub fn process_answer(&mut self, token: &str) -> ApplicationResult<Option<Vec<Programme>>> {
        if self.is_complete() {
            return Err(ApplicationError::TraversalComplete);
        }
        let node_id = self.registry.resolve_token(token)?;
        let label = self
            .registry
            .answer_label_for_token(token)
            .map_err(defect)?
            .to_string();
        let node = self.registry.node_by_id(node_id).map_err(defect)?;
        let next_nodes = self.next_nodes(node_id, node, &label)?;
        info!("answer '{}' at {} leads to {} branch(es)", label, node_id, next_nodes.len());

        self.history.cancel_after(node_id);
        self.queue.clear_from(node_id);
        self.registry.invalidate_from(node_id);

        let tree = Arc::clone(&self.tree);
        let mut live = None;
        for next in next_nodes {
            let is_leaf = tree
                .node(next)
                .ok_or(ApplicationError::NodeNotFound(node_id))
                .map_err(defect)?
                .is_leaf();
            if is_leaf {
                self.history.add_entry(node_id, next);
            } else if live.is_none() {
                live = Some(self.promote(next)?);
            } else {
                self.queue.enqueue(node_id, next);
            }
        }

        let live = match live {
            Some(id) => id,
            None => {
                let promoted_as = self.registry.peek_next_id();
                match self.queue.dequeue_next(promoted_as) {
                    Some(queued) => {
                        debug!("branch exhausted, continuing with queued question");
                        self.promote(queued)?
                    }
                    None => {
                        let results = self.history.results(&tree)?;
                        info!("traversal complete with {} programme(s)", results.len());
                        self.state = TraversalState::Complete(results.clone());
                        return Ok(Some(results));
                    }
                }
            }
        };
        self.state = TraversalState::AtNode(live);
        Ok(None)
    }

    fn next_nodes(
        &self,
        node_id: NodeId,
        node: NodeIndex,
        label: &str,
    ) -> ApplicationResult<Vec<NodeIndex>> {
        let invalid = |question: &str| ApplicationError::InvalidAnswer {
            question: question.to_string(),
            label: label.to_string(),
        };
        match self.tree.node(node) {
            Some(TreeNode::Binary { text, yes, no }) => match label {
                YES => Ok(vec![*yes]),
                NO => Ok(vec![*no]),
                PROBABLY if self.options.offer_probably => Ok(vec![*no, *yes]),
                _ => Err(invalid(text.as_str())),
            },
            Some(TreeNode::Options { text, options }) => options
                .iter()
                .find(|o| o.label == label)
                .map(|o| vec![o.branch])
                .ok_or_else(|| invalid(text.as_str())),
            Some(TreeNode::Leaf(_)) | None => Err(defect(ApplicationError::NodeNotFound(node_id))),
        }
    }

    /// Register a question as live and issue tokens for its answers.
    fn promote(&mut self, node: NodeIndex) -> ApplicationResult<NodeId> {
        let labels: Vec<String> = match self.tree.node(node) {
            Some(TreeNode::Binary { .. }) => {
                let mut labels = vec![YES.to_string(), NO.to_string()];
                if self.options.offer_probably {
                    labels.push(PROBABLY.to_string());
                }
                labels
            }
            Some(TreeNode::Options { options, .. }) => {
                options.iter().map(|o| o.label.clone()).collect()
            }
            Some(TreeNode::Leaf(_)) | None => {
                return Err(defect(ApplicationError::InvalidTree(
                    "only questions can become live".to_string(),
                )))
            }
        };
        let id = self.registry.add_node(node);
        for label in &labels {
            self.registry.add_answer_option(id, label)?;
        }
        debug!("question {} is live with {} answer(s)", id, labels.len());
        Ok(id)
    }
}

fn defect(err: ApplicationError) -> ApplicationError {
    error!("traversal state out of sync: {}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TreeBuilder;

    fn answer(engine: &mut TraversalEngine, label: &str) -> Option<Vec<String>> {
        let question = engine.current_question().unwrap();
        let token = question.token_for(label).unwrap().to_string();
        engine
            .process_answer(&token)
            .unwrap()
            .map(|r| r.into_iter().map(|p| p.code).collect())
    }

    /// root: yes -> A?, no -> B?; A?: yes P1, no P2; B?: yes P3, no P4
    fn two_level() -> Arc<DecisionTree> {
        let mut b = TreeBuilder::new();
        let p1 = b.leaf("P1", "P1");
        let p2 = b.leaf("P2", "P2");
        let p3 = b.leaf("P3", "P3");
        let p4 = b.leaf("P4", "P4");
        let a = b.binary("A?", p1, p2);
        let bq = b.binary("B?", p3, p4);
        let root = b.binary("Root?", a, bq);
        Arc::new(b.build(root).unwrap())
    }

    #[test]
    fn given_leaf_root_when_starting_then_rejects_tree() {
        let mut b = TreeBuilder::new();
        let leaf = b.leaf("Only", "ONLY");
        let tree = Arc::new(b.build(leaf).unwrap());
        assert!(matches!(
            TraversalEngine::start(tree, TraversalOptions::default()),
            Err(ApplicationError::InvalidTree(_))
        ));
    }

    #[test]
    fn given_binary_question_when_started_then_offers_three_answers() {
        let engine = TraversalEngine::start(two_level(), TraversalOptions::default()).unwrap();
        let question = engine.current_question().unwrap();
        assert_eq!(question.question, "Root?");
        assert_eq!(question.labels(), vec![YES, NO, PROBABLY]);
        assert_eq!(engine.current_node_id(), Some(NodeId::new(1)));
    }

    #[test]
    fn given_probably_disabled_when_started_then_offers_yes_no_only() {
        let options = TraversalOptions {
            offer_probably: false,
        };
        let engine = TraversalEngine::start(two_level(), options).unwrap();
        assert_eq!(engine.current_question().unwrap().labels(), vec![YES, NO]);
    }

    #[test]
    fn given_probably_over_questions_when_answering_then_queues_second_branch() {
        let mut engine = TraversalEngine::start(two_level(), TraversalOptions::default()).unwrap();

        assert_eq!(answer(&mut engine, PROBABLY), None);
        // no-branch first
        assert_eq!(engine.current_question().unwrap().question, "B?");
        assert_eq!(engine.pending_questions(), 1);

        assert_eq!(answer(&mut engine, YES), None);
        assert_eq!(engine.current_question().unwrap().question, "A?");
        assert_eq!(engine.collected().unwrap(), vec![Programme::new("P3", "P3")]);

        assert_eq!(answer(&mut engine, NO), Some(vec!["P3".into(), "P2".into()]));
        assert!(engine.is_complete());
    }

    #[test]
    fn given_unknown_token_when_answering_then_state_is_unchanged() {
        let mut engine = TraversalEngine::start(two_level(), TraversalOptions::default()).unwrap();
        let before = engine.current_question().unwrap();

        assert!(matches!(
            engine.process_answer("not-a-token"),
            Err(ApplicationError::TokenNotFound(_))
        ));
        assert_eq!(engine.current_question().unwrap(), before);
    }

    #[test]
    fn given_earlier_token_when_answering_then_rolls_back() {
        let mut engine = TraversalEngine::start(two_level(), TraversalOptions::default()).unwrap();
        let root_question = engine.current_question().unwrap();

        answer(&mut engine, YES);
        let a_question = engine.current_question().unwrap();
        assert_eq!(a_question.question, "A?");

        let no_token = root_question.token_for(NO).unwrap();
        assert_eq!(engine.process_answer(no_token).unwrap(), None);
        assert_eq!(engine.current_question().unwrap().question, "B?");
        assert_eq!(engine.current_node_id(), Some(NodeId::new(2)));

        let stale = a_question.token_for(YES).unwrap();
        assert!(matches!(
            engine.process_answer(stale),
            Err(ApplicationError::TokenNotFound(_))
        ));
    }

    #[test]
    fn given_complete_engine_when_answering_then_rejects() {
        let mut engine = TraversalEngine::start(two_level(), TraversalOptions::default()).unwrap();
        let root_question = engine.current_question().unwrap();
        answer(&mut engine, YES);
        answer(&mut engine, YES);
        assert!(engine.is_complete());

        let token = root_question.token_for(NO).unwrap();
        assert!(matches!(
            engine.process_answer(token),
            Err(ApplicationError::TraversalComplete)
        ));
        assert!(matches!(
            engine.current_question(),
            Err(ApplicationError::TraversalComplete)
        ));
    }

    fn assert_invalid_answer(
        engine: &TraversalEngine,
        node: NodeIndex,
        label: &str,
        question: &str,
    ) {
        let node_id = engine.current_node_id().unwrap();
        let before = engine.current_question().unwrap();
        let pending = engine.pending_questions();

        match engine.next_nodes(node_id, node, label) {
            Err(ApplicationError::InvalidAnswer {
                question: q,
                label: l,
            }) => {
                assert_eq!(q, question);
                assert_eq!(l, label);
            }
            other => panic!("expected InvalidAnswer, got {other:?}"),
        }
        assert_eq!(engine.current_question().unwrap(), before);
        assert_eq!(engine.current_node_id(), Some(node_id));
        assert_eq!(engine.pending_questions(), pending);
        assert!(engine.collected().unwrap().is_empty());
    }

    #[test]
    fn given_unknown_label_on_binary_question_when_resolving_then_invalid_answer() {
        let engine = TraversalEngine::start(two_level(), TraversalOptions::default()).unwrap();
        let root = engine.tree.root();

        assert_invalid_answer(&engine, root, "maybe", "Root?");
        assert_invalid_answer(&engine, root, "Yes", "Root?");
    }

    #[test]
    fn given_probably_disabled_when_resolving_probably_then_invalid_answer() {
        let options = TraversalOptions {
            offer_probably: false,
        };
        let engine = TraversalEngine::start(two_level(), options).unwrap();
        let root = engine.tree.root();

        assert_invalid_answer(&engine, root, PROBABLY, "Root?");
    }

    #[test]
    fn given_options_question_when_resolving_unlisted_label_then_invalid_answer() {
        let mut b = TreeBuilder::new();
        let art = b.leaf("Art", "ART");
        let law = b.leaf("Law", "LAW");
        let root = b.options("Pick a field", [("art", art), ("law", law)]).unwrap();
        let engine =
            TraversalEngine::start(Arc::new(b.build(root).unwrap()), TraversalOptions::default())
                .unwrap();

        assert_invalid_answer(&engine, root, PROBABLY, "Pick a field");
        assert_invalid_answer(&engine, root, YES, "Pick a field");
        assert_invalid_answer(&engine, root, "music", "Pick a field");
    }
}
