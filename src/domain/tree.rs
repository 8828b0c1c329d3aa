use generational_arena::{Arena, Index};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

/// Arena handle of a node. Node identity is handle identity, never value equality.
pub type NodeIndex = Index;

/// Leaf payload: one recommended study programme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Programme {
    /// Display name
    pub name: String,
    /// Unique, stable programme code
    pub code: String,
}

impl Programme {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for Programme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// One labelled branch of an options question.
#[derive(Debug, Clone)]
pub struct AnswerOption {
    pub label: String,
    pub branch: NodeIndex,
}

/// Node of the decision tree.
#[derive(Debug)]
pub enum TreeNode {
    /// Question answered with yes/no
    Binary {
        text: String,
        yes: NodeIndex,
        no: NodeIndex,
    },
    /// Question answered by picking one of the labelled options
    Options {
        text: String,
        options: Vec<AnswerOption>,
    },
    /// Terminal recommendation
    Leaf(Programme),
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf(_))
    }

    /// Question text, `None` for leaves.
    pub fn text(&self) -> Option<&str> {
        match self {
            TreeNode::Binary { text, .. } | TreeNode::Options { text, .. } => Some(text),
            TreeNode::Leaf(_) => None,
        }
    }

    pub fn programme(&self) -> Option<&Programme> {
        match self {
            TreeNode::Leaf(programme) => Some(programme),
            _ => None,
        }
    }

    /// Labelled branches in declared order. Binary questions list `yes` before `no`.
    pub fn branches(&self) -> Vec<(&str, NodeIndex)> {
        match self {
            TreeNode::Binary { yes, no, .. } => vec![("yes", *yes), ("no", *no)],
            TreeNode::Options { options, .. } => options
                .iter()
                .map(|o| (o.label.as_str(), o.branch))
                .collect(),
            TreeNode::Leaf(_) => Vec::new(),
        }
    }
}

/// Immutable decision tree, shared read-only by all sessions.
///
/// Nodes live in a generational arena; children are referenced by index.
/// Construct through [`crate::domain::TreeBuilder`].
#[derive(Debug)]
pub struct DecisionTree {
    arena: Arena<TreeNode>,
    root: NodeIndex,
}

impl DecisionTree {
    pub(crate) fn from_parts(arena: Arena<TreeNode>, root: NodeIndex) -> Self {
        Self { arena, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn root_node(&self) -> &TreeNode {
        // root is validated by the builder and the arena is never mutated afterwards
        &self.arena[self.root]
    }

    #[instrument(level = "trace", skip(self))]
    pub fn node(&self, idx: NodeIndex) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    /// Number of nodes reachable from the root, counting shared nodes once per path.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order, left-to-right iteration from the root.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.calculate_depth(self.root)
    }

    fn calculate_depth(&self, idx: NodeIndex) -> usize {
        match self.node(idx) {
            Some(node) => {
                1 + node
                    .branches()
                    .into_iter()
                    .map(|(_, child)| self.calculate_depth(child))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    /// All leaves reachable from the root, in declared branch order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaves(&self) -> Vec<(NodeIndex, &Programme)> {
        self.iter()
            .filter_map(|(idx, node)| node.programme().map(|p| (idx, p)))
            .collect()
    }

    pub fn question_count(&self) -> usize {
        self.iter().filter(|(_, node)| !node.is_leaf()).count()
    }

    /// Render the tree for terminal display.
    pub fn to_termtree(&self) -> termtree::Tree<String> {
        self.render(self.root, None)
    }

    fn render(&self, idx: NodeIndex, via: Option<&str>) -> termtree::Tree<String> {
        let label = match self.node(idx) {
            Some(TreeNode::Leaf(programme)) => programme.to_string(),
            Some(node) => node.text().unwrap_or_default().to_string(),
            None => "<missing>".to_string(),
        };
        let label = match via {
            Some(answer) => format!("[{}] {}", answer, label),
            None => label,
        };
        let mut tree = termtree::Tree::new(label);
        if let Some(node) = self.node(idx) {
            for (answer, child) in node.branches() {
                tree.push(self.render(child, Some(answer)));
            }
        }
        tree
    }
}

pub struct TreeIterator<'a> {
    tree: &'a DecisionTree,
    stack: Vec<NodeIndex>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a DecisionTree) -> Self {
        Self {
            tree,
            stack: vec![tree.root],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeIndex, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.node(current) {
                // Push children in reverse order for left-to-right traversal
                for (_, child) in node.branches().into_iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TreeBuilder;

    fn sample() -> DecisionTree {
        let mut b = TreeBuilder::new();
        let p1 = b.leaf("Informatics", "INF");
        let p2 = b.leaf("Mathematics", "MAT");
        let p3 = b.leaf("Physics", "PHY");
        let inner = b.binary("Do you like proofs?", p2, p3);
        let root = b.binary("Do you like programming?", p1, inner);
        b.build(root).unwrap()
    }

    #[test]
    fn given_tree_when_iterating_then_visits_preorder_yes_first() {
        let tree = sample();
        let texts: Vec<String> = tree
            .iter()
            .map(|(_, n)| match n {
                TreeNode::Leaf(p) => p.code.clone(),
                other => other.text().unwrap().to_string(),
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "Do you like programming?",
                "INF",
                "Do you like proofs?",
                "MAT",
                "PHY"
            ]
        );
    }

    #[test]
    fn given_tree_when_querying_shape_then_reports_depth_and_counts() {
        let tree = sample();
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.question_count(), 2);
        assert_eq!(tree.leaves().len(), 3);
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn given_equal_leaves_when_comparing_then_identity_differs() {
        let mut b = TreeBuilder::new();
        let a = b.leaf("Same", "X");
        let c = b.leaf("Same", "X");
        let root = b.binary("?", a, c);
        let tree = b.build(root).unwrap();

        let leaves = tree.leaves();
        assert_eq!(leaves[0].1, leaves[1].1);
        assert_ne!(leaves[0].0, leaves[1].0);
    }

    #[test]
    fn given_tree_when_rendering_then_labels_branches() {
        let rendered = sample().to_termtree().to_string();
        assert!(rendered.contains("[yes] Informatics (INF)"));
        assert!(rendered.contains("[no] Do you like proofs?"));
    }
}
