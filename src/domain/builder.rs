//! Tree builder: assembles decision trees bottom-up in an arena.

use std::collections::HashSet;

use generational_arena::Arena;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::DomainError;
use crate::domain::tree::{AnswerOption, DecisionTree, NodeIndex, Programme, TreeNode};

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Decoded form of a generated tree, as handed over by a tree provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    pub root: NodeDocument,
}

/// One node of a decoded tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDocument {
    Binary {
        question: String,
        yes: Box<NodeDocument>,
        no: Box<NodeDocument>,
    },
    Options {
        question: String,
        options: Vec<OptionDocument>,
    },
    Leaf {
        name: String,
        code: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDocument {
    pub label: String,
    pub node: NodeDocument,
}

/// Constructs decision trees. Children are inserted before their parents,
/// so the result is acyclic by construction.
pub struct TreeBuilder {
    arena: Arena<TreeNode>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    pub fn leaf(&mut self, name: impl Into<String>, code: impl Into<String>) -> NodeIndex {
        self.arena.insert(TreeNode::Leaf(Programme::new(name, code)))
    }

    pub fn binary(&mut self, text: impl Into<String>, yes: NodeIndex, no: NodeIndex) -> NodeIndex {
        self.arena.insert(TreeNode::Binary {
            text: text.into(),
            yes,
            no,
        })
    }

    /// Insert an options question. Labels must be non-empty and unique within the question.
    pub fn options<L>(
        &mut self,
        text: impl Into<String>,
        options: impl IntoIterator<Item = (L, NodeIndex)>,
    ) -> TreeResult<NodeIndex>
    where
        L: Into<String>,
    {
        let text = text.into();
        let options: Vec<AnswerOption> = options
            .into_iter()
            .map(|(label, branch)| AnswerOption {
                label: label.into(),
                branch,
            })
            .collect();

        if options.is_empty() {
            return Err(DomainError::EmptyOptions(text));
        }
        let mut seen = HashSet::new();
        for option in &options {
            if option.label.trim().is_empty() {
                return Err(DomainError::EmptyLabel(text));
            }
            if !seen.insert(option.label.as_str()) {
                return Err(DomainError::DuplicateLabel {
                    question: text.clone(),
                    label: option.label.clone(),
                });
            }
        }

        Ok(self.arena.insert(TreeNode::Options { text, options }))
    }

    /// Finish the tree with `root` as its entry point.
    #[instrument(level = "debug", skip(self))]
    pub fn build(self, root: NodeIndex) -> TreeResult<DecisionTree> {
        if !self.arena.contains(root) {
            return Err(DomainError::UnknownNode("root".to_string()));
        }
        for (_, node) in self.arena.iter() {
            for (_, child) in node.branches() {
                if !self.arena.contains(child) {
                    return Err(DomainError::UnknownNode(
                        node.text().unwrap_or_default().to_string(),
                    ));
                }
            }
        }
        debug!("built decision tree with {} arena nodes", self.arena.len());
        Ok(DecisionTree::from_parts(self.arena, root))
    }

    /// Build a tree from its decoded document form.
    pub fn from_document(document: &TreeDocument) -> TreeResult<DecisionTree> {
        let mut builder = Self::new();
        let root = builder.insert_document(&document.root)?;
        builder.build(root)
    }

    fn insert_document(&mut self, node: &NodeDocument) -> TreeResult<NodeIndex> {
        match node {
            NodeDocument::Leaf { name, code } => Ok(self.leaf(name.as_str(), code.as_str())),
            NodeDocument::Binary { question, yes, no } => {
                let yes = self.insert_document(yes)?;
                let no = self.insert_document(no)?;
                Ok(self.binary(question.as_str(), yes, no))
            }
            NodeDocument::Options { question, options } => {
                let mut branches = Vec::with_capacity(options.len());
                for option in options {
                    let branch = self.insert_document(&option.node)?;
                    branches.push((option.label.clone(), branch));
                }
                self.options(question.as_str(), branches)
            }
        }
    }
}
