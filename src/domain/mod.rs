//! Domain layer: the decision tree data model
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod builder;
pub mod error;
pub mod tree;

pub use builder::{NodeDocument, OptionDocument, TreeBuilder, TreeDocument, TreeResult};
pub use error::DomainError;
pub use tree::{AnswerOption, DecisionTree, NodeIndex, Programme, TreeNode};

/// Expand environment variables in a path string.
///
/// Supports `$VAR`, `${VAR}` and `~` for the home directory.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
