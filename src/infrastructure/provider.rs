//! Tree providers: where the generated decision tree comes from
//!
//! Tree generation happens offline; providers only decode the finished artifact
//! and build it into an arena tree before it is injected into the session manager.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::domain::{DecisionTree, TreeBuilder, TreeDocument};
use crate::infrastructure::{InfraError, InfraResult};

/// Supplies one fully built decision tree.
pub trait TreeProvider: Send + Sync {
    fn provide(&self) -> InfraResult<DecisionTree>;
}

/// Tree stored as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonTreeFile {
    path: PathBuf,
}

impl JsonTreeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the document without building it.
    pub fn read_document(&self) -> InfraResult<TreeDocument> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| InfraError::io(format!("read tree {}", self.path.display()), e))?;
        serde_json::from_str(&content).map_err(|source| InfraError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    /// Write a document as pretty-printed JSON.
    pub fn write_document(&self, document: &TreeDocument) -> InfraResult<()> {
        let content =
            serde_json::to_string_pretty(document).map_err(|source| InfraError::Encode {
                path: self.path.clone(),
                source,
            })?;
        std::fs::write(&self.path, content)
            .map_err(|e| InfraError::io(format!("write tree {}", self.path.display()), e))
    }
}

impl TreeProvider for JsonTreeFile {
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    fn provide(&self) -> InfraResult<DecisionTree> {
        let document = self.read_document()?;
        let tree = TreeBuilder::from_document(&document)?;
        debug!("loaded tree with {} nodes", tree.node_count());
        Ok(tree)
    }
}

/// Tree held in memory.
#[derive(Debug, Clone)]
pub struct StaticTree(pub TreeDocument);

impl TreeProvider for StaticTree {
    fn provide(&self) -> InfraResult<DecisionTree> {
        Ok(TreeBuilder::from_document(&self.0)?)
    }
}
