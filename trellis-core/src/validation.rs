// Validation tree produced alongside a bound model

use crate::metadata::ModelMetadata;
use std::sync::Arc;

/// One node per bound model (or element/property), keyed by model name.
///
/// The tree is a plain value owned by the top-level bind result. Binders
/// attach child nodes for the properties and elements they bind.
#[derive(Debug, Clone)]
pub struct ValidationNode {
    pub key: String,
    pub metadata: Arc<ModelMetadata>,
    pub suppress_validation: bool,
    pub children: Vec<ValidationNode>,
}

impl ValidationNode {
    pub fn new(key: impl Into<String>, metadata: Arc<ModelMetadata>) -> Self {
        let suppress_validation = metadata.suppress_validation();
        Self {
            key: key.into(),
            metadata,
            suppress_validation,
            children: Vec::new(),
        }
    }

    /// A node whose subtree is never validated (files, services)
    pub fn suppressed(key: impl Into<String>, metadata: Arc<ModelMetadata>) -> Self {
        Self {
            suppress_validation: true,
            ..Self::new(key, metadata)
        }
    }

    pub fn add_child(&mut self, child: ValidationNode) {
        self.children.push(child);
    }

    /// Depth-first search by key (case-insensitive)
    pub fn find(&self, key: &str) -> Option<&ValidationNode> {
        if self.key.eq_ignore_ascii_case(key) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(key))
    }

    /// Number of nodes in the tree, including this one
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ValidationNode::len).sum::<usize>()
    }
}
