//! Ancestor chains: paths from a node out to the file root

use crate::{ExprId, ExprKind, NodeRef, SourceFile};
use rv_span::{Pos, Span};
use thiserror::Error;

/// Reasons a node sequence is not a valid ancestor chain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// No nodes at all
    #[error("ancestor chain is empty")]
    Empty,
    /// The outermost node is not the file
    #[error("ancestor chain ends at {last:?} instead of the file root")]
    NotRootedAtFile {
        /// Outermost node supplied
        last: NodeRef,
    },
    /// A node does not index into the file
    #[error("{node:?} does not belong to this file")]
    ForeignNode {
        /// Offending node
        node: NodeRef,
    },
    /// A node's extent is not enclosed by its successor's
    #[error("node {index} of the ancestor chain is not enclosed by node {}", .index + 1)]
    Disconnected {
        /// Index of the inner node
        index: usize,
    },
}

/// Path from a node of interest (index 0) out to the file root (last index)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorChain {
    nodes: Vec<NodeRef>,
}

impl AncestorChain {
    /// Validates a caller-supplied chain against `file`
    ///
    /// # Errors
    ///
    /// Returns a [`ChainError`] if the chain is empty, is not rooted at the
    /// file, mentions nodes of another file, or skips out of containment.
    pub fn new(file: &SourceFile, nodes: Vec<NodeRef>) -> Result<Self, ChainError> {
        let last = *nodes.last().ok_or(ChainError::Empty)?;
        if last != NodeRef::File {
            return Err(ChainError::NotRootedAtFile { last });
        }
        if let Some(&node) = nodes.iter().find(|&&node| !file.contains(node)) {
            return Err(ChainError::ForeignNode { node });
        }
        for (index, pair) in nodes.windows(2).enumerate() {
            if !file.span_of(pair[1]).encloses(file.span_of(pair[0])) {
                return Err(ChainError::Disconnected { index });
            }
        }
        Ok(Self { nodes })
    }

    /// Nodes, innermost first
    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    /// Number of nodes, target and file included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the chain holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node of interest
    pub fn target(&self) -> NodeRef {
        self.nodes[0]
    }

    /// The node directly under the file root, if any
    pub fn top_level(&self) -> Option<NodeRef> {
        self.nodes.len().checked_sub(2).map(|index| self.nodes[index])
    }

    /// Nodes from the file root inward
    pub fn outermost_first(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.nodes.iter().rev().copied()
    }
}

/// Finds the path to the innermost node enclosing `[start, end)`.
///
/// A point query (`start == end`) selects the node covering `start`.
/// Returns `None` when the interval lies outside the file.
pub fn path_enclosing(file: &SourceFile, start: Pos, end: Pos) -> Option<AncestorChain> {
    let interval = if end <= start {
        Span::new(start, start.advance(1))
    } else {
        Span::new(start, end)
    };
    if !file.span.encloses(interval) {
        return None;
    }

    let mut path = vec![NodeRef::File];
    let mut current = NodeRef::File;
    while let Some(child) = file
        .children(current)
        .into_iter()
        .find(|&child| file.span_of(child).encloses(interval))
    {
        path.push(child);
        current = child;
    }
    path.reverse();
    Some(AncestorChain { nodes: path })
}

/// Strips any number of enclosing parentheses
pub fn unparen(file: &SourceFile, mut expr: ExprId) -> ExprId {
    while let ExprKind::Paren(inner) = file.exprs[expr].kind {
        expr = inner;
    }
    expr
}
