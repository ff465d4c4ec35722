//! Syntax-tree input shape supplied by external parsers
//!
//! The parser itself is an external collaborator; the engine only needs a
//! minimal structural contract per node: an internal tag string, an optional
//! name (used by discriminator predicates), a source range, and children.
//! Everything is serde-serializable so a parser can hand trees across a
//! process boundary.

use serde::{Deserialize, Serialize};

/// A position in source text (1-based line/column, byte offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourcePosition {
    /// Create a new source position
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open byte range into source text
///
/// `finish.offset` is exclusive, so the covered text has length
/// `finish.offset - start.offset`. Well-formed ranges satisfy
/// `start.offset <= finish.offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub finish: SourcePosition,
}

impl SourceRange {
    /// Create a new source range
    pub fn new(start: SourcePosition, finish: SourcePosition) -> Self {
        Self { start, finish }
    }

    /// Byte length of the range
    pub fn len(&self) -> usize {
        self.finish.offset.saturating_sub(self.start.offset)
    }

    /// Whether the range covers no bytes
    pub fn is_empty(&self) -> bool {
        self.finish.offset <= self.start.offset
    }

    /// Whether `start.offset <= finish.offset` holds
    pub fn is_well_formed(&self) -> bool {
        self.start.offset <= self.finish.offset
    }

    /// Whether this range overlaps another range in the same source
    pub fn overlaps(&self, other: &SourceRange) -> bool {
        !(self.finish.offset <= other.start.offset || other.finish.offset <= self.start.offset)
    }
}

impl std::fmt::Display for SourceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.finish)
    }
}

/// A node of the externally supplied syntax tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Internal per-node tag produced by the parser
    pub tag: String,
    /// Name carried by named constructs (used by discriminator predicates)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source range covered by this node
    pub location: SourceRange,
    /// Child nodes in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create a new leaf node
    pub fn new(tag: impl Into<String>, location: SourceRange) -> Self {
        Self {
            tag: tag.into(),
            name: None,
            location,
            children: Vec::new(),
        }
    }

    /// Attach a name to the node
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a child node
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child nodes
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Total number of nodes in this subtree, including self
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Node::subtree_size)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: usize, finish: usize) -> SourceRange {
        SourceRange::new(
            SourcePosition::new(1, start + 1, start),
            SourcePosition::new(1, finish + 1, finish),
        )
    }

    #[test]
    fn test_range_length_is_exclusive_end() {
        assert_eq!(range(2, 7).len(), 5);
        assert!(range(3, 3).is_empty());
    }

    #[test]
    fn test_range_overlap() {
        assert!(range(0, 5).overlaps(&range(4, 8)));
        assert!(!range(0, 5).overlaps(&range(5, 8)));
        assert!(!range(6, 9).overlaps(&range(0, 5)));
    }

    #[test]
    fn test_node_builders() {
        let node = Node::new("function", range(0, 20))
            .with_name("greet")
            .with_child(Node::new("block", range(10, 19)));

        assert_eq!(node.tag, "function");
        assert_eq!(node.name.as_deref(), Some("greet"));
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.subtree_size(), 2);
    }

    #[test]
    fn test_node_serde_round_trip() {
        let node = Node::new("local_declaration", range(0, 11))
            .with_child(Node::new("identifier", range(6, 7)).with_name("x"));

        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
