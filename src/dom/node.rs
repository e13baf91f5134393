//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references. Ids are
//! assigned in document order, so sorting ids sorts nodes.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// The document node always sits at index 0
pub const DOCUMENT_NODE: NodeId = 0;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// String id of the name (elements, PIs) or of the content (text, comments)
    pub name_id: u32,
    /// String id of the resolved namespace URI, or 0
    pub namespace_id: u32,
    /// Start of attributes in the attribute arena (elements only)
    pub attr_start: u32,
    pub attr_count: u16,
    pub depth: u16,
}

impl XmlNode {
    pub fn new(kind: NodeKind, name_id: u32, parent: Option<NodeId>, depth: u16) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id,
            namespace_id: 0,
            attr_start: 0,
            attr_count: 0,
            depth,
        }
    }

    pub fn document() -> Self {
        Self::new(NodeKind::Document, 0, None, 0)
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Text and CDATA both carry character data
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Stored attribute
#[derive(Debug, Clone)]
pub struct XmlAttribute {
    pub name_id: u32,
    pub value_id: u32,
}
