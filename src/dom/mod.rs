//! DOM Module - Arena-based XML Document
//!
//! Implements an efficient DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for element/attribute names
//! - Namespace resolution during the build

pub mod document;
pub mod node;
pub mod strings;

pub use document::XmlDocument;
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
pub use strings::StringPool;

/// Tree-navigation capability used by the path engine and by tables.
///
/// Implementors provide node and string storage; navigation (parents,
/// siblings, ancestors) and naming are derived from it.
pub trait DocumentAccess {
    /// Get a node by ID
    fn get_node(&self, id: NodeId) -> Option<&XmlNode>;

    /// Get attributes for an element
    fn attributes(&self, id: NodeId) -> &[XmlAttribute];

    fn strings(&self) -> &StringPool;

    /// Root element (first element child of the document node)
    fn root_element_id(&self) -> Option<NodeId>;

    fn document_node_id(&self) -> NodeId {
        DOCUMENT_NODE
    }

    fn node_kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    /// Qualified name of an element or PI target
    fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => self.strings().get_str(node.name_id),
            _ => None,
        }
    }

    /// Name without namespace prefix
    fn node_local_name(&self, id: NodeId) -> Option<&str> {
        let name = self.node_name(id)?;
        Some(name.split_once(':').map_or(name, |(_, local)| local))
    }

    fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.namespace_id {
            0 => None,
            ns => self.strings().get_str(ns),
        }
    }

    /// Content of a text, CDATA or comment node
    fn text_content(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Text | NodeKind::CData | NodeKind::Comment => self.strings().get_str(node.name_id),
            _ => None,
        }
    }

    fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id).iter().find_map(|attr| {
            let attr_name = self.strings().get_str(attr.name_id)?;
            let local = attr_name.split_once(':').map_or(attr_name, |(_, l)| l);
            if attr_name == name || local == name {
                self.strings().get_str(attr.value_id)
            } else {
                None
            }
        })
    }

    fn attribute_values(&self, id: NodeId) -> Vec<(&str, &str)> {
        self.attributes(id)
            .iter()
            .filter_map(|attr| {
                let name = self.strings().get_str(attr.name_id)?;
                let value = self.strings().get_str(attr.value_id)?;
                Some((name, value))
            })
            .collect()
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut child = self.get_node(id).and_then(|n| n.first_child);
        while let Some(c) = child {
            out.push(c);
            child = self.next_sibling_of(c);
        }
        out
    }

    /// All descendants in document order
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        let mut child = self.get_node(id).and_then(|n| n.last_child);
        while let Some(c) = child {
            stack.push(c);
            child = self.prev_sibling_of(c);
        }
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut child = self.get_node(current).and_then(|n| n.last_child);
            while let Some(c) = child {
                stack.push(c);
                child = self.prev_sibling_of(c);
            }
        }
        out
    }

    /// Ancestors from the parent up to the document node
    fn ancestors_vec(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent_of(p);
        }
        out
    }
}

/// XPath string-value of a node: concatenated descendant text for elements
/// and the document, the content for character-data nodes.
pub fn node_string_value<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> String {
    match doc.node_kind_of(id) {
        Some(NodeKind::Element) | Some(NodeKind::Document) => {
            let mut result = String::new();
            for d in doc.descendants_vec(id) {
                if doc.get_node(d).is_some_and(XmlNode::is_text) {
                    result.push_str(doc.text_content(d).unwrap_or(""));
                }
            }
            result
        }
        Some(_) => doc.text_content(id).unwrap_or("").to_string(),
        None => String::new(),
    }
}

/// Collapse runs of XML whitespace and trim, as `normalize-space()` does
pub fn normalize_space(s: &str) -> String {
    s.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}
