//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes
//! - NodeId indices for traversal
//! - String interning for names
//!
//! A parsed document owns all of its data and is immutable, so one snapshot
//! can be shared across tables and threads behind an `Arc`.

use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
use super::strings::StringPool;
use super::DocumentAccess;
use crate::error::TableError;
use crate::reader::{SliceReader, StartElement, XmlEvent};
use std::path::Path;

/// An XML document stored in arena format
#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    attributes: Vec<XmlAttribute>,
    strings: StringPool,
    root_element: Option<NodeId>,
}

/// Per-element namespace scope kept on the build stack
struct Scope {
    node: NodeId,
    name: Vec<u8>,
    /// (prefix id, uri id); prefix id 0 is the default namespace
    bindings: Vec<(u32, u32)>,
}

impl XmlDocument {
    fn empty() -> Self {
        XmlDocument {
            nodes: vec![XmlNode::document()],
            attributes: Vec::with_capacity(128),
            strings: StringPool::new(),
            root_element: None,
        }
    }

    /// Parse an XML document (lenient mode, never fails)
    pub fn parse(input: &[u8]) -> Self {
        let mut doc = Self::empty();
        // Lenient builds only report structural errors, which are ignored here
        let _ = doc.build(SliceReader::new(input), false);
        doc
    }

    /// Parse an XML document in strict mode.
    /// Returns Err if the document is not well-formed.
    pub fn parse_strict(input: &[u8]) -> Result<Self, String> {
        let mut doc = Self::empty();
        doc.build(SliceReader::new_strict(input), true)?;
        if doc.root_element.is_none() {
            return Err("Document has no root element".to_string());
        }
        Ok(doc)
    }

    /// Read and strictly parse an XML file
    pub fn from_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse_strict(&bytes).map_err(TableError::Parse)
    }

    fn build(&mut self, mut reader: SliceReader<'_>, strict: bool) -> Result<(), String> {
        let mut stack: Vec<Scope> = vec![Scope {
            node: DOCUMENT_NODE,
            name: Vec::new(),
            bindings: Vec::new(),
        }];

        while let Some(event) = reader.next_event() {
            let at_top = stack.len() == 1;
            match event {
                XmlEvent::StartElement(elem) => {
                    if strict && at_top && self.root_element.is_some() {
                        return Err("Document has multiple root elements".to_string());
                    }
                    let scope = self.open_element(&elem, &stack);
                    stack.push(scope);
                }
                XmlEvent::EmptyElement(elem) => {
                    if strict && at_top && self.root_element.is_some() {
                        return Err("Document has multiple root elements".to_string());
                    }
                    self.open_element(&elem, &stack);
                }
                XmlEvent::EndElement(name) => {
                    if stack.len() == 1 {
                        if strict {
                            return Err(format!(
                                "Unexpected end tag: </{}>",
                                String::from_utf8_lossy(name)
                            ));
                        }
                        continue;
                    }
                    let open = stack.last().map(|s| s.name.as_slice()).unwrap_or_default();
                    if open != name {
                        if strict {
                            return Err(format!(
                                "Tag mismatch: <{}> closed with </{}>",
                                String::from_utf8_lossy(open),
                                String::from_utf8_lossy(name)
                            ));
                        }
                        // Lenient: close up to the matching open tag if there is one
                        if let Some(depth) = stack.iter().rposition(|s| s.name == name) {
                            if depth > 0 {
                                stack.truncate(depth);
                            }
                        }
                        continue;
                    }
                    stack.pop();
                }
                XmlEvent::Text(content) => {
                    if at_top {
                        if strict && !content.iter().all(u8::is_ascii_whitespace) {
                            return Err("Text content not allowed at document level".to_string());
                        }
                        continue;
                    }
                    let id = self.strings.store(&content);
                    self.push_leaf(NodeKind::Text, id, &stack);
                }
                XmlEvent::CData(content) => {
                    if at_top {
                        if strict {
                            return Err("CDATA section not allowed at document level".to_string());
                        }
                        continue;
                    }
                    let id = self.strings.store(content);
                    self.push_leaf(NodeKind::CData, id, &stack);
                }
                XmlEvent::Comment(content) => {
                    let id = self.strings.store(content);
                    self.push_leaf(NodeKind::Comment, id, &stack);
                }
                XmlEvent::ProcessingInstruction { target, .. } => {
                    let id = self.strings.intern(target);
                    self.push_leaf(NodeKind::ProcessingInstruction, id, &stack);
                }
                XmlEvent::XmlDeclaration => {
                    if strict && self.nodes.len() > 1 {
                        return Err("XML declaration must come first".to_string());
                    }
                }
                XmlEvent::DocType => {
                    if strict && self.root_element.is_some() {
                        return Err("DOCTYPE must come before root element".to_string());
                    }
                }
            }
        }

        if let Some(err) = reader.error() {
            return Err(err.to_string());
        }
        if strict && stack.len() > 1 {
            return Err(format!(
                "Unclosed tag: <{}>",
                String::from_utf8_lossy(&stack[1].name)
            ));
        }
        Ok(())
    }

    /// Create an element node, returning the scope it opens
    fn open_element(&mut self, elem: &StartElement<'_>, stack: &[Scope]) -> Scope {
        let parent = stack.last().map_or(DOCUMENT_NODE, |s| s.node);
        let depth = stack.len().min(u16::MAX as usize) as u16;

        let name_id = self.strings.intern(elem.name);
        let mut node = XmlNode::new(NodeKind::Element, name_id, Some(parent), depth);

        let mut bindings = Vec::new();
        node.attr_start = self.attributes.len() as u32;
        for attr in &elem.attributes {
            if let Some((prefix, uri)) = attr.namespace_declaration() {
                bindings.push((self.strings.intern(prefix), self.strings.intern(uri)));
            }
            self.attributes.push(XmlAttribute {
                name_id: self.strings.intern(&attr.name),
                value_id: self.strings.store(&attr.value),
            });
        }
        node.attr_count = elem.attributes.len().min(u16::MAX as usize) as u16;

        let prefix_id = elem.prefix().map_or(0, |p| self.strings.intern(p));
        node.namespace_id = bindings
            .iter()
            .chain(stack.iter().rev().flat_map(|s| s.bindings.iter()))
            .find(|(p, _)| *p == prefix_id)
            .map_or(0, |&(_, uri)| uri);

        let id = self.push_node(node, parent);
        if self.root_element.is_none() && parent == DOCUMENT_NODE {
            self.root_element = Some(id);
        }

        Scope {
            node: id,
            name: elem.name.to_vec(),
            bindings,
        }
    }

    fn push_leaf(&mut self, kind: NodeKind, content_id: u32, stack: &[Scope]) {
        let parent = stack.last().map_or(DOCUMENT_NODE, |s| s.node);
        let depth = stack.len().min(u16::MAX as usize) as u16;
        self.push_node(XmlNode::new(kind, content_id, Some(parent), depth), parent);
    }

    fn push_node(&mut self, node: XmlNode, parent: NodeId) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.link_child(parent, id);
        id
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child = self.nodes[parent_id as usize].last_child;
        if let Some(last) = last_child {
            self.nodes[child_id as usize].prev_sibling = Some(last);
            self.nodes[last as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }

    /// Get root element name
    pub fn root_name(&self) -> Option<&str> {
        self.node_name(self.root_element?)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let next = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next }
    }

    /// Serialize a node and its subtree back to XML.
    /// Uses an explicit stack so deep documents cannot overflow.
    pub fn to_xml(&self, node_id: NodeId) -> String {
        enum Entry {
            Enter(NodeId),
            Close(NodeId),
        }

        let mut buf = String::with_capacity(256);
        let mut stack = vec![Entry::Enter(node_id)];

        while let Some(entry) = stack.pop() {
            let id = match entry {
                Entry::Close(id) => {
                    buf.push_str("</");
                    buf.push_str(self.node_name(id).unwrap_or(""));
                    buf.push('>');
                    continue;
                }
                Entry::Enter(id) => id,
            };
            let Some(node) = self.get_node(id) else { continue };

            match node.kind {
                NodeKind::Element => {
                    buf.push('<');
                    buf.push_str(self.node_name(id).unwrap_or(""));
                    for (name, value) in self.attribute_values(id) {
                        buf.push(' ');
                        buf.push_str(name);
                        buf.push_str("=\"");
                        escape_xml_to_buf(value, &mut buf);
                        buf.push('"');
                    }
                    if node.first_child.is_none() {
                        buf.push_str("/>");
                        continue;
                    }
                    buf.push('>');
                    stack.push(Entry::Close(id));
                    let mut child = node.last_child;
                    while let Some(c) = child {
                        stack.push(Entry::Enter(c));
                        child = self.prev_sibling_of(c);
                    }
                }
                NodeKind::Text => escape_xml_to_buf(self.text_content(id).unwrap_or(""), &mut buf),
                NodeKind::CData => {
                    buf.push_str("<![CDATA[");
                    buf.push_str(self.text_content(id).unwrap_or(""));
                    buf.push_str("]]>");
                }
                NodeKind::Comment => {
                    buf.push_str("<!--");
                    buf.push_str(self.text_content(id).unwrap_or(""));
                    buf.push_str("-->");
                }
                NodeKind::ProcessingInstruction => {
                    buf.push_str("<?");
                    buf.push_str(self.node_name(id).unwrap_or(""));
                    buf.push_str("?>");
                }
                NodeKind::Document => {
                    if let Some(root) = self.root_element {
                        stack.push(Entry::Enter(root));
                    }
                }
            }
        }

        buf
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d XmlDocument,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling_of(current);
        Some(current)
    }
}

impl DocumentAccess for XmlDocument {
    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        let Some(node) = self.get_node(id) else {
            return &[];
        };
        let start = node.attr_start as usize;
        let end = start + node.attr_count as usize;
        self.attributes.get(start..end).unwrap_or(&[])
    }

    fn strings(&self) -> &StringPool {
        &self.strings
    }

    fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }
}

/// Escape markup characters of text or attribute content
#[inline]
pub(crate) fn escape_xml_to_buf(s: &str, buf: &mut String) {
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            _ => buf.push(c),
        }
    }
}
