//! Raw table items

use crate::dom::{node_string_value, DocumentAccess, NodeId, XmlDocument};
use crate::error::{Result, TableError};
use crate::xpath;
use std::fmt;
use std::sync::Arc;

/// One matched subtree of a document snapshot.
///
/// Two items are equal when they point at the same node of the same
/// snapshot.
#[derive(Clone)]
pub struct Item {
    doc: Arc<XmlDocument>,
    node: NodeId,
}

impl Item {
    pub fn new(doc: Arc<XmlDocument>, node: NodeId) -> Self {
        Item { doc, node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn document(&self) -> &Arc<XmlDocument> {
        &self.doc
    }

    /// Element name of the item
    pub fn name(&self) -> Option<&str> {
        self.doc.node_name(self.node)
    }

    /// Concatenated text of the whole subtree
    pub fn string_value(&self) -> String {
        node_string_value(self.doc.as_ref(), self.node)
    }

    /// Trimmed text of the first match of `path`, relative to this item
    pub fn text(&self, path: &str) -> Result<Option<String>> {
        let value = xpath::first_string(self.doc.as_ref(), self.node, path)
            .map_err(|e| TableError::path(path, e))?;
        Ok(value.map(|v| v.trim().to_string()))
    }

    /// Items selected by `path`, relative to this item
    pub fn select(&self, path: &str) -> Result<Vec<Item>> {
        let nodes = xpath::select_nodes(self.doc.as_ref(), self.node, path)
            .map_err(|e| TableError::path(path, e))?;
        Ok(nodes
            .into_iter()
            .map(|node| Item::new(Arc::clone(&self.doc), node))
            .collect())
    }

    pub fn parent(&self) -> Option<Item> {
        let parent = self.doc.parent_of(self.node)?;
        Some(Item::new(Arc::clone(&self.doc), parent))
    }

    pub fn to_xml(&self) -> String {
        self.doc.to_xml(self.node)
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.doc, &other.doc) && self.node == other.node
    }
}

impl Eq for Item {}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item({}#{})", self.name().unwrap_or("?"), self.node)
    }
}
