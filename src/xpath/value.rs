//! XPath Value Types
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.
//! Attributes are not arena nodes, so the attribute axis yields their
//! values directly as `AttrValues`.

use crate::dom::NodeId;

#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// Nodes in document order, no duplicates
    NodeSet(Vec<NodeId>),
    Boolean(bool),
    Number(f64),
    String(String),
    /// Values selected through the attribute axis
    AttrValues(Vec<String>),
}

impl XPathValue {
    pub fn empty_nodeset() -> Self {
        XPathValue::NodeSet(Vec::new())
    }

    pub fn single_node(id: NodeId) -> Self {
        XPathValue::NodeSet(vec![id])
    }

    /// XPath boolean() semantics
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::AttrValues(values) => !values.is_empty(),
        }
    }

    /// XPath number() semantics for non-node values.
    /// Node-sets need the document; see `functions::resolve_string`.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Boolean(true) => 1.0,
            XPathValue::Boolean(false) => 0.0,
            XPathValue::Number(n) => *n,
            XPathValue::NodeSet(_) => f64::NAN,
            _ => self.to_string_value().trim().parse().unwrap_or(f64::NAN),
        }
    }

    /// XPath string() semantics for non-node values.
    ///
    /// A node-set yields an empty string here because its string-value needs
    /// document access; use `functions::resolve_string` when a document is
    /// at hand.
    pub fn to_string_value(&self) -> String {
        match self {
            XPathValue::NodeSet(_) => String::new(),
            XPathValue::Boolean(b) => b.to_string(),
            XPathValue::Number(n) => format_number(*n),
            XPathValue::String(s) => s.clone(),
            XPathValue::AttrValues(values) => values.first().cloned().unwrap_or_default(),
        }
    }

    pub fn is_nodeset(&self) -> bool {
        matches!(self, XPathValue::NodeSet(_))
    }

    pub fn as_nodeset(&self) -> Option<&[NodeId]> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn into_nodeset(self) -> Option<Vec<NodeId>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl Default for XPathValue {
    fn default() -> Self {
        XPathValue::empty_nodeset()
    }
}

impl From<bool> for XPathValue {
    fn from(b: bool) -> Self {
        XPathValue::Boolean(b)
    }
}

impl From<f64> for XPathValue {
    fn from(n: f64) -> Self {
        XPathValue::Number(n)
    }
}

impl From<String> for XPathValue {
    fn from(s: String) -> Self {
        XPathValue::String(s)
    }
}

impl From<&str> for XPathValue {
    fn from(s: &str) -> Self {
        XPathValue::String(s.to_string())
    }
}

impl From<Vec<NodeId>> for XPathValue {
    fn from(nodes: Vec<NodeId>) -> Self {
        XPathValue::NodeSet(nodes)
    }
}
