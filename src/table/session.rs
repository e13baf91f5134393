//! Acquisition collaborator
//!
//! A session runs one RPC against a device and hands back the reply XML.
//! Transport, authentication and retries live behind the trait.

use crate::dom::document::escape_xml_to_buf;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;

pub use crate::error::BoxError as SessionError;

/// RPC argument value as written in a table definition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// `true` renders as an empty flag element, `false` is omitted
    Flag(bool),
    Number(i64),
    Text(String),
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Flag(b)
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        ArgValue::Number(n)
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Text(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Text(s)
    }
}

pub type Args = IndexMap<String, ArgValue>;

/// One RPC invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub rpc: String,
    pub args: Args,
}

impl Request {
    pub fn new(rpc: impl Into<String>) -> Self {
        Request {
            rpc: rpc.into(),
            args: Args::new(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Copy of this request with `overrides` applied on top of its arguments
    pub fn merged(&self, overrides: &Args) -> Request {
        let mut args = self.args.clone();
        for (name, value) in overrides {
            args.insert(name.clone(), value.clone());
        }
        Request {
            rpc: self.rpc.clone(),
            args,
        }
    }

    /// RPC body; argument names use `-` in place of `_`
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push('<');
        out.push_str(&self.rpc);
        out.push('>');
        for (name, value) in &self.args {
            let tag = name.replace('_', "-");
            match value {
                ArgValue::Flag(false) => {}
                ArgValue::Flag(true) => {
                    out.push('<');
                    out.push_str(&tag);
                    out.push_str("/>");
                }
                ArgValue::Number(n) => out.push_str(&format!("<{tag}>{n}</{tag}>")),
                ArgValue::Text(text) => {
                    out.push_str(&format!("<{tag}>"));
                    escape_xml_to_buf(text, &mut out);
                    out.push_str(&format!("</{tag}>"));
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.rpc);
        out.push('>');
        out
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

/// Source of reply documents for tables
pub trait Session: Send + Sync {
    /// Identity of the remote device
    fn hostname(&self) -> &str;

    /// Run `request` and return the raw reply XML
    fn execute(&self, request: &Request) -> Result<Vec<u8>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_call_args() {
        let defaults = Request::new("get-interface-information")
            .arg("extensive", true)
            .arg("interface_name", "[efgx][et]-*");
        let mut overrides = Args::new();
        overrides.insert("interface_name".into(), "ge-0/0/0".into());
        overrides.insert("terse".into(), true.into());

        let merged = defaults.merged(&overrides);
        assert_eq!(merged.args["interface_name"], ArgValue::from("ge-0/0/0"));
        assert_eq!(merged.args.len(), 3);
        assert_eq!(defaults.args["interface_name"], ArgValue::from("[efgx][et]-*"));
    }

    #[test]
    fn test_request_xml() {
        let request = Request::new("get-interface-information")
            .arg("extensive", true)
            .arg("brief", false)
            .arg("interface_name", "a<b")
            .arg("count", 5);
        assert_eq!(
            request.to_xml(),
            "<get-interface-information><extensive/>\
             <interface-name>a&lt;b</interface-name><count>5</count>\
             </get-interface-information>"
        );
    }

    #[test]
    fn test_request_text_escaping_matches_documents() {
        use crate::dom::{DocumentAccess, XmlDocument};

        let request = Request::new("get-route-information").arg("destination", "a&b>\"c\"");
        let xml = request.to_xml();
        assert_eq!(
            xml,
            "<get-route-information><destination>a&amp;b&gt;&quot;c&quot;</destination>\
             </get-route-information>"
        );
        let doc = XmlDocument::parse_strict(xml.as_bytes()).unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.to_xml(root), xml);
    }
}
