//! Key resolution
//!
//! Walks every item matched by the item path and derives its key, in
//! document order. Large tables fan out over the rayon pool when the
//! `parallel` feature is enabled; results are collected in item order.

use super::key::Key;
use super::spec::{KeySpec, PathSpec};
use crate::dom::{DocumentAccess, NodeId, XmlDocument};
use crate::error::{Result, TableError};
use crate::xpath;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::warn;

/// Item count from which key resolution runs in parallel
pub const PARALLEL_THRESHOLD: usize = 1024;

/// Context node for item paths: the reply's top element
pub fn table_root(doc: &XmlDocument) -> NodeId {
    doc.root_element_id().unwrap_or(doc.document_node_id())
}

/// Nodes matched by `item_path`, in document order
pub fn item_nodes(doc: &XmlDocument, item_path: &str) -> Result<Vec<NodeId>> {
    xpath::select_nodes(doc, table_root(doc), item_path).map_err(|e| TableError::path(item_path, e))
}

/// Derive the ordered keys of every item. Keys are not deduplicated.
pub fn resolve_keys(doc: &XmlDocument, spec: &PathSpec) -> Result<Vec<Key>> {
    let Some(item_path) = spec.item_path() else {
        return Ok(Vec::new());
    };
    let items = item_nodes(doc, item_path)?;
    let key_spec = spec.key();

    #[cfg(feature = "parallel")]
    let keys = if items.len() >= PARALLEL_THRESHOLD {
        items
            .par_iter()
            .enumerate()
            .map(|(index, &node)| item_key(doc, key_spec, index, node))
            .collect::<Result<Vec<_>>>()?
    } else {
        resolve_sequential(doc, key_spec, &items)?
    };

    #[cfg(not(feature = "parallel"))]
    let keys = resolve_sequential(doc, key_spec, &items)?;

    report_duplicates(item_path, &keys);
    Ok(keys)
}

fn resolve_sequential(doc: &XmlDocument, key_spec: &KeySpec, items: &[NodeId]) -> Result<Vec<Key>> {
    items
        .iter()
        .enumerate()
        .map(|(index, &node)| item_key(doc, key_spec, index, node))
        .collect()
}

fn item_key(doc: &XmlDocument, key_spec: &KeySpec, index: usize, node: NodeId) -> Result<Key> {
    let text = |path: &str| xpath::first_string(doc, node, path).map_err(|e| TableError::path(path, e));
    match key_spec {
        KeySpec::Single(path) => match text(path)? {
            Some(value) => Ok(Key::Simple(value.trim().to_string())),
            None => Err(TableError::MissingKey {
                index,
                path: path.clone(),
            }),
        },
        KeySpec::Composite(paths) => paths
            .iter()
            .map(|path| Ok(text(path)?.unwrap_or_default()))
            .collect::<Result<Vec<_>>>()
            .map(Key::Composite),
    }
}

/// Duplicates stay in the key list; keyed lookups return the first match
fn report_duplicates(item_path: &str, keys: &[Key]) {
    let mut seen = HashSet::with_capacity(keys.len());
    let duplicates = keys.iter().filter(|k| !seen.insert(*k)).count();
    if duplicates > 0 {
        warn!(item_path, duplicates, "duplicate keys, lookups return the first match");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNITS: &[u8] = b"<interface-information>\
        <logical-interface><name>ge-0/0/0</name><unit>0</unit></logical-interface>\
        <logical-interface><name>ge-0/0/0</name><unit>1</unit></logical-interface>\
        <logical-interface><name> ge-0/0/1 </name></logical-interface>\
        </interface-information>";

    #[test]
    fn test_simple_keys_are_trimmed() {
        let doc = XmlDocument::parse(UNITS);
        let spec = PathSpec::new("logical-interface", "name").unwrap();
        let keys = resolve_keys(&doc, &spec).unwrap();
        assert_eq!(
            keys,
            vec![Key::from("ge-0/0/0"), Key::from("ge-0/0/0"), Key::from("ge-0/0/1")]
        );
    }

    #[test]
    fn test_composite_keys_keep_text_and_gaps() {
        let doc = XmlDocument::parse(UNITS);
        let spec = PathSpec::new("logical-interface", vec!["name", "unit"]).unwrap();
        let keys = resolve_keys(&doc, &spec).unwrap();
        assert_eq!(keys[0], Key::from(("ge-0/0/0", "0")));
        assert_eq!(keys[1], Key::from(("ge-0/0/0", "1")));
        assert_eq!(keys[2], Key::from((" ge-0/0/1 ", "")));
    }

    #[test]
    fn test_missing_simple_key_fails() {
        let doc = XmlDocument::parse(UNITS);
        let spec = PathSpec::new("logical-interface", "unit").unwrap();
        match resolve_keys(&doc, &spec) {
            Err(TableError::MissingKey { index, path }) => {
                assert_eq!(index, 2);
                assert_eq!(path, "unit");
            }
            other => panic!("expected MissingKey, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_key() {
        let doc = XmlDocument::parse(b"<r><entry id=\"a\"/><entry id=\"b\"/></r>");
        let spec = PathSpec::new("entry", "@id").unwrap();
        assert_eq!(resolve_keys(&doc, &spec).unwrap(), vec![Key::from("a"), Key::from("b")]);
    }

    #[test]
    fn test_large_table_keeps_document_order() {
        let mut xml = String::from("<r>");
        for i in 0..PARALLEL_THRESHOLD + 10 {
            xml.push_str(&format!("<e><name>k{}</name></e>", i));
        }
        xml.push_str("</r>");
        let doc = XmlDocument::parse(xml.as_bytes());
        let spec = PathSpec::new("e", "name").unwrap();
        let keys = resolve_keys(&doc, &spec).unwrap();
        assert_eq!(keys.len(), PARALLEL_THRESHOLD + 10);
        assert!(keys.iter().enumerate().all(|(i, k)| *k == Key::Simple(format!("k{}", i))));
    }
}
