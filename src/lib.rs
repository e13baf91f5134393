//! RustyTable - keyed tables over XML RPC replies
//!
//! Layers:
//! A: Zero-copy slice reader
//! B: Arena DOM with namespace resolution (dom)
//! C: Compiled, cached XPath 1.0 subset (xpath)
//! D: Tables: key resolution, lookups and views (table)
//!
//! ```
//! use rustytable::{PathSpec, Table, XmlDocument};
//!
//! let doc = XmlDocument::parse(
//!     b"<interface-information>\
//!       <physical-interface><name>ge-0/0/0</name></physical-interface>\
//!       <physical-interface><name>ge-0/0/1</name></physical-interface>\
//!       </interface-information>",
//! );
//! let spec = PathSpec::new("physical-interface", "name").unwrap();
//! let table = Table::new("PhyPortTable", spec).with_document(doc);
//!
//! assert_eq!(table.len().unwrap(), 2);
//! assert!(table.contains("ge-0/0/1").unwrap());
//! assert_eq!(table.at(-1).unwrap(), table.lookup("ge-0/0/1").unwrap());
//! ```

mod core;
pub mod dom;
pub mod error;
mod reader;
pub mod table;
pub mod xpath;

pub use dom::{DocumentAccess, NodeId, XmlDocument};
pub use error::{Result, TableError};
pub use table::{
    load_definitions, ArgValue, Args, Definitions, FieldView, Item, Key, KeyQuery, KeySpec,
    PathSpec, Raw, Record, Request, Selection, Session, SessionError, SliceRange, Table, View,
};
pub use xpath::XPathValue;
