//! XPath 1.0 Engine
//!
//! Path expressions used by tables for item selection, key extraction and
//! key lookups:
//! - All 13 axis names (attribute values are read directly)
//! - Core function library
//! - Per-thread cache of compiled programs

pub mod axes;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use compiler::compile_cached;
pub use eval::{evaluate, evaluate_from_node, first_string, select_nodes};
pub use value::XPathValue;
