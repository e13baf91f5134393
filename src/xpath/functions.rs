//! XPath 1.0 Functions
//!
//! Core library subset used by table definitions and key predicates:
//!
//! - node-set: position(), last(), count(), name(), local-name(), namespace-uri()
//! - string: string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//! - boolean: boolean(), not(), true(), false()
//! - number: number(), sum(), floor(), ceiling(), round()
//!
//! Names are resolved when an expression is compiled, so an unknown function
//! fails at compile time rather than on first evaluation.

use super::value::XPathValue;
use crate::dom::{self, DocumentAccess, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Position,
    Last,
    Count,
    Name,
    LocalName,
    NamespaceUri,
    String,
    Concat,
    StartsWith,
    Contains,
    Substring,
    SubstringBefore,
    SubstringAfter,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "position" => Function::Position,
            "last" => Function::Last,
            "count" => Function::Count,
            "name" => Function::Name,
            "local-name" => Function::LocalName,
            "namespace-uri" => Function::NamespaceUri,
            "string" => Function::String,
            "concat" => Function::Concat,
            "starts-with" => Function::StartsWith,
            "contains" => Function::Contains,
            "substring" => Function::Substring,
            "substring-before" => Function::SubstringBefore,
            "substring-after" => Function::SubstringAfter,
            "string-length" => Function::StringLength,
            "normalize-space" => Function::NormalizeSpace,
            "translate" => Function::Translate,
            "boolean" => Function::Boolean,
            "not" => Function::Not,
            "true" => Function::True,
            "false" => Function::False,
            "number" => Function::Number,
            "sum" => Function::Sum,
            "floor" => Function::Floor,
            "ceiling" => Function::Ceiling,
            "round" => Function::Round,
            _ => return None,
        })
    }

    /// Accepted argument count range (inclusive)
    pub fn arity(self) -> (usize, usize) {
        use Function::*;
        match self {
            Position | Last | True | False => (0, 0),
            Name | LocalName | NamespaceUri | String | StringLength | NormalizeSpace | Number => {
                (0, 1)
            }
            Count | Boolean | Not | Sum | Floor | Ceiling | Round => (1, 1),
            StartsWith | Contains | SubstringBefore | SubstringAfter => (2, 2),
            Substring => (2, 3),
            Translate => (3, 3),
            Concat => (2, usize::MAX),
        }
    }
}

/// Evaluation context handed to function calls
pub struct CallContext<'a, D: DocumentAccess + ?Sized> {
    pub doc: &'a D,
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
}

/// Evaluate a function call; arity has already been checked by the compiler
pub fn call<D: DocumentAccess + ?Sized>(
    function: Function,
    args: Vec<XPathValue>,
    ctx: &CallContext<'_, D>,
) -> Result<XPathValue, String> {
    let doc = ctx.doc;
    let string_arg = |i: usize| match args.get(i) {
        Some(v) => resolve_string(v, doc),
        None => dom::node_string_value(doc, ctx.node),
    };

    let value = match function {
        Function::Position => XPathValue::Number(ctx.position as f64),
        Function::Last => XPathValue::Number(ctx.size as f64),
        Function::Count => match &args[0] {
            XPathValue::NodeSet(nodes) => XPathValue::Number(nodes.len() as f64),
            XPathValue::AttrValues(values) => XPathValue::Number(values.len() as f64),
            _ => return Err("count() argument must be a node-set".to_string()),
        },
        Function::Name | Function::LocalName | Function::NamespaceUri => {
            let node = match args.first() {
                None => Some(ctx.node),
                Some(XPathValue::NodeSet(nodes)) => nodes.first().copied(),
                Some(_) => return Err("name functions take a node-set argument".to_string()),
            };
            let name = node.and_then(|n| match function {
                Function::Name => doc.node_name(n),
                Function::LocalName => doc.node_local_name(n),
                _ => doc.node_namespace_uri(n),
            });
            XPathValue::String(name.unwrap_or("").to_string())
        }

        Function::String => XPathValue::String(string_arg(0)),
        Function::Concat => XPathValue::String(args.iter().map(|a| resolve_string(a, doc)).collect()),
        Function::StartsWith => XPathValue::Boolean(string_arg(0).starts_with(&string_arg(1))),
        Function::Contains => XPathValue::Boolean(string_arg(0).contains(&string_arg(1))),
        Function::Substring => {
            let len = args.get(2).map(XPathValue::to_number);
            XPathValue::String(substring(&string_arg(0), args[1].to_number(), len))
        }
        Function::SubstringBefore => {
            let s = string_arg(0);
            let needle = string_arg(1);
            XPathValue::String(s.find(&needle).map_or_else(String::new, |pos| s[..pos].to_string()))
        }
        Function::SubstringAfter => {
            let s = string_arg(0);
            let needle = string_arg(1);
            XPathValue::String(
                s.find(&needle)
                    .map_or_else(String::new, |pos| s[pos + needle.len()..].to_string()),
            )
        }
        Function::StringLength => XPathValue::Number(string_arg(0).chars().count() as f64),
        Function::NormalizeSpace => XPathValue::String(dom::normalize_space(&string_arg(0))),
        Function::Translate => {
            let from: Vec<char> = string_arg(1).chars().collect();
            let to: Vec<char> = string_arg(2).chars().collect();
            let translated = string_arg(0)
                .chars()
                .filter_map(|c| match from.iter().position(|&f| f == c) {
                    Some(pos) => to.get(pos).copied(),
                    None => Some(c),
                })
                .collect();
            XPathValue::String(translated)
        }

        Function::Boolean => XPathValue::Boolean(args[0].to_boolean()),
        Function::Not => XPathValue::Boolean(!args[0].to_boolean()),
        Function::True => XPathValue::Boolean(true),
        Function::False => XPathValue::Boolean(false),

        Function::Number => XPathValue::Number(match args.first() {
            Some(XPathValue::NodeSet(_)) | None => parse_number(&string_arg(0)),
            Some(v) => v.to_number(),
        }),
        Function::Sum => match &args[0] {
            XPathValue::NodeSet(nodes) => XPathValue::Number(
                nodes
                    .iter()
                    .map(|&n| parse_number(&dom::node_string_value(doc, n)))
                    .sum(),
            ),
            XPathValue::AttrValues(values) => {
                XPathValue::Number(values.iter().map(|v| parse_number(v)).sum())
            }
            _ => return Err("sum() argument must be a node-set".to_string()),
        },
        Function::Floor => XPathValue::Number(args[0].to_number().floor()),
        Function::Ceiling => XPathValue::Number(args[0].to_number().ceil()),
        // XPath rounds halves towards positive infinity
        Function::Round => XPathValue::Number((args[0].to_number() + 0.5).floor()),
    };

    Ok(value)
}

fn parse_number(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

/// XPath substring(): 1-based, rounded positions
fn substring(s: &str, start: f64, len: Option<f64>) -> String {
    let start = start.round();
    let end = len.map_or(f64::INFINITY, |l| start + l.round());
    s.chars()
        .enumerate()
        .filter(|&(i, _)| {
            let pos = (i + 1) as f64;
            pos >= start && pos < end
        })
        .map(|(_, c)| c)
        .collect()
}

/// String-value of any XPath value, resolving node-sets through the document
pub fn resolve_string<D: DocumentAccess + ?Sized>(val: &XPathValue, doc: &D) -> String {
    match val {
        XPathValue::NodeSet(nodes) => nodes
            .first()
            .map_or_else(String::new, |&first| dom::node_string_value(doc, first)),
        _ => val.to_string_value(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn call_str(doc: &XmlDocument, f: Function, args: Vec<XPathValue>) -> String {
        let ctx = CallContext {
            doc,
            node: doc.root_element_id().unwrap(),
            position: 1,
            size: 1,
        };
        call(f, args, &ctx).unwrap().to_string_value()
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Function::from_name("normalize-space"), Some(Function::NormalizeSpace));
        assert_eq!(Function::from_name("id"), None);
        assert_eq!(Function::Concat.arity(), (2, usize::MAX));
    }

    #[test]
    fn test_concat() {
        let doc = XmlDocument::parse(b"<r/>");
        let args = vec!["ge-".into(), "0/0/0".into()];
        assert_eq!(call_str(&doc, Function::Concat, args), "ge-0/0/0");
    }

    #[test]
    fn test_substring() {
        let doc = XmlDocument::parse(b"<r/>");
        let args = vec!["12345".into(), XPathValue::Number(1.5), XPathValue::Number(2.6)];
        assert_eq!(call_str(&doc, Function::Substring, args), "234");
        let args = vec!["hello".into(), XPathValue::Number(2.0)];
        assert_eq!(call_str(&doc, Function::Substring, args), "ello");
    }

    #[test]
    fn test_normalize_space_defaults_to_context() {
        let doc = XmlDocument::parse(b"<r>\n  ge-0/0/0  \n</r>");
        assert_eq!(call_str(&doc, Function::NormalizeSpace, vec![]), "ge-0/0/0");
    }

    #[test]
    fn test_translate() {
        let doc = XmlDocument::parse(b"<r/>");
        let args = vec!["ge-0/0/0".into(), "/-".into(), "_".into()];
        assert_eq!(call_str(&doc, Function::Translate, args), "ge0_0_0");
    }

    #[test]
    fn test_round_halves_up() {
        let doc = XmlDocument::parse(b"<r/>");
        assert_eq!(call_str(&doc, Function::Round, vec![XPathValue::Number(2.5)]), "3");
        assert_eq!(call_str(&doc, Function::Round, vec![XPathValue::Number(-2.5)]), "-2");
    }

    #[test]
    fn test_namespace_uri() {
        let doc = XmlDocument::parse(b"<root xmlns:ns=\"http://example.com\"><ns:child/></root>");
        let root = doc.root_element_id().unwrap();
        let child = doc.children_vec(root)[0];
        let ctx = CallContext {
            doc: &doc,
            node: root,
            position: 1,
            size: 1,
        };
        let uri = call(Function::NamespaceUri, vec![XPathValue::NodeSet(vec![child])], &ctx).unwrap();
        assert_eq!(uri.to_string_value(), "http://example.com");
    }
}
