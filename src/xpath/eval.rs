//! XPath Evaluation Engine
//!
//! Runs compiled stack programs against any `DocumentAccess` implementation.

use super::axes::{matches_node_test, navigate};
use super::compiler::{compile_cached, CompiledExpr, Op};
use super::functions::{self, CallContext};
use super::parser::{Axis, BinaryOp, NodeTest};
use super::value::XPathValue;
use crate::dom::{node_string_value, DocumentAccess, NodeId};

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess + ?Sized> {
    pub doc: &'a D,
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
}

impl<'a, D: DocumentAccess + ?Sized> EvalContext<'a, D> {
    pub fn new(doc: &'a D, context_node: NodeId) -> Self {
        EvalContext {
            doc,
            context_node,
            context_position: 1,
            context_size: 1,
        }
    }
}

/// Evaluate against the root element (the document node when there is none)
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate<D: DocumentAccess + ?Sized>(doc: &D, xpath: &str) -> Result<XPathValue, String> {
    let context = doc.root_element_id().unwrap_or(doc.document_node_id());
    evaluate_from_node(doc, context, xpath)
}

/// Evaluate an XPath expression from a specific context node
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate_from_node<D: DocumentAccess + ?Sized>(
    doc: &D,
    context_node: NodeId,
    xpath: &str,
) -> Result<XPathValue, String> {
    let compiled = compile_cached(xpath)?;
    evaluate_compiled(&compiled, &EvalContext::new(doc, context_node))
}

/// Nodes selected by `xpath` from `context_node`, in document order
pub fn select_nodes<D: DocumentAccess + ?Sized>(
    doc: &D,
    context_node: NodeId,
    xpath: &str,
) -> Result<Vec<NodeId>, String> {
    match evaluate_from_node(doc, context_node, xpath)? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(format!("{}: expected a node-set, got {:?}", xpath, other)),
    }
}

/// String-value of the first match, `None` when nothing matched
pub fn first_string<D: DocumentAccess + ?Sized>(
    doc: &D,
    context_node: NodeId,
    xpath: &str,
) -> Result<Option<String>, String> {
    Ok(match evaluate_from_node(doc, context_node, xpath)? {
        XPathValue::NodeSet(nodes) => nodes.first().map(|&n| node_string_value(doc, n)),
        XPathValue::AttrValues(values) => values.into_iter().next(),
        scalar => Some(scalar.to_string_value()),
    })
}

/// Run a compiled program
pub fn evaluate_compiled<D: DocumentAccess + ?Sized>(
    expr: &CompiledExpr,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, String> {
    let mut stack: Vec<XPathValue> = Vec::with_capacity(4);

    for op in &expr.ops {
        let value = match op {
            Op::Root => XPathValue::single_node(ctx.doc.document_node_id()),
            Op::Context => XPathValue::single_node(ctx.context_node),
            Op::Number(n) => XPathValue::Number(*n),
            Op::Literal(s) => XPathValue::String(s.clone()),

            Op::Step {
                axis,
                test,
                predicates,
            } => {
                let nodes = pop_nodeset(&mut stack, "location step")?;
                if *axis == Axis::Attribute {
                    if !predicates.is_empty() {
                        return Err("Predicates on the attribute axis are not supported".to_string());
                    }
                    XPathValue::AttrValues(attribute_values(ctx.doc, &nodes, test))
                } else {
                    XPathValue::NodeSet(step(ctx.doc, &nodes, *axis, test, predicates)?)
                }
            }

            Op::Filter(predicate) => {
                let nodes = pop_nodeset(&mut stack, "predicate")?;
                XPathValue::NodeSet(filter(ctx.doc, nodes, predicate)?)
            }

            Op::Union => {
                let right = pop_nodeset(&mut stack, "union")?;
                let mut left = pop_nodeset(&mut stack, "union")?;
                left.extend(right);
                left.sort_unstable();
                left.dedup();
                XPathValue::NodeSet(left)
            }

            Op::Negate => {
                let value = pop(&mut stack)?;
                XPathValue::Number(-to_number(ctx.doc, &value))
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                binary(ctx.doc, *op, &left, &right)
            }

            Op::Call(function, argc) => {
                let split = stack
                    .len()
                    .checked_sub(*argc)
                    .ok_or_else(|| "Stack underflow in function call".to_string())?;
                let args = stack.split_off(split);
                let call_ctx = CallContext {
                    doc: ctx.doc,
                    node: ctx.context_node,
                    position: ctx.context_position,
                    size: ctx.context_size,
                };
                functions::call(*function, args, &call_ctx)?
            }
        };
        stack.push(value);
    }

    pop(&mut stack)
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, String> {
    stack.pop().ok_or_else(|| "Stack underflow".to_string())
}

fn pop_nodeset(stack: &mut Vec<XPathValue>, what: &str) -> Result<Vec<NodeId>, String> {
    match pop(stack)? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(format!("{} requires a node-set, got {:?}", what, other)),
    }
}

/// One location step from every input node. Predicates see proximity
/// positions along the axis; the merged result is in document order.
fn step<D: DocumentAccess + ?Sized>(
    doc: &D,
    inputs: &[NodeId],
    axis: Axis,
    test: &NodeTest,
    predicates: &[CompiledExpr],
) -> Result<Vec<NodeId>, String> {
    let mut result = Vec::with_capacity(inputs.len());
    for &node in inputs {
        let mut selected: Vec<NodeId> = navigate(doc, node, axis)
            .into_iter()
            .filter(|&candidate| matches_node_test(doc, candidate, test))
            .collect();
        for predicate in predicates {
            selected = filter(doc, selected, predicate)?;
        }
        result.extend(selected);
    }
    if inputs.len() > 1 || axis.is_reverse() {
        result.sort_unstable();
        result.dedup();
    }
    Ok(result)
}

fn filter<D: DocumentAccess + ?Sized>(
    doc: &D,
    nodes: Vec<NodeId>,
    predicate: &CompiledExpr,
) -> Result<Vec<NodeId>, String> {
    let size = nodes.len();
    let mut kept = Vec::with_capacity(size);
    for (i, node) in nodes.into_iter().enumerate() {
        let ctx = EvalContext {
            doc,
            context_node: node,
            context_position: i + 1,
            context_size: size,
        };
        let include = match evaluate_compiled(predicate, &ctx)? {
            XPathValue::Number(n) => n == (i + 1) as f64,
            other => other.to_boolean(),
        };
        if include {
            kept.push(node);
        }
    }
    Ok(kept)
}

fn attribute_values<D: DocumentAccess + ?Sized>(
    doc: &D,
    nodes: &[NodeId],
    test: &NodeTest,
) -> Vec<String> {
    let mut values = Vec::new();
    for &node in nodes {
        for (name, value) in doc.attribute_values(node) {
            let local = name.split_once(':').map_or(name, |(_, l)| l);
            let matched = match test {
                NodeTest::Any | NodeTest::Node => true,
                NodeTest::Name(n) => local == n,
                NodeTest::QName(q) => name == q,
                NodeTest::Prefix(p) => name.split_once(':').is_some_and(|(prefix, _)| prefix == p),
                _ => false,
            };
            if matched {
                values.push(value.to_string());
            }
        }
    }
    values
}

/// Comparison operands: node-sets and attribute values compare per member
enum Operand {
    Many(Vec<String>),
    One(XPathValue),
}

fn operand<D: DocumentAccess + ?Sized>(doc: &D, value: &XPathValue) -> Operand {
    match value {
        XPathValue::NodeSet(nodes) => {
            Operand::Many(nodes.iter().map(|&n| node_string_value(doc, n)).collect())
        }
        XPathValue::AttrValues(values) => Operand::Many(values.clone()),
        other => Operand::One(other.clone()),
    }
}

fn to_number<D: DocumentAccess + ?Sized>(doc: &D, value: &XPathValue) -> f64 {
    match value {
        XPathValue::NodeSet(_) => functions::resolve_string(value, doc)
            .trim()
            .parse()
            .unwrap_or(f64::NAN),
        other => other.to_number(),
    }
}

fn binary<D: DocumentAccess + ?Sized>(
    doc: &D,
    op: BinaryOp,
    left: &XPathValue,
    right: &XPathValue,
) -> XPathValue {
    let arith = |f: fn(f64, f64) -> f64| XPathValue::Number(f(to_number(doc, left), to_number(doc, right)));
    match op {
        BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
        BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
        BinaryOp::Add => arith(|a, b| a + b),
        BinaryOp::Sub => arith(|a, b| a - b),
        BinaryOp::Mul => arith(|a, b| a * b),
        BinaryOp::Div => arith(|a, b| a / b),
        BinaryOp::Mod => arith(|a, b| a % b),
        _ => XPathValue::Boolean(compare(doc, op, left, right)),
    }
}

/// XPath 1.0 §3.4 comparison rules
fn compare<D: DocumentAccess + ?Sized>(
    doc: &D,
    op: BinaryOp,
    left: &XPathValue,
    right: &XPathValue,
) -> bool {
    match (operand(doc, left), operand(doc, right)) {
        (Operand::Many(l), Operand::Many(r)) => l
            .iter()
            .any(|a| r.iter().any(|b| compare_strings(op, a, b))),
        (Operand::Many(l), Operand::One(v)) => compare_many(op, &l, &v, false),
        (Operand::One(v), Operand::Many(r)) => compare_many(op, &r, &v, true),
        (Operand::One(a), Operand::One(b)) => compare_scalars(op, &a, &b),
    }
}

fn compare_many(op: BinaryOp, members: &[String], scalar: &XPathValue, flipped: bool) -> bool {
    let ordered = |a: XPathValue, b: XPathValue| {
        if flipped {
            compare_scalars(op, &b, &a)
        } else {
            compare_scalars(op, &a, &b)
        }
    };
    match scalar {
        XPathValue::Boolean(_) => ordered(XPathValue::Boolean(!members.is_empty()), scalar.clone()),
        _ => members
            .iter()
            .any(|m| ordered(XPathValue::String(m.clone()), scalar.clone())),
    }
}

fn compare_strings(op: BinaryOp, a: &str, b: &str) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::NotEq => a != b,
        _ => compare_numbers(op, parse(a), parse(b)),
    }
}

fn compare_scalars(op: BinaryOp, a: &XPathValue, b: &XPathValue) -> bool {
    let is_bool = |v: &XPathValue| matches!(v, XPathValue::Boolean(_));
    let is_num = |v: &XPathValue| matches!(v, XPathValue::Number(_));
    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = if is_bool(a) || is_bool(b) {
                a.to_boolean() == b.to_boolean()
            } else if is_num(a) || is_num(b) {
                a.to_number() == b.to_number()
            } else {
                a.to_string_value() == b.to_string_value()
            };
            equal == (op == BinaryOp::Eq)
        }
        _ => compare_numbers(op, a.to_number(), b.to_number()),
    }
}

fn compare_numbers(op: BinaryOp, a: f64, b: f64) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::NotEq => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::LtEq => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::GtEq => a >= b,
        _ => false,
    }
}

fn parse(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    const INTERFACES: &[u8] = b"<interface-information>\
        <physical-interface><name>\nge-0/0/0\n</name><oper-status>up</oper-status><mtu>1514</mtu></physical-interface>\
        <physical-interface><name>ge-0/0/1</name><oper-status>down</oper-status><mtu>9192</mtu></physical-interface>\
        <physical-interface junos:style=\"brief\"><name>ge-0/0/2</name><oper-status>up</oper-status><mtu>1514</mtu></physical-interface>\
        </interface-information>";

    fn names(doc: &XmlDocument, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .map(|&n| first_string(doc, n, "normalize-space(name)").unwrap().unwrap())
            .collect()
    }

    #[test]
    fn test_simple_path() {
        let doc = XmlDocument::parse(b"<root><child/></root>");
        let result = evaluate(&doc, "/root/child").unwrap();
        assert_eq!(result.as_nodeset().map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_relative_item_path() {
        let doc = XmlDocument::parse(INTERFACES);
        let items = select_nodes(&doc, doc.root_element_id().unwrap(), "physical-interface").unwrap();
        assert_eq!(names(&doc, &items), ["ge-0/0/0", "ge-0/0/1", "ge-0/0/2"]);
    }

    #[test]
    fn test_key_predicate() {
        let doc = XmlDocument::parse(INTERFACES);
        let hits = evaluate(&doc, "physical-interface[normalize-space(name)=\"ge-0/0/0\"]").unwrap();
        assert_eq!(hits.as_nodeset().map(<[_]>::len), Some(1));
        let hits = evaluate(&doc, "physical-interface[oper-status='up'][mtu > 1500]").unwrap();
        assert_eq!(hits.as_nodeset().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_positional_predicates() {
        let doc = XmlDocument::parse(INTERFACES);
        let last = evaluate(&doc, "physical-interface[last()]").unwrap().into_nodeset().unwrap();
        assert_eq!(names(&doc, &last), ["ge-0/0/2"]);
        let second = evaluate(&doc, "physical-interface[2]").unwrap().into_nodeset().unwrap();
        assert_eq!(names(&doc, &second), ["ge-0/0/1"]);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let doc = XmlDocument::parse(INTERFACES);
        let items = select_nodes(&doc, doc.root_element_id().unwrap(), "physical-interface").unwrap();
        let prev = select_nodes(&doc, items[2], "preceding-sibling::physical-interface[1]").unwrap();
        assert_eq!(names(&doc, &prev), ["ge-0/0/1"]);
        let up = first_string(&doc, items[0], "name(ancestor::*[1])").unwrap();
        assert_eq!(up.as_deref(), Some("interface-information"));
    }

    #[test]
    fn test_parent_and_attributes() {
        let doc = XmlDocument::parse(INTERFACES);
        let items = select_nodes(&doc, doc.root_element_id().unwrap(), "physical-interface").unwrap();
        let name = select_nodes(&doc, items[1], "name").unwrap();
        let back = select_nodes(&doc, name[0], "..").unwrap();
        assert_eq!(back, [items[1]]);
        assert_eq!(first_string(&doc, items[2], "@style").unwrap().as_deref(), Some("brief"));
        assert_eq!(first_string(&doc, items[0], "@style").unwrap(), None);
        let styled = evaluate(&doc, "physical-interface[@style='brief']").unwrap();
        assert_eq!(styled.as_nodeset().map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_count_and_sum() {
        let doc = XmlDocument::parse(INTERFACES);
        assert_eq!(evaluate(&doc, "count(physical-interface)").unwrap().to_number(), 3.0);
        assert_eq!(evaluate(&doc, "sum(physical-interface/mtu)").unwrap().to_number(), 12220.0);
        assert_eq!(evaluate(&doc, "count(//name | //mtu)").unwrap().to_number(), 6.0);
    }

    #[test]
    fn test_first_string_missing() {
        let doc = XmlDocument::parse(INTERFACES);
        let root = doc.root_element_id().unwrap();
        assert_eq!(first_string(&doc, root, "no-such-child").unwrap(), None);
    }

    #[test]
    fn test_errors_propagate() {
        let doc = XmlDocument::parse(INTERFACES);
        assert!(evaluate(&doc, "physical-interface[").is_err());
        assert!(select_nodes(&doc, 0, "count(//name)").is_err());
    }
}
