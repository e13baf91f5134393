//! XPath Axes
//!
//! Every axis returns its nodes in axis order: document order for forward
//! axes, nearest-first for reverse axes. Proximity positions in predicates
//! count along that order.
//!
//! The attribute and namespace axes select no arena nodes; the evaluator
//! reads attribute values directly.

use super::parser::{Axis, NodeTest};
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// Navigate along an axis from a context node
pub fn navigate<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => {
            let mut result = vec![context];
            result.extend(doc.descendants_vec(context));
            result
        }
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => doc.ancestors_vec(context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(doc.ancestors_vec(context));
            result
        }
        Axis::FollowingSibling => siblings(doc, context, D::next_sibling_of),
        Axis::PrecedingSibling => siblings(doc, context, D::prev_sibling_of),
        Axis::Following => following(doc, context),
        Axis::Preceding => preceding(doc, context),
        Axis::SelfAxis => vec![context],
        Axis::Attribute | Axis::Namespace => Vec::new(),
    }
}

fn siblings<D: DocumentAccess + ?Sized>(
    doc: &D,
    context: NodeId,
    step: fn(&D, NodeId) -> Option<NodeId>,
) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = step(doc, context);
    while let Some(id) = current {
        result.push(id);
        current = step(doc, id);
    }
    result
}

/// Nodes after the context in document order, excluding descendants
fn following<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut anchor = Some(context);
    while let Some(node) = anchor {
        for sibling in siblings(doc, node, D::next_sibling_of) {
            result.push(sibling);
            result.extend(doc.descendants_vec(sibling));
        }
        anchor = doc.parent_of(node);
    }
    result
}

/// Nodes before the context in document order, excluding ancestors,
/// nearest first
fn preceding<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut anchor = Some(context);
    while let Some(node) = anchor {
        for sibling in siblings(doc, node, D::prev_sibling_of) {
            let mut subtree = doc.descendants_vec(sibling);
            subtree.reverse();
            result.extend(subtree);
            result.push(sibling);
        }
        anchor = doc.parent_of(node);
    }
    result
}

/// Check a node against a node test. Name tests and `*` only select elements.
pub fn matches_node_test<D: DocumentAccess + ?Sized>(
    doc: &D,
    node_id: NodeId,
    node_test: &NodeTest,
) -> bool {
    let Some(kind) = doc.node_kind_of(node_id) else {
        return false;
    };

    match node_test {
        NodeTest::Node => true,
        NodeTest::Text => matches!(kind, NodeKind::Text | NodeKind::CData),
        NodeTest::Comment => kind == NodeKind::Comment,
        NodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target
                    .as_deref()
                    .is_none_or(|t| doc.node_name(node_id) == Some(t))
        }
        _ if kind != NodeKind::Element => false,
        NodeTest::Any => true,
        NodeTest::Name(name) => doc.node_local_name(node_id) == Some(name.as_str()),
        NodeTest::QName(qname) => doc.node_name(node_id) == Some(qname.as_str()),
        NodeTest::Prefix(prefix) => doc
            .node_name(node_id)
            .and_then(|n| n.split_once(':'))
            .is_some_and(|(p, _)| p == prefix),
    }
}
