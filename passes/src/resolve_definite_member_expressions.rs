use crate::matching::{eval_source, is_literal_valued, replacement_text};
use if_chain::if_chain;
use unmangle_core::{Arborist, Evaluation, Filter, LitNode, NodeId, NodeKind, Sandbox};

/// Folds `literal[index]` and `literal.length` when the base is a literal
/// string, array, or object expression and the result is itself a literal.
///
/// Skipped positions: update-expression operands, method-callee positions,
/// write targets, deletes, empty bases, and out-of-bounds indices (the
/// sandbox would yield `undefined`, which is not a safe substitute).
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    arb.of_kind(NodeKind::MemberExpression)
        .iter()
        .copied()
        .filter(|&id| base_is_foldable(arb, id))
        .filter(|&id| property_is_foldable(arb, id))
        .filter(|&id| position_is_safe(arb, id))
        .filter(|&id| in_bounds(arb, id))
        .filter(|&id| filter(arb, id))
        .collect()
}

fn base_is_foldable(arb: &Arborist, member: NodeId) -> bool {
    let Some(object) = arb.child_by_key(member, "object") else {
        return false;
    };
    let node = arb.node(object);
    match node.kind {
        NodeKind::Literal => node.str_value().is_some_and(|value| !value.is_empty()),
        NodeKind::ArrayExpression => !node.children.is_empty() && is_literal_valued(arb, object),
        NodeKind::ObjectExpression => !node.children.is_empty() && is_literal_valued(arb, object),
        _ => false,
    }
}

fn property_is_foldable(arb: &Arborist, member: NodeId) -> bool {
    let Some(property) = arb.child_by_key(member, "property") else {
        return false;
    };
    if arb.node(member).is_computed() {
        matches!(
            arb.node(property).kind,
            NodeKind::Literal
        )
    } else {
        arb.node(property).sym() == Some("length")
    }
}

fn position_is_safe(arb: &Arborist, member: NodeId) -> bool {
    let Some(parent) = arb.node(member).parent else {
        return true;
    };
    let key = arb.node(member).parent_key;
    match arb.node(parent).kind {
        NodeKind::UpdateExpression => false,
        NodeKind::CallExpression | NodeKind::NewExpression => key != "callee",
        NodeKind::AssignmentExpression => key != "left",
        NodeKind::UnaryExpression => arb.node(parent).op() != Some("delete"),
        _ => true,
    }
}

fn in_bounds(arb: &Arborist, member: NodeId) -> bool {
    if_chain! {
        if arb.node(member).is_computed();
        if let Some(object) = arb.child_by_key(member, "object");
        if let Some(property) = arb.child_by_key(member, "property");
        if let Some(index) = arb.node(property).num();
        then {
            if index.fract() != 0.0 || index < 0.0 {
                return false;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = index as usize;
            match arb.node(object).kind {
                NodeKind::Literal => arb
                    .node(object)
                    .str_value()
                    .is_some_and(|value| index < value.encode_utf16().count()),
                NodeKind::ArrayExpression => index < arb.node(object).children.len(),
                _ => true,
            }
        } else {
            true
        }
    }
}

pub(crate) fn transform(arb: &mut Arborist, node: NodeId, sandbox: &mut Sandbox) {
    let source = eval_source(arb, node);
    match sandbox.eval(&source) {
        Evaluation::Value(LitNode::Undefined) | Evaluation::BadValue => {}
        Evaluation::Value(lit) => {
            let text = replacement_text(arb, node, &lit);
            arb.mark_node(node, text);
        }
    }
}
