use crate::matching::is_literal_valued;
use unmangle_core::{Arborist, Evaluation, Filter, LitNode, NodeId, NodeKind, Sandbox};

/// Replaces ternaries with literal tests by the branch that is actually
/// taken.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    arb.of_kind(NodeKind::ConditionalExpression)
        .iter()
        .copied()
        .filter(|&id| {
            arb.child_by_key(id, "test")
                .is_some_and(|test| is_literal_valued(arb, test))
        })
        .filter(|&id| filter(arb, id))
        .collect()
}

pub(crate) fn transform(arb: &mut Arborist, node: NodeId, sandbox: &mut Sandbox) {
    let Some(test) = arb.child_by_key(node, "test") else {
        return;
    };
    let source = format!("!!({})", arb.src(test));
    let truthy = match sandbox.eval(&source) {
        Evaluation::Value(LitNode::Bool(value)) => value,
        _ => return,
    };
    let branch = arb.child_by_key(node, if truthy { "consequent" } else { "alternate" });
    if let Some(branch) = branch {
        let text = arb.src(branch).to_owned();
        arb.mark_node(node, text);
    }
}
