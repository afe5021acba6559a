use crate::matching::{eval_source, is_literal_valued, replacement_text};
use unmangle_core::{Arborist, Evaluation, Filter, NodeId, NodeKind, Sandbox};

/// Folds `!expr` when `expr` is literal-reducible (literals, arrays,
/// objects, nested unaries). Only the outermost `!` of a chain is a
/// candidate, so `!!!x` folds in one step.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    arb.of_kind(NodeKind::UnaryExpression)
        .iter()
        .copied()
        .filter(|&id| arb.node(id).op() == Some("!"))
        .filter(|&id| {
            !arb.node(id).parent.is_some_and(|parent| {
                arb.node(parent).kind == NodeKind::UnaryExpression
                    && arb.node(parent).op() == Some("!")
            })
        })
        .filter(|&id| {
            arb.child_by_key(id, "argument")
                .is_some_and(|argument| is_literal_valued(arb, argument))
        })
        .filter(|&id| filter(arb, id))
        .collect()
}

pub(crate) fn transform(arb: &mut Arborist, node: NodeId, sandbox: &mut Sandbox) {
    let source = eval_source(arb, node);
    match sandbox.eval(&source) {
        Evaluation::Value(lit) => {
            let text = replacement_text(arb, node, &lit);
            arb.mark_node(node, text);
        }
        Evaluation::BadValue => {}
    }
}

#[cfg(test)]
mod tests {
    use super::find;
    use unmangle_core::{accept_all, Arborist};

    #[test]
    fn matches_only_literal_reducible_outermost_nots() {
        let arb = Arborist::new("!true; !!true; !a; !obj.prop; !func(); ![]; !-1;").unwrap();
        let candidates = find(&arb, accept_all);
        // !true, the outer of !!true, ![], and !-1.
        assert_eq!(candidates.len(), 4);
    }
}
