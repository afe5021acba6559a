use crate::matching::{eval_source, outermost, replacement_text, subtree_only};
use unmangle_core::{Arborist, Evaluation, Filter, NodeId, NodeKind, Sandbox};

const DEFINITE_KINDS: &[NodeKind] = &[
    NodeKind::BinaryExpression,
    NodeKind::UnaryExpression,
    NodeKind::Literal,
    NodeKind::BigIntLiteral,
];

/// Evaluates binary expressions whose entire subtree is literal-valued:
/// `5 * 3`, `'2' + 2`, `'o' - 'k'`, `3 - -1`. Logical expressions are a
/// different kind and are deliberately not candidates.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    let candidates = arb
        .of_kind(NodeKind::BinaryExpression)
        .iter()
        .copied()
        .filter(|&id| subtree_only(arb, id, DEFINITE_KINDS))
        .collect();
    outermost(arb, candidates)
        .into_iter()
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
    fn matches_literal_only_subtrees_at_their_outermost_node() {
        let arb = Arborist::new("5 * 3; '2' + 2; 3 - -1; 1 + 2 + 3; foo() + 5; a - 1;").unwrap();
        assert_eq!(find(&arb, accept_all).len(), 4);
    }

    #[test]
    fn logical_operators_are_not_candidates() {
        let arb = Arborist::new("true || false; 1 && 2;").unwrap();
        assert!(find(&arb, accept_all).is_empty());
    }
}
