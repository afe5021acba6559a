use crate::matching::{eval_source, outermost, replacement_text, subtree_contains, subtree_only};
use unmangle_core::{Arborist, Evaluation, Filter, NodeId, NodeKind, Sandbox};

const ALPHABET_KINDS: &[NodeKind] = &[
    NodeKind::UnaryExpression,
    NodeKind::BinaryExpression,
    NodeKind::ArrayExpression,
    NodeKind::Literal,
];

/// Folds the unary/array "alphabet" idiom of JSFuck-style obfuscators:
/// `+[]` is 0, `![]` is false, `+!+[]` is 1, `[]+[]` is the empty string.
/// The sandbox is the oracle; anything whose subtree reaches outside the
/// alphabet kinds (`+this`, identifiers, calls) is not a candidate.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    let mut candidates = Vec::new();
    for &id in arb.of_kind(NodeKind::UnaryExpression) {
        if matches!(arb.node(id).op(), Some("+" | "-" | "!" | "~")) {
            candidates.push(id);
        }
    }
    for &id in arb.of_kind(NodeKind::BinaryExpression) {
        if arb.node(id).op() == Some("+") {
            candidates.push(id);
        }
    }
    candidates.sort_unstable();
    let candidates = candidates
        .into_iter()
        .filter(|&id| subtree_only(arb, id, ALPHABET_KINDS))
        .filter(|&id| subtree_contains(arb, id, &[NodeKind::ArrayExpression]))
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
    fn matches_alphabet_idioms_only() {
        let arb = Arborist::new("+[]; ![]; +!+[]; [] + []; +this; +a; 1 + 2;").unwrap();
        assert_eq!(find(&arb, accept_all).len(), 4);
    }

    #[test]
    fn update_expressions_are_not_candidates() {
        let arb = Arborist::new("++[[]][0];").unwrap();
        assert!(find(&arb, accept_all).is_empty());
    }
}
