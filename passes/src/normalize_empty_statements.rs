use unmangle_core::{Arborist, Filter, NodeId, NodeKind, Sandbox};

/// Drops stray `;` statements from statement lists. An empty statement
/// serving as a loop body is not a candidate.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    arb.of_kind(NodeKind::EmptyStatement)
        .iter()
        .copied()
        .filter(|&id| {
            arb.node(id).parent.is_some_and(|parent| {
                matches!(
                    arb.node(parent).kind,
                    NodeKind::Program
                        | NodeKind::BlockStatement
                        | NodeKind::SwitchCase
                        | NodeKind::StaticBlock
                )
            })
        })
        .filter(|&id| filter(arb, id))
        .collect()
}

pub(crate) fn transform(arb: &mut Arborist, node: NodeId, _sandbox: &mut Sandbox) {
    arb.mark_removed(node);
}

#[cfg(test)]
mod tests {
    use super::find;
    use unmangle_core::{accept_all, Arborist};

    #[test]
    fn matches_list_level_empty_statements_only() {
        let arb = Arborist::new(";; if (a) {;} for (;;);").unwrap();
        // The `for` loop's empty body must survive.
        assert_eq!(find(&arb, accept_all).len(), 3);
    }
}
