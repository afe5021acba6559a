use unmangle_core::{Arborist, Filter, NodeId, NodeKind, Sandbox};

/// Removes never-referenced declarations whose initializer cannot have side
/// effects. Runs to fixpoint when cleanup is requested, since removing one
/// declaration can orphan another.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    let mut candidates = Vec::new();

    for &id in arb.of_kind(NodeKind::VariableDeclarator) {
        // Only single-declarator statements can be dropped cleanly.
        let Some(parent) = arb.node(id).parent else {
            continue;
        };
        if arb.node(parent).children.len() != 1 {
            continue;
        }
        let Some(pattern) = arb.child_by_key(id, "id") else {
            continue;
        };
        if arb.node(pattern).kind != NodeKind::Identifier
            || !arb.references(pattern).is_empty()
        {
            continue;
        }
        if arb
            .child_by_key(id, "init")
            .is_some_and(|init| !is_side_effect_free(arb, init))
        {
            continue;
        }
        if filter(arb, id) {
            candidates.push(id);
        }
    }

    for &id in arb.of_kind(NodeKind::FunctionDeclaration) {
        let Some(ident) = arb.child_by_key(id, "id") else {
            continue;
        };
        if arb.references(ident).is_empty() && filter(arb, id) {
            candidates.push(id);
        }
    }

    candidates.sort_unstable();
    candidates
}

pub(crate) fn transform(arb: &mut Arborist, node: NodeId, _sandbox: &mut Sandbox) {
    arb.mark_removed(node);
}

fn is_side_effect_free(arb: &Arborist, id: NodeId) -> bool {
    let node = arb.node(id);
    match node.kind {
        NodeKind::Literal
        | NodeKind::RegExpLiteral
        | NodeKind::BigIntLiteral
        | NodeKind::Identifier
        | NodeKind::ThisExpression
        | NodeKind::FunctionExpression
        | NodeKind::ArrowFunctionExpression => true,
        NodeKind::TemplateLiteral => node
            .children
            .iter()
            .all(|&child| arb.node(child).kind == NodeKind::TemplateElement),
        NodeKind::ArrayExpression => node
            .children
            .iter()
            .all(|&child| is_side_effect_free(arb, child)),
        NodeKind::ObjectExpression => node.children.iter().all(|&child| {
            arb.node(child).kind == NodeKind::Property
                && !arb.node(child).is_computed()
                && arb
                    .child_by_key(child, "value")
                    .is_some_and(|value| is_side_effect_free(arb, value))
        }),
        NodeKind::UnaryExpression => node.op() != Some("delete")
            && arb
                .child_by_key(id, "argument")
                .is_some_and(|argument| is_side_effect_free(arb, argument)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{find, transform};
    use unmangle_core::{accept_all, Arborist, Sandbox};

    fn run(source: &str) -> String {
        let mut arb = Arborist::new(source).unwrap();
        let mut sandbox = Sandbox::new();
        for node in find(&arb, accept_all) {
            transform(&mut arb, node, &mut sandbox);
        }
        arb.apply_changes().source().to_owned()
    }

    #[test]
    fn unreferenced_declarations_are_removed() {
        let output = run("var unused = 1;\nvar kept = 2;\nkept;\n");
        assert!(!output.contains("unused"));
        assert!(output.contains("var kept = 2;"));
    }

    #[test]
    fn unreferenced_functions_are_removed() {
        let output = run("function dead() {}\nfunction live() {}\nlive();\n");
        assert!(!output.contains("dead"));
        assert!(output.contains("function live"));
    }

    #[test]
    fn initializers_with_side_effects_are_kept() {
        let source = "var unused = doWork();";
        assert_eq!(run(source), source);
    }

    #[test]
    fn multi_declarator_statements_are_kept() {
        let source = "var unused = 1, used = 2; used;";
        assert_eq!(run(source), source);
    }
}
