use regex::Regex;
use std::sync::LazyLock;
use unmangle_core::{cache, Arborist, Evaluation, NodeId, NodeKind, Sandbox};

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap()
});

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

pub(crate) fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name) && !RESERVED_WORDS.contains(&name)
}

/// Whether the subtree at `id` reduces to a value without consulting any
/// binding: literals, arrays/objects of such, and unary operators over such.
pub(crate) fn is_literal_valued(arb: &Arborist, id: NodeId) -> bool {
    let node = arb.node(id);
    match node.kind {
        NodeKind::Literal | NodeKind::RegExpLiteral | NodeKind::BigIntLiteral => true,
        NodeKind::TemplateLiteral => node
            .children
            .iter()
            .all(|&child| arb.node(child).kind == NodeKind::TemplateElement),
        NodeKind::ArrayExpression => node
            .children
            .iter()
            .all(|&child| is_literal_valued(arb, child)),
        NodeKind::ObjectExpression => node.children.iter().all(|&child| {
            let property = arb.node(child);
            property.kind == NodeKind::Property
                && !property.is_computed()
                && arb
                    .child_by_key(child, "value")
                    .is_some_and(|value| is_literal_valued(arb, value))
        }),
        NodeKind::UnaryExpression => arb
            .child_by_key(id, "argument")
            .is_some_and(|argument| is_literal_valued(arb, argument)),
        _ => false,
    }
}

/// Whether every node in the subtree at `id` has a kind from `allowed`.
/// Cheap thanks to pre-order id contiguity.
pub(crate) fn subtree_only(arb: &Arborist, id: NodeId, allowed: &[NodeKind]) -> bool {
    let last = arb.node(id).last_descendant;
    (id..=last).all(|descendant| allowed.contains(&arb.node(descendant).kind))
}

/// Whether the subtree at `id` contains a node of one of the given kinds.
pub(crate) fn subtree_contains(arb: &Arborist, id: NodeId, kinds: &[NodeKind]) -> bool {
    let last = arb.node(id).last_descendant;
    (id..=last).any(|descendant| kinds.contains(&arb.node(descendant).kind))
}

/// Drops candidates contained within another candidate, keeping outermost
/// ones. Assumes `candidates` is in ascending id order.
pub(crate) fn outermost(arb: &Arborist, candidates: Vec<NodeId>) -> Vec<NodeId> {
    let mut result: Vec<NodeId> = Vec::new();
    for id in candidates {
        let contained = result
            .iter()
            .any(|&kept| arb.node(kept).last_descendant >= id);
        if !contained {
            result.push(id);
        }
    }
    result
}

pub(crate) fn callee(arb: &Arborist, call: NodeId) -> Option<NodeId> {
    arb.child_by_key(call, "callee")
}

/// The callee's name when it is a bare identifier.
pub(crate) fn callee_name(arb: &Arborist, call: NodeId) -> Option<&str> {
    let callee = callee(arb, call)?;
    if arb.node(callee).kind == NodeKind::Identifier {
        arb.node(callee).sym()
    } else {
        None
    }
}

/// The property name of a member expression, for non-computed accesses and
/// computed accesses with a string-literal key.
pub(crate) fn property_name(arb: &Arborist, member: NodeId) -> Option<String> {
    let property = arb.child_by_key(member, "property")?;
    if arb.node(member).is_computed() {
        arb.node(property).str_value().map(ToOwned::to_owned)
    } else {
        arb.node(property).sym().map(ToOwned::to_owned)
    }
}

/// Arguments of a call, spread elements included.
pub(crate) fn call_arguments(arb: &Arborist, call: NodeId) -> Vec<NodeId> {
    arb.node(call)
        .children
        .iter()
        .copied()
        .filter(|&child| arb.node(child).parent_key == "arguments")
        .collect()
}

/// Replacement text for substituting `lit` at `node`: object literals in
/// statement position need parentheses to stay expressions.
pub(crate) fn replacement_text(
    arb: &Arborist,
    node: NodeId,
    lit: &unmangle_core::LitNode,
) -> String {
    let printed = lit.print();
    let statement_position = arb
        .node(node)
        .parent
        .is_some_and(|parent| arb.node(parent).kind == NodeKind::ExpressionStatement);
    if statement_position && lit.needs_statement_parens() {
        format!("({printed})")
    } else {
        printed
    }
}

/// Evaluation source for an expression candidate; parenthesized so object
/// and function forms stay expressions.
pub(crate) fn eval_source(arb: &Arborist, node: NodeId) -> String {
    format!("({})", arb.src(node))
}

/// The declaring identifier and declaring construct behind a call's
/// identifier callee.
pub(crate) fn callee_declaration(arb: &Arborist, call: NodeId) -> Option<(NodeId, NodeId)> {
    let callee = callee(arb, call)?;
    if arb.node(callee).kind != NodeKind::Identifier {
        return None;
    }
    let decl = arb.decl_of(callee)?;
    let declaration = arb.node(decl).parent?;
    Some((decl, declaration))
}

/// Sandbox evaluation memoised in the active cache generation under the
/// fragment's content hash.
pub(crate) fn cached_eval(arb: &Arborist, fragment: &str, sandbox: &mut Sandbox) -> Evaluation {
    let key = cache::fingerprint(fragment);
    let hit = cache::with_bucket(Some(arb.fingerprint()), |bucket| bucket.eval(key).cloned());
    if let Some(hit) = hit {
        return hit;
    }
    let evaluation = sandbox.eval(fragment);
    cache::with_bucket(Some(arb.fingerprint()), |bucket| {
        bucket.store_eval(key, evaluation.clone());
    });
    evaluation
}
