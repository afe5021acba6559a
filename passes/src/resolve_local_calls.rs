use crate::matching::{
    cached_eval, call_arguments, callee, callee_declaration, callee_name, property_name,
    replacement_text,
};
use log::debug;
use std::collections::HashMap;
use unmangle_core::{
    context::{context_of, fragment_source},
    mutation, Arborist, Evaluation, Filter, LitNode, NodeId, NodeKind, Sandbox,
};

/// Inlines calls whose callee resolves to a local declaration (or a literal
/// object method) by sandbox-evaluating the call together with its collected
/// context. Candidates are sorted by callee-name frequency, descending, so
/// high-leverage helpers land first.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    let mut candidates = Vec::new();
    for &id in arb.of_kind(NodeKind::CallExpression) {
        if resolves_locally(arb, id) && filter(arb, id) {
            candidates.push(id);
        }
    }

    let mut frequency: HashMap<String, usize> = HashMap::new();
    for &id in &candidates {
        if let Some(name) = candidate_name(arb, id) {
            *frequency.entry(name).or_insert(0) += 1;
        }
    }
    candidates.sort_by(|&a, &b| {
        let count = |id| {
            candidate_name(arb, id)
                .and_then(|name| frequency.get(&name).copied())
                .unwrap_or(0)
        };
        count(b).cmp(&count(a)).then(a.cmp(&b))
    });
    candidates
}

fn candidate_name(arb: &Arborist, call: NodeId) -> Option<String> {
    if let Some(name) = callee_name(arb, call) {
        return Some(name.to_owned());
    }
    let callee = callee(arb, call)?;
    property_name(arb, callee)
}

fn resolves_locally(arb: &Arborist, call: NodeId) -> bool {
    if let Some((_, declaration)) = callee_declaration(arb, call) {
        return match arb.node(declaration).kind {
            NodeKind::FunctionDeclaration => true,
            NodeKind::VariableDeclarator => arb.child_by_key(declaration, "init").is_some_and(
                |init| {
                    matches!(
                        arb.node(init).kind,
                        NodeKind::FunctionExpression | NodeKind::ArrowFunctionExpression
                    )
                },
            ),
            _ => false,
        };
    }
    // A method on a locally declared literal object.
    let Some(callee) = callee(arb, call) else {
        return false;
    };
    if arb.node(callee).kind != NodeKind::MemberExpression
        || property_name(arb, callee).is_none()
    {
        return false;
    }
    let Some(object) = arb.child_by_key(callee, "object") else {
        return false;
    };
    if arb.node(object).kind != NodeKind::Identifier {
        return false;
    }
    let Some(decl) = arb.decl_of(object) else {
        return false;
    };
    arb.node(decl)
        .parent
        .filter(|&declaration| arb.node(declaration).kind == NodeKind::VariableDeclarator)
        .and_then(|declaration| arb.child_by_key(declaration, "init"))
        .is_some_and(|init| arb.node(init).kind == NodeKind::ObjectExpression)
}

pub(crate) fn transform(arb: &mut Arborist, call: NodeId, sandbox: &mut Sandbox) {
    // ThisExpression arguments have no identity inside the fragment.
    if call_arguments(arb, call)
        .iter()
        .any(|&argument| arb.node(argument).kind == NodeKind::ThisExpression)
    {
        return;
    }
    // Skip calls landing inside a range this pass already rewrote.
    if arb.has_mark_intersecting(arb.node(call).start, arb.node(call).end) {
        return;
    }

    let declaration = match declaration_of(arb, call) {
        Some(declaration) => declaration,
        None => return,
    };

    // A trivial identifier/literal wrapper would cascade with other passes.
    if is_trivial_wrapper(arb, declaration) {
        return;
    }

    // Never inline through a binding some later statement rewrites.
    if let Some((decl, _)) = callee_declaration(arb, call) {
        if mutation::is_binding_mutated(arb, decl) {
            return;
        }
    }

    let context = context_of(arb, declaration);
    let mut fragment = fragment_source(arb, &context, false);
    fragment.push_str(&format!("{};\n", arb.src(call)));

    match cached_eval(arb, &fragment, sandbox) {
        Evaluation::Value(LitNode::Undefined) | Evaluation::BadValue => {
            debug!("skipping local call {call}");
        }
        Evaluation::Value(lit) => {
            let text = replacement_text(arb, call, &lit);
            arb.mark_node(call, text);
        }
    }
}

/// `var f = g;`, `var f = 'x';`, and `function f() { return <leaf>; }` are
/// wrappers other passes resolve more precisely; inlining them here would
/// cascade.
fn is_trivial_wrapper(arb: &Arborist, declaration: NodeId) -> bool {
    match arb.node(declaration).kind {
        NodeKind::VariableDeclarator => arb.child_by_key(declaration, "init").is_some_and(
            |init| matches!(arb.node(init).kind, NodeKind::Identifier | NodeKind::Literal),
        ),
        NodeKind::FunctionDeclaration => {
            let Some(body) = arb.child_by_key(declaration, "body") else {
                return false;
            };
            if let [statement] = arb.node(body).children.as_slice() {
                arb.node(*statement).kind == NodeKind::ReturnStatement
                    && arb.child_by_key(*statement, "argument").is_none_or(|argument| {
                        matches!(
                            arb.node(argument).kind,
                            NodeKind::Identifier | NodeKind::Literal
                        )
                    })
            } else {
                false
            }
        }
        _ => false,
    }
}

fn declaration_of(arb: &Arborist, call: NodeId) -> Option<NodeId> {
    if let Some((_, declaration)) = callee_declaration(arb, call) {
        return Some(declaration);
    }
    let callee = callee(arb, call)?;
    let object = arb.child_by_key(callee, "object")?;
    let decl = arb.decl_of(object)?;
    arb.node(decl).parent
}

#[cfg(test)]
mod tests {
    use super::find;
    use unmangle_core::{accept_all, Arborist};

    #[test]
    fn matches_calls_to_local_functions() {
        let arb =
            Arborist::new("function add(a, b) { return a + b; }\nadd(1, 2);\nglobalThing(3);\n")
                .unwrap();
        assert_eq!(find(&arb, accept_all).len(), 1);
    }

    #[test]
    fn frequency_sorts_candidates_descending() {
        let source = "\
function one() { return 1; }
function two() { return 2; }
one();
two();
two();
";
        let arb = Arborist::new(source).unwrap();
        let candidates = find(&arb, accept_all);
        assert_eq!(candidates.len(), 3);
        let first = arb.src(candidates[0]);
        assert!(first.starts_with("two"));
    }

    #[test]
    fn matches_literal_object_methods() {
        let arb = Arborist::new(
            "var util = {double: function (n) { return n * 2; }};\nutil.double(4);\n",
        )
        .unwrap();
        assert_eq!(find(&arb, accept_all).len(), 1);
    }
}
