use crate::matching::{call_arguments, callee};
use if_chain::if_chain;
use unmangle_core::{mutation, Arborist, Filter, NodeId, NodeKind, Sandbox};

/// Replaces argument-less calls to a function whose body is exactly
/// `return [...]` with the array literal itself.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    arb.of_kind(NodeKind::CallExpression)
        .iter()
        .copied()
        .filter(|&id| call_arguments(arb, id).is_empty())
        .filter(|&id| returned_array(arb, id).is_some())
        .filter(|&id| filter(arb, id))
        .collect()
}

fn returned_array(arb: &Arborist, call: NodeId) -> Option<NodeId> {
    let callee = callee(arb, call)?;
    if arb.node(callee).kind != NodeKind::Identifier {
        return None;
    }
    let decl = arb.decl_of(callee)?;
    if mutation::is_binding_mutated(arb, decl) {
        return None;
    }
    let declaration = arb.node(decl).parent?;
    let function = match arb.node(declaration).kind {
        NodeKind::FunctionDeclaration => declaration,
        NodeKind::VariableDeclarator => {
            let init = arb.child_by_key(declaration, "init")?;
            matches!(
                arb.node(init).kind,
                NodeKind::FunctionExpression | NodeKind::ArrowFunctionExpression
            )
            .then_some(init)?
        }
        _ => return None,
    };
    let body = arb.child_by_key(function, "body")?;
    if_chain! {
        if arb.node(body).kind == NodeKind::BlockStatement;
        if let [statement] = arb.node(body).children.as_slice();
        if arb.node(*statement).kind == NodeKind::ReturnStatement;
        if let Some(argument) = arb.child_by_key(*statement, "argument");
        if arb.node(argument).kind == NodeKind::ArrayExpression;
        then {
            Some(argument)
        } else {
            // An arrow with an expression body is the same shape.
            if arb.node(body).kind == NodeKind::ArrayExpression {
                Some(body)
            } else {
                None
            }
        }
    }
}

pub(crate) fn transform(arb: &mut Arborist, node: NodeId, _sandbox: &mut Sandbox) {
    if let Some(array) = returned_array(arb, node) {
        let text = arb.src(array).to_owned();
        arb.mark_node(node, text);
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
    fn calls_become_the_returned_array() {
        let output = run("function arr() { return [1, 2, 3]; }\nvar x = arr()[0];\n");
        assert!(output.contains("var x = [1, 2, 3][0];"));
    }

    #[test]
    fn functions_with_more_than_a_return_are_left_alone() {
        let source = "function arr() { log(); return [1]; }\nvar x = arr();\n";
        assert_eq!(run(source), source);
    }

    #[test]
    fn mutated_bindings_are_left_alone() {
        let source = "function arr() { return [1]; }\narr = other;\nvar x = arr();\n";
        assert_eq!(run(source), source);
    }

    #[test]
    fn calls_with_arguments_are_left_alone() {
        let source = "function arr() { return [1]; }\nvar x = arr(5);\n";
        assert_eq!(run(source), source);
    }
}
