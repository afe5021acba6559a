use crate::matching::subtree_contains;
use unmangle_core::{Arborist, Filter, NodeId, NodeKind, Sandbox};

/// Rewrites arrow functions to function expressions when the body uses
/// neither `this` nor `arguments`, so the conversion cannot change meaning.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    arb.of_kind(NodeKind::ArrowFunctionExpression)
        .iter()
        .copied()
        .filter(|&id| !subtree_contains(arb, id, &[NodeKind::ThisExpression]))
        .filter(|&id| {
            let last = arb.node(id).last_descendant;
            !(id..=last).any(|descendant| {
                arb.node(descendant).kind == NodeKind::Identifier
                    && arb.node(descendant).sym() == Some("arguments")
            })
        })
        .filter(|&id| !arb.src(id).trim_start().starts_with("async"))
        .filter(|&id| filter(arb, id))
        .collect()
}

pub(crate) fn transform(arb: &mut Arborist, node: NodeId, _sandbox: &mut Sandbox) {
    let Some(body) = arb.child_by_key(node, "body") else {
        return;
    };
    let params = arb
        .node(node)
        .children
        .iter()
        .copied()
        .filter(|&child| arb.node(child).parent_key == "params")
        .map(|param| arb.src(param))
        .collect::<Vec<_>>()
        .join(", ");
    let text = if arb.node(body).kind == NodeKind::BlockStatement {
        format!("function ({}) {}", params, arb.src(body))
    } else {
        format!("function ({}) {{ return {}; }}", params, arb.src(body))
    };
    arb.mark_node(node, text);
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
    fn expression_bodies_gain_a_return() {
        assert_eq!(run("var f = x => x + 1;"), "var f = function (x) { return x + 1; };");
    }

    #[test]
    fn block_bodies_are_kept() {
        assert_eq!(
            run("var f = (a, b) => { return a * b; };"),
            "var f = function (a, b) { return a * b; };"
        );
    }

    #[test]
    fn arrows_capturing_this_are_left_alone() {
        let source = "var f = () => this.x;";
        assert_eq!(run(source), source);
    }

    #[test]
    fn arrows_reading_arguments_are_left_alone() {
        let source = "function g() { var f = () => arguments.length; }";
        assert_eq!(run(source), source);
    }
}
