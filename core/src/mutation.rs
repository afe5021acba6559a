use crate::{
    arborist::Arborist,
    context::{member_property_name, MUTATING_PROPERTIES},
    node::{NodeId, NodeKind},
};

/// Whether any reference to the given declaring identifier ever mutates the
/// binding: a write, an update, a delete, a destructuring or loop target, a
/// property assignment through it, or a content-modifying method call.
#[must_use]
pub fn is_binding_mutated(arb: &Arborist, decl: NodeId) -> bool {
    arb.references(decl)
        .iter()
        .any(|&reference| is_mutating_reference(arb, reference))
}

#[must_use]
pub fn is_mutating_reference(arb: &Arborist, reference: NodeId) -> bool {
    let Some(parent) = arb.node(reference).parent else {
        return false;
    };
    let key = arb.node(reference).parent_key;
    match arb.node(parent).kind {
        NodeKind::AssignmentExpression => key == "left",
        NodeKind::UpdateExpression => true,
        NodeKind::UnaryExpression => arb.node(parent).op() == Some("delete"),
        NodeKind::ForInStatement | NodeKind::ForOfStatement => key == "left",
        NodeKind::ArrayPattern
        | NodeKind::ObjectPattern
        | NodeKind::RestElement
        | NodeKind::AssignmentPattern
        | NodeKind::Property => pattern_is_write_target(arb, parent),
        NodeKind::MemberExpression if key == "object" => member_chain_mutates(arb, parent),
        _ => false,
    }
}

/// Climbs a pattern chain; the chain mutates its leaves when it is an
/// assignment or loop target (as opposed to a declaration).
fn pattern_is_write_target(arb: &Arborist, mut id: NodeId) -> bool {
    loop {
        let Some(parent) = arb.node(id).parent else {
            return false;
        };
        match arb.node(parent).kind {
            NodeKind::ArrayPattern
            | NodeKind::ObjectPattern
            | NodeKind::RestElement
            | NodeKind::AssignmentPattern
            | NodeKind::Property => id = parent,
            NodeKind::AssignmentExpression
            | NodeKind::ForInStatement
            | NodeKind::ForOfStatement => return arb.node(id).parent_key == "left",
            _ => return false,
        }
    }
}

fn member_chain_mutates(arb: &Arborist, mut member: NodeId) -> bool {
    while let Some(parent) = arb.node(member).parent {
        if arb.node(parent).kind == NodeKind::MemberExpression
            && arb.node(member).parent_key == "object"
        {
            member = parent;
        } else {
            break;
        }
    }
    let Some(parent) = arb.node(member).parent else {
        return false;
    };
    match arb.node(parent).kind {
        NodeKind::AssignmentExpression => arb.node(member).parent_key == "left",
        NodeKind::UpdateExpression => true,
        NodeKind::UnaryExpression => arb.node(parent).op() == Some("delete"),
        NodeKind::CallExpression => {
            arb.node(member).parent_key == "callee"
                && member_property_name(arb, member)
                    .is_some_and(|name| MUTATING_PROPERTIES.contains(&name))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::is_binding_mutated;
    use crate::{arborist::Arborist, node::NodeKind};

    fn first_decl_mutated(source: &str) -> bool {
        let arb = Arborist::new(source).unwrap();
        let declarator = arb.of_kind(NodeKind::VariableDeclarator)[0];
        let ident = arb.child_by_key(declarator, "id").unwrap();
        is_binding_mutated(&arb, ident)
    }

    fn function_decl_mutated(source: &str) -> bool {
        let arb = Arborist::new(source).unwrap();
        let function = arb.of_kind(NodeKind::FunctionDeclaration)[0];
        let ident = arb.child_by_key(function, "id").unwrap();
        is_binding_mutated(&arb, ident)
    }

    #[test]
    fn plain_reads_are_not_mutations() {
        assert!(!first_decl_mutated("var a = 1; a; a + a; f(a); a.length;"));
        assert!(!function_decl_mutated("function f() {} f(); f();"));
    }

    #[test]
    fn writes_are_mutations() {
        assert!(first_decl_mutated("var a = 1; a = 2;"));
        assert!(first_decl_mutated("var a = 1; a += 2;"));
        assert!(first_decl_mutated("var a = 1; a++;"));
        assert!(function_decl_mutated("function f() {} f = null;"));
    }

    #[test]
    fn property_writes_and_deletes_are_mutations() {
        assert!(first_decl_mutated("var a = {}; a.k = 1;"));
        assert!(first_decl_mutated("var a = {}; a.b.c = 1;"));
        assert!(first_decl_mutated("var a = {k: 1}; delete a.k;"));
    }

    #[test]
    fn mutating_method_calls_are_mutations() {
        assert!(first_decl_mutated("var a = []; a.push(1);"));
        assert!(first_decl_mutated("var a = []; a.sort();"));
        assert!(!first_decl_mutated("var a = []; a.slice(0); a.indexOf(1);"));
    }

    #[test]
    fn destructuring_and_loop_targets_are_mutations() {
        assert!(first_decl_mutated("var a = 1; [a] = [2];"));
        assert!(first_decl_mutated("var a = 1; ({x: a} = {x: 2});"));
        assert!(first_decl_mutated("var a; for (a in {}) {}"));
        assert!(first_decl_mutated("var a; for (a of []) {}"));
    }
}
