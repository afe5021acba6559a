use crate::matching::is_valid_identifier;
use unmangle_core::{Arborist, Filter, NodeId, NodeKind, Sandbox};

/// `obj['key']` becomes `obj.key`, and `{['key']: v}` becomes `{key: v}`,
/// whenever the key is a valid, non-reserved identifier.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    let mut candidates = Vec::new();
    for &id in arb.of_kind(NodeKind::MemberExpression) {
        if !arb.node(id).is_computed() {
            continue;
        }
        let Some(property) = arb.child_by_key(id, "property") else {
            continue;
        };
        let Some(name) = arb.node(property).str_value() else {
            continue;
        };
        if is_valid_identifier(name) && filter(arb, id) {
            candidates.push(id);
        }
    }
    for &id in arb.of_kind(NodeKind::Property) {
        if !arb.node(id).is_computed() {
            continue;
        }
        if arb
            .node(id)
            .parent
            .is_some_and(|parent| arb.node(parent).kind == NodeKind::ObjectPattern)
        {
            continue;
        }
        let Some(key) = arb.child_by_key(id, "key") else {
            continue;
        };
        let Some(name) = arb.node(key).str_value() else {
            continue;
        };
        if is_valid_identifier(name) && filter(arb, id) {
            candidates.push(id);
        }
    }
    candidates.sort_unstable();
    candidates
}

pub(crate) fn transform(arb: &mut Arborist, node: NodeId, _sandbox: &mut Sandbox) {
    match arb.node(node).kind {
        NodeKind::MemberExpression => {
            let (Some(object), Some(property)) = (
                arb.child_by_key(node, "object"),
                arb.child_by_key(node, "property"),
            ) else {
                return;
            };
            let Some(name) = arb.node(property).str_value() else {
                return;
            };
            let text = format!("{}.{}", arb.src(object), name);
            arb.mark_node(node, text);
        }
        NodeKind::Property => {
            let (Some(key), Some(value)) = (
                arb.child_by_key(node, "key"),
                arb.child_by_key(node, "value"),
            ) else {
                return;
            };
            let Some(name) = arb.node(key).str_value() else {
                return;
            };
            let text = format!("{}: {}", name, arb.src(value));
            arb.mark_node(node, text);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::find;
    use unmangle_core::{accept_all, Arborist};

    #[test]
    fn matches_string_keys_that_are_valid_identifiers() {
        let arb = Arborist::new("a['b']; a['b c']; a[0]; a.b; a['for'];").unwrap();
        assert_eq!(find(&arb, accept_all).len(), 1);
    }

    #[test]
    fn matches_computed_object_keys() {
        let arb = Arborist::new("var o = {['k']: 1, q: 2};").unwrap();
        assert_eq!(find(&arb, accept_all).len(), 1);
    }
}
