use unmangle_core::{Arborist, Filter, NodeId, NodeKind, Sandbox};

/// Renames declarations that shadow an outer binding to `<name>_<nodeId>`,
/// so later passes (and readers) can tell the bindings apart.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    let mut candidates = Vec::new();
    for scope in arb.scopes() {
        let Some(ancestor) = scope.parent else {
            continue;
        };
        for (name, &ident) in &scope.bindings {
            let mut shadowed = false;
            let mut current = Some(ancestor);
            while let Some(scope_id) = current {
                if arb.scope(scope_id).bindings.contains_key(name) {
                    shadowed = true;
                    break;
                }
                current = arb.scope(scope_id).parent;
            }
            if shadowed && filter(arb, ident) {
                candidates.push(ident);
            }
        }
    }
    candidates.sort_unstable();
    candidates.dedup();
    candidates
}

pub(crate) fn transform(arb: &mut Arborist, decl: NodeId, _sandbox: &mut Sandbox) {
    let Some(sym) = arb.node(decl).sym().map(ToOwned::to_owned) else {
        return;
    };
    let renamed = format!("{sym}_{decl}");

    // Bail when the fresh name is itself resolvable from here.
    let mut scope = Some(arb.node(decl).scope);
    while let Some(current) = scope {
        if arb.scope(current).bindings.contains_key(&renamed) {
            return;
        }
        scope = arb.scope(current).parent;
    }

    let mut sites = vec![decl];
    sites.extend_from_slice(arb.references(decl));
    for site in sites {
        // A shorthand property value must keep its key when renamed.
        let shorthand_property = arb.node(site).parent.filter(|&parent| {
            arb.node(parent).kind == NodeKind::Property
                && arb.node(parent).start == arb.node(site).start
                && arb.node(parent).end == arb.node(site).end
        });
        if let Some(property) = shorthand_property {
            arb.mark_node(property, format!("{sym}: {renamed}"));
        } else {
            arb.mark_node(site, renamed.clone());
        }
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
    fn inner_shadows_are_renamed_with_their_references() {
        let source = "var a = 1; function f(a) { return a + 1; }";
        let output = run(source);
        assert!(output.starts_with("var a = 1;"));
        assert!(!output.contains("function f(a)"));
        let renamed = output
            .split(['(', ')'])
            .nth(1)
            .unwrap()
            .to_owned();
        assert!(output.contains(&format!("return {renamed} + 1")));
    }

    #[test]
    fn unshadowed_bindings_are_untouched() {
        let source = "var a = 1; function f(b) { return b; }";
        assert_eq!(run(source), source);
    }

    #[test]
    fn renaming_is_idempotent() {
        let source = "var a = 1; function f(a) { return a; }";
        let once = run(source);
        assert_eq!(run(&once), once);
    }
}
