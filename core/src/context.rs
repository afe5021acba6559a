use crate::{
    arborist::Arborist,
    cache,
    node::{NodeId, NodeKind},
    scope::pattern_bindings,
};

/// Property names whose invocation or assignment modifies the receiver's
/// contents.
pub const MUTATING_PROPERTIES: &[&str] = &[
    "push", "pop", "shift", "unshift", "splice", "sort", "reverse", "fill", "copyWithin",
    "forEach", "insert", "add", "set", "delete",
];

/// Collects the minimal set of nodes whose ordered source reproduces the
/// observable behavior of evaluating `origin`: the declarations it depends
/// on, every assignment and content-modifying operation on those bindings,
/// and the calls that augment them.
///
/// Results are memoised under both a node-id-qualified key and a
/// content-hash-only key, so structurally identical origins share the work.
pub fn context_of(arb: &Arborist, origin: NodeId) -> Vec<NodeId> {
    let content_hash = cache::fingerprint(arb.src(origin));
    let id_key = format!("{origin}-{content_hash:032x}");
    let hash_key = format!("{content_hash:032x}");

    let cached = cache::with_bucket(Some(arb.fingerprint()), |bucket| {
        bucket
            .context(&id_key)
            .or_else(|| bucket.context(&hash_key))
            .cloned()
    });
    if let Some(hit) = cached {
        return hit;
    }

    let collected = collect(arb, origin);
    cache::with_bucket(Some(arb.fingerprint()), |bucket| {
        bucket.store_context(id_key, collected.clone());
        bucket.store_context(hash_key, collected.clone());
    });
    collected
}

fn collect(arb: &Arborist, origin: NodeId) -> Vec<NodeId> {
    let mut stack = vec![origin];
    let mut visited = vec![false; arb.nodes().len()];
    let mut collected: Vec<NodeId> = Vec::new();
    let mut ranges: Vec<(usize, usize)> = Vec::new();

    while let Some(id) = stack.pop() {
        if visited[id] {
            continue;
        }
        visited[id] = true;
        if arb.marked_removed(id) {
            continue;
        }

        let node = arb.node(id);
        let contained = ranges
            .iter()
            .any(|&(start, end)| start <= node.start && node.end <= end);
        if !contained {
            collected.push(id);
            ranges.push((node.start, node.end));
        }

        // Descend so declarations referenced from within are discovered.
        stack.extend(node.children.iter().copied());

        // Free variables captured by any scope this node opens.
        if let Some(scope) = arb.scopes().iter().find(|scope| scope.owner == id) {
            stack.extend(scope.through.iter().copied());
        }

        match node.kind {
            NodeKind::VariableDeclarator => {
                if let Some(pattern) = arb.child_by_key(id, "id") {
                    let mut bindings = Vec::new();
                    pattern_bindings(arb.nodes(), pattern, &mut bindings);
                    for binding in bindings {
                        discover_binding_operations(arb, binding, &mut stack);
                    }
                }
            }
            NodeKind::AssignmentExpression => {
                if let Some(right) = arb.child_by_key(id, "right") {
                    stack.push(right);
                }
            }
            NodeKind::CallExpression => {
                for &child in &node.children {
                    if arb.node(child).parent_key == "arguments"
                        && arb.node(child).kind == NodeKind::Identifier
                    {
                        stack.push(child);
                    }
                }
            }
            NodeKind::MemberExpression => {
                if let Some(property) = arb.child_by_key(id, "property") {
                    stack.push(property);
                }
            }
            NodeKind::Identifier => {
                if let Some(decl) = arb.decl_of(id) {
                    if let Some(parent) = arb.node(decl).parent {
                        stack.push(parent);
                    }
                }
            }
            _ => {}
        }
    }

    // Drop nodes that ended up inside another collected node's range, then
    // the pure leaves that contribute no standalone statement.
    let mut result: Vec<NodeId> = collected
        .iter()
        .copied()
        .filter(|&id| {
            let node = arb.node(id);
            !collected.iter().any(|&other| {
                other != id
                    && arb.node(other).contains(node)
                    // On equal ranges keep only the outermost (lowest id).
                    && (!node.contains(arb.node(other)) || other < id)
            })
        })
        .filter(|&id| !arb.node(id).kind.is_pure_leaf())
        .collect();
    result.sort_unstable();
    result
}

/// Operations on a binding that context collection must carry along:
/// direct assignments, content-modifying property writes and method calls,
/// and calls taking the binding as an argument (augmenting functions).
fn discover_binding_operations(arb: &Arborist, binding: NodeId, stack: &mut Vec<NodeId>) {
    for &reference in arb.references(binding) {
        let Some(parent) = arb.node(reference).parent else {
            continue;
        };
        let key = arb.node(reference).parent_key;
        match arb.node(parent).kind {
            NodeKind::AssignmentExpression if key == "left" => stack.push(parent),
            NodeKind::CallExpression if key == "arguments" => stack.push(parent),
            NodeKind::MemberExpression if key == "object" => {
                let outer = outermost_member(arb, parent);
                let outer_parent = arb.node(outer).parent;
                if let Some(outer_parent) = outer_parent {
                    if arb.node(outer_parent).kind == NodeKind::AssignmentExpression
                        && arb.node(outer).parent_key == "left"
                    {
                        stack.push(outer_parent);
                        continue;
                    }
                    if arb.node(outer_parent).kind == NodeKind::CallExpression
                        && arb.node(outer).parent_key == "callee"
                        && member_property_name(arb, outer)
                            .is_some_and(|name| MUTATING_PROPERTIES.contains(&name))
                    {
                        stack.push(outer_parent);
                    }
                }
            }
            _ => {}
        }
    }
}

fn outermost_member(arb: &Arborist, mut member: NodeId) -> NodeId {
    while let Some(parent) = arb.node(member).parent {
        if arb.node(parent).kind == NodeKind::MemberExpression
            && arb.node(member).parent_key == "object"
        {
            member = parent;
        } else {
            break;
        }
    }
    member
}

pub(crate) fn member_property_name(arb: &Arborist, member: NodeId) -> Option<&str> {
    if arb.node(member).is_computed() {
        return None;
    }
    let property = arb.child_by_key(member, "property")?;
    arb.node(property).sym()
}

/// Prints an unordered node set as a self-contained fragment: pieces in
/// source order, IIFEs deferred to the end (they typically install
/// prototype methods or mutate globals), anonymous invoked function
/// expressions given deterministic `func<nodeId>` names, and each piece
/// newline-terminated.
#[must_use]
pub fn fragment_source(arb: &Arborist, nodes: &[NodeId], preserve_order: bool) -> String {
    let mut ids = nodes.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids.sort_by_key(|&id| arb.node(id).start);

    let mut pieces = Vec::new();
    let mut deferred = Vec::new();
    for id in ids {
        if !preserve_order && iife_call(arb, id).is_some() {
            deferred.push(iife_source(arb, id));
        } else {
            pieces.push(piece_source(arb, id));
        }
    }
    pieces.append(&mut deferred);

    let mut out = String::new();
    for piece in pieces {
        out.push_str(&piece);
        out.push('\n');
    }
    out
}

/// The invoked function-expression call underneath `id`, when `id` is an
/// IIFE (possibly wrapped in an expression statement and/or a unary
/// operator such as `!fn()`).
fn iife_call(arb: &Arborist, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        match arb.node(current).kind {
            NodeKind::ExpressionStatement => current = arb.child_by_key(current, "expression")?,
            NodeKind::UnaryExpression => current = arb.child_by_key(current, "argument")?,
            NodeKind::CallExpression => {
                let callee = arb.child_by_key(current, "callee")?;
                return matches!(
                    arb.node(callee).kind,
                    NodeKind::FunctionExpression | NodeKind::ArrowFunctionExpression
                )
                .then_some(current);
            }
            _ => return None,
        }
    }
}

fn iife_source(arb: &Arborist, id: NodeId) -> String {
    let node = arb.node(id);
    let mut src = arb.src(id).to_owned();
    if let Some(call) = iife_call(arb, id) {
        if let Some(callee) = arb.child_by_key(call, "callee") {
            if arb.node(callee).kind == NodeKind::FunctionExpression
                && arb.child_by_key(callee, "id").is_none()
            {
                // Name the function so the fragment can stand alone.
                let offset = arb.node(callee).start - node.start;
                if let Some(keyword) = src[offset..].find("function") {
                    let insert_at = offset + keyword + "function".len();
                    src.insert_str(insert_at, &format!(" func{callee}"));
                }
            }
        }
    }
    if node.kind == NodeKind::ExpressionStatement {
        src
    } else {
        format!("{src};")
    }
}

fn piece_source(arb: &Arborist, id: NodeId) -> String {
    let node = arb.node(id);
    let src = arb.src(id);
    match node.kind {
        NodeKind::VariableDeclarator => {
            let kind = node
                .parent
                .and_then(|parent| match arb.node(parent).payload {
                    crate::node::Payload::VarKind(kind) => Some(kind),
                    _ => None,
                })
                .unwrap_or("var");
            format!("{kind} {src};")
        }
        NodeKind::FunctionExpression | NodeKind::ArrowFunctionExpression => {
            format!("var func{id} = {src};")
        }
        NodeKind::CallExpression
        | NodeKind::AssignmentExpression
        | NodeKind::SequenceExpression
        | NodeKind::UnaryExpression
        | NodeKind::UpdateExpression
        | NodeKind::NewExpression => format!("{src};"),
        _ => src.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{context_of, fragment_source};
    use crate::{arborist::Arborist, node::NodeKind};

    fn context_source(source: &str, origin_kind: NodeKind, nth: usize) -> String {
        let arb = Arborist::new(source).unwrap();
        let origin = arb.of_kind(origin_kind)[nth];
        let context = context_of(&arb, origin);
        fragment_source(&arb, &context, false)
    }

    #[test]
    fn collects_the_declarations_a_call_depends_on() {
        let fragment = context_source(
            "var offset = 2;\nfunction add(a) { return a + offset; }\nadd(1);\n",
            NodeKind::FunctionDeclaration,
            0,
        );
        assert!(fragment.contains("function add"));
        assert!(fragment.contains("var offset = 2;"));
        assert!(!fragment.contains("add(1)"));
    }

    #[test]
    fn collects_assignments_and_mutating_calls_on_the_binding() {
        let fragment = context_source(
            "var arr = [1];\narr.push(2);\narr = arr.concat([3]);\nfunction get(i) { return arr[i]; }\nget(0);\n",
            NodeKind::FunctionDeclaration,
            0,
        );
        assert!(fragment.contains("var arr = [1];"));
        assert!(fragment.contains("arr.push(2);"));
        assert!(fragment.contains("arr = arr.concat([3]);"));
    }

    #[test]
    fn skips_unrelated_statements() {
        let fragment = context_source(
            "var a = 1;\nvar unrelated = 9;\nfunction f() { return a; }\n",
            NodeKind::FunctionDeclaration,
            0,
        );
        assert!(!fragment.contains("unrelated"));
    }

    #[test]
    fn defers_iifes_to_the_end() {
        let source = "\
var data = ['x'];
(function (arr) { arr.reverse(); })(data);
function pick(i) { return data[i]; }
";
        let arb = Arborist::new(source).unwrap();
        let origin = arb.of_kind(NodeKind::FunctionDeclaration)[0];
        let context = context_of(&arb, origin);
        let fragment = fragment_source(&arb, &context, false);
        let iife_at = fragment.find("arr.reverse").unwrap();
        assert!(fragment.find("var data").unwrap() < iife_at);
        assert!(fragment.find("function pick").unwrap() < iife_at);
    }

    #[test]
    fn names_anonymous_invoked_functions_deterministically() {
        let source = "var seed = (function () { return 1; })();\nfunction f() { return seed; }\n";
        let arb = Arborist::new(source).unwrap();
        let origin = arb.of_kind(NodeKind::FunctionDeclaration)[0];
        let context = context_of(&arb, origin);
        let fragment = fragment_source(&arb, &context, false);
        assert!(fragment.contains("var seed"));
    }

    #[test]
    fn identical_origins_share_a_cached_context() {
        let source = "var k = 3;\nfunction f(a) { return a * k; }\nf(1);\nf(2);\n";
        let arb = Arborist::new(source).unwrap();
        let function = arb.of_kind(NodeKind::FunctionDeclaration)[0];
        let first = context_of(&arb, function);
        let second = context_of(&arb, function);
        assert_eq!(first, second);
    }
}
