use crate::node::{Node, NodeId, NodeKind, Payload, Scope, ScopeId, ScopeKind};
use std::collections::HashSet;

/// Builds the scope tree over a freshly flattened node table, registers
/// declarations (with `var`/function hoisting), resolves identifier
/// references, and populates each scope's `through` set.
pub(crate) fn analyze(nodes: &mut [Node]) -> Vec<Scope> {
    let mut scopes = vec![Scope {
        id: 0,
        kind: ScopeKind::Program,
        parent: None,
        owner: 0,
        bindings: indexmap::IndexMap::new(),
        through: Vec::new(),
    }];

    assign_scopes(nodes, &mut scopes, 0, 0);
    let declarations = register_declarations(nodes, &mut scopes);
    resolve_references(nodes, &mut scopes, &declarations);

    scopes
}

fn opens_scope(nodes: &[Node], id: NodeId) -> Option<ScopeKind> {
    match nodes[id].kind {
        NodeKind::FunctionDeclaration
        | NodeKind::FunctionExpression
        | NodeKind::ArrowFunctionExpression
        | NodeKind::StaticBlock => Some(ScopeKind::Function),
        NodeKind::CatchClause => Some(ScopeKind::Catch),
        NodeKind::ForStatement
        | NodeKind::ForInStatement
        | NodeKind::ForOfStatement
        | NodeKind::SwitchStatement => Some(ScopeKind::Block),
        // A function body's top level is the function scope itself.
        NodeKind::BlockStatement => {
            let parent = nodes[id].parent?;
            if nodes[id].parent_key == "body"
                && matches!(
                    nodes[parent].kind,
                    NodeKind::FunctionDeclaration
                        | NodeKind::FunctionExpression
                        | NodeKind::ArrowFunctionExpression
                        | NodeKind::StaticBlock
                )
            {
                None
            } else {
                Some(ScopeKind::Block)
            }
        }
        _ => None,
    }
}

fn assign_scopes(nodes: &mut [Node], scopes: &mut Vec<Scope>, id: NodeId, current: ScopeId) {
    nodes[id].scope = current;
    let inner = if id == 0 {
        current
    } else if let Some(kind) = opens_scope(nodes, id) {
        let scope_id = scopes.len();
        scopes.push(Scope {
            id: scope_id,
            kind,
            parent: Some(current),
            owner: id,
            bindings: indexmap::IndexMap::new(),
            through: Vec::new(),
        });
        scope_id
    } else {
        current
    };
    let children = nodes[id].children.clone();
    for child in children {
        assign_scopes(nodes, scopes, child, inner);
    }
}

/// Identifiers bound by the pattern rooted at `id` (default values and
/// non-computed keys are not bindings).
pub(crate) fn pattern_bindings(nodes: &[Node], id: NodeId, out: &mut Vec<NodeId>) {
    match nodes[id].kind {
        NodeKind::Identifier => out.push(id),
        NodeKind::ArrayPattern | NodeKind::ObjectPattern => {
            for &child in &nodes[id].children {
                pattern_bindings(nodes, child, out);
            }
        }
        NodeKind::Property => {
            for &child in &nodes[id].children {
                if nodes[child].parent_key == "value" {
                    pattern_bindings(nodes, child, out);
                }
            }
        }
        NodeKind::RestElement => {
            for &child in &nodes[id].children {
                if nodes[child].parent_key == "argument" {
                    pattern_bindings(nodes, child, out);
                }
            }
        }
        NodeKind::AssignmentPattern => {
            for &child in &nodes[id].children {
                if nodes[child].parent_key == "left" {
                    pattern_bindings(nodes, child, out);
                }
            }
        }
        _ => {}
    }
}

fn scope_opened_by(scopes: &[Scope], nodes: &[Node], id: NodeId) -> ScopeId {
    scopes
        .iter()
        .find(|scope| scope.owner == id)
        .map_or(nodes[id].scope, |scope| scope.id)
}

fn hoist_target(scopes: &[Scope], from: ScopeId) -> ScopeId {
    let mut scope = from;
    loop {
        if scopes[scope].kind.is_var_boundary() {
            return scope;
        }
        match scopes[scope].parent {
            Some(parent) => scope = parent,
            None => return scope,
        }
    }
}

fn declare(scopes: &mut [Scope], scope: ScopeId, nodes: &[Node], ident: NodeId) {
    let Some(name) = nodes[ident].sym() else {
        return;
    };
    // The first declaration of a name is canonical; `var` redeclarations
    // resolve to it.
    scopes[scope]
        .bindings
        .entry(name.to_owned())
        .or_insert(ident);
}

fn register_declarations(nodes: &[Node], scopes: &mut [Scope]) -> HashSet<NodeId> {
    let mut declarations = HashSet::new();
    let mut bindings = Vec::new();

    for id in 0..nodes.len() {
        bindings.clear();
        match nodes[id].kind {
            NodeKind::VariableDeclarator => {
                let Some(pattern) = child_by_key(nodes, id, "id") else {
                    continue;
                };
                pattern_bindings(nodes, pattern, &mut bindings);
                let hoisted = nodes[id]
                    .parent
                    .is_some_and(|parent| nodes[parent].payload == Payload::VarKind("var"));
                let target = if hoisted {
                    hoist_target(scopes, nodes[id].scope)
                } else {
                    nodes[id].scope
                };
                for &ident in &bindings {
                    declare(scopes, target, nodes, ident);
                }
            }
            NodeKind::FunctionDeclaration | NodeKind::ClassDeclaration => {
                if let Some(ident) = child_by_key(nodes, id, "id") {
                    declare(scopes, nodes[id].scope, nodes, ident);
                    bindings.push(ident);
                }
            }
            NodeKind::FunctionExpression | NodeKind::ClassExpression => {
                if let Some(ident) = child_by_key(nodes, id, "id") {
                    let inner = scope_opened_by(scopes, nodes, id);
                    declare(scopes, inner, nodes, ident);
                    bindings.push(ident);
                }
            }
            NodeKind::CatchClause => {
                if let Some(param) = child_by_key(nodes, id, "param") {
                    pattern_bindings(nodes, param, &mut bindings);
                    let inner = scope_opened_by(scopes, nodes, id);
                    for &ident in &bindings {
                        declare(scopes, inner, nodes, ident);
                    }
                }
            }
            _ => {}
        }
        declarations.extend(bindings.iter().copied());

        // Parameters of the surrounding function.
        if matches!(
            nodes[id].kind,
            NodeKind::FunctionDeclaration
                | NodeKind::FunctionExpression
                | NodeKind::ArrowFunctionExpression
        ) {
            let inner = scope_opened_by(scopes, nodes, id);
            let mut params = Vec::new();
            for &child in &nodes[id].children {
                if nodes[child].parent_key == "params" {
                    pattern_bindings(nodes, child, &mut params);
                }
            }
            for &ident in &params {
                declare(scopes, inner, nodes, ident);
            }
            declarations.extend(params);
        }
    }

    declarations
}

fn child_by_key(nodes: &[Node], id: NodeId, key: &str) -> Option<NodeId> {
    nodes[id]
        .children
        .iter()
        .copied()
        .find(|&child| nodes[child].parent_key == key)
}

fn is_reference(nodes: &[Node], id: NodeId) -> bool {
    let Some(parent) = nodes[id].parent else {
        return false;
    };
    match (nodes[parent].kind, nodes[id].parent_key) {
        (NodeKind::MemberExpression, "property")
        | (
            NodeKind::Property | NodeKind::MethodDefinition | NodeKind::PropertyDefinition,
            "key",
        ) => nodes[parent].is_computed(),
        (
            NodeKind::LabeledStatement | NodeKind::BreakStatement | NodeKind::ContinueStatement,
            "label",
        ) => false,
        _ => true,
    }
}

fn resolve_references(nodes: &mut [Node], scopes: &mut [Scope], declarations: &HashSet<NodeId>) {
    for id in 0..nodes.len() {
        if nodes[id].kind != NodeKind::Identifier
            || declarations.contains(&id)
            || !is_reference(nodes, id)
        {
            continue;
        }
        let Some(name) = nodes[id].sym().map(ToOwned::to_owned) else {
            continue;
        };

        let mut decl = None;
        let mut scope = Some(nodes[id].scope);
        while let Some(current) = scope {
            if let Some(&ident) = scopes[current].bindings.get(&name) {
                decl = Some((ident, current));
                break;
            }
            scope = scopes[current].parent;
        }

        match decl {
            Some((ident, declaring_scope)) => {
                if let Payload::Ident(info) = &mut nodes[id].payload {
                    info.decl_node = Some(ident);
                }
                if let Payload::Ident(info) = &mut nodes[ident].payload {
                    info.references.push(id);
                }
                let mut current = nodes[id].scope;
                while current != declaring_scope {
                    scopes[current].through.push(id);
                    let Some(parent) = scopes[current].parent else {
                        break;
                    };
                    current = parent;
                }
            }
            None => {
                // Free names flow through every enclosing scope.
                let mut current = Some(nodes[id].scope);
                while let Some(scope) = current {
                    scopes[scope].through.push(id);
                    current = scopes[scope].parent;
                }
            }
        }
    }
}
