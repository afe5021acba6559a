use crate::matching::{
    call_arguments, callee, callee_name, eval_source, is_literal_valued, property_name,
    replacement_text,
};
use unmangle_core::{Arborist, Evaluation, Filter, LitNode, NodeId, NodeKind, Sandbox};

const PURE_GLOBAL_FUNCTIONS: &[&str] = &[
    "atob",
    "btoa",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "escape",
    "unescape",
    "parseInt",
    "parseFloat",
    "String",
    "Number",
    "Boolean",
];

const NAMESPACE_METHODS: &[(&str, &[&str])] = &[
    ("String", &["fromCharCode", "fromCodePoint", "raw"]),
    (
        "Number",
        &["isInteger", "isFinite", "isNaN", "parseFloat", "parseInt"],
    ),
    (
        // The pure subset; no Math.random.
        "Math",
        &[
            "abs", "acos", "asin", "atan", "atan2", "cbrt", "ceil", "cos", "exp", "floor",
            "hypot", "log", "log10", "log2", "max", "min", "pow", "round", "sign", "sin", "sqrt",
            "tan", "trunc",
        ],
    ),
    ("JSON", &["parse", "stringify"]),
];

const STRING_METHODS: &[&str] = &[
    "at",
    "charAt",
    "charCodeAt",
    "codePointAt",
    "concat",
    "endsWith",
    "includes",
    "indexOf",
    "lastIndexOf",
    "normalize",
    "padEnd",
    "padStart",
    "repeat",
    "replace",
    "replaceAll",
    "slice",
    "split",
    "startsWith",
    "substr",
    "substring",
    "toLowerCase",
    "toUpperCase",
    "trim",
    "trimEnd",
    "trimStart",
];

const ARRAY_METHODS: &[&str] = &["at", "concat", "flat", "includes", "indexOf", "join", "slice"];

/// Folds calls to a whitelisted set of pure globals and methods on literal
/// receivers. Refuses shadowed callees, computed properties with variable
/// keys, the `constructor` property, and any non-literal argument.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    arb.of_kind(NodeKind::CallExpression)
        .iter()
        .copied()
        .filter(|&id| callee_is_whitelisted(arb, id))
        .filter(|&id| {
            call_arguments(arb, id)
                .iter()
                .all(|&argument| is_literal_valued(arb, argument))
        })
        .filter(|&id| filter(arb, id))
        .collect()
}

fn callee_is_whitelisted(arb: &Arborist, call: NodeId) -> bool {
    if let Some(name) = callee_name(arb, call) {
        let Some(callee) = callee(arb, call) else {
            return false;
        };
        // A local declaration shadowing the builtin wins.
        return PURE_GLOBAL_FUNCTIONS.contains(&name) && arb.decl_of(callee).is_none();
    }

    let Some(callee) = callee(arb, call) else {
        return false;
    };
    if arb.node(callee).kind != NodeKind::MemberExpression {
        return false;
    }
    let Some(method) = property_name(arb, callee) else {
        // A computed property with a variable key is not resolvable.
        return false;
    };
    if method == "constructor" {
        return false;
    }
    let Some(object) = arb.child_by_key(callee, "object") else {
        return false;
    };

    match arb.node(object).kind {
        NodeKind::Identifier => {
            if arb.decl_of(object).is_some() {
                return false;
            }
            let Some(namespace) = arb.node(object).sym() else {
                return false;
            };
            NAMESPACE_METHODS
                .iter()
                .any(|&(name, methods)| name == namespace && methods.contains(&method.as_str()))
        }
        NodeKind::Literal => {
            arb.node(object).str_value().is_some()
                && STRING_METHODS.contains(&method.as_str())
        }
        NodeKind::ArrayExpression => {
            is_literal_valued(arb, object) && ARRAY_METHODS.contains(&method.as_str())
        }
        _ => false,
    }
}

pub(crate) fn transform(arb: &mut Arborist, node: NodeId, sandbox: &mut Sandbox) {
    let source = eval_source(arb, node);
    match sandbox.eval(&source) {
        Evaluation::Value(LitNode::Undefined) | Evaluation::BadValue => {}
        Evaluation::Value(lit) => {
            let text = replacement_text(arb, node, &lit);
            arb.mark_node(node, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::find;
    use unmangle_core::{accept_all, Arborist};

    #[test]
    fn matches_pure_globals_and_literal_receivers() {
        let arb = Arborist::new(
            "atob('YQ=='); String.fromCharCode(65); 'a,b'.split(','); [1, 2].join('-'); Math.floor(1.5);",
        )
        .unwrap();
        assert_eq!(find(&arb, accept_all).len(), 5);
    }

    #[test]
    fn refuses_shadowed_callees() {
        let arb = Arborist::new("function atob() { return 1; } atob('test');").unwrap();
        assert!(find(&arb, accept_all).is_empty());
    }

    #[test]
    fn refuses_unknown_receivers_variable_keys_and_impure_methods() {
        let arb = Arborist::new(
            "document.querySelector('div'); 'a'[method]('x'); ''.constructor('x'); Math.random(); 'a'.replace(cb, 'x');",
        )
        .unwrap();
        assert!(find(&arb, accept_all).is_empty());
    }
}
