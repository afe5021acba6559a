use crate::matching::{
    cached_eval, callee, is_literal_valued, property_name, replacement_text,
};
use if_chain::if_chain;
use log::debug;
use unmangle_core::{
    context::{context_of, fragment_source},
    Arborist, Evaluation, Filter, LitNode, NodeId, NodeKind, Sandbox,
};

/// When the program installs a method on a builtin prototype
/// (`String.prototype.x = function () {...}`) and later calls it on a
/// literal receiver (`'hello'.x()`), evaluates the body against the
/// receiver and substitutes the result. The installation itself stays.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    let installed = installed_methods(arb);
    if installed.is_empty() {
        return Vec::new();
    }
    arb.of_kind(NodeKind::CallExpression)
        .iter()
        .copied()
        .filter(|&id| {
            if_chain! {
                if let Some(callee) = callee(arb, id);
                if arb.node(callee).kind == NodeKind::MemberExpression;
                if let Some(method) = property_name(arb, callee);
                if installed.iter().any(|(name, _)| *name == method);
                if let Some(object) = arb.child_by_key(callee, "object");
                if is_literal_valued(arb, object);
                then {
                    true
                } else {
                    false
                }
            }
        })
        .filter(|&id| filter(arb, id))
        .collect()
}

/// Assignments of the shape `X.prototype.name = function`, keyed by `name`.
fn installed_methods(arb: &Arborist) -> Vec<(String, NodeId)> {
    let mut installed = Vec::new();
    for &id in arb.of_kind(NodeKind::AssignmentExpression) {
        if_chain! {
            if arb.node(id).op() == Some("=");
            if let Some(left) = arb.child_by_key(id, "left");
            if arb.node(left).kind == NodeKind::MemberExpression;
            if let Some(method) = property_name(arb, left);
            if let Some(object) = arb.child_by_key(left, "object");
            if arb.node(object).kind == NodeKind::MemberExpression;
            if property_name(arb, object).as_deref() == Some("prototype");
            if let Some(right) = arb.child_by_key(id, "right");
            if matches!(
                arb.node(right).kind,
                NodeKind::FunctionExpression | NodeKind::ArrowFunctionExpression
            );
            then {
                installed.push((method, id));
            }
        }
    }
    installed
}

pub(crate) fn transform(arb: &mut Arborist, call: NodeId, sandbox: &mut Sandbox) {
    let installed = installed_methods(arb);
    let assignment = if_chain! {
        if let Some(callee) = callee(arb, call);
        if let Some(method) = property_name(arb, callee);
        if let Some((_, assignment)) = installed.iter().find(|(name, _)| *name == method);
        then {
            *assignment
        } else {
            return;
        }
    };

    let context = context_of(arb, assignment);
    let mut fragment = fragment_source(arb, &context, false);
    fragment.push_str(&format!("{};\n", arb.src(call)));

    match cached_eval(arb, &fragment, sandbox) {
        Evaluation::Value(LitNode::Undefined) | Evaluation::BadValue => {
            debug!("skipping injected prototype method call {call}");
        }
        Evaluation::Value(lit) => {
            let text = replacement_text(arb, call, &lit);
            arb.mark_node(call, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::find;
    use unmangle_core::{accept_all, Arborist};

    #[test]
    fn matches_literal_receivers_of_installed_methods() {
        let source = "\
String.prototype.secret = function () { return 'secret ' + this; };
'hello'.secret();
value.secret();
'hello'.other();
";
        let arb = Arborist::new(source).unwrap();
        assert_eq!(find(&arb, accept_all).len(), 1);
    }

    #[test]
    fn nothing_matches_without_an_installation() {
        let arb = Arborist::new("'hello'.secret();").unwrap();
        assert!(find(&arb, accept_all).is_empty());
    }
}
