use crate::matching::{cached_eval, call_arguments, callee, callee_name, replacement_text};
use log::debug;
use unmangle_core::{
    context::{context_of, fragment_source},
    Arborist, Evaluation, Filter, LitNode, NodeId, NodeKind, Sandbox,
};

/// Evaluates `eval(expr)` where `expr` reduces to a string, and replaces
/// the whole call with the evaluated code as source. Arguments that other
/// passes have already reduced to a string literal are substituted
/// directly; everything else is evaluated with its collected context.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    arb.of_kind(NodeKind::CallExpression)
        .iter()
        .copied()
        .filter(|&id| {
            callee_name(arb, id) == Some("eval")
                && callee(arb, id).is_some_and(|callee| arb.decl_of(callee).is_none())
        })
        .filter(|&id| {
            match call_arguments(arb, id).as_slice() {
                [argument] => {
                    !arb.node(*argument).kind.is_literal()
                        || arb.node(*argument).str_value().is_some()
                }
                _ => false,
            }
        })
        .filter(|&id| filter(arb, id))
        .collect()
}

pub(crate) fn transform(arb: &mut Arborist, call: NodeId, sandbox: &mut Sandbox) {
    let Some(argument) = call_arguments(arb, call).first().copied() else {
        return;
    };
    if arb.node(argument).kind == NodeKind::ThisExpression {
        return;
    }

    if let Some(code) = arb.node(argument).str_value() {
        let code = code.to_owned();
        substitute_code(arb, call, &code);
        return;
    }

    let context = context_of(arb, argument);
    let mut fragment = fragment_source(arb, &context, false);
    fragment.push_str(&format!("({});\n", arb.src(argument)));

    match cached_eval(arb, &fragment, sandbox) {
        Evaluation::Value(LitNode::Str(code)) => substitute_code(arb, call, &code),
        Evaluation::Value(LitNode::Undefined) | Evaluation::BadValue => {
            debug!("skipping eval call {call}");
        }
        Evaluation::Value(lit) => {
            let text = replacement_text(arb, call, &lit);
            arb.mark_node(call, text);
        }
    }
}

/// Substitutes evaluated source for the call. In expression position only a
/// single-expression payload is safe, and it gets parentheses so the
/// surrounding precedence is preserved; statement payloads are accepted
/// only where the call itself was a statement.
fn substitute_code(arb: &mut Arborist, call: NodeId, code: &str) {
    let Ok(parsed) = Arborist::new(code) else {
        debug!("eval payload at {call} does not parse");
        return;
    };
    let statement_position = arb
        .node(call)
        .parent
        .is_some_and(|parent| arb.node(parent).kind == NodeKind::ExpressionStatement);
    if statement_position {
        arb.mark_node(call, code.to_owned());
        return;
    }
    let program_body = &parsed.node(0).children;
    if let [statement] = program_body.as_slice() {
        if parsed.node(*statement).kind == NodeKind::ExpressionStatement {
            if let Some(expression) = parsed.child_by_key(*statement, "expression") {
                // Comma expressions change meaning in most embedded slots.
                let text = if parsed.node(expression).kind == NodeKind::SequenceExpression {
                    format!("({})", parsed.src(expression))
                } else {
                    parsed.src(expression).to_owned()
                };
                arb.mark_node(call, text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::find;
    use unmangle_core::{accept_all, Arborist};

    #[test]
    fn matches_string_reducible_arguments() {
        let arb = Arborist::new(
            "eval(atob('YQ==')); eval('literal'); eval(1); eval(a, b); window.eval(x);",
        )
        .unwrap();
        assert_eq!(find(&arb, accept_all).len(), 2);
    }

    #[test]
    fn shadowed_eval_is_not_a_candidate() {
        let arb = Arborist::new("function eval(x) { return x; } eval(foo());").unwrap();
        assert!(find(&arb, accept_all).is_empty());
    }
}
