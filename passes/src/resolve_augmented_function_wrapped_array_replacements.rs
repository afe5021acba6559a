use crate::matching::{
    cached_eval, call_arguments, callee_declaration, is_literal_valued, replacement_text,
};
use log::debug;
use unmangle_core::{
    context::{context_of, fragment_source},
    Arborist, Evaluation, Filter, LitNode, NodeId, NodeKind, Sandbox,
};

/// Resolves the wrapped-string-array decoder idiom: a decoder function that
/// is augmented after its declaration (reassigned, or handed to an IIFE that
/// permutes the backing array) and then called with literal indices
/// throughout the program. Context collection carries the augmenting calls
/// and assignments along, and the fragment printer defers the permuting
/// IIFE past the declarations it touches.
pub(crate) fn find(arb: &Arborist, filter: Filter) -> Vec<NodeId> {
    arb.of_kind(NodeKind::CallExpression)
        .iter()
        .copied()
        .filter(|&id| {
            call_arguments(arb, id)
                .iter()
                .all(|&argument| is_literal_valued(arb, argument))
        })
        .filter(|&id| is_augmented_function_call(arb, id))
        .filter(|&id| filter(arb, id))
        .collect()
}

fn is_augmented_function_call(arb: &Arborist, call: NodeId) -> bool {
    let Some((decl, declaration)) = callee_declaration(arb, call) else {
        return false;
    };
    if arb.node(declaration).kind != NodeKind::FunctionDeclaration {
        return false;
    }
    arb.references(decl).iter().any(|&reference| {
        let Some(parent) = arb.node(reference).parent else {
            return false;
        };
        let key = arb.node(reference).parent_key;
        match arb.node(parent).kind {
            // The decoder's name is handed to a wrapper for augmentation.
            NodeKind::CallExpression => key == "arguments",
            // Or the decoder itself is reassigned after declaration.
            NodeKind::AssignmentExpression => key == "left",
            _ => false,
        }
    })
}

pub(crate) fn transform(arb: &mut Arborist, call: NodeId, sandbox: &mut Sandbox) {
    if arb.has_mark_intersecting(arb.node(call).start, arb.node(call).end) {
        return;
    }
    let Some((_, declaration)) = callee_declaration(arb, call) else {
        return;
    };

    let context = context_of(arb, declaration);
    let mut fragment = fragment_source(arb, &context, false);
    fragment.push_str(&format!("{};\n", arb.src(call)));

    match cached_eval(arb, &fragment, sandbox) {
        Evaluation::Value(LitNode::Undefined) | Evaluation::BadValue => {
            debug!("skipping augmented call {call}");
        }
        Evaluation::Value(lit) => {
            let text = replacement_text(arb, call, &lit);
            arb.mark_node(call, text);
        }
    }
}
