#![warn(clippy::expect_used)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::panic)]

//! The pass catalogue: a static, ordered list of match/transform pairs the
//! orchestrator drives. Safe passes are purely syntactic; unsafe passes
//! consult the sandbox or reference analysis and fail closed per candidate.

use unmangle_core::{Arborist, Filter, NodeId, Pass, PassKind, Sandbox};

mod matching;

// Safe passes

mod convert_arrow_functions;
mod normalize_computed_members;
mod normalize_empty_statements;
mod rename_shadowed_identifiers;

// Unsafe passes

mod normalize_redundant_not_operator;
mod resolve_augmented_function_wrapped_array_replacements;
mod resolve_builtin_calls;
mod resolve_definite_binary_expressions;
mod resolve_definite_member_expressions;
mod resolve_deterministic_conditional_expressions;
mod resolve_eval_calls_on_non_literals;
mod resolve_function_to_array;
mod resolve_injected_prototype_method_calls;
mod resolve_local_calls;
mod resolve_minimal_alphabet;

// Cleanup

mod dead_code;

const fn safe(
    name: &'static str,
    find: fn(&Arborist, Filter) -> Vec<NodeId>,
    transform: fn(&mut Arborist, NodeId, &mut Sandbox),
) -> Pass {
    Pass {
        name,
        kind: PassKind::Safe,
        find,
        transform,
    }
}

const fn unsafe_(
    name: &'static str,
    find: fn(&Arborist, Filter) -> Vec<NodeId>,
    transform: fn(&mut Arborist, NodeId, &mut Sandbox),
) -> Pass {
    Pass {
        name,
        kind: PassKind::Unsafe,
        find,
        transform,
    }
}

/// The full catalogue in declared order. Ordering is load-bearing: later
/// passes exploit that earlier candidates have already landed.
#[must_use]
pub fn catalogue() -> unmangle_core::Catalogue {
    unmangle_core::Catalogue {
        safe: vec![
            safe(
                "normalizeComputedMembers",
                normalize_computed_members::find,
                normalize_computed_members::transform,
            ),
            safe(
                "normalizeEmptyStatements",
                normalize_empty_statements::find,
                normalize_empty_statements::transform,
            ),
            safe(
                "convertArrowFunctions",
                convert_arrow_functions::find,
                convert_arrow_functions::transform,
            ),
            safe(
                "renameShadowedIdentifiers",
                rename_shadowed_identifiers::find,
                rename_shadowed_identifiers::transform,
            ),
        ],
        unsafe_: vec![
            unsafe_(
                "resolveMinimalAlphabet",
                resolve_minimal_alphabet::find,
                resolve_minimal_alphabet::transform,
            ),
            unsafe_(
                "resolveDefiniteBinaryExpressions",
                resolve_definite_binary_expressions::find,
                resolve_definite_binary_expressions::transform,
            ),
            unsafe_(
                "resolveDefiniteMemberExpressions",
                resolve_definite_member_expressions::find,
                resolve_definite_member_expressions::transform,
            ),
            unsafe_(
                "resolveDeterministicConditionalExpressions",
                resolve_deterministic_conditional_expressions::find,
                resolve_deterministic_conditional_expressions::transform,
            ),
            unsafe_(
                "normalizeRedundantNotOperator",
                normalize_redundant_not_operator::find,
                normalize_redundant_not_operator::transform,
            ),
            unsafe_(
                "resolveBuiltinCalls",
                resolve_builtin_calls::find,
                resolve_builtin_calls::transform,
            ),
            unsafe_(
                "resolveFunctionToArray",
                resolve_function_to_array::find,
                resolve_function_to_array::transform,
            ),
            unsafe_(
                "resolveAugmentedFunctionWrappedArrayReplacements",
                resolve_augmented_function_wrapped_array_replacements::find,
                resolve_augmented_function_wrapped_array_replacements::transform,
            ),
            unsafe_(
                "resolveLocalCalls",
                resolve_local_calls::find,
                resolve_local_calls::transform,
            ),
            unsafe_(
                "resolveInjectedPrototypeMethodCalls",
                resolve_injected_prototype_method_calls::find,
                resolve_injected_prototype_method_calls::transform,
            ),
            unsafe_(
                "resolveEvalCallsOnNonLiterals",
                resolve_eval_calls_on_non_literals::find,
                resolve_eval_calls_on_non_literals::transform,
            ),
        ],
        cleanup: Some(safe("removeDeadNodes", dead_code::find, dead_code::transform)),
    }
}
