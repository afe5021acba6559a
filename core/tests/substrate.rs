use strum::IntoEnumIterator;
use unmangle_core::{
    cache,
    context::{context_of, fragment_source},
    Arborist, Evaluation, LitNode, NodeKind, Sandbox,
};

#[test]
fn ids_are_dense_and_preorder() {
    let source = "var a = [1, 2];\nfunction f(x) { return a[x] + 1; }\nf(0);\n";
    let arb = Arborist::new(source).unwrap();
    for (index, node) in arb.nodes().iter().enumerate() {
        assert_eq!(node.id, index);
        if let Some(parent) = node.parent {
            assert!(parent < node.id);
            assert!(node.last_descendant <= arb.node(parent).last_descendant);
        }
    }
}

#[test]
fn reparsing_printed_source_preserves_kinds() {
    let source = "var a = [1, 2];\nfunction f(x) { return a[x] + 1; }\nf(0) ? g() : h(1, 'x');\n";
    let arb = Arborist::new(source).unwrap();
    let reparsed = Arborist::new(&arb.script()).unwrap();
    let kinds = |arb: &Arborist| {
        arb.nodes()
            .iter()
            .map(|node| node.kind)
            .collect::<Vec<_>>()
    };
    assert_eq!(kinds(&arb), kinds(&reparsed));
}

#[test]
fn type_map_partitions_the_node_table() {
    let source = "\
var a = [1, 2];
function f(x) { return a[x] !== undefined ? a[x] : -1; }
for (var i = 0; i < 2; i++) {
    f(i) + `t${i}`;
}
try { new f(...a); } catch (e) { throw e; }
";
    let arb = Arborist::new(source).unwrap();
    let mut total = 0;
    for kind in NodeKind::iter() {
        for &id in arb.of_kind(kind) {
            assert_eq!(arb.node(id).kind, kind, "typeMap bucket {kind} is impure");
            total += 1;
        }
    }
    // Every node is in exactly one bucket.
    assert_eq!(total, arb.nodes().len());
}

#[test]
fn committed_trees_uphold_the_metadata_invariants() {
    let mut arb = Arborist::new("var x = 1 + 2;\nconsole.log(x + x);\n").unwrap();
    let binary = arb.of_kind(NodeKind::BinaryExpression)[0];
    arb.mark_node(binary, "3".to_owned());
    let arb = arb.apply_changes();

    assert!(!arb.has_marks());
    // typeMap is exact on the rebuilt tree.
    for &id in arb.of_kind(NodeKind::BinaryExpression) {
        assert_eq!(arb.node(id).kind, NodeKind::BinaryExpression);
    }
    // Declaration/reference links are mutually consistent.
    for node in arb.nodes() {
        if let Some(info) = node.ident() {
            for &reference in &info.references {
                assert_eq!(arb.decl_of(reference), Some(node.id));
            }
        }
    }
}

#[test]
fn collected_fragments_are_self_contained() {
    let source = "\
var offset = 40;
var bump = function (n) { return n + offset; };
function answer() { return bump(2); }
";
    let arb = Arborist::new(source).unwrap();
    let function = arb.of_kind(NodeKind::FunctionDeclaration)[0];
    let context = context_of(&arb, function);
    let mut fragment = fragment_source(&arb, &context, false);
    fragment.push_str("answer();\n");

    assert_eq!(
        Sandbox::new().eval(&fragment),
        Evaluation::Value(LitNode::Num(42.0))
    );
}

#[test]
fn the_cache_is_single_generation() {
    let first = Some(cache::fingerprint("script one"));
    let second = Some(cache::fingerprint("script two"));
    cache::with_bucket(first, |bucket| {
        bucket.store_context("k".to_owned(), vec![1]);
    });
    assert!(cache::with_bucket(first, |bucket| bucket.context("k").is_some()));
    cache::with_bucket(second, |_| {});
    assert!(cache::with_bucket(first, |bucket| bucket.context("k").is_none()));
}
