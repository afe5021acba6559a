use crate::{
    builder,
    cache,
    node::{Node, NodeId, NodeKind, Scope, ScopeId},
    rewriter::{splice, Splice},
};
use anyhow::Result;
use indexmap::IndexMap;
use log::warn;
use std::collections::BTreeMap;

/// A staged replacement. `Replace` carries the printed source of the new
/// node; `Remove` deletes the enclosing statement.
#[derive(Clone, Debug)]
pub enum Mark {
    Replace(String),
    Remove,
}

/// The tree substrate: a flat, id-addressable syntax forest with scope and
/// reference metadata, plus the pending set of rewrite marks.
///
/// The arborist owns every node of the current tree. Passes hold node ids
/// only transiently; ids from before an `apply_changes` call are invalid on
/// the substrate it returns.
pub struct Arborist {
    source: String,
    fingerprint: u128,
    nodes: Vec<Node>,
    scopes: Vec<Scope>,
    type_map: IndexMap<NodeKind, Vec<NodeId>>,
    marks: BTreeMap<NodeId, Mark>,
}

impl Arborist {
    /// Parses `source` and builds the full substrate. A parse failure here
    /// is fatal to the job.
    pub fn new(source: &str) -> Result<Self> {
        let mut nodes = builder::build(source)?;
        let scopes = crate::scope::analyze(&mut nodes);
        let mut type_map: IndexMap<NodeKind, Vec<NodeId>> = IndexMap::new();
        for node in &nodes {
            type_map.entry(node.kind).or_default().push(node.id);
        }
        Ok(Self {
            source: source.to_owned(),
            fingerprint: cache::fingerprint(source),
            nodes,
            scopes,
            type_map,
            marks: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn fingerprint(&self) -> u128 {
        self.fingerprint
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    #[must_use]
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Current nodes of the given kind, in id (= source) order.
    #[must_use]
    pub fn of_kind(&self, kind: NodeKind) -> &[NodeId] {
        self.type_map.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// The verbatim source slice of a node.
    #[must_use]
    pub fn src(&self, id: NodeId) -> &str {
        let node = &self.nodes[id];
        &self.source[node.start..node.end]
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.nodes[id].parent.map(|parent| &self.nodes[parent])
    }

    #[must_use]
    pub fn child_by_key(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].parent_key == key)
    }

    /// Identifiers that resolve to the given declaring identifier.
    #[must_use]
    pub fn references(&self, decl: NodeId) -> &[NodeId] {
        self.nodes[decl]
            .ident()
            .map_or(&[], |info| info.references.as_slice())
    }

    /// The declaring identifier a reference resolves to, if any.
    #[must_use]
    pub fn decl_of(&self, ident: NodeId) -> Option<NodeId> {
        self.nodes[ident].ident().and_then(|info| info.decl_node)
    }

    /// The statement containing `id`: the ancestor sitting directly in a
    /// statement list, or filling a single-statement slot (an `if` arm, a
    /// loop body, a label's body).
    #[must_use]
    pub fn enclosing_statement(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            let in_list = matches!(
                self.nodes[parent].kind,
                NodeKind::Program
                    | NodeKind::BlockStatement
                    | NodeKind::SwitchCase
                    | NodeKind::StaticBlock
            );
            let in_single_slot = matches!(
                self.nodes[parent].kind,
                NodeKind::IfStatement
                    | NodeKind::WhileStatement
                    | NodeKind::DoWhileStatement
                    | NodeKind::ForStatement
                    | NodeKind::ForInStatement
                    | NodeKind::ForOfStatement
                    | NodeKind::LabeledStatement
            ) && matches!(
                self.nodes[current].parent_key,
                "body" | "consequent" | "alternate"
            );
            if in_list || in_single_slot {
                return current;
            }
            current = parent;
        }
        current
    }

    /// Stages a substitution of `id` by already-printed source text.
    pub fn mark_node(&mut self, id: NodeId, replacement: String) {
        self.marks.insert(id, Mark::Replace(replacement));
    }

    /// Stages removal of the statement enclosing `id`. A statement that is
    /// the sole body of an `if` arm or a loop cannot be spliced away without
    /// breaking its parent, so it degrades to an empty statement instead.
    pub fn mark_removed(&mut self, id: NodeId) {
        let statement = self.enclosing_statement(id);
        let in_list = self.nodes[statement].parent.is_some_and(|parent| {
            matches!(
                self.nodes[parent].kind,
                NodeKind::Program
                    | NodeKind::BlockStatement
                    | NodeKind::SwitchCase
                    | NodeKind::StaticBlock
            )
        });
        if in_list {
            self.marks.insert(statement, Mark::Remove);
        } else {
            self.marks.insert(statement, Mark::Replace(";".to_owned()));
        }
    }

    #[must_use]
    pub fn has_marks(&self) -> bool {
        !self.marks.is_empty()
    }

    #[must_use]
    pub fn mark_count(&self) -> usize {
        self.marks.len()
    }

    #[must_use]
    pub fn is_marked(&self, id: NodeId) -> bool {
        self.marks.contains_key(&id)
    }

    #[must_use]
    pub fn marked_removed(&self, id: NodeId) -> bool {
        matches!(self.marks.get(&id), Some(Mark::Remove))
    }

    /// Whether any pending mark's byte range intersects `[start, end)`.
    #[must_use]
    pub fn has_mark_intersecting(&self, start: usize, end: usize) -> bool {
        self.marks.keys().any(|&id| {
            let node = &self.nodes[id];
            node.start < end && start < node.end
        })
    }

    fn splices(&self) -> Vec<Splice<'_>> {
        let mut splices = self
            .marks
            .iter()
            .map(|(&id, mark)| {
                let node = &self.nodes[id];
                Splice {
                    start: node.start,
                    end: node.end,
                    text: match mark {
                        Mark::Replace(text) => text.as_str(),
                        Mark::Remove => "",
                    },
                }
            })
            .collect::<Vec<_>>();
        splices.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        // Outer marks win over marks staged within their range.
        let mut accepted: Vec<Splice> = Vec::new();
        for candidate in splices {
            if accepted
                .last()
                .is_none_or(|last| candidate.start >= last.end)
            {
                accepted.push(candidate);
            }
        }
        accepted
    }

    /// Printed source of the current tree with pending marks applied. Does
    /// not commit anything.
    #[must_use]
    pub fn script(&self) -> String {
        if self.marks.is_empty() {
            return self.source.clone();
        }
        splice(&self.source, &self.splices())
    }

    /// Commits pending marks: splices the source, reparses, and rebuilds all
    /// metadata. When the committed source no longer parses, the previous
    /// substrate is kept (marks discarded) and the pipeline continues.
    #[must_use]
    pub fn apply_changes(mut self) -> Self {
        if self.marks.is_empty() {
            return self;
        }
        let committed = self.script();
        match Self::new(&committed) {
            Ok(next) => next,
            Err(error) => {
                warn!("parse after rewrite failed, dropping {} mark(s): {error}", self.marks.len());
                self.marks.clear();
                self
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Arborist;
    use crate::node::NodeKind;

    #[test]
    fn node_ids_are_preorder_and_contiguous() {
        let arb = Arborist::new("var a = 1 + 2;\nfoo(a);\n").unwrap();
        for node in arb.nodes() {
            for &child in &node.children {
                assert!(child > node.id);
                assert!(child <= node.last_descendant);
                assert!(arb.node(child).last_descendant <= node.last_descendant);
            }
        }
    }

    #[test]
    fn type_map_is_exact() {
        let arb = Arborist::new("f(1); g(2); h(3);").unwrap();
        let calls = arb.of_kind(NodeKind::CallExpression);
        assert_eq!(calls.len(), 3);
        let by_scan = arb
            .nodes()
            .iter()
            .filter(|node| node.kind == NodeKind::CallExpression)
            .map(|node| node.id)
            .collect::<Vec<_>>();
        assert_eq!(calls, by_scan.as_slice());
    }

    #[test]
    fn references_and_declarations_are_consistent() {
        let arb = Arborist::new("var x = 1; x; x + x;").unwrap();
        let decl = arb
            .nodes()
            .iter()
            .find(|node| node.kind == NodeKind::Identifier && node.parent_key == "id")
            .unwrap();
        let references = arb.references(decl.id);
        assert_eq!(references.len(), 3);
        for &reference in references {
            assert_eq!(arb.decl_of(reference), Some(decl.id));
        }
    }

    #[test]
    fn src_is_the_exact_slice() {
        let source = "foo( 1 ,2 );";
        let arb = Arborist::new(source).unwrap();
        let call = arb.of_kind(NodeKind::CallExpression)[0];
        assert_eq!(arb.src(call), "foo( 1 ,2 )");
    }

    #[test]
    fn apply_changes_commits_marks() {
        let mut arb = Arborist::new("var x = 1 + 2;").unwrap();
        let binary = arb.of_kind(NodeKind::BinaryExpression)[0];
        arb.mark_node(binary, "3".to_owned());
        let arb = arb.apply_changes();
        assert_eq!(arb.source(), "var x = 3;");
        assert!(!arb.has_marks());
    }

    #[test]
    fn apply_changes_keeps_previous_tree_on_reparse_failure() {
        let mut arb = Arborist::new("var x = 1;").unwrap();
        let literal = arb.of_kind(NodeKind::Literal)[0];
        arb.mark_node(literal, "] oops [".to_owned());
        let arb = arb.apply_changes();
        assert_eq!(arb.source(), "var x = 1;");
        assert!(!arb.has_marks());
    }

    #[test]
    fn later_marks_overwrite_earlier_ones() {
        let mut arb = Arborist::new("1 + 2;").unwrap();
        let binary = arb.of_kind(NodeKind::BinaryExpression)[0];
        arb.mark_node(binary, "7".to_owned());
        arb.mark_node(binary, "3".to_owned());
        assert_eq!(arb.mark_count(), 1);
        assert_eq!(arb.apply_changes().source(), "3;");
    }

    #[test]
    fn outer_marks_win_over_nested_marks() {
        let mut arb = Arborist::new("1 + 2;").unwrap();
        let binary = arb.of_kind(NodeKind::BinaryExpression)[0];
        let literal = arb.of_kind(NodeKind::Literal)[0];
        arb.mark_node(literal, "9".to_owned());
        arb.mark_node(binary, "3".to_owned());
        assert_eq!(arb.apply_changes().source(), "3;");
    }

    #[test]
    fn mark_removed_deletes_the_enclosing_statement() {
        let mut arb = Arborist::new("var x = 1;\nfoo();\n").unwrap();
        let call = arb.of_kind(NodeKind::CallExpression)[0];
        arb.mark_removed(call);
        let arb = arb.apply_changes();
        assert_eq!(arb.source().trim(), "var x = 1;");
    }

    #[test]
    fn script_applies_marks_without_commit() {
        let mut arb = Arborist::new("1 + 2;").unwrap();
        let binary = arb.of_kind(NodeKind::BinaryExpression)[0];
        arb.mark_node(binary, "3".to_owned());
        assert_eq!(arb.script(), "3;");
        assert_eq!(arb.source(), "1 + 2;");
        assert!(arb.has_marks());
    }

    #[test]
    fn through_sets_capture_free_names() {
        let arb = Arborist::new("var a = 1; function f() { return a + b; }").unwrap();
        let function = arb.of_kind(NodeKind::FunctionDeclaration)[0];
        let scope = arb
            .scopes()
            .iter()
            .find(|scope| scope.owner == function)
            .unwrap();
        let through = scope
            .through
            .iter()
            .map(|&id| arb.node(id).sym().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert!(through.contains(&"a".to_owned()));
        assert!(through.contains(&"b".to_owned()));
    }
}
