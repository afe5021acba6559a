use crate::{arborist::Arborist, node::NodeId, sandbox::Sandbox};
use log::debug;

/// Predicate composed over a pass's candidate stream.
pub type Filter = fn(&Arborist, NodeId) -> bool;

#[must_use]
pub fn accept_all(_: &Arborist, _: NodeId) -> bool {
    true
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PassKind {
    /// Purely syntactic; never consults the sandbox. Idempotent on fixpoint
    /// inputs.
    Safe,
    /// May consult the sandbox or reference analysis; fails closed per
    /// candidate.
    Unsafe,
}

/// A match/transform pair rewriting one class of patterns. `find` is a pure
/// search; `transform` stages marks on the arborist for one candidate and
/// must treat any failure as "skip this candidate".
#[derive(Clone, Copy)]
pub struct Pass {
    pub name: &'static str,
    pub kind: PassKind,
    pub find: fn(&Arborist, Filter) -> Vec<NodeId>,
    pub transform: fn(&mut Arborist, NodeId, &mut Sandbox),
}

impl Pass {
    /// Default entry point: match, transform each candidate against one
    /// shared sandbox, then commit. Callers must reassign the arborist,
    /// since committing may produce a new substrate.
    #[must_use]
    pub fn run(&self, arb: Arborist, filter: Filter) -> Arborist {
        let candidates = (self.find)(&arb, filter);
        if candidates.is_empty() {
            return arb;
        }
        debug!("{}: {} candidate(s)", self.name, candidates.len());

        let mut arb = arb;
        let mut sandbox = Sandbox::new();
        for node in candidates {
            (self.transform)(&mut arb, node, &mut sandbox);
        }
        if arb.has_marks() {
            debug!("{}: committing {} mark(s)", self.name, arb.mark_count());
        }
        arb.apply_changes()
    }
}

/// The ordered pass lists the orchestrator drives, plus the optional
/// dead-code cleanup pass.
pub struct Catalogue {
    pub safe: Vec<Pass>,
    pub unsafe_: Vec<Pass>,
    pub cleanup: Option<Pass>,
}
