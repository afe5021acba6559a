#![warn(clippy::expect_used)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::panic)]

mod arborist;
pub use arborist::{Arborist, Mark};

mod builder;

pub mod cache;

pub mod cli;

pub mod context;

mod engine;
pub use engine::{deobfuscate, run, Config, Unmangle, DEFAULT_MAX_ITERATIONS};

mod literal;
pub use literal::{quote, Evaluation, LitNode};

pub mod mutation;

mod node;
pub use node::{IdentInfo, Node, NodeId, NodeKind, Payload, Scope, ScopeId, ScopeKind};

mod pass;
pub use pass::{accept_all, Catalogue, Filter, Pass, PassKind};

mod rewriter;

mod sandbox;
pub use sandbox::{Sandbox, DEFAULT_EVAL_BUDGET};

mod scope;
