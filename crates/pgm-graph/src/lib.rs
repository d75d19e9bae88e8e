//! The typed-node store: a Bayesian network as a flat arena of [Node]s addressed by
//! [pgm_utils::ArenaKey], plus the structural queries (`build`'s topological/observation/
//! discreteness fixpoints, likelihood-child traversal) the sampler framework consumes.

mod graph;
mod node;
mod topo;

pub use graph::Graph;
pub use node::{Node, NodeKind};
