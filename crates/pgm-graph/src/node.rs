use std::sync::Arc;

use pgm_registry::{Distribution, Function};
use pgm_utils::ArenaKey;

/// The variant-specific payload of a node. Mirrors the source's const/logical/stochastic
/// visitor split as a sum type: match-dispatch at call sites instead of a vtable chain.
pub enum NodeKind {
    /// A value fixed at graph-construction time.
    Constant,
    /// A deterministic function of its parents, recomputed whenever any parent's value
    /// changes.
    Logical { function: Arc<dyn Function> },
    /// A random variable drawn from `prior`, optionally truncated to `[lower, upper]` —
    /// each bound, if present, is itself a node id (so a bound may be data-dependent).
    Stochastic {
        prior: Arc<dyn Distribution>,
        lower: Option<ArenaKey>,
        upper: Option<ArenaKey>,
    },
}

impl NodeKind {
    pub fn is_constant(&self) -> bool {
        matches!(self, NodeKind::Constant)
    }
    pub fn is_logical(&self) -> bool {
        matches!(self, NodeKind::Logical { .. })
    }
    pub fn is_stochastic(&self) -> bool {
        matches!(self, NodeKind::Stochastic { .. })
    }
}

/// One node of the graph. Dimension descriptor, parents, and the bookkeeping fields the
/// `build()` fixpoints populate (`rank`, `observed`, `discrete`).
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) dim: Vec<usize>,
    pub(crate) parents: Vec<ArenaKey>,
    pub(crate) value: Option<Vec<f64>>,
    /// For a stochastic node, whether the model declares this variable as data (a value is
    /// required by `build()`, supplied via `set_observation` before or after `add_stochastic`
    /// returns). Ignored for constant/logical nodes, whose `observed`-ness is structural.
    pub(crate) declared_observed: bool,
    pub(crate) observed: bool,
    pub(crate) discrete: bool,
    pub(crate) rank: usize,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn dim(&self) -> &[usize] {
        &self.dim
    }

    pub fn parents(&self) -> &[ArenaKey] {
        &self.parents
    }

    pub fn value(&self) -> Option<&[f64]> {
        self.value.as_deref()
    }

    pub fn is_observed(&self) -> bool {
        self.observed
    }

    pub fn is_discrete(&self) -> bool {
        self.discrete
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn prior(&self) -> Option<&Arc<dyn Distribution>> {
        match &self.kind {
            NodeKind::Stochastic { prior, .. } => Some(prior),
            _ => None,
        }
    }

    pub fn truncation(&self) -> Option<(Option<ArenaKey>, Option<ArenaKey>)> {
        match &self.kind {
            NodeKind::Stochastic { lower, upper, .. } => Some((*lower, *upper)),
            _ => None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self.truncation(), Some((l, u)) if l.is_some() || u.is_some())
    }
}
