use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use pgm_error::{Result, ensure, pgm_bail, pgm_err};
use pgm_registry::{Distribution, Function};
use pgm_utils::{Arena, ArenaKey};

use crate::node::{Node, NodeKind};
use crate::topo::topological_order;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Building,
    Built,
}

/// Owns every node and its value buffer. Nothing outside the graph holds a node by
/// reference across a mutation — callers address nodes by [ArenaKey] and the graph hands
/// back borrows scoped to the call, which sidesteps the cyclic owner/visitor problem the
/// source's `NodeSampler ↔ Graph` callback pair runs into.
pub struct Graph {
    nodes: Arena<Node>,
    phase: Phase,
    order: Vec<ArenaKey>,
    children: Vec<Vec<ArenaKey>>,
    likelihood_cache: RefCell<HashMap<ArenaKey, Arc<[ArenaKey]>>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            phase: Phase::Building,
            order: Vec::new(),
            children: Vec::new(),
            likelihood_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.phase == Phase::Built
    }

    pub fn node(&self, id: ArenaKey) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| pgm_err!(ModelInvalid: "no such node id"))
    }

    fn require_building(&self) -> Result<()> {
        ensure!(self.phase == Phase::Building, LifecycleViolation: "graph is already built; no more nodes may be added");
        Ok(())
    }

    fn require_built(&self) -> Result<()> {
        ensure!(self.phase == Phase::Built, LifecycleViolation: "graph has not been built yet");
        Ok(())
    }

    fn dim_of(&self, id: ArenaKey) -> Result<&[usize]> {
        Ok(self.node(id)?.dim())
    }

    fn parent_dims(&self, parents: &[ArenaKey]) -> Result<Vec<&[usize]>> {
        parents.iter().map(|&p| self.dim_of(p)).collect()
    }

    /// Adds a node whose value is fixed at construction time.
    pub fn add_constant(&mut self, dim: Vec<usize>, values: Vec<f64>) -> Result<ArenaKey> {
        self.require_building()?;
        let expected: usize = dim.iter().product();
        ensure!(values.len() == expected, ModelInvalid: "constant: value length {} does not match dim product {}", values.len(), expected);
        Ok(self.nodes.insert(Node {
            kind: NodeKind::Constant,
            dim,
            parents: Vec::new(),
            value: Some(values),
            declared_observed: true,
            observed: false,
            discrete: false,
            rank: 0,
        }))
    }

    /// Adds a deterministic node computed from `parents` by `function`.
    pub fn add_logical(&mut self, function: Arc<dyn Function>, parents: Vec<ArenaKey>) -> Result<ArenaKey> {
        self.require_building()?;
        if let Some(arity) = function.arity() {
            ensure!(parents.len() == arity, ModelInvalid: "{}: expected {} parents, got {}", function.name(), arity, parents.len());
        }
        let dims = self.parent_dims(&parents)?;
        ensure!(function.check_param_dims(&dims), ModelInvalid: "{}: incompatible parent dims", function.name());
        let dim = function.output_dim(&dims);
        Ok(self.nodes.insert(Node {
            kind: NodeKind::Logical { function },
            dim,
            parents,
            value: None,
            declared_observed: false,
            observed: false,
            discrete: false,
            rank: 0,
        }))
    }

    /// Adds a random-variable node drawn from `prior`. `observed` declares that this
    /// variable is data: `build()` requires a value to have been supplied (via
    /// [Graph::set_observation]) for every node so declared.
    pub fn add_stochastic(
        &mut self,
        prior: Arc<dyn Distribution>,
        parents: Vec<ArenaKey>,
        observed: bool,
        lower: Option<ArenaKey>,
        upper: Option<ArenaKey>,
    ) -> Result<ArenaKey> {
        self.require_building()?;
        ensure!(parents.len() == prior.arity(), ModelInvalid: "{}: expected {} parents, got {}", prior.name(), prior.arity(), parents.len());
        let dims = self.parent_dims(&parents)?;
        ensure!(prior.check_param_dims(&dims), ModelInvalid: "{}: incompatible parent dims", prior.name());
        let dim = prior.output_dim(&dims);

        if let (Some(lo), Some(hi)) = (lower, upper) {
            let lo_node = self.node(lo)?;
            let hi_node = self.node(hi)?;
            if let (NodeKind::Constant, NodeKind::Constant) = (&lo_node.kind, &hi_node.kind) {
                let lo_val = lo_node.value.as_ref().and_then(|v| v.first()).copied();
                let hi_val = hi_node.value.as_ref().and_then(|v| v.first()).copied();
                if let (Some(lo_val), Some(hi_val)) = (lo_val, hi_val) {
                    ensure!(lo_val <= hi_val, ModelInvalid: "truncation lower bound {} exceeds upper bound {}", lo_val, hi_val);
                }
            }
        }

        Ok(self.nodes.insert(Node {
            kind: NodeKind::Stochastic { prior, lower, upper },
            dim,
            parents,
            value: None,
            declared_observed: observed,
            observed: false,
            discrete: false,
            rank: 0,
        }))
    }

    /// Attaches or replaces the observed value of a stochastic node. Before `build()` this
    /// just records the value; after `build()` it also re-runs observation/discreteness
    /// propagation and invalidates the likelihood-children cache, per §4.1.
    pub fn set_observation(&mut self, id: ArenaKey, values: Vec<f64>) -> Result<()> {
        let expected: usize = self.dim_of(id)?.iter().product();
        ensure!(values.len() == expected, DataError: "set_observation: value length {} does not match dim product {}", values.len(), expected);
        let node = self.nodes.get_mut(id).ok_or_else(|| pgm_err!(ModelInvalid: "no such node id"))?;
        ensure!(node.kind.is_stochastic(), ModelInvalid: "set_observation: node is not stochastic");
        node.value = Some(values);
        node.declared_observed = true;

        if self.phase == Phase::Built {
            self.likelihood_cache.borrow_mut().clear();
            self.propagate()?;
        }
        Ok(())
    }

    /// Clears a previously observed stochastic node back to latent. Used by `change_data`'s
    /// removal form at the facade layer.
    pub fn clear_observation(&mut self, id: ArenaKey) -> Result<()> {
        let node = self.nodes.get_mut(id).ok_or_else(|| pgm_err!(ModelInvalid: "no such node id"))?;
        ensure!(node.kind.is_stochastic(), ModelInvalid: "clear_observation: node is not stochastic");
        node.value = None;
        node.declared_observed = false;

        if self.phase == Phase::Built {
            self.likelihood_cache.borrow_mut().clear();
            self.propagate()?;
        }
        Ok(())
    }

    /// Computes topological rank, propagates observation and discreteness to their
    /// fixpoints, and rejects the graph if any declared-observed stochastic node still
    /// lacks a value. Idempotent failure: a failed `build()` leaves the graph in
    /// `Building` so the caller may fix the model and retry.
    pub fn build(&mut self) -> Result<()> {
        self.require_building()?;
        let order = topological_order(&self.nodes)?;

        let mut children: Vec<Vec<ArenaKey>> = vec![Vec::new(); self.nodes.len()];
        for (id, node) in self.nodes.iter() {
            for &parent in &node.parents {
                children[parent.index()].push(id);
            }
        }

        for (rank, &id) in order.iter().enumerate() {
            self.nodes.get_mut(id).unwrap().rank = rank;
        }

        self.order = order;
        self.children = children;
        self.phase = Phase::Built;
        self.propagate()?;

        for (id, node) in self.nodes.iter() {
            if node.kind.is_stochastic() && node.declared_observed && node.value.is_none() {
                self.phase = Phase::Building;
                pgm_bail!(ModelInvalid: "node {} is declared observed but no value was supplied", id.index());
            }
        }
        Ok(())
    }

    /// Recomputes every node's `observed`/`discrete` flags and every logical node's derived
    /// value, in topological order. Constants and explicit stochastic observations are
    /// read, never overwritten.
    fn propagate(&mut self) -> Result<()> {
        let n = self.nodes.len();
        let mut observed = vec![false; n];
        let mut discrete = vec![false; n];
        let mut values: Vec<Option<Vec<f64>>> = vec![None; n];

        for &id in &self.order {
            let node = &self.nodes[id];
            match &node.kind {
                NodeKind::Constant => {
                    let v = node.value.as_ref().expect("constant node always carries a value");
                    observed[id.index()] = true;
                    discrete[id.index()] = v.iter().all(|x| x.fract() == 0.0);
                    values[id.index()] = Some(v.clone());
                }
                NodeKind::Stochastic { prior, .. } => {
                    let param_discrete: Vec<bool> = node.parents.iter().map(|p| discrete[p.index()]).collect();
                    observed[id.index()] = node.value.is_some();
                    discrete[id.index()] = prior.is_discrete_valued(&param_discrete);
                    values[id.index()] = node.value.clone();
                }
                NodeKind::Logical { function } => {
                    let all_observed = node.parents.iter().all(|p| observed[p.index()]);
                    let parent_discrete: Vec<bool> = node.parents.iter().map(|p| discrete[p.index()]).collect();
                    discrete[id.index()] = function.is_discrete_valued(&parent_discrete);
                    observed[id.index()] = all_observed;
                    if all_observed {
                        let parent_dims: Vec<&[usize]> = node.parents.iter().map(|&p| self.nodes[p].dim.as_slice()).collect();
                        let parent_values: Vec<Vec<f64>> =
                            node.parents.iter().map(|p| values[p.index()].clone().unwrap()).collect();
                        let parent_refs: Vec<&[f64]> = parent_values.iter().map(|v| v.as_slice()).collect();
                        let mut out = vec![0.0; node.dim.iter().product()];
                        function.eval(&mut out, &parent_refs, &parent_dims)?;
                        values[id.index()] = Some(out);
                    }
                }
            }
        }

        for &id in &self.order {
            let o = observed[id.index()];
            let d = discrete[id.index()];
            let v = values[id.index()].take();
            let node = self.nodes.get_mut(id).unwrap();
            node.observed = o;
            node.discrete = d;
            node.value = v;
        }
        Ok(())
    }

    pub fn sorted_ids(&self) -> Result<&[ArenaKey]> {
        self.require_built()?;
        Ok(&self.order)
    }

    pub fn parents(&self, id: ArenaKey) -> Result<&[ArenaKey]> {
        Ok(self.node(id)?.parents())
    }

    pub fn children(&self, id: ArenaKey) -> Result<&[ArenaKey]> {
        self.require_built()?;
        Ok(&self.children[id.index()])
    }

    pub fn stochastic_children(&self, id: ArenaKey) -> Result<Vec<ArenaKey>> {
        Ok(self
            .children(id)?
            .iter()
            .copied()
            .filter(|&c| self.nodes[c].kind.is_stochastic())
            .collect())
    }

    /// Observed stochastic descendants of `id` reachable through logical nodes only,
    /// computed lazily and cached until the next observation change.
    pub fn likelihood_children(&self, id: ArenaKey) -> Result<Arc<[ArenaKey]>> {
        self.require_built()?;
        if let Some(cached) = self.likelihood_cache.borrow().get(&id) {
            return Ok(Arc::clone(cached));
        }

        let mut result = Vec::new();
        let mut stack: Vec<ArenaKey> = self.children[id.index()].clone();
        let mut visited: std::collections::HashSet<ArenaKey> = std::collections::HashSet::new();
        while let Some(cur) = stack.pop() {
            if !visited.insert(cur) {
                continue;
            }
            let node = &self.nodes[cur];
            match &node.kind {
                NodeKind::Stochastic { .. } => {
                    if node.observed {
                        result.push(cur);
                    }
                }
                NodeKind::Logical { .. } => {
                    stack.extend(self.children[cur.index()].iter().copied());
                }
                NodeKind::Constant => {}
            }
        }

        let arc: Arc<[ArenaKey]> = Arc::from(result);
        self.likelihood_cache.borrow_mut().insert(id, Arc::clone(&arc));
        Ok(arc)
    }

    pub fn has_cycle(&self) -> bool {
        topological_order(&self.nodes).is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_registry::distributions::{DBern, DNorm};
    use pgm_registry::functions::Identity;

    #[test]
    fn build_assigns_topological_ranks() {
        let mut g = Graph::new();
        let mu = g.add_constant(vec![1], vec![0.0]).unwrap();
        let tau = g.add_constant(vec![1], vec![1.0]).unwrap();
        let x = g.add_stochastic(Arc::new(DNorm), vec![mu, tau], false, None, None).unwrap();
        g.build().unwrap();
        assert!(g.node(mu).unwrap().rank() < g.node(x).unwrap().rank());
    }

    #[test]
    fn observed_fixpoint_propagates_through_logical_nodes() {
        let mut g = Graph::new();
        let mu = g.add_constant(vec![1], vec![0.0]).unwrap();
        let tau = g.add_constant(vec![1], vec![1.0]).unwrap();
        let x = g.add_stochastic(Arc::new(DNorm), vec![mu, tau], true, None, None).unwrap();
        let y = g.add_logical(Arc::new(Identity), vec![x]).unwrap();
        g.set_observation(x, vec![0.5]).unwrap();
        g.build().unwrap();
        assert!(g.node(x).unwrap().is_observed());
        assert!(g.node(y).unwrap().is_observed());
        assert_eq!(g.node(y).unwrap().value(), Some([0.5].as_slice()));
    }

    #[test]
    fn build_fails_when_declared_observed_node_has_no_value() {
        let mut g = Graph::new();
        let mu = g.add_constant(vec![1], vec![0.0]).unwrap();
        let tau = g.add_constant(vec![1], vec![1.0]).unwrap();
        g.add_stochastic(Arc::new(DNorm), vec![mu, tau], true, None, None).unwrap();
        let err = g.build().unwrap_err();
        assert_eq!(err.code(), pgm_error::ErrorCode::ModelInvalid);
    }

    #[test]
    fn cycle_is_rejected_before_build_mutates_phase() {
        let mut g = Graph::new();
        let a = g.add_constant(vec![1], vec![0.0]).unwrap();
        let b = g.add_logical(Arc::new(Identity), vec![a]).unwrap();
        // Patch in a cycle by hand; not reachable through the public add_* API, which can
        // only reference already-inserted parents.
        g.nodes.get_mut(a).unwrap().parents.push(b);
        let err = g.build().unwrap_err();
        assert_eq!(err.code(), pgm_error::ErrorCode::ModelInvalid);
        assert!(!g.is_built());
    }

    #[test]
    fn likelihood_children_stop_at_unobserved_stochastic_and_skip_past_logical() {
        let mut g = Graph::new();
        let p = g.add_constant(vec![1], vec![0.3]).unwrap();
        let theta = g.add_stochastic(Arc::new(DBern), vec![p], false, None, None).unwrap();
        let identity = g.add_logical(Arc::new(Identity), vec![theta]).unwrap();
        let y = g.add_stochastic(Arc::new(DBern), vec![identity], true, None, None).unwrap();
        g.set_observation(y, vec![1.0]).unwrap();
        g.build().unwrap();
        let children = g.likelihood_children(theta).unwrap();
        assert_eq!(children.as_ref(), &[y]);
    }

    #[test]
    fn likelihood_children_prunes_through_unobserved_stochastic() {
        let mut g = Graph::new();
        let p = g.add_constant(vec![1], vec![0.3]).unwrap();
        let theta = g.add_stochastic(Arc::new(DBern), vec![p], false, None, None).unwrap();
        // z is downstream of theta but itself unobserved, so nothing past it should count.
        let z = g.add_stochastic(Arc::new(DBern), vec![p], false, None, None).unwrap();
        let _ = z;
        g.build().unwrap();
        assert!(g.likelihood_children(theta).unwrap().is_empty());
    }

    #[test]
    fn set_observation_rejects_wrong_length() {
        let mut g = Graph::new();
        let p = g.add_constant(vec![1], vec![0.3]).unwrap();
        let theta = g.add_stochastic(Arc::new(DBern), vec![p], true, None, None).unwrap();
        let err = g.set_observation(theta, vec![1.0, 0.0]).unwrap_err();
        assert_eq!(err.code(), pgm_error::ErrorCode::DataError);
    }

    #[test]
    fn truncation_bounds_are_validated_when_both_constant() {
        let mut g = Graph::new();
        let mu = g.add_constant(vec![1], vec![0.0]).unwrap();
        let tau = g.add_constant(vec![1], vec![1.0]).unwrap();
        let lo = g.add_constant(vec![1], vec![5.0]).unwrap();
        let hi = g.add_constant(vec![1], vec![1.0]).unwrap();
        let err = g
            .add_stochastic(Arc::new(DNorm), vec![mu, tau], false, Some(lo), Some(hi))
            .unwrap_err();
        assert_eq!(err.code(), pgm_error::ErrorCode::ModelInvalid);
    }
}
