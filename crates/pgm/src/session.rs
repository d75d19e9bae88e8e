use std::collections::HashMap;
use std::sync::Arc;

use pgm_core::{Engine, Rng};
use pgm_error::{Result, ensure, pgm_bail, pgm_err};
use pgm_graph::Graph;
use pgm_model::{Model, ModelData, compile};
use pgm_monitor::{Histogram, IndexRange, Monitor, MonitorType, NodeArray, StatTag};
use pgm_registry::Registry;
use pgm_samplers::{NodeSamplerFactory, base_factories, prior_mutation::PriorMutationFactory, resolve};
use pgm_smc::{BackwardSmoother, ForwardSampler, ResampleMethod, Schedule};
use pgm_utils::ArenaKey;

use crate::lifecycle::State;
use crate::monitor_slot::MonitorSlot;

/// The one facade type a driver talks to (§6 "Control surface"): owns the model's AST, its
/// currently-bound data, the compiled graph, and whichever forward/backward pass is live,
/// and enforces the lifecycle in [State] around every operation.
pub struct Session {
    registry: Registry,
    model: Model,
    state: State,
    data: HashMap<String, ModelData>,
    graph: Option<Arc<Graph>>,
    arrays: HashMap<String, Vec<ArenaKey>>,
    factories: Vec<Arc<dyn NodeSamplerFactory>>,
    forward: Option<ForwardSampler>,
    backward: Option<BackwardSmoother>,
    log_norm_const: Option<f64>,
    filter_monitors: HashMap<String, MonitorSlot>,
    backward_monitors: HashMap<String, MonitorSlot>,
}

impl Session {
    pub fn new(model: Model) -> Self {
        Self {
            registry: Registry::load_base_module(),
            model,
            state: State::Uninit,
            data: HashMap::new(),
            graph: None,
            arrays: HashMap::new(),
            factories: base_factories(),
            forward: None,
            backward: None,
            log_norm_const: None,
            filter_monitors: HashMap::new(),
            backward_monitors: HashMap::new(),
        }
    }

    /// Registers an additional distribution or function ahead of the base module, e.g. for
    /// a project-specific family (§9 "no hidden global": the catalog is still explicit,
    /// just built with extra entries before any model is compiled).
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_discrete(&self, name: &str) -> Result<bool> {
        let graph = self.require_graph()?;
        let ids = self.node_ids(name)?;
        let id = *ids.first().ok_or_else(|| pgm_err!(DataError: "'{}' has no elements", name))?;
        Ok(graph.node(id)?.is_discrete())
    }

    fn require_graph(&self) -> Result<&Arc<Graph>> {
        self.graph.as_ref().ok_or_else(|| pgm_err!(LifecycleViolation: "no compiled model; call compile() first"))
    }

    fn node_ids(&self, name: &str) -> Result<&[ArenaKey]> {
        self.arrays
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| pgm_err!(DataError: "'{}' is not a declared variable", name))
    }

    fn node_array(&self, name: &str) -> Result<NodeArray> {
        Ok(NodeArray::new(name, self.node_ids(name)?.to_vec()))
    }

    /// Structural validation only: compiles against no data and discards the result. Does
    /// not touch session state, so it may be called at any time, including `Uninit`.
    pub fn check_model(&self) -> Result<()> {
        compile(&self.model, &self.registry, &HashMap::new()).map(|_| ())
    }

    /// Builds (or rebuilds) the graph from `data`. `generate_data`, when set, fills in any
    /// component the caller left as [pgm_model::MISSING] by sampling it from its prior
    /// (seeded by `seed`) instead of leaving it latent. `clone`, when set and a graph from
    /// an identical variable set already exists, reuses that graph's topology and just
    /// rewrites observation values instead of re-running the compiler from scratch.
    pub fn compile(&mut self, data: HashMap<String, ModelData>, generate_data: bool, seed: u64, clone: bool) -> Result<()> {
        self.forward = None;
        self.backward = None;
        self.log_norm_const = None;

        let reused = clone && self.graph.is_some() && !self.arrays.is_empty();
        if reused {
            let graph_arc = self.graph.take().unwrap();
            let mut graph =
                Arc::try_unwrap(graph_arc).map_err(|_| pgm_err!(LifecycleViolation: "graph still referenced elsewhere; cannot reuse in place"))?;
            apply_data(&mut graph, &self.arrays, &data)?;
            self.graph = Some(Arc::new(graph));
        } else {
            let compiled = compile(&self.model, &self.registry, &data)?;
            self.graph = Some(Arc::new(compiled.graph));
            self.arrays = compiled.arrays;
        }
        self.data = data;

        if generate_data {
            self.generate_missing_data(seed)?;
        }

        self.release_backward_monitors();
        self.state = State::Built;
        Ok(())
    }

    fn generate_missing_data(&mut self, seed: u64) -> Result<()> {
        let mut rng = Rng::from_seed(seed);
        let graph_arc = self.graph.take().ok_or_else(|| pgm_err!(LifecycleViolation: "no compiled graph"))?;
        let mut graph = Arc::try_unwrap(graph_arc).map_err(|_| pgm_err!(LifecycleViolation: "graph still referenced elsewhere"))?;

        let mut missing: Vec<(String, usize, ArenaKey)> = Vec::new();
        for (name, ids) in &self.arrays {
            if let Some(entry) = self.data.get(name) {
                for (i, &id) in ids.iter().enumerate() {
                    if entry.element(i + 1).is_none() {
                        missing.push((name.clone(), i + 1, id));
                    }
                }
            }
        }

        let order = graph.sorted_ids()?.to_vec();
        let missing_ids: std::collections::HashSet<ArenaKey> = missing.iter().map(|(_, _, id)| *id).collect();
        for id in order {
            if !missing_ids.contains(&id) {
                continue;
            }
            let node = graph.node(id)?;
            let prior = node
                .prior()
                .ok_or_else(|| pgm_err!(ModelInvalid: "data-generating node is not stochastic"))?
                .clone();
            let parents = node.parents().to_vec();
            let dim = node.dim().to_vec();
            let params: Vec<Vec<f64>> = parents.iter().map(|&p| resolved_value(&graph, p)).collect::<Result<_>>()?;
            let param_refs: Vec<&[f64]> = params.iter().map(|v| v.as_slice()).collect();
            let bounds = resolve_static_bounds(&graph, node.truncation())?;
            let mut out = vec![0.0; dim.iter().product::<usize>().max(1)];
            prior.sample(&mut out, &param_refs, bounds, &mut rng)?;
            graph.set_observation(id, out)?;
        }

        self.graph = Some(Arc::new(graph));
        for (name, position, id) in missing {
            let values = self.graph.as_ref().unwrap().node(id)?.value().unwrap().to_vec();
            if let Some(entry) = self.data.get_mut(&name) {
                let k = entry.elem_dim.iter().product::<usize>().max(1);
                let start = (position - 1) * k;
                entry.values[start..start + k].copy_from_slice(&values);
            }
        }
        Ok(())
    }

    pub fn build_sampler(&mut self, prior_only: bool) -> Result<()> {
        ensure!(matches!(self.state, State::Built), LifecycleViolation: "build_sampler requires a freshly compiled model");
        let graph = self.require_graph()?;
        let factories: Vec<Arc<dyn NodeSamplerFactory>> =
            if prior_only { vec![Arc::new(PriorMutationFactory)] } else { base_factories() };
        Schedule::build(graph, &factories)?;
        self.factories = factories;
        self.state = State::Initialized;
        Ok(())
    }

    pub fn run_forward(&mut self, n_particles: usize, seed: u64, method: ResampleMethod, ess_threshold: f64) -> Result<()> {
        ensure!(matches!(self.state, State::Initialized), LifecycleViolation: "run_forward requires build_sampler to have completed first");
        let graph = self.require_graph()?.clone();
        let mut forward = ForwardSampler::new(graph.clone(), &self.factories, n_particles, seed, method, ess_threshold)?;
        let schedule_len = forward.schedule().len();

        if schedule_len == 0 {
            self.log_norm_const = Some(0.0);
            self.forward = Some(forward);
            self.state = State::AtEnd;
            return Ok(());
        }

        loop {
            let epoch = forward.next()?;
            record_filter_monitors(&mut self.filter_monitors, &graph, &forward, epoch.t, epoch.ess)?;
            if epoch.is_complete(schedule_len) {
                self.log_norm_const = Some(epoch.log_norm_const);
                self.state = State::AtEnd;
                break;
            }
            self.state = State::Iterating(epoch.t);
        }
        self.forward = Some(forward);
        Ok(())
    }

    pub fn get_log_norm_const(&self) -> Result<f64> {
        ensure!(self.state.is_forward_done(), LifecycleViolation: "run_forward has not completed yet");
        self.log_norm_const.ok_or_else(|| pgm_err!(LifecycleViolation: "no log normalizing constant recorded"))
    }

    pub fn run_backward(&mut self) -> Result<()> {
        ensure!(matches!(self.state, State::AtEnd), LifecycleViolation: "run_backward requires run_forward to have reached its end");
        let graph = self.require_graph()?.clone();
        let forward = self.forward.take().ok_or_else(|| pgm_err!(LifecycleViolation: "no completed forward pass"))?;
        let history = forward.into_history();
        let mut backward = BackwardSmoother::new(graph.clone(), history)?;
        self.state = State::SmootherInit;

        if backward.is_complete() {
            record_backward_monitors(&mut self.backward_monitors, &graph, &backward)?;
            self.state = State::SmootherAtEnd;
            self.backward = Some(backward);
            return Ok(());
        }

        loop {
            let epoch = backward.next()?;
            record_backward_monitors(&mut self.backward_monitors, &graph, &backward)?;
            if backward.is_complete() {
                self.state = State::SmootherAtEnd;
                break;
            }
            self.state = State::Smoothing(epoch.t);
        }
        self.backward = Some(backward);
        Ok(())
    }

    pub fn extract_stat(&self, name: &str, component: usize, tag: StatTag) -> Result<f64> {
        if let Some(slot) = self.filter_monitors.get(name) {
            return slot.monitor.extract_stat(component, tag);
        }
        if let Some(slot) = self.backward_monitors.get(name) {
            return slot.monitor.extract_stat(component, tag);
        }
        pgm_bail!(DataError: "no monitor registered for '{}'", name)
    }

    pub fn extract_pdf(&self, name: &str, component: usize, num_bins: usize, cache_fraction: Option<f64>, seed: u64) -> Result<Histogram> {
        let mut rng = Rng::from_seed(seed);
        if let Some(slot) = self.filter_monitors.get(name) {
            return slot.monitor.extract_pdf(component, num_bins, cache_fraction, &mut rng);
        }
        if let Some(slot) = self.backward_monitors.get(name) {
            return slot.monitor.extract_pdf(component, num_bins, cache_fraction, &mut rng);
        }
        pgm_bail!(DataError: "no monitor registered for '{}'", name)
    }

    pub fn set_filter_monitor(&mut self, name: &str, range: Option<IndexRange>) -> Result<()> {
        let array = self.node_array(name)?;
        let range = match range {
            Some(r) => r,
            None => array.full_range()?,
        };
        let monitor = Monitor::new(&array, range, MonitorType::Filter)?;
        self.filter_monitors.insert(name.to_string(), MonitorSlot::new(monitor));
        Ok(())
    }

    pub fn set_backward_smooth_monitor(&mut self, name: &str, range: Option<IndexRange>) -> Result<()> {
        let array = self.node_array(name)?;
        let range = match range {
            Some(r) => r,
            None => array.full_range()?,
        };
        let monitor = Monitor::new(&array, range, MonitorType::BackwardSmooth)?;
        self.backward_monitors.insert(name.to_string(), MonitorSlot::new(monitor));
        Ok(())
    }

    pub fn clear_filter_monitors(&mut self, release_only: bool) {
        if release_only {
            for slot in self.filter_monitors.values_mut() {
                slot.released = true;
            }
        } else {
            self.filter_monitors.clear();
        }
    }

    pub fn clear_backward_smooth_monitors(&mut self, release_only: bool) {
        if release_only {
            for slot in self.backward_monitors.values_mut() {
                slot.released = true;
            }
        } else {
            self.backward_monitors.clear();
        }
    }

    fn release_backward_monitors(&mut self) {
        for slot in self.backward_monitors.values_mut() {
            slot.released = true;
        }
    }

    /// Overwrites observations for `name[range]` with `values` (§6). Drops the session back
    /// to `Built` and marks backward monitors released regardless of the state it was
    /// called from, except while a forward or backward pass is actively running.
    pub fn change_data(&mut self, name: &str, range: IndexRange, values: Vec<f64>) -> Result<()> {
        ensure!(
            !matches!(self.state, State::Iterating(_) | State::Smoothing(_)),
            LifecycleViolation: "change_data cannot run while a pass is in progress"
        );
        let ids = self.node_array(name)?.select(range)?;
        let graph_arc = self.graph.take().ok_or_else(|| pgm_err!(LifecycleViolation: "no compiled graph"))?;
        let mut graph = Arc::try_unwrap(graph_arc).map_err(|_| pgm_err!(LifecycleViolation: "graph still referenced elsewhere"))?;

        let elem_len = graph.node(ids[0])?.dim().iter().product::<usize>().max(1);
        ensure!(values.len() == ids.len() * elem_len, DataError: "change_data: expected {} values, got {}", ids.len() * elem_len, values.len());

        for (i, &id) in ids.iter().enumerate() {
            let slice = &values[i * elem_len..(i + 1) * elem_len];
            graph.set_observation(id, slice.to_vec())?;
        }
        self.write_back_data(name, range, &values, elem_len);

        self.graph = Some(Arc::new(graph));
        self.forward = None;
        self.backward = None;
        self.log_norm_const = None;
        self.release_backward_monitors();
        self.state = State::Built;
        Ok(())
    }

    /// Draws fresh values for `name[range]` from the prior and records them as observations.
    pub fn sample_data(&mut self, name: &str, range: IndexRange, seed: u64) -> Result<()> {
        ensure!(
            !matches!(self.state, State::Iterating(_) | State::Smoothing(_)),
            LifecycleViolation: "sample_data cannot run while a pass is in progress"
        );
        let ids = self.node_array(name)?.select(range)?;
        let graph_arc = self.graph.take().ok_or_else(|| pgm_err!(LifecycleViolation: "no compiled graph"))?;
        let mut graph = Arc::try_unwrap(graph_arc).map_err(|_| pgm_err!(LifecycleViolation: "graph still referenced elsewhere"))?;
        let mut rng = Rng::from_seed(seed);

        let mut flat_values = Vec::new();
        let mut elem_len = 1;
        for &id in &ids {
            let node = graph.node(id)?;
            let prior = node.prior().ok_or_else(|| pgm_err!(ModelInvalid: "'{}' is not stochastic", name))?.clone();
            let parents = node.parents().to_vec();
            let dim = node.dim().to_vec();
            elem_len = dim.iter().product::<usize>().max(1);
            let params: Vec<Vec<f64>> = parents.iter().map(|&p| resolved_value(&graph, p)).collect::<Result<_>>()?;
            let param_refs: Vec<&[f64]> = params.iter().map(|v| v.as_slice()).collect();
            let bounds = resolve_static_bounds(&graph, node.truncation())?;
            let mut out = vec![0.0; elem_len];
            prior.sample(&mut out, &param_refs, bounds, &mut rng)?;
            graph.set_observation(id, out.clone())?;
            flat_values.extend(out);
        }
        self.write_back_data(name, range, &flat_values, elem_len);

        self.graph = Some(Arc::new(graph));
        self.forward = None;
        self.backward = None;
        self.log_norm_const = None;
        self.release_backward_monitors();
        self.state = State::Built;
        Ok(())
    }

    pub fn remove_data(&mut self, name: &str, range: IndexRange) -> Result<()> {
        ensure!(
            !matches!(self.state, State::Iterating(_) | State::Smoothing(_)),
            LifecycleViolation: "remove_data cannot run while a pass is in progress"
        );
        let ids = self.node_array(name)?.select(range)?;
        let graph_arc = self.graph.take().ok_or_else(|| pgm_err!(LifecycleViolation: "no compiled graph"))?;
        let mut graph = Arc::try_unwrap(graph_arc).map_err(|_| pgm_err!(LifecycleViolation: "graph still referenced elsewhere"))?;
        let elem_len = graph.node(ids[0])?.dim().iter().product::<usize>().max(1);
        for &id in &ids {
            graph.clear_observation(id)?;
        }
        let missing = vec![pgm_model::MISSING; ids.len() * elem_len];
        self.write_back_data(name, range, &missing, elem_len);

        self.graph = Some(Arc::new(graph));
        self.forward = None;
        self.backward = None;
        self.log_norm_const = None;
        self.release_backward_monitors();
        self.state = State::Built;
        Ok(())
    }

    fn write_back_data(&mut self, name: &str, range: IndexRange, flat_values: &[f64], elem_len: usize) {
        if let Some(entry) = self.data.get_mut(name) {
            let start = (range.lo - 1) * elem_len;
            let end = start + flat_values.len();
            if entry.values.len() < end {
                entry.values.resize(end, pgm_model::MISSING);
            }
            entry.values[start..end].copy_from_slice(flat_values);
        } else {
            let ids = self.arrays.get(name).map(|v| v.len()).unwrap_or(range.hi);
            let mut values = vec![pgm_model::MISSING; ids * elem_len];
            let start = (range.lo - 1) * elem_len;
            values[start..start + flat_values.len()].copy_from_slice(flat_values);
            self.data.insert(name.to_string(), ModelData::new(name, vec![elem_len], values));
        }
    }

    /// Dumps every declared variable's current values (§8 property 6): present for
    /// constants, logicals, and observed stochastic nodes; [pgm_model::MISSING] for latent
    /// ones.
    pub fn dump_data(&self) -> Result<HashMap<String, ModelData>> {
        let graph = self.require_graph()?;
        let mut out = HashMap::new();
        for (name, ids) in &self.arrays {
            if ids.is_empty() {
                continue;
            }
            let elem_dim = graph.node(ids[0])?.dim().to_vec();
            let elem_len = elem_dim.iter().product::<usize>().max(1);
            let mut values = Vec::with_capacity(ids.len() * elem_len);
            for &id in ids {
                match graph.node(id)?.value() {
                    Some(v) => values.extend_from_slice(v),
                    None => values.extend(std::iter::repeat(pgm_model::MISSING).take(elem_len)),
                }
            }
            out.insert(name.clone(), ModelData::new(name.clone(), elem_dim, values));
        }
        Ok(out)
    }

    pub fn get_log_prior_density(&self, name: &str, range: IndexRange) -> Result<f64> {
        let graph = self.require_graph()?;
        let ids = self.node_array(name)?.select(range)?;
        let mut total = 0.0;
        for id in ids {
            let node = graph.node(id)?;
            let prior = node.prior().ok_or_else(|| pgm_err!(ModelInvalid: "'{}' is not stochastic", name))?;
            let value = node.value().ok_or_else(|| pgm_err!(ModelInvalid: "'{}' has no realized value", name))?;
            let params: Vec<Vec<f64>> = node.parents().iter().map(|&p| resolved_value(graph, p)).collect::<Result<_>>()?;
            let param_refs: Vec<&[f64]> = params.iter().map(|v| v.as_slice()).collect();
            let bounds = resolve_static_bounds(graph, node.truncation())?;
            total += prior.log_density(value, &param_refs, bounds)?;
        }
        Ok(total)
    }

    pub fn get_fixed_support(&self, name: &str, range: IndexRange) -> Result<Vec<Vec<f64>>> {
        let graph = self.require_graph()?;
        let ids = self.node_array(name)?.select(range)?;
        ids.into_iter()
            .map(|id| {
                let node = graph.node(id)?;
                let prior = node.prior().ok_or_else(|| pgm_err!(ModelInvalid: "'{}' is not stochastic", name))?;
                let params: Vec<Vec<f64>> = node.parents().iter().map(|&p| resolved_value(graph, p)).collect::<Result<_>>()?;
                let param_refs: Vec<&[f64]> = params.iter().map(|v| v.as_slice()).collect();
                let bounds = resolve_static_bounds(graph, node.truncation())?;
                prior
                    .finite_support(&param_refs, bounds)
                    .ok_or_else(|| pgm_err!(Unsupported: "'{}' has no enumerable fixed support", name))
            })
            .collect()
    }

    pub fn print_graphviz(&self, out: &mut dyn std::io::Write) -> Result<()> {
        let graph = self.require_graph()?;
        let write_err = |e: std::io::Error| pgm_err!(DataError: "graphviz write failed: {}", e);
        writeln!(out, "digraph model {{").map_err(write_err)?;
        for &id in graph.sorted_ids()? {
            let node = graph.node(id)?;
            let shape = match node.kind() {
                pgm_graph::NodeKind::Constant => "box",
                pgm_graph::NodeKind::Logical { .. } => "diamond",
                pgm_graph::NodeKind::Stochastic { .. } => {
                    if node.is_observed() {
                        "doublecircle"
                    } else {
                        "circle"
                    }
                }
            };
            writeln!(out, "  n{} [shape={}];", id.index(), shape).map_err(write_err)?;
            for &parent in node.parents() {
                writeln!(out, "  n{} -> n{};", parent.index(), id.index()).map_err(write_err)?;
            }
        }
        writeln!(out, "}}").map_err(write_err)?;
        Ok(())
    }
}

fn record_filter_monitors(
    monitors: &mut HashMap<String, MonitorSlot>,
    graph: &Graph,
    forward: &ForwardSampler,
    iteration: usize,
    ess: f64,
) -> Result<()> {
    let conditionals = conditioning_observations(graph)?;
    for slot in monitors.values_mut() {
        if slot.released {
            continue;
        }
        let nodes = slot.monitor.nodes().to_vec();
        if nodes.is_empty() {
            continue;
        }
        let discrete = graph.node(nodes[0])?.is_discrete();
        let values: Vec<Vec<f64>> = forward
            .particles()
            .iter()
            .map(|p| nodes.iter().map(|&id| resolve(graph, p, id).map(|v| v[0]).unwrap_or(f64::NAN)).collect())
            .collect();
        let weights: Vec<f64> = forward.particles().iter().map(|p| p.log_weight.exp()).collect();
        slot.monitor.record(iteration, values, weights, ess, discrete, conditionals.clone())?;
    }
    Ok(())
}

fn record_backward_monitors(monitors: &mut HashMap<String, MonitorSlot>, graph: &Graph, backward: &BackwardSmoother) -> Result<()> {
    let conditionals = conditioning_observations(graph)?;
    let particles = backward.current_particles();
    let weights = backward.smoothing_weights().to_vec();
    let ess = pgm_smc::effective_sample_size(&weights);
    for slot in monitors.values_mut() {
        if slot.released {
            continue;
        }
        let nodes = slot.monitor.nodes().to_vec();
        if nodes.is_empty() {
            continue;
        }
        let discrete = graph.node(nodes[0])?.is_discrete();
        let values: Vec<Vec<f64>> = particles
            .iter()
            .map(|p| nodes.iter().map(|&id| resolve(graph, p, id).map(|v| v[0]).unwrap_or(f64::NAN)).collect())
            .collect();
        slot.monitor.record(backward.current_t(), values, weights.clone(), ess, discrete, conditionals.clone())?;
    }
    Ok(())
}

fn conditioning_observations(graph: &Graph) -> Result<Vec<ArenaKey>> {
    Ok(graph
        .sorted_ids()?
        .iter()
        .copied()
        .filter(|&id| graph.node(id).map(|n| n.is_observed()).unwrap_or(false))
        .collect())
}

fn resolved_value(graph: &Graph, id: ArenaKey) -> Result<Vec<f64>> {
    graph
        .node(id)?
        .value()
        .map(|v| v.to_vec())
        .ok_or_else(|| pgm_err!(ModelInvalid: "node {} has no realized value", id.index()))
}

fn resolve_static_bounds(graph: &Graph, bounds: Option<(Option<ArenaKey>, Option<ArenaKey>)>) -> Result<Option<(f64, f64)>> {
    let Some((lower, upper)) = bounds else {
        return Ok(None);
    };
    let lo = lower.map(|id| resolved_value(graph, id)).transpose()?.map(|v| v[0]);
    let hi = upper.map(|id| resolved_value(graph, id)).transpose()?.map(|v| v[0]);
    Ok(match (lo, hi) {
        (Some(lo), Some(hi)) => Some((lo, hi)),
        (Some(lo), None) => Some((lo, f64::INFINITY)),
        (None, Some(hi)) => Some((f64::NEG_INFINITY, hi)),
        (None, None) => None,
    })
}

/// Rewrites every stochastic node's observation to match `data`, leaving the graph's
/// topology untouched — the cheap path `compile(..., clone = true)` takes when the caller
/// only changed which values are bound, not the model's shape.
fn apply_data(graph: &mut Graph, arrays: &HashMap<String, Vec<ArenaKey>>, data: &HashMap<String, ModelData>) -> Result<()> {
    for (name, ids) in arrays {
        for (i, &id) in ids.iter().enumerate() {
            if !graph.node(id)?.kind().is_stochastic() {
                continue;
            }
            match data.get(name).and_then(|d| d.element(i + 1)) {
                Some(values) => graph.set_observation(id, values.to_vec())?,
                None => graph.clear_observation(id)?,
            }
        }
    }
    Ok(())
}
