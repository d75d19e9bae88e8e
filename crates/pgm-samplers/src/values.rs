use pgm_error::{Result, pgm_err};
use pgm_graph::{Graph, NodeKind};
use pgm_utils::ArenaKey;

/// A particle's per-node working values for nodes the graph itself does not carry a fixed
/// value for (every unobserved stochastic node, resampled each iteration). Implemented by
/// `pgm-smc`'s `Particle`; kept as a trait here so the sampler framework has no dependency
/// on the particle/filter crate that consumes it.
pub trait ParticleValues {
    fn get(&self, id: ArenaKey) -> Option<&[f64]>;
    fn set(&mut self, id: ArenaKey, value: Vec<f64>);
}

/// Resolves a node's current value: the graph's own value if the node is a constant or
/// observed, else whatever the particle has sampled for it so far this iteration. Parents
/// always precede children in topological order, so by the time a sampler reads a parent's
/// value one of these two sources has always already supplied it.
pub fn resolve<'a>(graph: &'a Graph, particle: &'a dyn ParticleValues, id: ArenaKey) -> Option<&'a [f64]> {
    graph
        .node(id)
        .ok()
        .and_then(|n| n.value())
        .or_else(|| particle.get(id))
}

/// Like [resolve], but also evaluates logical nodes on demand (recursing through any chain
/// of deterministic functions) and substitutes a hypothetical value for `override_id` along
/// the way. `graph.build()` only bakes a logical node's value in once, at construction time,
/// when every parent already has a fixed value (§4.4); a logical node reading an unobserved
/// stochastic parent never gets a cached value, so a candidate-enumeration sampler checking
/// a likelihood child whose parameter is such a logical node (e.g. `dbern(theta[k])` with
/// `k` the node under enumeration) must recompute it from the candidate value up.
pub fn resolve_through_logicals(
    graph: &Graph,
    particle: &dyn ParticleValues,
    id: ArenaKey,
    override_id: ArenaKey,
    override_value: &[f64],
) -> Result<Vec<f64>> {
    if id == override_id {
        return Ok(override_value.to_vec());
    }
    let n = graph.node(id)?;
    if let Some(v) = n.value() {
        return Ok(v.to_vec());
    }
    if let NodeKind::Logical { function } = n.kind() {
        let parents = n.parents().to_vec();
        let parent_values: Vec<Vec<f64>> = parents
            .iter()
            .map(|&p| resolve_through_logicals(graph, particle, p, override_id, override_value))
            .collect::<Result<_>>()?;
        let parent_dims: Vec<Vec<usize>> = parents.iter().map(|&p| graph.node(p).map(|pn| pn.dim().to_vec())).collect::<Result<_>>()?;
        let parent_refs: Vec<&[f64]> = parent_values.iter().map(|v| v.as_slice()).collect();
        let dim_refs: Vec<&[usize]> = parent_dims.iter().map(|v| v.as_slice()).collect();
        let out_dim: usize = n.dim().iter().product();
        let mut out = vec![0.0; out_dim];
        function.eval(&mut out, &parent_refs, &dim_refs)?;
        return Ok(out);
    }
    particle
        .get(id)
        .map(|v| v.to_vec())
        .ok_or_else(|| pgm_err!(ModelInvalid: "parameter value not yet resolved"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct TestParticle(HashMap<ArenaKey, Vec<f64>>);
    impl ParticleValues for TestParticle {
        fn get(&self, id: ArenaKey) -> Option<&[f64]> {
            self.0.get(&id).map(|v| v.as_slice())
        }
        fn set(&mut self, id: ArenaKey, value: Vec<f64>) {
            self.0.insert(id, value);
        }
    }

    #[test]
    fn recomputes_a_logical_node_fed_by_the_overridden_node() {
        let mut g = Graph::new();
        let theta = g.add_constant(vec![3], vec![0.1, 0.5, 0.9]).unwrap();
        let probs = g.add_constant(vec![3], vec![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]).unwrap();
        let cat = g
            .add_stochastic(Arc::new(pgm_registry::distributions::DCat), vec![probs], false, None, None)
            .unwrap();
        let theta_k = g.add_logical(Arc::new(pgm_registry::functions::IndexSelect), vec![theta, cat]).unwrap();
        g.build().unwrap();

        // `cat` is unobserved, so `theta_k` has no value baked in at build time; the
        // hypothetical override must be threaded through the index_select by hand.
        let particle = TestParticle(HashMap::new());
        let got = resolve_through_logicals(&g, &particle, theta_k, cat, &[3.0]).unwrap();
        assert_eq!(got, vec![0.9]);
    }

    #[test]
    fn falls_back_to_the_particle_for_an_unrelated_unobserved_parent() {
        let mut g = Graph::new();
        let p = g.add_constant(vec![1], vec![0.3]).unwrap();
        let theta = g.add_stochastic(Arc::new(pgm_registry::distributions::DBern), vec![p], false, None, None).unwrap();
        let identity = g.add_logical(Arc::new(pgm_registry::functions::Identity), vec![theta]).unwrap();
        g.build().unwrap();

        let mut particle = TestParticle(HashMap::new());
        particle.set(theta, vec![1.0]);
        let bogus_override = g.add_constant(vec![1], vec![0.0]).unwrap();
        let got = resolve_through_logicals(&g, &particle, identity, bogus_override, &[99.0]).unwrap();
        assert_eq!(got, vec![1.0]);
    }
}
