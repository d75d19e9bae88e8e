use std::sync::Arc;

use pgm_error::Result;
use pgm_graph::Graph;
use pgm_samplers::{NodeSampler, NodeSamplerFactory, assign_sampler};
use pgm_utils::ArenaKey;

/// The unobserved stochastic nodes in topological order, each paired with the sampler a
/// factory list assigned it at `build_sampler` time. Fixed for the lifetime of a forward
/// run (§5): the graph is immutable while a sampler is iterating.
pub struct Schedule {
    nodes: Vec<ArenaKey>,
    samplers: Vec<Arc<dyn NodeSampler>>,
}

impl Schedule {
    pub fn build(graph: &Graph, factories: &[Arc<dyn NodeSamplerFactory>]) -> Result<Self> {
        let mut nodes = Vec::new();
        let mut samplers = Vec::new();
        for &id in graph.sorted_ids()? {
            let node = graph.node(id)?;
            if !node.kind().is_stochastic() || node.is_observed() {
                continue;
            }
            let sampler = assign_sampler(factories, graph, id)
                .ok_or_else(|| pgm_bail_unsupported(id))?;
            nodes.push(id);
            samplers.push(sampler);
        }
        Ok(Self { nodes, samplers })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_at(&self, t: usize) -> ArenaKey {
        self.nodes[t]
    }

    pub fn sampler_at(&self, t: usize) -> &Arc<dyn NodeSampler> {
        &self.samplers[t]
    }

    pub fn nodes(&self) -> &[ArenaKey] {
        &self.nodes
    }
}

fn pgm_bail_unsupported(id: ArenaKey) -> pgm_error::PgmError {
    pgm_error::pgm_err!(Unsupported: "no registered sampler factory matched node {}", id.index())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_registry::distributions::{DBern, DNorm};

    #[test]
    fn schedule_skips_observed_nodes_and_keeps_topological_order() {
        let mut g = Graph::new();
        let mu = g.add_constant(vec![1], vec![0.0]).unwrap();
        let tau = g.add_constant(vec![1], vec![1.0]).unwrap();
        let x0 = g.add_stochastic(Arc::new(DNorm), vec![mu, tau], false, None, None).unwrap();
        let x1 = g.add_stochastic(Arc::new(DNorm), vec![x0, tau], false, None, None).unwrap();
        let y = g.add_stochastic(Arc::new(DBern), vec![mu], false, None, None).unwrap();
        g.set_observation(y, vec![1.0]).unwrap();
        g.build().unwrap();

        let schedule = Schedule::build(&g, &pgm_samplers::base_factories()).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.node_at(0), x0);
        assert_eq!(schedule.node_at(1), x1);
    }
}
