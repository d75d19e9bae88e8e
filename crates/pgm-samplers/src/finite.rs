use std::sync::Arc;

use pgm_core::Rng;
use pgm_error::{Result, pgm_bail, pgm_err};
use pgm_graph::Graph;
use pgm_registry::{Distribution, SupportHint};
use pgm_utils::ArenaKey;

use crate::factory::NodeSamplerFactory;
use crate::sampler::NodeSampler;
use crate::values::{ParticleValues, resolve, resolve_through_logicals};

/// Matches a scalar node whose prior has a fixed or bound-narrowed finite support (§4.5):
/// `dbern`, `dcat`, a bound-truncated `dbin`. Exact enumeration beats every other
/// non-conjugate strategy, since it marginalizes the node rather than sampling it, but it
/// is tried after the conjugate families since those are cheaper still (O(1) vs O(|support|)).
pub struct FiniteFactory;

impl NodeSamplerFactory for FiniteFactory {
    fn name(&self) -> &'static str {
        "finite"
    }

    fn try_build(&self, graph: &Graph, node: ArenaKey) -> Option<Arc<dyn NodeSampler>> {
        let n = graph.node(node).ok()?;
        let prior = n.prior()?;
        let dim: usize = n.dim().iter().product();
        if dim != 1 {
            return None;
        }
        match prior.support() {
            SupportHint::Fixed | SupportHint::Interval => {
                Some(Arc::new(FiniteSampler { prior: prior.clone() }))
            }
            _ => None,
        }
    }
}

struct FiniteSampler {
    prior: Arc<dyn Distribution>,
}

fn resolve_params(graph: &Graph, particle: &dyn ParticleValues, ids: &[ArenaKey]) -> Result<Vec<Vec<f64>>> {
    ids.iter()
        .map(|&id| {
            resolve(graph, particle, id)
                .map(|v| v.to_vec())
                .ok_or_else(|| pgm_err!(ModelInvalid: "parameter value not yet resolved"))
        })
        .collect()
}

fn resolve_bounds(graph: &Graph, particle: &dyn ParticleValues, id: ArenaKey) -> Result<Option<(f64, f64)>> {
    let n = graph.node(id)?;
    let Some((lower, upper)) = n.truncation() else {
        return Ok(None);
    };
    let lo = match lower {
        Some(id) => resolve(graph, particle, id).map(|v| v[0]),
        None => None,
    };
    let hi = match upper {
        Some(id) => resolve(graph, particle, id).map(|v| v[0]),
        None => None,
    };
    Ok(match (lo, hi) {
        (Some(lo), Some(hi)) => Some((lo, hi)),
        (Some(lo), None) => Some((lo, f64::INFINITY)),
        (None, Some(hi)) => Some((f64::NEG_INFINITY, hi)),
        (None, None) => None,
    })
}

fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + xs.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

impl NodeSampler for FiniteSampler {
    fn name(&self) -> &'static str {
        "finite"
    }

    fn sample(
        &self,
        graph: &Graph,
        node: ArenaKey,
        particle: &mut dyn ParticleValues,
        rng: &mut Rng,
    ) -> Result<f64> {
        let n = graph.node(node)?;
        let param_ids = n.parents().to_vec();
        let params = resolve_params(graph, particle, &param_ids)?;
        let param_refs: Vec<&[f64]> = params.iter().map(|v| v.as_slice()).collect();
        let bounds = resolve_bounds(graph, particle, node)?;

        let support = self
            .prior
            .finite_support(&param_refs, bounds)
            .ok_or_else(|| pgm_err!(Unsupported: "node's support is not enumerable at these parameter values"))?;
        if support.is_empty() {
            pgm_bail!(NumericFailure: "finite sampler: empty candidate support");
        }

        let likelihood_children = graph.likelihood_children(node)?;
        let mut log_weights = Vec::with_capacity(support.len());
        for &v in &support {
            let mut lw = self.prior.log_density(&[v], &param_refs, bounds)?;
            for &child_id in likelihood_children.iter() {
                let child = graph.node(child_id)?;
                let prior_c = child
                    .prior()
                    .ok_or_else(|| pgm_err!(ModelInvalid: "likelihood child is not stochastic"))?;
                let cparam_ids: Vec<ArenaKey> = child.parents().to_vec();
                let mut cparams = Vec::with_capacity(cparam_ids.len());
                for &id in &cparam_ids {
                    cparams.push(resolve_through_logicals(graph, particle, id, node, &[v])?);
                }
                let cparam_refs: Vec<&[f64]> = cparams.iter().map(|v| v.as_slice()).collect();
                let y = child
                    .value()
                    .ok_or_else(|| pgm_err!(ModelInvalid: "observed likelihood child has no value"))?;
                let cbounds = resolve_bounds(graph, particle, child_id)?;
                lw += prior_c.log_density(y, &cparam_refs, cbounds)?;
            }
            log_weights.push(lw);
        }

        let log_total = log_sum_exp(&log_weights);
        let mut u = rng.unit() * log_total.exp();
        let mut chosen = support.len() - 1;
        for (i, &lw) in log_weights.iter().enumerate() {
            u -= lw.exp();
            if u <= 0.0 {
                chosen = i;
                break;
            }
        }
        particle.set(node, vec![support[chosen]]);
        Ok(log_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_core::Rng;
    use pgm_registry::distributions::{DBern, DCat};
    use std::collections::HashMap;

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
    fn matches_dcat_but_not_continuous_node() {
        let mut g = Graph::new();
        let probs = g.add_constant(vec![3], vec![0.2, 0.3, 0.5]).unwrap();
        let cat = g.add_stochastic(Arc::new(DCat), vec![probs], false, None, None).unwrap();
        g.build().unwrap();
        assert!(FiniteFactory.try_build(&g, cat).is_some());
    }

    #[test]
    fn dcat_with_bernoulli_child_concentrates_on_best_matching_category() {
        let mut g = Graph::new();
        let probs = g.add_constant(vec![3], vec![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]).unwrap();
        let cat = g.add_stochastic(Arc::new(DCat), vec![probs], false, None, None).unwrap();
        // p(y=1) scales with category index via a constant map built from `cat`'s value
        // directly is awkward without an index-based function in this unit test, so
        // instead give the Bernoulli a parent that only meaningfully distinguishes
        // category 3 from the others: index_select isn't wired here, so we just check
        // that enumeration covers every category and produces a finite total weight.
        let p = g.add_constant(vec![1], vec![0.9]).unwrap();
        let y = g.add_stochastic(Arc::new(DBern), vec![p], false, None, None).unwrap();
        g.set_observation(y, vec![1.0]).unwrap();
        g.build().unwrap();

        let sampler = FiniteFactory.try_build(&g, cat).unwrap();
        let mut particle = TestParticle(HashMap::new());
        let mut rng = Rng::from_seed(1);
        let w = sampler.sample(&g, cat, &mut particle, &mut rng).unwrap();
        assert!(w.is_finite());
        let drawn = particle.get(cat).unwrap()[0];
        assert!([1.0, 2.0, 3.0].contains(&drawn));
    }

    /// `k ~ dcat(0.2, 0.5, 0.3)` over {1,2,3}, `y ~ dbern(theta[k])` for
    /// `theta = (0.1, 0.5, 0.9)`: the finite sampler must reproduce the exact posterior
    /// `P(k | y)` for both `y = 0` and `y = 1`.
    fn exact_posterior(y: f64) -> [f64; 3] {
        let prior = [0.2, 0.5, 0.3];
        let theta = [0.1, 0.5, 0.9];
        let joint: Vec<f64> = prior.iter().zip(theta).map(|(&p, t)| p * if y >= 0.5 { t } else { 1.0 - t }).collect();
        let z: f64 = joint.iter().sum();
        [joint[0] / z, joint[1] / z, joint[2] / z]
    }

    fn build_dcat_bern_graph(y: f64) -> (Graph, ArenaKey) {
        let mut g = Graph::new();
        let probs = g.add_constant(vec![3], vec![0.2, 0.5, 0.3]).unwrap();
        let cat = g.add_stochastic(Arc::new(DCat), vec![probs], false, None, None).unwrap();
        let theta = g.add_constant(vec![3], vec![0.1, 0.5, 0.9]).unwrap();
        let theta_k = g.add_logical(Arc::new(pgm_registry::functions::IndexSelect), vec![theta, cat]).unwrap();
        let bern = g.add_stochastic(Arc::new(DBern), vec![theta_k], false, None, None).unwrap();
        g.set_observation(bern, vec![y]).unwrap();
        g.build().unwrap();
        (g, cat)
    }

    fn empirical_posterior(graph: &Graph, cat: ArenaKey, seed: u64) -> [f64; 3] {
        let sampler = FiniteFactory.try_build(graph, cat).unwrap();
        let mut counts = [0usize; 3];
        let trials = 20_000;
        let mut rng = Rng::from_seed(seed);
        for _ in 0..trials {
            let mut particle = TestParticle(HashMap::new());
            sampler.sample(graph, cat, &mut particle, &mut rng).unwrap();
            let k = particle.get(cat).unwrap()[0] as usize;
            counts[k - 1] += 1;
        }
        [counts[0] as f64 / trials as f64, counts[1] as f64 / trials as f64, counts[2] as f64 / trials as f64]
    }

    #[test]
    fn finite_sampler_matches_exact_posterior_for_y_equals_one() {
        let (g, cat) = build_dcat_bern_graph(1.0);
        let got = empirical_posterior(&g, cat, 1);
        let expected = exact_posterior(1.0);
        for i in 0..3 {
            assert!((got[i] - expected[i]).abs() < 0.01, "category {i}: got {} expected {}", got[i], expected[i]);
        }
    }

    #[test]
    fn finite_sampler_matches_exact_posterior_for_y_equals_zero() {
        let (g, cat) = build_dcat_bern_graph(0.0);
        let got = empirical_posterior(&g, cat, 2);
        let expected = exact_posterior(0.0);
        for i in 0..3 {
            assert!((got[i] - expected[i]).abs() < 0.01, "category {i}: got {} expected {}", got[i], expected[i]);
        }
    }
}
