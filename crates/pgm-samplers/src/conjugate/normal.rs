use std::sync::Arc;

use pgm_core::Rng;
use pgm_error::Result;
use pgm_graph::Graph;
use pgm_registry::Distribution;
use pgm_registry::distributions::DNorm;
use pgm_utils::ArenaKey;

use super::importance_weight;
use crate::classify::classify;
use crate::factory::NodeSamplerFactory;
use crate::sampler::NodeSampler;
use crate::values::ParticleValues;

/// Converts a `dnorm`/`dnormvar` parameter pair (mean, precision-or-variance) to
/// `(mean, precision)`, the scale this family always computes in.
fn as_precision(name: &str, mean: f64, second: f64) -> Option<(f64, f64)> {
    match name {
        "dnorm" => Some((mean, second)),
        "dnormvar" => Some((mean, 1.0 / second)),
        _ => None,
    }
}

struct Term {
    a: f64,
    b: f64,
    tau: f64,
    y: f64,
}

/// `x ~ dnorm(mu0, tau0)` (or `dnormvar`), every likelihood child `y_i ~ dnorm(a_i x + b_i,
/// tau_i)` with `a_i`/`b_i`/`tau_i` KNOWN: the textbook weighted-linear-Gaussian update,
/// generalized to an arbitrary affine mean and any number of children.
pub struct NormalKnownPrecisionFactory;

impl NodeSamplerFactory for NormalKnownPrecisionFactory {
    fn name(&self) -> &'static str {
        "normal_known_precision"
    }

    fn try_build(&self, graph: &Graph, node: ArenaKey) -> Option<Arc<dyn NodeSampler>> {
        let n = graph.node(node).ok()?;
        if n.is_bounded() {
            return None;
        }
        let prior = n.prior()?;
        let parents = n.parents();
        if parents.len() != 2 {
            return None;
        }
        let mean_aff = classify(graph, parents[0], node)?;
        let second_aff = classify(graph, parents[1], node)?;
        if !mean_aff.is_known() || !second_aff.is_known() {
            return None;
        }
        let (mu0, tau0) = as_precision(prior.name(), mean_aff.b[0], second_aff.b[0])?;
        if tau0 <= 0.0 {
            return None;
        }

        let mut terms = Vec::new();
        for &child_id in graph.likelihood_children(node).ok()?.iter() {
            let child = graph.node(child_id).ok()?;
            let prior_c = child.prior()?;
            let cparents = child.parents();
            if cparents.len() != 2 {
                return None;
            }
            let mean_aff = classify(graph, cparents[0], node)?;
            if mean_aff.out_dim != 1 {
                return None;
            }
            let tau_aff = classify(graph, cparents[1], node)?;
            if !tau_aff.is_known() {
                return None;
            }
            let (_, tau) = as_precision(prior_c.name(), 0.0, tau_aff.b[0])?;
            if tau <= 0.0 {
                return None;
            }
            let y = child.value()?[0];
            terms.push(Term {
                a: mean_aff.a[0],
                b: mean_aff.b[0],
                tau,
                y,
            });
        }
        if terms.is_empty() {
            return None;
        }

        Some(Arc::new(NormalKnownPrecisionSampler { mu0, tau0, terms }))
    }
}

struct NormalKnownPrecisionSampler {
    mu0: f64,
    tau0: f64,
    terms: Vec<Term>,
}

impl NodeSampler for NormalKnownPrecisionSampler {
    fn name(&self) -> &'static str {
        "normal_known_precision"
    }

    fn sample(
        &self,
        _graph: &Graph,
        node: ArenaKey,
        particle: &mut dyn ParticleValues,
        rng: &mut Rng,
    ) -> Result<f64> {
        let mut precision = self.tau0;
        let mut weighted = self.tau0 * self.mu0;
        for t in &self.terms {
            precision += t.a * t.a * t.tau;
            weighted += t.a * t.tau * (t.y - t.b);
        }
        let post_mu = weighted / precision;
        let post_tau = precision;

        let x = rng.gaussian(post_mu, post_tau.sqrt().recip());
        particle.set(node, vec![x]);

        let dnorm = DNorm;
        let log_prior = dnorm.log_density(&[x], &[&[self.mu0], &[self.tau0]], None)?;
        let mut log_lik = 0.0;
        for t in &self.terms {
            let mean = t.a * x + t.b;
            log_lik += dnorm.log_density(&[t.y], &[&[mean], &[t.tau]], None)?;
        }
        let log_post = dnorm.log_density(&[x], &[&[post_mu], &[post_tau]], None)?;
        Ok(importance_weight(log_prior, log_lik, log_post))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_registry::distributions::DNorm;
    use pgm_registry::functions::{Add, Identity};
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

    fn particle() -> TestParticle {
        TestParticle(HashMap::new())
    }

    #[test]
    fn matches_direct_normal_normal_pair() {
        let mut g = Graph::new();
        let mu0 = g.add_constant(vec![1], vec![0.0]).unwrap();
        let tau0 = g.add_constant(vec![1], vec![1.0]).unwrap();
        let x = g.add_stochastic(Arc::new(DNorm), vec![mu0, tau0], false, None, None).unwrap();
        let taus = g.add_constant(vec![1], vec![4.0]).unwrap();
        let y = g.add_stochastic(Arc::new(DNorm), vec![x, taus], false, None, None).unwrap();
        g.set_observation(y, vec![2.0]).unwrap();
        g.build().unwrap();

        let sampler = NormalKnownPrecisionFactory.try_build(&g, x);
        assert!(sampler.is_some());
    }

    #[test]
    fn posterior_precision_equals_sum_of_precisions() {
        let mut g = Graph::new();
        let mu0 = g.add_constant(vec![1], vec![0.0]).unwrap();
        let tau0 = g.add_constant(vec![1], vec![1.0]).unwrap();
        let x = g.add_stochastic(Arc::new(DNorm), vec![mu0, tau0], false, None, None).unwrap();
        let taus = g.add_constant(vec![1], vec![3.0]).unwrap();
        let y = g.add_stochastic(Arc::new(DNorm), vec![x, taus], false, None, None).unwrap();
        g.set_observation(y, vec![10.0]).unwrap();
        g.build().unwrap();

        let sampler = NormalKnownPrecisionFactory.try_build(&g, x).unwrap();
        let mut p = particle();
        let mut rng = Rng::from_seed(42);
        let mut draws = Vec::new();
        for _ in 0..20_000 {
            sampler.sample(&g, x, &mut p, &mut rng).unwrap();
            draws.push(p.get(x).unwrap()[0]);
        }
        let mean: f64 = draws.iter().sum::<f64>() / draws.len() as f64;
        // posterior precision = 1 + 3 = 4, posterior mean = (1*0 + 3*10)/4 = 7.5
        assert!((mean - 7.5).abs() < 0.1, "mean={mean}");
    }

    #[test]
    fn affine_mean_through_identity_and_add_still_matches() {
        let mut g = Graph::new();
        let mu0 = g.add_constant(vec![1], vec![0.0]).unwrap();
        let tau0 = g.add_constant(vec![1], vec![1.0]).unwrap();
        let x = g.add_stochastic(Arc::new(DNorm), vec![mu0, tau0], false, None, None).unwrap();
        let id_x = g.add_logical(Arc::new(Identity), vec![x]).unwrap();
        let shift = g.add_constant(vec![1], vec![5.0]).unwrap();
        let mean = g.add_logical(Arc::new(Add), vec![id_x, shift]).unwrap();
        let taus = g.add_constant(vec![1], vec![2.0]).unwrap();
        let y = g.add_stochastic(Arc::new(DNorm), vec![mean, taus], false, None, None).unwrap();
        g.set_observation(y, vec![8.0]).unwrap();
        g.build().unwrap();

        assert!(NormalKnownPrecisionFactory.try_build(&g, x).is_some());
    }

    #[test]
    fn unaffine_mean_falls_back_to_other() {
        let mut g = Graph::new();
        let mu0 = g.add_constant(vec![1], vec![0.0]).unwrap();
        let tau0 = g.add_constant(vec![1], vec![1.0]).unwrap();
        let x = g.add_stochastic(Arc::new(DNorm), vec![mu0, tau0], false, None, None).unwrap();
        let mean = g.add_logical(Arc::new(pgm_registry::functions::Exp), vec![x]).unwrap();
        let taus = g.add_constant(vec![1], vec![2.0]).unwrap();
        let y = g.add_stochastic(Arc::new(DNorm), vec![mean, taus], false, None, None).unwrap();
        g.set_observation(y, vec![8.0]).unwrap();
        g.build().unwrap();

        assert!(NormalKnownPrecisionFactory.try_build(&g, x).is_none());
    }

    #[test]
    fn truncated_prior_is_excluded_from_conjugacy() {
        let mut g = Graph::new();
        let mu0 = g.add_constant(vec![1], vec![0.0]).unwrap();
        let tau0 = g.add_constant(vec![1], vec![1.0]).unwrap();
        let lo = g.add_constant(vec![1], vec![-1.0]).unwrap();
        let hi = g.add_constant(vec![1], vec![1.0]).unwrap();
        let x = g
            .add_stochastic(Arc::new(DNorm), vec![mu0, tau0], false, Some(lo), Some(hi))
            .unwrap();
        let taus = g.add_constant(vec![1], vec![2.0]).unwrap();
        let y = g.add_stochastic(Arc::new(DNorm), vec![x, taus], false, None, None).unwrap();
        g.set_observation(y, vec![0.5]).unwrap();
        g.build().unwrap();

        assert!(NormalKnownPrecisionFactory.try_build(&g, x).is_none());
    }
}
