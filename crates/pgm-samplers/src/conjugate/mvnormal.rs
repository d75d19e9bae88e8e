use std::sync::Arc;

use pgm_core::Rng;
use pgm_error::{Result, pgm_err};
use pgm_graph::Graph;
use pgm_registry::Distribution;
use pgm_registry::distributions::DMNorm;
use pgm_utils::ArenaKey;

use super::importance_weight;
use super::linalg::{add, cholesky_lower, invert_spd, matmul, matvec, sub, transpose};
use crate::classify::classify;
use crate::factory::NodeSamplerFactory;
use crate::sampler::NodeSampler;
use crate::values::ParticleValues;

struct Term {
    a: Vec<f64>, // m x n, row-major
    b: Vec<f64>, // m
    r: Vec<f64>, // m x m observation covariance (inverse of the child's known precision)
    m: usize,
    y: Vec<f64>,
}

/// `x ~ dmnorm(mu0, Tau0)`, every likelihood child `y_i ~ dmnorm(A_i x + b_i, Tau_i)` with
/// `A_i`/`b_i`/`Tau_i` KNOWN: a Kalman-gain update applied sequentially per matching child,
/// with the Joseph-form covariance update (`(I - K A) Sigma (I - K A)ᵀ + K R Kᵀ`) preferred
/// over the plain `(I - K A) Sigma` form, since Joseph form stays positive-semidefinite
/// under floating-point rounding even when the gain is computed from a near-singular `S`.
pub struct MvNormalKnownPrecisionFactory;

impl NodeSamplerFactory for MvNormalKnownPrecisionFactory {
    fn name(&self) -> &'static str {
        "mvnormal_known_precision"
    }

    fn try_build(&self, graph: &Graph, node: ArenaKey) -> Option<Arc<dyn NodeSampler>> {
        let n = graph.node(node).ok()?;
        if n.is_bounded() {
            return None;
        }
        let prior = n.prior()?;
        if prior.name() != "dmnorm" {
            return None;
        }
        let dim: usize = n.dim().iter().product();
        if dim < 2 {
            return None; // the scalar family handles dim == 1 more cheaply
        }
        let parents = n.parents();
        let mu0_aff = classify(graph, parents[0], node)?;
        let tau0_aff = classify(graph, parents[1], node)?;
        if !mu0_aff.is_known() || !tau0_aff.is_known() {
            return None;
        }
        let mu0 = mu0_aff.b.clone();
        let tau0 = tau0_aff.b.clone();
        let sigma0 = invert_spd(&tau0, dim)?;

        let mut terms = Vec::new();
        for &child_id in graph.likelihood_children(node).ok()?.iter() {
            let child = graph.node(child_id).ok()?;
            let prior_c = child.prior()?;
            if prior_c.name() != "dmnorm" {
                return None;
            }
            let cparents = child.parents();
            let mean_aff = classify(graph, cparents[0], node)?;
            let tau_aff = classify(graph, cparents[1], node)?;
            if !tau_aff.is_known() {
                return None;
            }
            let m = mean_aff.out_dim;
            let r = invert_spd(&tau_aff.b, m)?;
            let y = child.value()?.to_vec();
            terms.push(Term {
                a: mean_aff.a.clone(),
                b: mean_aff.b.clone(),
                r,
                m,
                y,
            });
        }
        if terms.is_empty() {
            return None;
        }

        Some(Arc::new(MvNormalKnownPrecisionSampler {
            dim,
            mu0,
            sigma0,
            terms,
        }))
    }
}

struct MvNormalKnownPrecisionSampler {
    dim: usize,
    mu0: Vec<f64>,
    sigma0: Vec<f64>,
    terms: Vec<Term>,
}

/// One Kalman-gain step: given prior `(mu, sigma)` and a known-precision affine
/// observation, returns the updated `(mu, sigma)` via the Joseph-form covariance update.
fn kalman_step(mu: &[f64], sigma: &[f64], n: usize, term: &Term) -> Option<(Vec<f64>, Vec<f64>)> {
    let m = term.m;
    let a_sigma = matmul(&term.a, m, n, sigma, n); // m x n
    let a_t = transpose(&term.a, m, n); // n x m
    let a_sigma_at = matmul(&a_sigma, m, n, &a_t, m); // m x m
    let s: Vec<f64> = add(&a_sigma_at, &term.r);
    let s_inv = invert_spd(&s, m)?;
    let sigma_at = matmul(sigma, n, n, &a_t, m); // n x m
    let k = matmul(&sigma_at, n, m, &s_inv, m); // n x m

    let a_mu = matvec(&term.a, m, n, mu);
    let innovation = sub(&sub(&term.y, &a_mu), &term.b);
    let correction = matvec(&k, n, m, &innovation);
    let mu_post = add(mu, &correction);

    let ka = matmul(&k, n, m, &term.a, n); // n x n
    let mut i_minus_ka = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            i_minus_ka[i * n + j] = if i == j { 1.0 } else { 0.0 } - ka[i * n + j];
        }
    }
    let left = matmul(&i_minus_ka, n, n, sigma, n);
    let left_t = transpose(&i_minus_ka, n, n);
    let term1 = matmul(&left, n, n, &left_t, n);
    let kr = matmul(&k, n, m, &term.r, m);
    let k_t = transpose(&k, n, m);
    let term2 = matmul(&kr, n, m, &k_t, m);
    let sigma_post = add(&term1, &term2);

    Some((mu_post, sigma_post))
}

impl NodeSampler for MvNormalKnownPrecisionSampler {
    fn name(&self) -> &'static str {
        "mvnormal_known_precision"
    }

    fn sample(
        &self,
        _graph: &Graph,
        node: ArenaKey,
        particle: &mut dyn ParticleValues,
        rng: &mut Rng,
    ) -> Result<f64> {
        let n = self.dim;
        let mut mu = self.mu0.clone();
        let mut sigma = self.sigma0.clone();
        for term in &self.terms {
            let (mu2, sigma2) = kalman_step(&mu, &sigma, n, term)
                .ok_or_else(|| pgm_err!(NumericFailure: "mvnormal conjugate update: singular innovation covariance"))?;
            mu = mu2;
            sigma = sigma2;
        }

        let l = cholesky_lower(&sigma, n)
            .ok_or_else(|| pgm_err!(NumericFailure: "mvnormal conjugate update: posterior covariance not positive-definite"))?;
        let z: Vec<f64> = (0..n).map(|_| rng.gaussian(0.0, 1.0)).collect();
        let offset = {
            // Sigma = L Lᵀ (covariance form, unlike DMNorm's precision-Cholesky), so a
            // draw is mu + L z directly.
            let mut out = vec![0.0; n];
            for i in 0..n {
                let mut acc = 0.0;
                for j in 0..=i {
                    acc += l[i * n + j] * z[j];
                }
                out[i] = acc;
            }
            out
        };
        let x: Vec<f64> = mu.iter().zip(&offset).map(|(&m, &o)| m + o).collect();
        particle.set(node, x.clone());

        let tau0 = invert_spd(&self.sigma0, n)
            .ok_or_else(|| pgm_err!(NumericFailure: "mvnormal conjugate: prior covariance not invertible"))?;
        let dmnorm = DMNorm;
        let log_prior = dmnorm.log_density(&x, &[self.mu0.as_slice(), tau0.as_slice()], None)?;
        let mut log_lik = 0.0;
        for term in &self.terms {
            let mean = add(&matvec(&term.a, term.m, n, &x), &term.b);
            let tau_i = invert_spd(&term.r, term.m)
                .ok_or_else(|| pgm_err!(NumericFailure: "mvnormal conjugate: observation covariance not invertible"))?;
            log_lik += dmnorm.log_density(&term.y, &[mean.as_slice(), tau_i.as_slice()], None)?;
        }
        let tau_post = invert_spd(&sigma, n)
            .ok_or_else(|| pgm_err!(NumericFailure: "mvnormal conjugate: posterior covariance not invertible"))?;
        let log_post = dmnorm.log_density(&x, &[mu.as_slice(), tau_post.as_slice()], None)?;
        Ok(importance_weight(log_prior, log_lik, log_post))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_registry::distributions::DMNorm;
    use pgm_registry::functions::Identity;
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

    fn build_diagonal_model() -> (Graph, ArenaKey) {
        let mut g = Graph::new();
        let mu0 = g.add_constant(vec![2], vec![0.0, 0.0]).unwrap();
        let tau0 = g.add_constant(vec![2, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let x = g.add_stochastic(Arc::new(DMNorm), vec![mu0, tau0], false, None, None).unwrap();
        let mean = g.add_logical(Arc::new(Identity), vec![x]).unwrap();
        let tau_y = g.add_constant(vec![2, 2], vec![4.0, 0.0, 0.0, 4.0]).unwrap();
        let y = g.add_stochastic(Arc::new(DMNorm), vec![mean, tau_y], false, None, None).unwrap();
        g.set_observation(y, vec![1.0, -1.0]).unwrap();
        g.build().unwrap();
        (g, x)
    }

    #[test]
    fn matches_diagonal_linear_gaussian_pair() {
        let (g, x) = build_diagonal_model();
        assert!(MvNormalKnownPrecisionFactory.try_build(&g, x).is_some());
    }

    /// `x ~ dmnorm(mu0, Tau0)`, `y ~ dmnorm(A x + b, Tau_y)` with `A` a genuine (non-identity,
    /// non-diagonal) 2x2 matrix: exercises the `matmul` + `add` affine chain `classify` must
    /// walk through, not just the identity-mean case above.
    fn build_linear_mean_model() -> (Graph, ArenaKey, [f64; 4], [f64; 2]) {
        let a = [2.0, 1.0, 0.0, 3.0];
        let b = [0.5, -0.5];
        let mut g = Graph::new();
        let mu0 = g.add_constant(vec![2], vec![0.0, 0.0]).unwrap();
        let tau0 = g.add_constant(vec![2, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let x = g.add_stochastic(Arc::new(DMNorm), vec![mu0, tau0], false, None, None).unwrap();

        let a_node = g.add_constant(vec![2, 2], a.to_vec()).unwrap();
        let ax = g.add_logical(Arc::new(pgm_registry::functions::MatMultiply), vec![a_node, x]).unwrap();
        let b_node = g.add_constant(vec![2], b.to_vec()).unwrap();
        let mean = g.add_logical(Arc::new(pgm_registry::functions::Add), vec![ax, b_node]).unwrap();

        let tau_y = g.add_constant(vec![2, 2], vec![4.0, 0.0, 0.0, 4.0]).unwrap();
        let y = g.add_stochastic(Arc::new(DMNorm), vec![mean, tau_y], false, None, None).unwrap();
        g.set_observation(y, vec![3.0, 2.0]).unwrap();
        g.build().unwrap();
        (g, x, a, b)
    }

    #[test]
    fn recognizes_a_non_identity_linear_mean_as_conjugate() {
        let (g, x, _, _) = build_linear_mean_model();
        assert!(MvNormalKnownPrecisionFactory.try_build(&g, x).is_some());
    }

    #[test]
    fn posterior_mean_matches_closed_form_kalman_update_through_matmul_and_add() {
        let (g, x, a, b) = build_linear_mean_model();
        let sampler = MvNormalKnownPrecisionFactory.try_build(&g, x).unwrap();
        let mut p = TestParticle(HashMap::new());
        let mut rng = Rng::from_seed(5);
        let trials = 40_000;
        let mut sum = [0.0, 0.0];
        for _ in 0..trials {
            sampler.sample(&g, x, &mut p, &mut rng).unwrap();
            let v = p.get(x).unwrap();
            sum[0] += v[0];
            sum[1] += v[1];
        }
        let empirical_mean = [sum[0] / trials as f64, sum[1] / trials as f64];

        // Closed-form Kalman-gain update for prior N(0, I), observation y = A x + b + noise,
        // noise precision 4*I: Sigma_post^-1 = Tau0 + Aᵀ Tau_y A, mu_post = Sigma_post Aᵀ Tau_y (y - b).
        let tau_y = 4.0;
        let at_taua = [
            tau_y * (a[0] * a[0] + a[2] * a[2]),
            tau_y * (a[0] * a[1] + a[2] * a[3]),
            tau_y * (a[1] * a[0] + a[3] * a[2]),
            tau_y * (a[1] * a[1] + a[3] * a[3]),
        ];
        let tau_post = [1.0 + at_taua[0], at_taua[1], at_taua[2], 1.0 + at_taua[3]];
        let sigma_post = invert_spd(&tau_post, 2).unwrap();
        let y = [3.0, 2.0];
        let y_minus_b = [y[0] - b[0], y[1] - b[1]];
        let at_tau_r = [tau_y * a[0], tau_y * a[2], tau_y * a[1], tau_y * a[3]]; // (Aᵀ Tau_y), row-major 2x2
        let rhs = [
            at_tau_r[0] * y_minus_b[0] + at_tau_r[1] * y_minus_b[1],
            at_tau_r[2] * y_minus_b[0] + at_tau_r[3] * y_minus_b[1],
        ];
        let expected_mean = [
            sigma_post[0] * rhs[0] + sigma_post[1] * rhs[1],
            sigma_post[2] * rhs[0] + sigma_post[3] * rhs[1],
        ];

        assert!((empirical_mean[0] - expected_mean[0]).abs() < 0.03, "mean0={} expected={}", empirical_mean[0], expected_mean[0]);
        assert!((empirical_mean[1] - expected_mean[1]).abs() < 0.03, "mean1={} expected={}", empirical_mean[1], expected_mean[1]);
    }

    #[test]
    fn posterior_mean_matches_per_component_scalar_update() {
        let (g, x) = build_diagonal_model();
        let sampler = MvNormalKnownPrecisionFactory.try_build(&g, x).unwrap();
        let mut p = TestParticle(HashMap::new());
        let mut rng = Rng::from_seed(11);
        let mut sum = [0.0, 0.0];
        let trials = 20_000;
        for _ in 0..trials {
            sampler.sample(&g, x, &mut p, &mut rng).unwrap();
            let v = p.get(x).unwrap();
            sum[0] += v[0];
            sum[1] += v[1];
        }
        // Per-axis: tau0=1, tau_y=4 => posterior mean = (1*0 + 4*y)/(1+4) = 0.8*y
        let mean0 = sum[0] / trials as f64;
        let mean1 = sum[1] / trials as f64;
        assert!((mean0 - 0.8).abs() < 0.05, "mean0={mean0}");
        assert!((mean1 + 0.8).abs() < 0.05, "mean1={mean1}");
    }
}
