//! Closed-form conjugate families (§4.4). Every sampler here follows the same importance
//! weighting identity regardless of family: drawing `x` from the exact posterior and
//! weighting by `log prior(x) + sum log lik(y_i | x) - log posterior(x)` is, for any `x`,
//! equal to the log marginal likelihood `log p(y_{1:k})` — so there is no family-specific
//! weight formula to derive, only the posterior-parameter update.

pub mod beta_binomial;
pub mod gamma_normal_precision;
pub mod gamma_poisson;
pub mod linalg;
pub mod mvnormal;
pub mod normal;

/// `log prior(x) + log lik - log posterior(x)`, the shared weight identity every family
/// below evaluates with its own prior/posterior distribution objects.
pub fn importance_weight(log_prior: f64, log_likelihood: f64, log_posterior: f64) -> f64 {
    log_prior + log_likelihood - log_posterior
}
