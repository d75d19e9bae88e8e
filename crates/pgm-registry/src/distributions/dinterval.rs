use pgm_core::Rng;
use pgm_error::Result;

use crate::distribution::{Bounds, Distribution, SupportHint};

fn interval_index(t: f64, cutpoints: &[f64]) -> f64 {
    cutpoints.iter().filter(|&&c| t >= c).count() as f64
}

/// `dinterval(t, cutpoints)`. Not really a sampling distribution: it encodes that a node's
/// value is the (deterministic) index of the half-open interval of `cutpoints` containing
/// the continuous parameter `t`. It exists so that interval-censored observations on `t`
/// can be expressed as an ordinary stochastic node — `t` stays continuous and unconstrained,
/// while the observed interval index becomes the likelihood that disciplines it.
pub struct DInterval;

impl Distribution for DInterval {
    fn name(&self) -> &'static str {
        "dinterval"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 2 && param_dims[0] == [1]
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[1].windows(2).all(|w| w[0] <= w[1])
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], _bounds: Bounds, _rng: &mut Rng) -> Result<()> {
        out[0] = interval_index(params[0][0], params[1]);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        Ok(if x[0] == interval_index(params[0][0], params[1]) {
            0.0
        } else {
            f64::NEG_INFINITY
        })
    }
    fn support(&self) -> SupportHint {
        SupportHint::Fixed
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        true
    }
    fn finite_support(&self, params: &[&[f64]], _bounds: Bounds) -> Option<Vec<f64>> {
        Some((0..=params[1].len()).map(|i| i as f64).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_core::Rng;

    #[test]
    fn interval_index_below_first_cutpoint_is_zero() {
        let cutpoints = [0.0, 1.0, 2.0];
        assert_eq!(interval_index(-5.0, &cutpoints), 0.0);
    }

    #[test]
    fn interval_index_above_last_cutpoint_is_len() {
        let cutpoints = [0.0, 1.0, 2.0];
        assert_eq!(interval_index(10.0, &cutpoints), 3.0);
    }

    #[test]
    fn interval_index_on_a_cutpoint_is_inclusive_of_it() {
        let cutpoints = [0.0, 1.0, 2.0];
        assert_eq!(interval_index(1.0, &cutpoints), 2.0);
    }

    #[test]
    fn sample_is_deterministic_given_t_and_ignores_rng() {
        let dist = DInterval;
        let t = [1.5];
        let cutpoints = [0.0, 1.0, 2.0];
        let mut out = [0.0];
        let mut rng = Rng::from_seed(1);
        dist.sample(&mut out, &[&t, &cutpoints], None, &mut rng).unwrap();
        assert_eq!(out[0], 2.0);
    }

    #[test]
    fn log_density_is_zero_on_match_and_neg_infinity_otherwise() {
        let dist = DInterval;
        let t = [1.5];
        let cutpoints = [0.0, 1.0, 2.0];
        assert_eq!(dist.log_density(&[2.0], &[&t, &cutpoints], None).unwrap(), 0.0);
        assert_eq!(dist.log_density(&[0.0], &[&t, &cutpoints], None).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn check_param_values_requires_sorted_cutpoints() {
        let dist = DInterval;
        assert!(dist.check_param_values(&[&[0.5], &[0.0, 1.0, 2.0]]));
        assert!(!dist.check_param_values(&[&[0.5], &[0.0, 2.0, 1.0]]));
    }
}
