use pgm_core::Rng;
use pgm_error::Result;
use statrs::distribution::{Binomial, Discrete, Poisson};

use crate::distribution::{Bounds, Distribution, SupportHint};
use crate::distributions::helpers::{numeric, sample_discrete};

/// `dbern(p)`.
pub struct DBern;

impl Distribution for DBern {
    fn name(&self) -> &'static str {
        "dbern"
    }
    fn arity(&self) -> usize {
        1
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims == [[1].as_slice()]
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        (0.0..=1.0).contains(&params[0][0])
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], _bounds: Bounds, rng: &mut Rng) -> Result<()> {
        out[0] = if rng.unit() < params[0][0] { 1.0 } else { 0.0 };
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let p = params[0][0];
        Ok(if x[0] >= 0.5 { p.ln() } else { (1.0 - p).ln() })
    }
    fn support(&self) -> SupportHint {
        SupportHint::Fixed
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        true
    }
    fn finite_support(&self, _params: &[&[f64]], _bounds: Bounds) -> Option<Vec<f64>> {
        Some(vec![0.0, 1.0])
    }
}

/// `dbin(p, n)`, `n` independent Bernoulli(p) trials summed.
pub struct DBin;

impl Distribution for DBin {
    fn name(&self) -> &'static str {
        "dbin"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims == [[1].as_slice(), [1].as_slice()]
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        (0.0..=1.0).contains(&params[0][0]) && params[1][0] >= 0.0 && params[1][0].fract() == 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(Binomial::new(params[0][0], params[1][0] as u64))?;
        out[0] = sample_discrete(&dist, bounds, rng) as f64;
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(Binomial::new(params[0][0], params[1][0] as u64))?;
        Ok(dist.ln_pmf(x[0] as u64))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Interval
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        true
    }
    fn finite_support(&self, params: &[&[f64]], bounds: Bounds) -> Option<Vec<f64>> {
        let n = params[1][0] as u64;
        let (lo, hi) = bounds.unwrap_or((0.0, n as f64));
        let lo = lo.max(0.0) as u64;
        let hi = hi.min(n as f64) as u64;
        Some((lo..=hi).map(|k| k as f64).collect())
    }
}

/// `dpois(lambda)`. Unbounded discrete support, so the finite sampler cannot enumerate it
/// unless a truncation narrows it to a closed interval.
pub struct DPois;

impl Distribution for DPois {
    fn name(&self) -> &'static str {
        "dpois"
    }
    fn arity(&self) -> usize {
        1
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims == [[1].as_slice()]
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[0][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(Poisson::new(params[0][0]))?;
        out[0] = sample_discrete(&dist, bounds, rng) as f64;
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(Poisson::new(params[0][0]))?;
        Ok(dist.ln_pmf(x[0] as u64))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Positive
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        true
    }
    fn finite_support(&self, _params: &[&[f64]], bounds: Bounds) -> Option<Vec<f64>> {
        let (lo, hi) = bounds?;
        let lo = lo.max(0.0) as u64;
        let hi = hi as u64;
        Some((lo..=hi).map(|k| k as f64).collect())
    }
}

/// `dcat(pi)`, categorical over `{1, ..., len(pi)}` with the given (not necessarily
/// normalized) weights.
pub struct DCat;

impl Distribution for DCat {
    fn name(&self) -> &'static str {
        "dcat"
    }
    fn arity(&self) -> usize {
        1
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 1 && param_dims[0].len() == 1 && param_dims[0][0] >= 1
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        !params[0].is_empty() && params[0].iter().all(|&w| w >= 0.0) && params[0].iter().sum::<f64>() > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], _bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let weights = params[0];
        let total: f64 = weights.iter().sum();
        let u = rng.unit() * total;
        let mut acc = 0.0;
        for (i, &w) in weights.iter().enumerate() {
            acc += w;
            if u < acc {
                out[0] = (i + 1) as f64;
                return Ok(());
            }
        }
        out[0] = weights.len() as f64;
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let weights = params[0];
        let k = x[0] as usize;
        if k == 0 || k > weights.len() {
            return Ok(f64::NEG_INFINITY);
        }
        let total: f64 = weights.iter().sum();
        Ok((weights[k - 1] / total).ln())
    }
    fn support(&self) -> SupportHint {
        SupportHint::Interval
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        true
    }
    fn finite_support(&self, params: &[&[f64]], bounds: Bounds) -> Option<Vec<f64>> {
        let k = params[0].len();
        let (lo, hi) = bounds.unwrap_or((1.0, k as f64));
        let lo = lo.max(1.0) as usize;
        let hi = hi.min(k as f64) as usize;
        Some((lo..=hi).map(|i| i as f64).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_core::Rng;

    #[test]
    fn dbern_finite_support_is_zero_one() {
        let dist = DBern;
        assert_eq!(dist.finite_support(&[&[0.3]], None), Some(vec![0.0, 1.0]));
    }

    #[test]
    fn dbern_log_density_matches_bernoulli_pmf() {
        let dist = DBern;
        let p = [0.3];
        assert!((dist.log_density(&[1.0], &[&p], None).unwrap() - 0.3f64.ln()).abs() < 1e-12);
        assert!((dist.log_density(&[0.0], &[&p], None).unwrap() - 0.7f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn dbern_sample_converges_to_p_over_many_draws() {
        let dist = DBern;
        let mut rng = Rng::from_seed(9);
        let mut out = [0.0];
        let mut ones = 0;
        let n = 5_000;
        for _ in 0..n {
            dist.sample(&mut out, &[&[0.25]], None, &mut rng).unwrap();
            if out[0] >= 0.5 {
                ones += 1;
            }
        }
        let rate = ones as f64 / n as f64;
        assert!((rate - 0.25).abs() < 0.03, "rate={rate}");
    }

    #[test]
    fn dbin_finite_support_is_narrowed_by_bounds() {
        let dist = DBin;
        let n = [10.0];
        assert_eq!(dist.finite_support(&[&[0.4], &n], None), Some((0..=10).map(|k| k as f64).collect()));
        assert_eq!(dist.finite_support(&[&[0.4], &n], Some((2.0, 5.0))), Some((2..=5).map(|k| k as f64).collect()));
    }

    #[test]
    fn dpois_finite_support_requires_bounds() {
        let dist = DPois;
        assert_eq!(dist.finite_support(&[&[3.0]], None), None);
        assert_eq!(dist.finite_support(&[&[3.0]], Some((0.0, 4.0))), Some(vec![0.0, 1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn dcat_sample_only_ever_returns_in_range_categories() {
        let dist = DCat;
        let weights = [1.0, 2.0, 3.0];
        let mut rng = Rng::from_seed(13);
        let mut out = [0.0];
        for _ in 0..500 {
            dist.sample(&mut out, &[&weights], None, &mut rng).unwrap();
            assert!((1.0..=3.0).contains(&out[0]));
        }
    }

    #[test]
    fn dcat_log_density_out_of_range_is_neg_infinity() {
        let dist = DCat;
        let weights = [1.0, 2.0, 3.0];
        assert_eq!(dist.log_density(&[0.0], &[&weights], None).unwrap(), f64::NEG_INFINITY);
        assert_eq!(dist.log_density(&[4.0], &[&weights], None).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn dcat_finite_support_respects_bounds() {
        let dist = DCat;
        let weights = [1.0, 1.0, 1.0, 1.0];
        assert_eq!(dist.finite_support(&[&weights], Some((2.0, 3.0))), Some(vec![2.0, 3.0]));
    }
}
