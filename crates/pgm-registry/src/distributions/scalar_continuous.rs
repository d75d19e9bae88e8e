use pgm_core::Rng;
use pgm_error::Result;
use statrs::distribution::{Beta, ChiSquared, Continuous, Exp, FisherSnedecor, Gamma, LogNormal, Normal, StudentsT, Uniform, Weibull};

use crate::distribution::{Bounds, Distribution, SupportHint};
use crate::distributions::helpers::{numeric, sample_continuous};

fn scalar_dims(param_dims: &[&[usize]], arity: usize) -> bool {
    param_dims.len() == arity && param_dims.iter().all(|d| *d == [1])
}

/// `dnorm(mu, tau)`, precision-parameterized normal. The BUGS surface language always
/// passes precision (not variance) here; `dnormvar` below is the variance-parameterized
/// sibling.
pub struct DNorm;

impl Distribution for DNorm {
    fn name(&self) -> &'static str {
        "dnorm"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 2)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[1][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(Normal::new(params[0][0], params[1][0].sqrt().recip()))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(Normal::new(params[0][0], params[1][0].sqrt().recip()))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Unbounded
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dnormvar(mu, sigma2)`, variance-parameterized normal.
pub struct DNormVar;

impl Distribution for DNormVar {
    fn name(&self) -> &'static str {
        "dnormvar"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 2)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[1][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(Normal::new(params[0][0], params[1][0].sqrt()))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(Normal::new(params[0][0], params[1][0].sqrt()))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Unbounded
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dbeta(alpha, beta)`.
pub struct DBeta;

impl Distribution for DBeta {
    fn name(&self) -> &'static str {
        "dbeta"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 2)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[0][0] > 0.0 && params[1][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(Beta::new(params[0][0], params[1][0]))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(Beta::new(params[0][0], params[1][0]))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Fixed
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dexp(rate)`.
pub struct DExp;

impl Distribution for DExp {
    fn name(&self) -> &'static str {
        "dexp"
    }
    fn arity(&self) -> usize {
        1
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 1)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[0][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(Exp::new(params[0][0]))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(Exp::new(params[0][0]))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Positive
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dlnorm(mu, tau)`, precision-parameterized on the log scale.
pub struct DLnorm;

impl Distribution for DLnorm {
    fn name(&self) -> &'static str {
        "dlnorm"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 2)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[1][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(LogNormal::new(params[0][0], params[1][0].sqrt().recip()))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(LogNormal::new(params[0][0], params[1][0].sqrt().recip()))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Positive
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dchisqr(k)`.
pub struct DChisqr;

impl Distribution for DChisqr {
    fn name(&self) -> &'static str {
        "dchisqr"
    }
    fn arity(&self) -> usize {
        1
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 1)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[0][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(ChiSquared::new(params[0][0]))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(ChiSquared::new(params[0][0]))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Positive
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dgamma(shape, rate)`.
pub struct DGamma;

impl Distribution for DGamma {
    fn name(&self) -> &'static str {
        "dgamma"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 2)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[0][0] > 0.0 && params[1][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(Gamma::new(params[0][0], params[1][0]))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(Gamma::new(params[0][0], params[1][0]))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Positive
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dt(mu, tau, k)`, location-scale Student's t with precision `tau` and `k` degrees of
/// freedom.
pub struct DT;

impl Distribution for DT {
    fn name(&self) -> &'static str {
        "dt"
    }
    fn arity(&self) -> usize {
        3
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 3)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[1][0] > 0.0 && params[2][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(StudentsT::new(params[0][0], params[1][0].sqrt().recip(), params[2][0]))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(StudentsT::new(params[0][0], params[1][0].sqrt().recip(), params[2][0]))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Unbounded
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dweib(v, lambda)`, shape `v` and rate `lambda`: `f(x) = v·lambda·x^(v-1)·exp(-lambda·x^v)`.
/// `statrs::Weibull` is parameterized by shape and scale, so `lambda` is converted to
/// `scale = lambda^(-1/v)` at every call.
pub struct DWeib;

impl Distribution for DWeib {
    fn name(&self) -> &'static str {
        "dweib"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 2)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[0][0] > 0.0 && params[1][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let shape = params[0][0];
        let scale = params[1][0].powf(-1.0 / shape);
        let dist = numeric(Weibull::new(shape, scale))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let shape = params[0][0];
        let scale = params[1][0].powf(-1.0 / shape);
        let dist = numeric(Weibull::new(shape, scale))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Positive
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `df(n, m)`, Fisher-Snedecor with `n` and `m` degrees of freedom.
pub struct DF;

impl Distribution for DF {
    fn name(&self) -> &'static str {
        "df"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 2)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[0][0] > 0.0 && params[1][0] > 0.0
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(FisherSnedecor::new(params[0][0], params[1][0]))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(FisherSnedecor::new(params[0][0], params[1][0]))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Positive
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dunif(lower, upper)`.
pub struct DUnif;

impl Distribution for DUnif {
    fn name(&self) -> &'static str {
        "dunif"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        scalar_dims(param_dims, 2)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        params[0][0] < params[1][0]
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let dist = numeric(Uniform::new(params[0][0], params[1][0]))?;
        out[0] = sample_continuous(&dist, bounds, rng);
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let dist = numeric(Uniform::new(params[0][0], params[1][0]))?;
        Ok(dist.ln_pdf(x[0]))
    }
    fn support(&self) -> SupportHint {
        SupportHint::Interval
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_core::Rng;

    #[test]
    fn dnorm_round_trips_precision_and_variance() {
        let precision = DNorm;
        let variance = DNormVar;
        let x = [1.3];
        let mu = [0.5];
        let tau = [4.0];
        let sigma2 = [0.25];
        let a = precision.log_density(&x, &[&mu, &tau], None).unwrap();
        let b = variance.log_density(&x, &[&mu, &sigma2], None).unwrap();
        assert!((a - b).abs() < 1e-9, "{a} vs {b}");
    }

    #[test]
    fn dnorm_rejects_nonpositive_precision() {
        let dist = DNorm;
        assert!(!dist.check_param_values(&[&[0.0], &[0.0]]));
        assert!(dist.check_param_values(&[&[0.0], &[1.0]]));
    }

    #[test]
    fn dnorm_sample_within_truncation_bounds() {
        let dist = DNorm;
        let mut rng = Rng::from_seed(11);
        let mut out = [0.0];
        for _ in 0..200 {
            dist.sample(&mut out, &[&[0.0], &[1.0]], Some((-1.0, 1.0)), &mut rng).unwrap();
            assert!((-1.0..=1.0).contains(&out[0]));
        }
    }

    #[test]
    fn dbeta_support_is_fixed_and_rejects_nonpositive_shape() {
        let dist = DBeta;
        assert_eq!(dist.support(), SupportHint::Fixed);
        assert!(dist.check_param_values(&[&[2.0], &[3.0]]));
        assert!(!dist.check_param_values(&[&[0.0], &[3.0]]));
    }

    #[test]
    fn dunif_sample_respects_declared_bounds() {
        let dist = DUnif;
        let mut rng = Rng::from_seed(5);
        let mut out = [0.0];
        for _ in 0..200 {
            dist.sample(&mut out, &[&[2.0], &[5.0]], None, &mut rng).unwrap();
            assert!((2.0..5.0).contains(&out[0]));
        }
    }

    #[test]
    fn scalar_dims_rejects_vector_params() {
        let dist = DGamma;
        assert!(dist.check_param_dims(&[&[1], &[1]]));
        assert!(!dist.check_param_dims(&[&[2], &[1]]));
    }
}
