use pgm_core::Rng;
use pgm_error::{Result, pgm_err};
use statrs::function::gamma::ln_gamma;

use crate::distribution::{Bounds, Distribution, SupportHint};

/// Lower-triangular Cholesky factor of a flat, row-major `n x n` matrix. `None` if the
/// matrix is not positive-definite — the caller turns that into a `NumericFailure`.
fn cholesky_lower(a: &[f64], n: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i * n + j] = sum.sqrt();
            } else {
                l[i * n + j] = sum / l[j * n + j];
            }
        }
    }
    Some(l)
}

/// Solves `L y = b` for lower-triangular `L`.
fn forward_solve(l: &[f64], n: usize, b: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i * n + k] * y[k];
        }
        y[i] = sum / l[i * n + i];
    }
    y
}

/// Solves `Lᵀ y = b` for lower-triangular `L`, i.e. back-substitution against its
/// transpose.
fn back_solve_transposed(l: &[f64], n: usize, b: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for k in (i + 1)..n {
            sum -= l[k * n + i] * y[k];
        }
        y[i] = sum / l[i * n + i];
    }
    y
}

fn log_det_from_chol(l: &[f64], n: usize) -> f64 {
    (0..n).map(|i| l[i * n + i].ln()).sum::<f64>() * 2.0
}

fn quadratic_form(mat: &[f64], n: usize, v: &[f64]) -> f64 {
    let mut acc = 0.0;
    for i in 0..n {
        let mut row = 0.0;
        for j in 0..n {
            row += mat[i * n + j] * v[j];
        }
        acc += v[i] * row;
    }
    acc
}

fn check_square_dims(param_dims: &[&[usize]]) -> bool {
    param_dims.len() == 2
        && param_dims[0].len() == 1
        && param_dims[1] == [param_dims[0][0], param_dims[0][0]]
}

/// `dmnorm(mu, tau)`, precision-parameterized multivariate normal. `tau` is the flattened,
/// row-major `n x n` precision matrix.
pub struct DMNorm;

impl Distribution for DMNorm {
    fn name(&self) -> &'static str {
        "dmnorm"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        check_square_dims(param_dims)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        let n = params[0].len();
        cholesky_lower(params[1], n).is_some()
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        param_dims[0].to_vec()
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], _bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let mu = params[0];
        let n = mu.len();
        let l = cholesky_lower(params[1], n).ok_or_else(|| pgm_err!(NumericFailure: "precision matrix is not positive-semidefinite"))?;
        let z: Vec<f64> = (0..n).map(|_| rng.gaussian(0.0, 1.0)).collect();
        // Sigma = (L Lᵀ)⁻¹, so a draw is mu + L⁻ᵀ z.
        let offset = back_solve_transposed(&l, n, &z);
        for i in 0..n {
            out[i] = mu[i] + offset[i];
        }
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let mu = params[0];
        let n = mu.len();
        let precision = params[1];
        let l = cholesky_lower(precision, n).ok_or_else(|| pgm_err!(NumericFailure: "precision matrix is not positive-semidefinite"))?;
        let diff: Vec<f64> = (0..n).map(|i| x[i] - mu[i]).collect();
        let qf = quadratic_form(precision, n, &diff);
        let log_det_precision = log_det_from_chol(&l, n);
        Ok(-0.5 * n as f64 * (2.0 * std::f64::consts::PI).ln() + 0.5 * log_det_precision - 0.5 * qf)
    }
    fn support(&self) -> SupportHint {
        SupportHint::Unbounded
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dmnormvar(mu, sigma)`, covariance-parameterized multivariate normal. `sigma` is the
/// flattened, row-major `n x n` covariance matrix.
pub struct DMNormVar;

impl Distribution for DMNormVar {
    fn name(&self) -> &'static str {
        "dmnormvar"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        check_square_dims(param_dims)
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        let n = params[0].len();
        cholesky_lower(params[1], n).is_some()
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        param_dims[0].to_vec()
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], _bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let mu = params[0];
        let n = mu.len();
        let l = cholesky_lower(params[1], n).ok_or_else(|| pgm_err!(NumericFailure: "covariance matrix is not positive-semidefinite"))?;
        let z: Vec<f64> = (0..n).map(|_| rng.gaussian(0.0, 1.0)).collect();
        let mut offset = vec![0.0; n];
        for i in 0..n {
            let mut s = 0.0;
            for j in 0..=i {
                s += l[i * n + j] * z[j];
            }
            offset[i] = s;
        }
        for i in 0..n {
            out[i] = mu[i] + offset[i];
        }
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let mu = params[0];
        let n = mu.len();
        let l = cholesky_lower(params[1], n).ok_or_else(|| pgm_err!(NumericFailure: "covariance matrix is not positive-semidefinite"))?;
        let diff: Vec<f64> = (0..n).map(|i| x[i] - mu[i]).collect();
        let y = forward_solve(&l, n, &diff);
        let qf: f64 = y.iter().map(|v| v * v).sum();
        let log_det_sigma = log_det_from_chol(&l, n);
        Ok(-0.5 * n as f64 * (2.0 * std::f64::consts::PI).ln() - 0.5 * log_det_sigma - 0.5 * qf)
    }
    fn support(&self) -> SupportHint {
        SupportHint::Unbounded
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `dmulti(p, n)`, `n` trials distributed across `len(p)` categories.
pub struct DMulti;

impl Distribution for DMulti {
    fn name(&self) -> &'static str {
        "dmulti"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 2 && param_dims[0].len() == 1 && param_dims[1] == [1]
    }
    fn check_param_values(&self, params: &[&[f64]]) -> bool {
        !params[0].is_empty()
            && params[0].iter().all(|&w| w >= 0.0)
            && params[0].iter().sum::<f64>() > 0.0
            && params[1][0] >= 0.0
            && params[1][0].fract() == 0.0
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        param_dims[0].to_vec()
    }
    fn sample(&self, out: &mut [f64], params: &[&[f64]], _bounds: Bounds, rng: &mut Rng) -> Result<()> {
        let probs = params[0];
        let total_p: f64 = probs.iter().sum();
        let mut trials_left = params[1][0] as i64;
        let mut mass_left = total_p;
        for (i, &p) in probs.iter().enumerate() {
            out[i] = 0.0;
            if i == probs.len() - 1 {
                out[i] = trials_left as f64;
                break;
            }
            let cond_p = (p / mass_left).clamp(0.0, 1.0);
            let mut count = 0i64;
            for _ in 0..trials_left {
                if rng.unit() < cond_p {
                    count += 1;
                }
            }
            out[i] = count as f64;
            trials_left -= count;
            mass_left -= p;
        }
        Ok(())
    }
    fn log_density(&self, x: &[f64], params: &[&[f64]], _bounds: Bounds) -> Result<f64> {
        let probs = params[0];
        let n = params[1][0];
        let total_p: f64 = probs.iter().sum();
        let sum_x: f64 = x.iter().sum();
        if (sum_x - n).abs() > 1e-9 {
            return Ok(f64::NEG_INFINITY);
        }
        let mut log_density = ln_gamma(n + 1.0);
        for (&xi, &pi) in x.iter().zip(probs.iter()) {
            log_density -= ln_gamma(xi + 1.0);
            if xi > 0.0 {
                log_density += xi * (pi / total_p).ln();
            }
        }
        Ok(log_density)
    }
    fn support(&self) -> SupportHint {
        SupportHint::Interval
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_core::Rng;

    #[test]
    fn cholesky_reconstructs_identity() {
        let a = [1.0, 0.0, 0.0, 1.0];
        let l = cholesky_lower(&a, 2).unwrap();
        assert_eq!(l, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn cholesky_rejects_indefinite_matrix() {
        let a = [1.0, 2.0, 2.0, 1.0];
        assert!(cholesky_lower(&a, 2).is_none());
    }

    #[test]
    fn forward_and_back_solve_invert_cholesky_factor() {
        let a = [4.0, 2.0, 2.0, 3.0];
        let l = cholesky_lower(&a, 2).unwrap();
        let b = [1.0, 1.0];
        let y = forward_solve(&l, 2, &b);
        // L y = b, so L^T (L^-T y') shouldn't be needed here; just check L y == b.
        let reconstructed = [l[0] * y[0], l[2] * y[0] + l[3] * y[1]];
        assert!((reconstructed[0] - b[0]).abs() < 1e-9);
        assert!((reconstructed[1] - b[1]).abs() < 1e-9);
    }

    #[test]
    fn dmnorm_and_dmnormvar_agree_on_diagonal_case() {
        // tau = diag(1/sigma^2) <=> sigma = diag(sigma^2); independent unit-variance case.
        let precision = DMNorm;
        let variance = DMNormVar;
        let mu = [0.0, 0.0];
        let tau = [1.0, 0.0, 0.0, 1.0];
        let sigma = [1.0, 0.0, 0.0, 1.0];
        let x = [0.3, -0.2];
        let a = precision.log_density(&x, &[&mu, &tau], None).unwrap();
        let b = variance.log_density(&x, &[&mu, &sigma], None).unwrap();
        assert!((a - b).abs() < 1e-9, "{a} vs {b}");
    }

    #[test]
    fn dmnorm_rejects_nonpositive_definite_precision() {
        let dist = DMNorm;
        let bad = [1.0, 2.0, 2.0, 1.0];
        assert!(!dist.check_param_values(&[&[0.0, 0.0], &bad]));
    }

    #[test]
    fn dmnorm_sample_has_correct_dimension() {
        let dist = DMNorm;
        let mut rng = Rng::from_seed(21);
        let mut out = [0.0, 0.0, 0.0];
        let mu = [0.0, 0.0, 0.0];
        let tau = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        dist.sample(&mut out, &[&mu, &tau], None, &mut rng).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn dmulti_log_density_rejects_count_mismatch() {
        let dist = DMulti;
        let probs = [1.0, 1.0];
        let n = [5.0];
        let x = [1.0, 1.0];
        assert_eq!(dist.log_density(&x, &[&probs, &n], None).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn dmulti_log_density_matches_binomial_at_two_categories() {
        let dist = DMulti;
        let probs = [0.5, 0.5];
        let n = [4.0];
        let x = [1.0, 3.0];
        let ld = dist.log_density(&x, &[&probs, &n], None).unwrap();
        // C(4,1) * 0.5^4 = 4/16 = 0.25
        assert!((ld.exp() - 0.25).abs() < 1e-9, "{}", ld.exp());
    }

    #[test]
    fn dmulti_sample_counts_sum_to_n() {
        let dist = DMulti;
        let mut rng = Rng::from_seed(31);
        let probs = [1.0, 2.0, 3.0];
        let mut out = [0.0, 0.0, 0.0];
        dist.sample(&mut out, &[&probs, &[10.0]], None, &mut rng).unwrap();
        assert!((out.iter().sum::<f64>() - 10.0).abs() < 1e-9);
    }
}
