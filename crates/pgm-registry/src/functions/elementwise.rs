use pgm_error::Result;

use crate::function::Function;

/// Elementwise `exp(x)`. Not part of the closed affine set the conjugacy detector walks.
pub struct Exp;

impl Function for Exp {
    fn name(&self) -> &'static str {
        "exp"
    }
    fn arity(&self) -> Option<usize> {
        Some(1)
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 1
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        param_dims[0].to_vec()
    }
    fn eval(&self, out: &mut [f64], params: &[&[f64]], _param_dims: &[&[usize]]) -> Result<()> {
        for (o, a) in out.iter_mut().zip(params[0].iter()) {
            *o = a.exp();
        }
        Ok(())
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// Elementwise `log(x)`.
pub struct Log;

impl Function for Log {
    fn name(&self) -> &'static str {
        "log"
    }
    fn arity(&self) -> Option<usize> {
        Some(1)
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 1
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        param_dims[0].to_vec()
    }
    fn eval(&self, out: &mut [f64], params: &[&[f64]], _param_dims: &[&[usize]]) -> Result<()> {
        for (o, a) in out.iter_mut().zip(params[0].iter()) {
            *o = a.ln();
        }
        Ok(())
    }
    fn is_discrete_valued(&self, _param_discrete: &[bool]) -> bool {
        false
    }
}

/// `sum(x)`, a vector reduced to a scalar.
pub struct Sum;

impl Function for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }
    fn arity(&self) -> Option<usize> {
        Some(1)
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 1
    }
    fn output_dim(&self, _param_dims: &[&[usize]]) -> Vec<usize> {
        vec![1]
    }
    fn eval(&self, out: &mut [f64], params: &[&[f64]], _param_dims: &[&[usize]]) -> Result<()> {
        out[0] = params[0].iter().sum();
        Ok(())
    }
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool {
        param_discrete[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exp_is_elementwise_and_not_affine() {
        let f = Exp;
        let x = [0.0, 1.0];
        let mut out = [0.0, 0.0];
        f.eval(&mut out, &[&x], &[&[2]]).unwrap();
        assert_eq!(out, [1.0, std::f64::consts::E]);
        assert!(!f.is_affine());
    }

    #[test]
    fn log_is_the_inverse_of_exp_on_positive_values() {
        let exp = Exp;
        let log = Log;
        let x = [0.5];
        let mut mid = [0.0];
        let mut back = [0.0];
        exp.eval(&mut mid, &[&x], &[&[1]]).unwrap();
        log.eval(&mut back, &[&mid], &[&[1]]).unwrap();
        assert!((back[0] - x[0]).abs() < 1e-12);
    }

    #[test]
    fn sum_reduces_vector_to_scalar() {
        let f = Sum;
        let x = [1.0, 2.0, 3.0];
        let mut out = [0.0];
        f.eval(&mut out, &[&x], &[&[3]]).unwrap();
        assert_eq!(out[0], 6.0);
        assert_eq!(f.output_dim(&[&[3]]), vec![1]);
    }

    #[test]
    fn sum_is_discrete_only_if_its_input_is() {
        let f = Sum;
        assert!(f.is_discrete_valued(&[true]));
        assert!(!f.is_discrete_valued(&[false]));
    }
}
