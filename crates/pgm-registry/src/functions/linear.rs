use pgm_error::{Result, pgm_bail};

use crate::function::Function;

/// `x` unchanged. Used where the model language names a value without transforming it.
pub struct Identity;

impl Function for Identity {
    fn name(&self) -> &'static str {
        "identity"
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
        out.copy_from_slice(params[0]);
        Ok(())
    }
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool {
        param_discrete[0]
    }
    fn is_affine(&self) -> bool {
        true
    }
}

/// Elementwise `a + b`.
pub struct Add;

impl Function for Add {
    fn name(&self) -> &'static str {
        "add"
    }
    fn arity(&self) -> Option<usize> {
        Some(2)
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 2 && param_dims[0] == param_dims[1]
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        param_dims[0].to_vec()
    }
    fn eval(&self, out: &mut [f64], params: &[&[f64]], _param_dims: &[&[usize]]) -> Result<()> {
        for (o, (a, b)) in out.iter_mut().zip(params[0].iter().zip(params[1].iter())) {
            *o = a + b;
        }
        Ok(())
    }
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool {
        param_discrete[0] && param_discrete[1]
    }
    fn is_affine(&self) -> bool {
        true
    }
}

/// Elementwise `a - b`.
pub struct Subtract;

impl Function for Subtract {
    fn name(&self) -> &'static str {
        "subtract"
    }
    fn arity(&self) -> Option<usize> {
        Some(2)
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 2 && param_dims[0] == param_dims[1]
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        param_dims[0].to_vec()
    }
    fn eval(&self, out: &mut [f64], params: &[&[f64]], _param_dims: &[&[usize]]) -> Result<()> {
        for (o, (a, b)) in out.iter_mut().zip(params[0].iter().zip(params[1].iter())) {
            *o = a - b;
        }
        Ok(())
    }
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool {
        param_discrete[0] && param_discrete[1]
    }
    fn is_affine(&self) -> bool {
        true
    }
}

/// Elementwise `-x`.
pub struct Negate;

impl Function for Negate {
    fn name(&self) -> &'static str {
        "negate"
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
            *o = -a;
        }
        Ok(())
    }
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool {
        param_discrete[0]
    }
    fn is_affine(&self) -> bool {
        true
    }
}

/// `k * x`, `k` a scalar broadcast against `x` elementwise.
pub struct Scale;

impl Function for Scale {
    fn name(&self) -> &'static str {
        "scale"
    }
    fn arity(&self) -> Option<usize> {
        Some(2)
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 2 && (param_dims[0] == [1] || param_dims[1] == [1])
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        if param_dims[0] == [1] {
            param_dims[1].to_vec()
        } else {
            param_dims[0].to_vec()
        }
    }
    fn eval(&self, out: &mut [f64], params: &[&[f64]], param_dims: &[&[usize]]) -> Result<()> {
        let (scalar, vector) = if param_dims[0] == [1] {
            (params[0][0], params[1])
        } else {
            (params[1][0], params[0])
        };
        for (o, v) in out.iter_mut().zip(vector.iter()) {
            *o = scalar * v;
        }
        Ok(())
    }
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool {
        param_discrete[0] && param_discrete[1]
    }
    fn is_affine(&self) -> bool {
        true
    }
}

/// `A x`, a known `n x m` matrix `A` (row-major) applied to an `m`-vector `x`.
pub struct MatMultiply;

impl Function for MatMultiply {
    fn name(&self) -> &'static str {
        "matmul"
    }
    fn arity(&self) -> Option<usize> {
        Some(2)
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 2 && param_dims[0].len() == 2 && param_dims[1] == [param_dims[0][1]]
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        vec![param_dims[0][0]]
    }
    fn eval(&self, out: &mut [f64], params: &[&[f64]], param_dims: &[&[usize]]) -> Result<()> {
        let (n, m) = (param_dims[0][0], param_dims[0][1]);
        let a = params[0];
        let x = params[1];
        for i in 0..n {
            let mut acc = 0.0;
            for j in 0..m {
                acc += a[i * m + j] * x[j];
            }
            out[i] = acc;
        }
        Ok(())
    }
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool {
        param_discrete[0] && param_discrete[1]
    }
    fn is_affine(&self) -> bool {
        true
    }
}

/// Matrix transpose of a known `n x m` matrix.
pub struct Transpose;

impl Function for Transpose {
    fn name(&self) -> &'static str {
        "transpose"
    }
    fn arity(&self) -> Option<usize> {
        Some(1)
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 1 && param_dims[0].len() == 2
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        vec![param_dims[0][1], param_dims[0][0]]
    }
    fn eval(&self, out: &mut [f64], params: &[&[f64]], param_dims: &[&[usize]]) -> Result<()> {
        let (n, m) = (param_dims[0][0], param_dims[0][1]);
        let a = params[0];
        for i in 0..n {
            for j in 0..m {
                out[j * n + i] = a[i * m + j];
            }
        }
        Ok(())
    }
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool {
        param_discrete[0]
    }
    fn is_affine(&self) -> bool {
        true
    }
}

/// `x[indices]`, selecting entries of `x` at the (1-based, known) positions in `indices`.
pub struct IndexSelect;

impl Function for IndexSelect {
    fn name(&self) -> &'static str {
        "index_select"
    }
    fn arity(&self) -> Option<usize> {
        Some(2)
    }
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool {
        param_dims.len() == 2 && param_dims[0].len() == 1 && param_dims[1].len() == 1
    }
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize> {
        param_dims[1].to_vec()
    }
    fn eval(&self, out: &mut [f64], params: &[&[f64]], _param_dims: &[&[usize]]) -> Result<()> {
        let x = params[0];
        for (o, &idx) in out.iter_mut().zip(params[1].iter()) {
            let i = idx as usize;
            if i == 0 || i > x.len() {
                pgm_bail!(DataError: "index_select: index {} out of range for length {}", i, x.len());
            }
            *o = x[i - 1];
        }
        Ok(())
    }
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool {
        param_discrete[0]
    }
    fn is_affine(&self) -> bool {
        true
    }
}
