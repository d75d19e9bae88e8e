use pgm_error::Result;

/// One entry of the deterministic-function catalog consumed by logical nodes
/// (`x <- f(...)` in the model language).
pub trait Function: Send + Sync {
    /// The name under which this function is registered, e.g. `"add"`.
    fn name(&self) -> &'static str;

    /// Number of arguments this function takes, or `None` if variadic.
    fn arity(&self) -> Option<usize>;

    /// Whether the given argument shapes are acceptable. Each element is one argument's
    /// dimension descriptor, e.g. `[1]` for a scalar or `[n, m]` for a matrix.
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool;

    /// The output dimension descriptor given the argument shapes.
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize>;

    /// Evaluates the function, writing the result into `out`. `param_dims` carries each
    /// argument's shape, needed by matrix-shaped operations (matrix multiply, transpose)
    /// that a flat length alone would not disambiguate.
    fn eval(&self, out: &mut [f64], params: &[&[f64]], param_dims: &[&[usize]]) -> Result<()>;

    /// Whether the output is discrete given which arguments are themselves discrete.
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool;

    /// Whether this function belongs to the closed affine set the conjugacy detector
    /// walks when classifying a node as a LINEAR parameter slot: identity, add,
    /// subtract, negate, scalar multiply, matrix multiply or transpose by a KNOWN
    /// operand, or index-select by KNOWN indices. `false` for anything else (the
    /// detector then falls back to OTHER and conjugacy does not apply through this node).
    fn is_affine(&self) -> bool {
        false
    }
}
