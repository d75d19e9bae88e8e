use pgm_core::Rng;
use pgm_error::Result;

/// The category of support a distribution's density is defined over, queried by the
/// conjugacy detector (an unbounded prior is a precondition for every closed-form update)
/// and by the finite sampler (fixed support is a precondition for enumeration).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportHint {
    /// Support does not depend on the parameter values, e.g. a Bernoulli is always {0, 1}.
    Fixed,
    /// Support is the positive reals, possibly parameter-dependent upper/lower shape.
    Positive,
    /// Support is all of ℝ (or ℝᵏ).
    Unbounded,
    /// Support is a closed interval whose bounds are one or more of the parameters.
    Interval,
}

/// A bound pair for a scalar truncation, `T(lower, upper)` in the model language.
pub type Bounds = Option<(f64, f64)>;

/// One entry of the distribution catalog. Implementations wrap a `statrs` distribution for
/// density/CDF math and draw variates through the caller's [Rng] rather than through
/// `statrs`'s own `rand`-backed `Distribution::sample`, so every draw in a model run flows
/// through the one RNG stream the sampler owns.
pub trait Distribution: Send + Sync {
    /// The name under which this distribution is registered, e.g. `"dnorm"`.
    fn name(&self) -> &'static str;

    /// Number of parameters this distribution takes.
    fn arity(&self) -> usize;

    /// Whether the given parameter shapes are acceptable for this distribution. Each
    /// element is one parameter's dimension descriptor, e.g. `[1]` for a scalar or
    /// `[n, n]` for a square matrix.
    fn check_param_dims(&self, param_dims: &[&[usize]]) -> bool;

    /// Whether the given parameter values are in the distribution's valid domain
    /// (e.g. a scale parameter must be positive).
    fn check_param_values(&self, params: &[&[f64]]) -> bool;

    /// The dimension descriptor of a draw from this distribution given its parameters'
    /// shapes.
    fn output_dim(&self, param_dims: &[&[usize]]) -> Vec<usize>;

    /// Draws one variate into `out`, respecting `bounds` if the node carries a
    /// scalar truncation.
    fn sample(&self, out: &mut [f64], params: &[&[f64]], bounds: Bounds, rng: &mut Rng) -> Result<()>;

    /// log p(x | params), restricted to `bounds` if present. Returns a finite value or
    /// `f64::NEG_INFINITY`; never NaN for in-domain `params`.
    fn log_density(&self, x: &[f64], params: &[&[f64]], bounds: Bounds) -> Result<f64>;

    /// The category of support. This is a fixed property of the distribution family (e.g.
    /// a Gamma is always `Positive`), not of any particular parameter values.
    fn support(&self) -> SupportHint;

    /// Whether a draw from this distribution is integer-valued given which parameters are
    /// themselves discrete.
    fn is_discrete_valued(&self, param_discrete: &[bool]) -> bool;

    /// Whether the support is the same set regardless of which parameters are graph
    /// constants, given `param_fixed`. Families whose support is literally parameter-free
    /// (Bernoulli's `{0, 1}`) ignore the mask and are always fixed.
    fn is_support_fixed(&self, _param_fixed: &[bool]) -> bool {
        matches!(self.support(), SupportHint::Fixed)
    }

    /// For a discrete, fixed-support distribution, the enumerable value set. `None` for
    /// anything the finite sampler cannot enumerate (continuous, or discrete-but-unbounded
    /// like Poisson). Bounds narrow the returned set when present.
    fn finite_support(&self, _params: &[&[f64]], _bounds: Bounds) -> Option<Vec<f64>> {
        None
    }
}
