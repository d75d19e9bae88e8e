use pgm_core::Rng;
use pgm_error::{Result, pgm_err};
use statrs::distribution::{ContinuousCDF, DiscreteCDF};

use crate::distribution::Bounds;

/// Maps a `statrs` construction failure (bad parameters) onto the catalog's own error
/// taxonomy; callers are expected to have already run `check_param_values`, so this only
/// fires when a caller skips that check.
pub fn numeric<T>(r: std::result::Result<T, statrs::StatsError>) -> Result<T> {
    r.map_err(|e| pgm_err!(NumericFailure: "{}", e))
}

pub fn finite(x: f64) -> bool {
    x.is_finite()
}

/// Draws a continuous variate by inverting `dist`'s CDF at a uniform drawn from `rng`,
/// restricted to `bounds` when the node carries a scalar truncation. One code path serves
/// every continuous family in the catalog, and every draw still flows through the caller's
/// single RNG stream.
pub fn sample_continuous<D>(dist: &D, bounds: Bounds, rng: &mut Rng) -> f64
where
    D: ContinuousCDF<f64, f64>,
{
    let u = rng.unit();
    match bounds {
        None => dist.inverse_cdf(u),
        Some((lo, hi)) => {
            let clo = dist.cdf(lo);
            let chi = dist.cdf(hi);
            dist.inverse_cdf(clo + u * (chi - clo))
        }
    }
}

/// Same idea as [sample_continuous] for integer-valued distributions exposing a discrete CDF.
pub fn sample_discrete<D>(dist: &D, bounds: Bounds, rng: &mut Rng) -> u64
where
    D: DiscreteCDF<u64, f64>,
{
    let u = rng.unit();
    match bounds {
        None => dist.inverse_cdf(u),
        Some((lo, hi)) => {
            let lo = lo.round() as u64;
            let hi = hi.round() as u64;
            let clo = if lo == 0 { 0.0 } else { dist.cdf(lo - 1) };
            let chi = dist.cdf(hi);
            dist.inverse_cdf(clo + u * (chi - clo))
        }
    }
}
