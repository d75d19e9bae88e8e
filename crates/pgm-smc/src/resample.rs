use pgm_core::Rng;

/// Resampling method selectable at `run_forward` (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleMethod {
    Multinomial,
    Residual,
    Stratified,
    Systematic,
}

/// `(Σ wᵢ)² / Σ wᵢ²` on unnormalized weights — equivalently `1 / Σ w̃ᵢ²` on normalized ones.
pub fn effective_sample_size(weights: &[f64]) -> f64 {
    let sum: f64 = weights.iter().sum();
    let sum_sq: f64 = weights.iter().map(|w| w * w).sum();
    if sum_sq == 0.0 { 0.0 } else { sum * sum / sum_sq }
}

fn cumulative(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    let mut acc = 0.0;
    weights
        .iter()
        .map(|w| {
            acc += w / total;
            acc
        })
        .collect()
}

/// Left-continuous CDF inversion: the first index whose cumulative weight strictly exceeds
/// `u`. A particle with exactly zero weight never widens the interval that selects it.
fn invert(cum: &[f64], u: f64) -> usize {
    cum.iter().position(|&c| c > u).unwrap_or(cum.len() - 1)
}

/// Draws `N` ancestor indices according to `method`, preserving the order of survivors
/// (no shuffle, per §4.6).
pub fn resample_indices(weights: &[f64], method: ResampleMethod, rng: &mut Rng) -> Vec<usize> {
    let n = weights.len();
    match method {
        ResampleMethod::Multinomial => {
            let cum = cumulative(weights);
            (0..n).map(|_| invert(&cum, rng.unit())).collect()
        }
        ResampleMethod::Residual => residual(weights, rng),
        ResampleMethod::Stratified => {
            let cum = cumulative(weights);
            (0..n)
                .map(|k| {
                    let u = (k as f64 + rng.unit()) / n as f64;
                    invert(&cum, u)
                })
                .collect()
        }
        ResampleMethod::Systematic => {
            let cum = cumulative(weights);
            let u0 = rng.unit() / n as f64;
            (0..n).map(|k| invert(&cum, u0 + k as f64 / n as f64)).collect()
        }
    }
}

fn residual(weights: &[f64], rng: &mut Rng) -> Vec<usize> {
    let n = weights.len();
    let total: f64 = weights.iter().sum();
    let normalized: Vec<f64> = weights.iter().map(|w| w / total).collect();

    let mut indices = Vec::with_capacity(n);
    let mut residual_weights = Vec::with_capacity(n);
    for (i, &w) in normalized.iter().enumerate() {
        let expected = n as f64 * w;
        let copies = expected.floor() as usize;
        for _ in 0..copies {
            indices.push(i);
        }
        residual_weights.push(expected - copies as f64);
    }

    let remainder = n - indices.len();
    if remainder > 0 {
        let cum = cumulative(&residual_weights);
        for _ in 0..remainder {
            indices.push(invert(&cum, rng.unit()));
        }
    }
    indices
}
