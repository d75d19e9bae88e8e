use pgm_error::{Result, ensure};

/// An equi-width weighted histogram over one component's particle values, backing
/// `extract_pdf` (§6). Bin edges are fixed at construction from the observed min/max so a
/// caller gets the same bin layout back on repeated calls within one snapshot.
#[derive(Debug, Clone)]
pub struct Histogram {
    lo: f64,
    hi: f64,
    counts: Vec<f64>,
}

impl Histogram {
    /// Builds bins spanning `[lo, hi]` and folds every `(value, weight)` pair in. Values
    /// outside the span clamp into the nearest edge bin rather than being dropped, since a
    /// resampled particle cloud can occasionally land a hair outside the range used to size
    /// the bins (e.g. a cached fraction drawn before the freshest extreme was observed).
    pub fn new(lo: f64, hi: f64, num_bins: usize, values: &[f64], weights: &[f64]) -> Result<Self> {
        ensure!(num_bins > 0, DataError: "histogram needs at least one bin");
        ensure!(hi >= lo, DataError: "histogram span [{}, {}] is inverted", lo, hi);
        let mut hist = Self {
            lo,
            hi,
            counts: vec![0.0; num_bins],
        };
        for (&v, &w) in values.iter().zip(weights) {
            hist.add(v, w);
        }
        Ok(hist)
    }

    fn add(&mut self, value: f64, weight: f64) {
        if weight <= 0.0 {
            return;
        }
        let idx = self.bin_index(value);
        self.counts[idx] += weight;
    }

    fn bin_index(&self, value: f64) -> usize {
        let span = self.hi - self.lo;
        if span <= 0.0 {
            return 0;
        }
        let frac = ((value - self.lo) / span).clamp(0.0, 1.0);
        let idx = (frac * self.counts.len() as f64) as usize;
        idx.min(self.counts.len() - 1)
    }

    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.counts.len() as f64
    }

    /// Left edge of bin `i`.
    pub fn bin_lo(&self, i: usize) -> f64 {
        self.lo + self.bin_width() * i as f64
    }

    /// Raw weighted counts, one per bin, not yet normalized to a density.
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Normalizes the weighted counts into a probability density (integrates to 1 over
    /// `[lo, hi]`).
    pub fn density(&self) -> Vec<f64> {
        let total: f64 = self.counts.iter().sum();
        let width = self.bin_width();
        if total <= 0.0 || width <= 0.0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts.iter().map(|&c| c / total / width).collect()
    }
}
