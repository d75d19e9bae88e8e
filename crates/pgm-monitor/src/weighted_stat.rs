use pgm_core::Adder;

/// Weighted mean/variance/skewness/kurtosis over one particle cloud snapshot. Built the
/// same way `pgm-core`'s unweighted [pgm_core::Statistic] sums its moments — through a
/// Kahan-compensated [Adder] rather than a naive running total — but as a two-pass batch
/// reduction instead of a streaming update: a snapshot's particle count is fixed and known
/// upfront, and every particle's weight changes between snapshots anyway, so there is
/// nothing to carry incrementally across them.
#[derive(Clone, Default)]
pub struct WeightedStatistic {
    count: usize,
    sum_w: f64,
    mean: f64,
    variance: f64,
    skewness: f64,
    kurtosis: f64,
    min: f64,
    max: f64,
}

impl WeightedStatistic {
    pub fn from_samples(values: &[f64], weights: &[f64]) -> Self {
        let mut sum_w = Adder::default();
        let mut sum_wx = Adder::default();
        let mut sum_w2 = Adder::default();
        let mut count = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for (&x, &w) in values.iter().zip(weights) {
            if w <= 0.0 {
                continue;
            }
            count += 1;
            sum_w.add(w as f32);
            sum_wx.add((w * x) as f32);
            sum_w2.add((w * w) as f32);
            min = min.min(x);
            max = max.max(x);
        }

        let total_w = sum_w.value() as f64;
        let mean = if total_w > 0.0 { sum_wx.value() as f64 / total_w } else { 0.0 };

        let mut sum_w_d2 = Adder::default();
        let mut sum_w_d3 = Adder::default();
        let mut sum_w_d4 = Adder::default();
        for (&x, &w) in values.iter().zip(weights) {
            if w <= 0.0 {
                continue;
            }
            let d = x - mean;
            sum_w_d2.add((w * d * d) as f32);
            sum_w_d3.add((w * d * d * d) as f32);
            sum_w_d4.add((w * d * d * d * d) as f32);
        }

        let biased_variance = if total_w > 0.0 { sum_w_d2.value() as f64 / total_w } else { f64::NAN };
        let effective_n = if total_w > 0.0 { total_w * total_w / (sum_w2.value() as f64) } else { 0.0 };
        let variance = if count >= 2 && effective_n > 1.0 {
            biased_variance * effective_n / (effective_n - 1.0)
        } else {
            f64::NAN
        };
        let skewness = if count >= 3 && biased_variance > 0.0 {
            (sum_w_d3.value() as f64 / total_w) / biased_variance.powf(1.5)
        } else {
            f64::NAN
        };
        let kurtosis = if count >= 4 && biased_variance > 0.0 {
            (sum_w_d4.value() as f64 / total_w) / (biased_variance * biased_variance) - 3.0
        } else {
            f64::NAN
        };

        Self {
            count,
            sum_w: total_w,
            mean,
            variance,
            skewness,
            kurtosis,
            min,
            max,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn sum_weight(&self) -> f64 {
        self.sum_w
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Bias-corrected via the effective-sample-size `(Σw)²/Σw²` in place of an unweighted
    /// `n`, which reduces to the usual `n/(n-1)` factor when every weight is equal.
    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    pub fn skewness(&self) -> f64 {
        self.skewness
    }

    pub fn kurtosis(&self) -> f64 {
        self.kurtosis
    }
}
