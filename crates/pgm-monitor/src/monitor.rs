use pgm_core::Rng;
use pgm_error::{Result, ensure};
use pgm_utils::ArenaKey;

use crate::histogram::Histogram;
use crate::monitor_type::MonitorType;
use crate::node_array::{IndexRange, NodeArray};
use crate::reservoir::weighted_sample_indices;
use crate::snapshot::MonitorSnapshot;
use crate::weighted_stat::WeightedStatistic;

/// Which scalar statistic `extract_stat` reduces a monitored component to (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatTag {
    Mean,
    Variance,
    StdDev,
    Skewness,
    Kurtosis,
    Min,
    Max,
    Ess,
}

/// One monitored node array (§4.8): records a [MonitorSnapshot] per iteration and reduces
/// the accumulated history to statistics or density estimates on demand.
pub struct Monitor {
    name: String,
    range: IndexRange,
    kind: MonitorType,
    nodes: Vec<ArenaKey>,
    snapshots: Vec<MonitorSnapshot>,
}

impl Monitor {
    pub fn new(array: &NodeArray, range: IndexRange, kind: MonitorType) -> Result<Self> {
        let nodes = array.select(range)?;
        Ok(Self {
            name: array.name.clone(),
            range,
            kind,
            nodes,
            snapshots: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> IndexRange {
        self.range
    }

    pub fn kind(&self) -> MonitorType {
        self.kind
    }

    pub fn nodes(&self) -> &[ArenaKey] {
        &self.nodes
    }

    pub fn snapshots(&self) -> &[MonitorSnapshot] {
        &self.snapshots
    }

    /// Records one iteration. `values[p][c]` is particle `p`'s realized value of component
    /// `c` of this monitor's node array; `weights[p]` is that particle's importance weight.
    pub fn record(
        &mut self,
        iteration: usize,
        values: Vec<Vec<f64>>,
        weights: Vec<f64>,
        ess: f64,
        discrete: bool,
        conditionals: Vec<ArenaKey>,
    ) -> Result<()> {
        ensure!(
            values.len() == weights.len(),
            DataError: "monitor '{}' got {} particle value rows but {} weights",
            self.name,
            values.len(),
            weights.len()
        );
        self.snapshots.push(MonitorSnapshot {
            iteration,
            values,
            weights,
            ess,
            discrete,
            conditionals,
        });
        Ok(())
    }

    fn component_values(&self, snapshot: &MonitorSnapshot, component: usize) -> Vec<f64> {
        snapshot.values.iter().map(|row| row[component]).collect()
    }

    /// Reduces the most recent snapshot's component `component` to a scalar statistic.
    pub fn extract_stat(&self, component: usize, tag: StatTag) -> Result<f64> {
        let snapshot = self
            .snapshots
            .last()
            .ok_or_else(|| pgm_error::pgm_err!(LifecycleViolation: "monitor '{}' has no recorded snapshots", self.name))?;
        if tag == StatTag::Ess {
            return Ok(snapshot.ess);
        }
        let values = self.component_values(snapshot, component);
        let stat = WeightedStatistic::from_samples(&values, &snapshot.weights);
        Ok(match tag {
            StatTag::Mean => stat.mean(),
            StatTag::Variance => stat.variance(),
            StatTag::StdDev => stat.std_dev(),
            StatTag::Skewness => stat.skewness(),
            StatTag::Kurtosis => stat.kurtosis(),
            StatTag::Min => stat.min(),
            StatTag::Max => stat.max(),
            StatTag::Ess => unreachable!(),
        })
    }

    /// Builds a weighted density estimate for the most recent snapshot's component
    /// `component`. When `cache_fraction` is `Some(f)`, only a weighted subsample of size
    /// `f * n_particles` is folded into the histogram instead of the full cloud.
    pub fn extract_pdf(
        &self,
        component: usize,
        num_bins: usize,
        cache_fraction: Option<f64>,
        rng: &mut Rng,
    ) -> Result<Histogram> {
        let snapshot = self
            .snapshots
            .last()
            .ok_or_else(|| pgm_error::pgm_err!(LifecycleViolation: "monitor '{}' has no recorded snapshots", self.name))?;
        let values = self.component_values(snapshot, component);

        let (values, weights): (Vec<f64>, Vec<f64>) = match cache_fraction {
            Some(frac) if frac < 1.0 => {
                let k = ((values.len() as f64 * frac).round() as usize).max(1);
                let picked = weighted_sample_indices(&snapshot.weights, k, rng);
                (
                    picked.iter().map(|&i| values[i]).collect(),
                    picked.iter().map(|&i| snapshot.weights[i]).collect(),
                )
            }
            _ => (values, snapshot.weights.clone()),
        };

        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Histogram::new(lo, hi, num_bins, &values, &weights)
    }
}
