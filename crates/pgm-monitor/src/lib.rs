//! Weighted accumulators and particle-cloud monitors (§4.8): a [Monitor] snapshots a
//! [NodeArray]'s values, weights, ESS, discreteness, and conditioning observations once per
//! iteration, then reduces that history to scalar statistics via [WeightedStatistic] or to a
//! density estimate via [Histogram], optionally built from a reservoir-subsampled cache.

pub mod histogram;
pub mod monitor;
pub mod monitor_type;
pub mod node_array;
pub mod reservoir;
pub mod snapshot;
pub mod weighted_stat;

pub use histogram::Histogram;
pub use monitor::{Monitor, StatTag};
pub use monitor_type::MonitorType;
pub use node_array::{IndexRange, NodeArray};
pub use reservoir::weighted_sample_indices;
pub use snapshot::MonitorSnapshot;
pub use weighted_stat::WeightedStatistic;
