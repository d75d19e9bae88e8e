pub mod engine;
pub mod rng;
pub mod stats;

pub use engine::{Engine, EngineExt};
pub use rng::Rng;
pub use stats::*;

pub mod prelude {
    pub use super::engine::{Engine, EngineExt};
    pub use super::rng::Rng;
    pub use super::stats::{Adder, Statistic, TimeStatistic};
}
