//! The forward SMC sampler and backward smoother (§4.6–4.7): schedules the unobserved
//! stochastic nodes once at build time, advances every particle through that schedule one
//! node per [pgm_core::Engine::next] call, resamples on ESS collapse, and — once the
//! forward pass completes — replays its filtering clouds backward through the smoothing
//! kernel.

pub mod backward;
pub mod forward;
pub mod particle;
pub mod resample;
pub mod schedule;

pub use backward::{BackwardEpoch, BackwardSmoother};
pub use forward::{FilterSnapshot, ForwardEpoch, ForwardSampler};
pub use particle::Particle;
pub use resample::{ResampleMethod, effective_sample_size, resample_indices};
pub use schedule::Schedule;
