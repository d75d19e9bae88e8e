//! The node-sampler framework (§4.3–4.5): assigns each unobserved stochastic node a
//! [NodeSampler] by trying registered [NodeSamplerFactory]s in priority order, analytic
//! conjugate families first, exact finite enumeration next, and the universal
//! prior-mutation proposal last (it always matches, so the list never fails to produce a
//! sampler as long as it ends with one).

pub mod classify;
pub mod conjugate;
pub mod factory;
pub mod finite;
pub mod prior_mutation;
pub mod sampler;
pub mod values;

pub use classify::{Affine, classify};
pub use factory::{NodeSamplerFactory, assign_sampler, base_factories};
pub use sampler::NodeSampler;
pub use values::{ParticleValues, resolve, resolve_through_logicals};
