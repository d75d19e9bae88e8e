//! Name-indexed distribution/function catalog. The compiler and samplers treat this as an
//! external collaborator: they consume [Distribution]/[Function] trait objects by name and
//! never reach into a family's internals.

pub mod distribution;
pub mod distributions;
pub mod function;
pub mod functions;
pub mod registry;

pub use distribution::{Bounds, Distribution, SupportHint};
pub use function::Function;
pub use registry::Registry;
