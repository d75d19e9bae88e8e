//! # Engine Traits
//!
//! A minimal abstraction over anything that advances through a sequence of steps,
//! one fallible [Engine::next] at a time. The forward sampler and the backward smoother
//! both fit this shape: each call to `next` consumes or produces one time index and
//! returns an epoch describing the resulting state.
//!
//! `EngineExt` adds a `run` helper for driving an engine to a termination condition
//! without hard-coding the stopping rule into the engine itself.

use pgm_error::Result;

/// A trait representing a steppable inference engine.
///
/// Implementors define how the process advances from one epoch to the next. It is
/// intentionally essentially an iterator: `next` borrows `&mut self`, mutates internal
/// state, and returns a snapshot of the result.
///
/// # Examples
///
/// ```rust
/// use pgm_core::engine::{Engine, EngineExt};
/// use pgm_error::PgmError;
///
/// #[derive(Default)]
/// struct MyEngine {
///     step: usize,
/// }
///
/// #[derive(Debug, Clone)]
/// struct MyEpoch {
///     step: usize,
/// }
///
/// impl Engine for MyEngine {
///     type Epoch = MyEpoch;
///
///     fn next(&mut self) -> Result<Self::Epoch, PgmError> {
///         self.step += 1;
///         Ok(MyEpoch { step: self.step })
///     }
/// }
///
/// let mut engine = MyEngine::default();
/// let final_epoch = engine.run(|epoch| epoch.step >= 10);
/// println!("Final step: {}", final_epoch.step);
/// ```
pub trait Engine {
    /// The type representing a single epoch in the stepped process.
    ///
    /// Typically carries the step index plus whatever state a caller needs to
    /// decide whether to continue (e.g. effective sample size, time index reached).
    type Epoch;

    /// Advances the engine to the next epoch.
    ///
    /// # Side Effects
    ///
    /// Mutable so implementors can carry state between calls.
    ///
    /// # Performance
    ///
    /// Called repeatedly during execution, so it should be optimized for performance.
    fn next(&mut self) -> Result<Self::Epoch>;
}

/// Extension trait providing convenient methods for running engines with custom logic.
///
/// Separates stepping (owned by [Engine]) from stopping (owned by the caller), so the
/// same engine can be driven to a fixed step count, a convergence threshold, or any
/// other condition without the engine knowing about it.
pub trait EngineExt<E: Engine> {
    /// Runs the engine until `limit` returns `true` for the just-produced epoch,
    /// then returns that epoch.
    ///
    /// # Panics
    ///
    /// Panics if the engine returns an `Err`; callers that need to recover from
    /// engine errors should call [Engine::next] directly instead.
    fn run<F>(&mut self, limit: F) -> E::Epoch
    where
        F: Fn(&E::Epoch) -> bool;
}

impl<E> EngineExt<E> for E
where
    E: Engine,
{
    fn run<F>(&mut self, limit: F) -> E::Epoch
    where
        F: Fn(&E::Epoch) -> bool,
    {
        loop {
            match self.next() {
                Ok(epoch) => {
                    if limit(&epoch) {
                        return epoch;
                    }
                }
                Err(e) => {
                    panic!("{e}");
                }
            }
        }
    }
}
