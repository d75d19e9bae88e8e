/// The driver-visible lifecycle (§4.8, §9): a session starts `Uninit`, gains a graph at
/// `compile`, a schedule at `build_sampler`, and then advances one forward iteration at a
/// time until `AtEnd`, from which it may optionally run a full backward pass. Any data
/// change drops straight back to `Built` regardless of where it fired from — §8 scenario
/// (F) — and marks every backward monitor released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninit,
    Built,
    Initialized,
    Iterating(usize),
    AtEnd,
    SmootherInit,
    Smoothing(usize),
    SmootherAtEnd,
}

impl State {
    pub fn is_at_least_built(&self) -> bool {
        !matches!(self, State::Uninit)
    }

    pub fn is_forward_done(&self) -> bool {
        matches!(self, State::AtEnd | State::SmootherInit | State::Smoothing(_) | State::SmootherAtEnd)
    }

    pub fn is_backward_done(&self) -> bool {
        matches!(self, State::SmootherAtEnd)
    }
}
