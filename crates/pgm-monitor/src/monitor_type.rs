/// Which pass a monitor is recording (§6): the live forward filtering cloud, the
/// post-forward filtering cloud replayed once backward smoothing has finished, or the
/// backward smoothing pass itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorType {
    Filter,
    Smooth,
    BackwardSmooth,
}
