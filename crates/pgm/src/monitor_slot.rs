use pgm_monitor::Monitor;

/// A registered monitor plus the "released" flag `clear_*_monitors(release_only: true)`
/// sets (§6): a released monitor keeps every snapshot it already recorded (so a driver that
/// already called `extract_stat`/`extract_pdf` still gets the same answer back) but will
/// not be written to again until re-registered.
pub struct MonitorSlot {
    pub monitor: Monitor,
    pub released: bool,
}

impl MonitorSlot {
    pub fn new(monitor: Monitor) -> Self {
        Self { monitor, released: false }
    }
}
