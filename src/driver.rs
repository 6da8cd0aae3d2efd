//! Run/stop gating for an externally timed loop
//!
//! The core never decides when a tick happens. [`LoopDriver`] holds the
//! state a control surface toggles (running or stopped) and forwards ticks
//! only while running; a stopped loop keeps its last state queryable.

use core::time::Duration;
use num_traits::Float;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::tracking::{TickOutcome, TrajectoryLoop};

/// Nominal tick period of the external timer
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(50);

pub struct LoopDriver<T, R = StdRng> {
    trajectory: TrajectoryLoop<T, R>,
    running: bool,
    period: Duration,
}

impl<T: Float, R: Rng> LoopDriver<T, R> {
    /// Wrap a loop; starts stopped
    pub fn new(trajectory: TrajectoryLoop<T, R>) -> Self {
        Self {
            trajectory,
            running: false,
            period: DEFAULT_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        if running != self.running {
            debug!(running, "driver state changed");
        }
        self.running = running;
    }

    /// Flip running/stopped, returning the new state
    pub fn toggle(&mut self) -> bool {
        self.set_running(!self.running);
        self.running
    }

    /// One timer callback: tick only while running
    pub fn step(&mut self) -> Option<TickOutcome<T>> {
        self.running.then(|| self.trajectory.tick())
    }

    /// Up to `count` timer callbacks; returns how many ticks ran
    pub fn run_ticks(&mut self, count: usize) -> usize {
        (0..count).filter_map(|_| self.step()).count()
    }

    pub fn trajectory(&self) -> &TrajectoryLoop<T, R> {
        &self.trajectory
    }

    pub fn trajectory_mut(&mut self) -> &mut TrajectoryLoop<T, R> {
        &mut self.trajectory
    }

    pub fn into_inner(self) -> TrajectoryLoop<T, R> {
        self.trajectory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::TrackingBuilder;

    fn driver() -> LoopDriver<f64> {
        LoopDriver::new(TrackingBuilder::new().seed(3).build().unwrap())
    }

    #[test]
    fn test_stopped_driver_does_not_tick() {
        let mut driver = driver();
        assert!(!driver.is_running());
        assert!(driver.step().is_none());
        assert_eq!(driver.run_ticks(5), 0);
        assert!(driver.trajectory().history().is_empty());
    }

    #[test]
    fn test_toggle_gates_ticks() {
        let mut driver = driver();
        assert!(driver.toggle());
        assert_eq!(driver.run_ticks(12), 12);
        assert_eq!(driver.trajectory().history().len(), 12);

        assert!(!driver.toggle());
        assert_eq!(driver.run_ticks(4), 0);
        // State stays queryable after stopping.
        assert!(driver.trajectory().snapshot().is_some());
        assert_eq!(driver.trajectory().diagnostics().ticks, 12);
    }

    #[test]
    fn test_period() {
        let driver = driver().with_period(Duration::from_millis(20));
        assert_eq!(driver.period(), Duration::from_millis(20));
        assert_eq!(DEFAULT_PERIOD, Duration::from_millis(50));
    }
}
