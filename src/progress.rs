//! Progress reporting for bulk insertion.
//!
//! Bulk vertex insertion can take a while on large samples. The engine
//! polls a caller-supplied monitor between vertex insertions at a
//! cadence chosen from the monitor's reporting interval. Cancellation
//! is cooperative: when the monitor reports it has been canceled, the
//! engine finishes the vertex in flight and returns cleanly.

/// A monitor that receives progress updates during bulk insertion and
/// may request cancellation.
pub trait ProgressMonitor {
    /// The preferred reporting interval, in percent of total progress.
    fn reporting_interval_percent(&self) -> i32 {
        5
    }

    /// Receive a progress update in the range 0..=100.
    fn report_progress(&mut self, percent: i32);

    /// True if the caller has requested cancellation. Polled between
    /// vertex insertions.
    fn is_canceled(&self) -> bool {
        false
    }
}

/// A monitor built from a closure, for callers that do not need
/// cancellation.
pub struct ProgressFn<F: FnMut(i32)> {
    callback: F,
}

impl<F: FnMut(i32)> ProgressFn<F> {
    /// Wrap a closure as a progress monitor.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: FnMut(i32)> ProgressMonitor for ProgressFn<F> {
    fn report_progress(&mut self, percent: i32) {
        (self.callback)(percent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fn() {
        let mut seen = Vec::new();
        {
            let mut monitor = ProgressFn::new(|p| seen.push(p));
            monitor.report_progress(0);
            monitor.report_progress(50);
            monitor.report_progress(100);
            assert!(!monitor.is_canceled());
            assert_eq!(monitor.reporting_interval_percent(), 5);
        }
        assert_eq!(seen, vec![0, 50, 100]);
    }
}
