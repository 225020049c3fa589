//! Wall-clock timing utilities.

use std::time::{Duration, Instant};

/// Simple start/stop wall-clock timer.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    started_at: Option<Instant>,
    elapsed: Duration,
}

impl Timer {
    /// A stopped timer with no elapsed time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) measuring from now.
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.elapsed = Duration::ZERO;
    }

    /// Stop measuring; `elapsed_seconds` freezes at this point.
    pub fn stop(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.elapsed = started_at.elapsed();
        }
    }

    /// Forget any measurement.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.elapsed = Duration::ZERO;
    }

    /// Seconds measured so far (live while running, frozen after `stop`).
    pub fn elapsed_seconds(&self) -> f64 {
        match self.started_at {
            Some(started_at) => started_at.elapsed().as_secs_f64(),
            None => self.elapsed.as_secs_f64(),
        }
    }

    /// Elapsed time rendered with millisecond precision.
    pub fn elapsed_string(&self) -> String {
        format!("{:.3}s", self.elapsed_seconds())
    }
}

/// Logs a label and the elapsed time when dropped.
pub struct ScopedTimer {
    label: String,
    started_at: Instant,
}

impl ScopedTimer {
    /// Start timing a named phase.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started_at: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        tracing::info!(
            phase = %self.label,
            elapsed_seconds = self.started_at.elapsed().as_secs_f64(),
            "phase finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_measures_and_freezes() {
        let mut timer = Timer::new();
        timer.start();
        std::thread::sleep(Duration::from_millis(5));
        timer.stop();

        let frozen = timer.elapsed_seconds();
        assert!(frozen >= 0.005);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.elapsed_seconds(), frozen);
    }

    #[test]
    fn test_timer_reset() {
        let mut timer = Timer::new();
        timer.start();
        timer.stop();
        timer.reset();
        assert_eq!(timer.elapsed_seconds(), 0.0);
        assert_eq!(timer.elapsed_string(), "0.000s");
    }

    #[test]
    fn test_scoped_timer_drop_is_quiet() {
        let _timer = ScopedTimer::new("test phase");
    }
}
