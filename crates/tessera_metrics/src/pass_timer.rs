//! Timing of repeated passes over the store, with the work each pass did

use crate::PassCount;
use std::time::{Duration, Instant};

/// Accumulated duration and visit counts of every completed pass, plus the
/// fastest and slowest pass.
#[derive(Debug, Default, Clone)]
pub struct PassTimer {
    started: Option<Instant>,
    passes: u64,
    total: Duration,
    fastest: Option<Duration>,
    slowest: Duration,
    visited: PassCount,
}

impl PassTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the pass opened by `begin`. Ignored without one.
    pub fn end(&mut self, count: PassCount) {
        if let Some(started) = self.started.take() {
            self.record(started.elapsed(), count);
        }
    }

    fn record(&mut self, elapsed: Duration, count: PassCount) {
        self.passes += 1;
        self.total += elapsed;
        self.fastest = Some(self.fastest.map_or(elapsed, |fastest| fastest.min(elapsed)));
        self.slowest = self.slowest.max(elapsed);
        self.visited.pages += count.pages;
        self.visited.entities += count.entities;
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Pages and entities visited over all passes.
    pub fn visited(&self) -> PassCount {
        self.visited
    }

    pub fn mean_ms(&self) -> f64 {
        if self.passes == 0 {
            return 0.0;
        }
        self.total.as_secs_f64() * 1000.0 / self.passes as f64
    }

    pub fn range_ms(&self) -> (f64, f64) {
        let fastest = self.fastest.unwrap_or(Duration::ZERO);
        (fastest.as_secs_f64() * 1000.0, self.slowest.as_secs_f64() * 1000.0)
    }

    /// Average fill of the visited pages.
    pub fn entities_per_page(&self) -> f64 {
        if self.visited.pages == 0 {
            return 0.0;
        }
        self.visited.entities as f64 / self.visited.pages as f64
    }

    pub fn entities_per_second(&self) -> f64 {
        let seconds = self.total.as_secs_f64();
        if seconds > 0.0 {
            self.visited.entities as f64 / seconds
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(pages: usize, entities: usize) -> PassCount {
        PassCount { pages, entities }
    }

    #[test]
    fn empty_timer_reports_zero() {
        let timer = PassTimer::new();
        assert_eq!(timer.passes(), 0);
        assert_eq!(timer.mean_ms(), 0.0);
        assert_eq!(timer.range_ms(), (0.0, 0.0));
        assert_eq!(timer.entities_per_page(), 0.0);
        assert_eq!(timer.entities_per_second(), 0.0);
    }

    #[test]
    fn accumulates_time_and_visits() {
        let mut timer = PassTimer::new();
        timer.record(Duration::from_millis(10), count(2, 40));
        timer.record(Duration::from_millis(30), count(3, 20));

        assert_eq!(timer.passes(), 2);
        assert_eq!(timer.visited(), count(5, 60));
        assert!((timer.mean_ms() - 20.0).abs() < 1e-9);
        let (fastest, slowest) = timer.range_ms();
        assert!((fastest - 10.0).abs() < 1e-9 && (slowest - 30.0).abs() < 1e-9);
        assert!((timer.entities_per_page() - 12.0).abs() < 1e-9);
        assert!((timer.entities_per_second() - 1500.0).abs() < 1e-6);
    }

    #[test]
    fn end_without_begin_is_ignored() {
        let mut timer = PassTimer::new();
        timer.end(count(1, 1));
        assert_eq!(timer.passes(), 0);

        timer.begin();
        timer.end(count(1, 4));
        timer.end(count(1, 4));
        assert_eq!(timer.passes(), 1);
        assert_eq!(timer.visited(), count(1, 4));
    }
}
