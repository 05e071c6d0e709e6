//! Timing helpers
//!
//! `Timer` measures attempt latency and run duration; `Stopwatch` splits the
//! CLI pipeline into named phases.

use std::time::{Duration, Instant};

/// Monotonic start point
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed milliseconds, saturating
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Phase timings of a pipeline run
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    laps: Vec<(String, Duration)>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            laps: Vec::new(),
        }
    }

    /// Close the current phase under `label`
    pub fn lap(&mut self, label: impl Into<String>) {
        self.laps.push((label.into(), self.start.elapsed()));
    }

    pub fn total(&self) -> Duration {
        self.start.elapsed()
    }

    /// Duration of each phase, not cumulative
    pub fn lap_times(&self) -> Vec<(&str, Duration)> {
        let mut prev = Duration::ZERO;
        self.laps
            .iter()
            .map(|(label, cumulative)| {
                let lap = cumulative.saturating_sub(prev);
                prev = *cumulative;
                (label.as_str(), lap)
            })
            .collect()
    }

    /// One-line rendering, e.g. `load=3ms execute=120ms total=130ms`
    pub fn format(&self) -> String {
        let mut parts: Vec<String> = self
            .lap_times()
            .into_iter()
            .map(|(label, d)| format!("{}={}ms", label, d.as_millis()))
            .collect();
        parts.push(format!("total={}ms", self.total().as_millis()));
        parts.join(" ")
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10);
        assert!(timer.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_stopwatch() {
        let mut sw = Stopwatch::new();
        sleep(Duration::from_millis(10));
        sw.lap("load");
        sleep(Duration::from_millis(10));
        sw.lap("execute");

        let laps = sw.lap_times();
        assert_eq!(laps.len(), 2);
        assert_eq!(laps[0].0, "load");
        assert!(laps[1].1 >= Duration::from_millis(10));

        let line = sw.format();
        assert!(line.starts_with("load="));
        assert!(line.contains(" execute="));
        assert!(line.contains(" total="));
    }
}
