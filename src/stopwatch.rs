use std::time::{Duration, Instant};

/// Measures the wall-clock time of a single interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stopwatch {
    begin: Option<Instant>,
    end: Option<Instant>,
}

impl Stopwatch {
    pub fn new(start_now: bool) -> Self {
        Self {
            begin: start_now.then(Instant::now),
            end: None,
        }
    }

    /// Starts (or restarts) the interval, discarding any previous end.
    pub fn start(&mut self) {
        self.begin = Some(Instant::now());
        self.end = None;
    }

    /// Closes the interval. Does nothing if the watch was never started.
    pub fn stop(&mut self) -> Option<Duration> {
        if self.begin.is_some() {
            self.end = Some(Instant::now());
        }
        self.elapsed()
    }

    /// Stops a running watch, otherwise restarts it.
    pub fn toggle(&mut self) -> Option<Duration> {
        if self.is_running() {
            self.stop()
        } else {
            self.start();
            self.elapsed()
        }
    }

    pub fn is_running(&self) -> bool {
        self.begin.is_some() && self.end.is_none()
    }

    /// Length of the closed interval, `None` while it is open or unstarted.
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.begin, self.end) {
            (Some(begin), Some(end)) => Some(end.duration_since(begin)),
            _ => None,
        }
    }
}
