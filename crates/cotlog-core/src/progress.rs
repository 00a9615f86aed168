//! Progress reporting for long passes.
//!
//! A pass reports human-readable lines to a [`ProgressSink`] at a fixed
//! cadence. Sinks are called synchronously from the processing loop and
//! have no influence on the pass outcome.

use tracing::info;

/// Receives progress messages from a running pass.
pub trait ProgressSink {
    fn report(&mut self, message: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(&str),
{
    fn report(&mut self, message: &str) {
        self(message)
    }
}

/// Forwards progress messages to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&mut self, message: &str) {
        info!(target: "cotlog::progress", "{}", message);
    }
}

/// Discards all progress messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _message: &str) {}
}

/// Emits `"<verb> {idx}/{total} events..."` every `interval` events.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    interval: usize,
    total: usize,
}

impl Cadence {
    pub fn new(interval: usize, total: usize) -> Self {
        Self {
            interval: interval.max(1),
            total,
        }
    }

    /// Reports on zero-based index `idx` when it falls on the cadence.
    pub fn tick(&self, sink: &mut dyn ProgressSink, verb: &str, idx: usize) {
        if idx % self.interval == 0 {
            sink.report(&format!("{} {}/{} events...", verb, idx, self.total));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink() {
        let mut lines = Vec::new();
        {
            let mut sink = |m: &str| lines.push(m.to_string());
            sink.report("hello");
        }
        assert_eq!(lines, vec!["hello"]);
    }

    #[test]
    fn test_cadence_reports_every_interval() {
        let mut lines: Vec<String> = Vec::new();
        let mut sink = |m: &str| lines.push(m.to_string());
        let cadence = Cadence::new(1000, 2500);

        for idx in 0..2500 {
            cadence.tick(&mut sink, "Processed", idx);
        }

        assert_eq!(
            lines,
            vec![
                "Processed 0/2500 events...",
                "Processed 1000/2500 events...",
                "Processed 2000/2500 events...",
            ]
        );
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let mut count = 0;
        let mut sink = |_: &str| count += 1;
        let cadence = Cadence::new(0, 3);
        for idx in 0..3 {
            cadence.tick(&mut sink, "Processed", idx);
        }
        assert_eq!(count, 3);
    }
}
