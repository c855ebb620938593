//! Nested stage timing for a single conversion.
//!
//! [`StageTimer`] keeps an explicit stack of open stages. Closing a stage
//! appends a [`TimingRecord`]; records are ordered by start time, so a
//! parent appears before the stages nested inside it. Misuse of the stack
//! (closing with nothing open, finishing with stages still open) is a bug in
//! the caller and panics.

use std::fmt::Write;
use std::time::{Duration, Instant};

/// One closed stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingRecord {
    pub label: &'static str,
    /// Nesting depth; top-level stages are 0.
    pub depth: usize,
    pub duration: Duration,
}

#[derive(Debug, Default)]
pub struct StageTimer {
    // (label, started, index of the reserved slot in `records`)
    open: Vec<(&'static str, Instant, usize)>,
    records: Vec<TimingRecord>,
}

impl StageTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a stage nested inside whatever stage is currently open.
    pub fn start_stage(&mut self, label: &'static str) {
        let slot = self.records.len();
        self.records.push(TimingRecord {
            label,
            depth: self.open.len(),
            duration: Duration::ZERO,
        });
        self.open.push((label, Instant::now(), slot));
    }

    /// Close the innermost open stage and return its duration.
    ///
    /// # Panics
    /// When no stage is open.
    pub fn end_stage(&mut self) -> Duration {
        let Some((label, started, slot)) = self.open.pop() else {
            panic!("StageTimer::end_stage called with no open stage");
        };
        let duration = started.elapsed();
        self.records[slot].duration = duration;
        debug_assert_eq!(self.records[slot].label, label);
        duration
    }

    /// Number of stages currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Records so far, including zero-duration placeholders for open stages.
    pub fn report(&self) -> &[TimingRecord] {
        &self.records
    }

    /// Consume the timer and return its records.
    ///
    /// # Panics
    /// When a stage is still open.
    pub fn finish(self) -> Vec<TimingRecord> {
        if let Some((label, _, _)) = self.open.last() {
            panic!("StageTimer finished with open stage '{label}'");
        }
        self.records
    }

    /// Single-line rendering of the records, e.g.
    /// `Total: 12.40ms | > Reading: 3.10ms | > Solve: 9.00ms`.
    pub fn timelog(&self) -> String {
        format_records(&self.records)
    }
}

/// Render `records` the way [`StageTimer::timelog`] does.
pub fn format_records(records: &[TimingRecord]) -> String {
    let mut out = String::new();
    for (i, r) in records.iter().enumerate() {
        if i > 0 {
            out.push_str(" | ");
        }
        for _ in 0..r.depth {
            out.push('>');
        }
        if r.depth > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}: {:.2}ms", r.label, r.duration.as_secs_f64() * 1000.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_keep_start_order_and_depth() {
        let mut t = StageTimer::new();
        t.start_stage("outer");
        t.start_stage("a");
        t.end_stage();
        t.start_stage("b");
        t.start_stage("b.1");
        t.end_stage();
        t.end_stage();
        t.end_stage();

        let records = t.finish();
        let shape: Vec<_> = records.iter().map(|r| (r.label, r.depth)).collect();
        assert_eq!(
            shape,
            vec![("outer", 0), ("a", 1), ("b", 1), ("b.1", 2)]
        );
        assert!(records[0].duration >= records[2].duration);
    }

    #[test]
    fn timelog_lists_every_stage() {
        let mut t = StageTimer::new();
        t.start_stage("Vectorize - Total");
        t.start_stage("Image Reading");
        t.end_stage();
        t.end_stage();
        let log = t.timelog();
        assert!(log.starts_with("Vectorize - Total: "), "{log}");
        assert!(log.contains(" | > Image Reading: "), "{log}");
        assert!(log.ends_with("ms"));
    }

    #[test]
    fn depth_tracks_open_stages() {
        let mut t = StageTimer::new();
        assert_eq!(t.depth(), 0);
        t.start_stage("x");
        assert_eq!(t.depth(), 1);
        t.end_stage();
        assert_eq!(t.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "no open stage")]
    fn end_without_start_panics() {
        StageTimer::new().end_stage();
    }

    #[test]
    #[should_panic(expected = "open stage 'dangling'")]
    fn finish_with_open_stage_panics() {
        let mut t = StageTimer::new();
        t.start_stage("dangling");
        let _ = t.finish();
    }
}
