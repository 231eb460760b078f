//! Scoped-timing sinks consumed by the executor (C8).
//!
//! The core never ships a concrete metrics backend — like logging, that
//! is a host concern (see `SPEC_FULL.md` §9) — it only defines the trait
//! boundary and a no-op default so the crate is usable stand-alone.

use std::time::{Duration, Instant};

/// A single open span; dropping it (or calling [`Span::finish`] explicitly)
/// records its duration into whatever the [`MetricsSink`] does with it.
pub trait Span {
    /// Ends the span. Implementations that record on `Drop` may make this
    /// a no-op; callers should still call it at the natural end point so
    /// non-`Drop`-based sinks behave identically.
    fn finish(self: Box<Self>);
}

/// Scoped-timing sink the executor opens spans against: `"schema"`,
/// `"document"`, `"Analyzing complexity"`, `"Validating document"`,
/// `"Executing operation"`, per spec.md §4.7.
pub trait MetricsSink: Send + Sync {
    /// Opens a new named span, active until it is finished or dropped.
    fn start_span(&self, name: &str) -> Box<dyn Span + '_>;

    /// Snapshots whatever spans have finished so far, for attaching to
    /// [`crate::error::ExecutionResult::perf`]. Sinks that don't retain
    /// span history (e.g. [`NoopMetrics`]) return an empty vec.
    fn records(&self) -> Vec<SpanRecord> {
        Vec::new()
    }
}

struct NoopSpan;

impl Span for NoopSpan {
    fn finish(self: Box<Self>) {}
}

/// A [`MetricsSink`] that records nothing; the crate's default when the
/// host does not supply one.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn start_span(&self, _name: &str) -> Box<dyn Span + '_> {
        Box::new(NoopSpan)
    }
}

/// A single recorded `(name, duration)` pair, as attached to
/// [`crate::error::ExecutionResult::perf`].
#[derive(Clone, Debug, PartialEq)]
pub struct SpanRecord {
    /// Span name, e.g. `"Validating document"`.
    pub name: String,
    /// How long the span was open.
    pub duration: Duration,
}

struct RecordingSpan<'a> {
    name: String,
    started_at: Instant,
    sink: &'a RecordingMetrics,
}

impl Span for RecordingSpan<'_> {
    fn finish(self: Box<Self>) {
        let duration = self.started_at.elapsed();
        self.sink.records.lock().unwrap().push(SpanRecord { name: self.name, duration });
    }
}

/// A [`MetricsSink`] that records every span's wall-clock duration,
/// useful in tests and as a minimal in-process default for hosts that
/// don't have their own tracing backend wired up yet.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    records: std::sync::Mutex<Vec<SpanRecord>>,
}

impl RecordingMetrics {
    /// A fresh, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the spans recorded so far, in finish order.
    pub fn records(&self) -> Vec<SpanRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn start_span(&self, name: &str) -> Box<dyn Span + '_> {
        Box::new(RecordingSpan { name: name.to_string(), started_at: Instant::now(), sink: self })
    }

    fn records(&self) -> Vec<SpanRecord> {
        self.records.lock().unwrap().clone()
    }
}
