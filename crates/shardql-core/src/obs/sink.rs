//! Metrics sink boundary.
//!
//! Routing and command code MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics::{self, EventReport};
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Read,
    Write,
}

///
/// MetricsEvent
///
/// An empty `entity_path` records global counters only.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
        entity_path: &'static str,
    },
    ExecFinish {
        kind: ExecKind,
        entity_path: &'static str,
        rows_touched: u64,
    },
    Route {
        entity_path: &'static str,
        shard_count: u64,
        fallback: bool,
    },
    ShardStatement {
        entity_path: &'static str,
    },
    ShardFailure {
        entity_path: &'static str,
    },
    PolicyRejected {
        entity_path: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::ExecStart { kind, entity_path } => {
                match kind {
                    ExecKind::Read => m.ops.read_calls = m.ops.read_calls.saturating_add(1),
                    ExecKind::Write => m.ops.write_calls = m.ops.write_calls.saturating_add(1),
                }
                if !entity_path.is_empty() {
                    let entry = metrics::entity(m, entity_path);
                    match kind {
                        ExecKind::Read => entry.read_calls = entry.read_calls.saturating_add(1),
                        ExecKind::Write => {
                            entry.write_calls = entry.write_calls.saturating_add(1);
                        }
                    }
                }
            }

            MetricsEvent::ExecFinish {
                kind,
                entity_path,
                rows_touched,
            } => {
                match kind {
                    ExecKind::Read => m.ops.rows_read = m.ops.rows_read.saturating_add(rows_touched),
                    ExecKind::Write => {
                        m.ops.rows_affected = m.ops.rows_affected.saturating_add(rows_touched);
                    }
                }
                if !entity_path.is_empty() {
                    let entry = metrics::entity(m, entity_path);
                    match kind {
                        ExecKind::Read => {
                            entry.rows_read = entry.rows_read.saturating_add(rows_touched);
                        }
                        ExecKind::Write => {
                            entry.rows_affected = entry.rows_affected.saturating_add(rows_touched);
                        }
                    }
                }
            }

            MetricsEvent::Route {
                entity_path,
                shard_count,
                fallback,
            } => {
                m.ops.plans = m.ops.plans.saturating_add(1);
                m.ops.shards_targeted = m.ops.shards_targeted.saturating_add(shard_count);
                if fallback {
                    m.ops.plan_fallbacks = m.ops.plan_fallbacks.saturating_add(1);
                    if !entity_path.is_empty() {
                        let entry = metrics::entity(m, entity_path);
                        entry.plan_fallbacks = entry.plan_fallbacks.saturating_add(1);
                    }
                }
            }

            MetricsEvent::ShardStatement { .. } => {
                m.ops.shard_statements = m.ops.shard_statements.saturating_add(1);
            }

            MetricsEvent::ShardFailure { entity_path } => {
                m.ops.shard_failures = m.ops.shard_failures.saturating_add(1);
                if !entity_path.is_empty() {
                    let entry = metrics::entity(m, entity_path);
                    entry.shard_failures = entry.shard_failures.saturating_add(1);
                }
            }

            MetricsEvent::PolicyRejected { entity_path } => {
                m.ops.policy_rejections = m.ops.policy_rejections.saturating_add(1);
                if !entity_path.is_empty() {
                    let entry = metrics::entity(m, entity_path);
                    entry.policy_rejections = entry.policy_rejections.saturating_add(1);
                }
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`,
        //   which restores the previous slot on every exit, including unwind.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        // - Only a shared reference is materialized, matching the original borrow.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::since_ms`), not by
/// per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope; `Guard` restores
    //   the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}

///
/// Span
/// RAII guard that emits start/finish events for one command call.
/// Finish accounting happens even on early return or unwind.
///

pub(crate) struct Span {
    kind: ExecKind,
    entity_path: &'static str,
    rows: u64,
}

impl Span {
    #[must_use]
    pub(crate) fn new(kind: ExecKind, entity_path: &'static str) -> Self {
        record(MetricsEvent::ExecStart { kind, entity_path });

        Self {
            kind,
            entity_path,
            rows: 0,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            entity_path: self.entity_path,
            rows_touched: self.rows,
        });
    }
}
