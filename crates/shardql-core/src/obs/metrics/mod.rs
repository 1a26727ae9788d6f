use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for routing and execution.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Command entrypoints
    pub read_calls: u64,
    pub write_calls: u64,

    // Routing
    pub plans: u64,
    pub plan_fallbacks: u64,
    pub shards_targeted: u64,

    // Per-shard execution
    pub shard_statements: u64,
    pub shard_failures: u64,
    pub policy_rejections: u64,

    // Rows touched
    pub rows_read: u64,
    pub rows_affected: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub read_calls: u64,
    pub write_calls: u64,
    pub plan_fallbacks: u64,
    pub rows_read: u64,
    pub rows_affected: u64,
    pub shard_failures: u64,
    pub policy_rejections: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Per-entity counters, created on first use.
pub(crate) fn entity<'a>(m: &'a mut EventState, path: &str) -> &'a mut EntityCounters {
    m.entities.entry(path.to_string()).or_default()
}

/// Reset all event state.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or_default()
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `since_ms`.
    pub counters: Option<EventState>,
    /// Per-entity counters and averages.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub path: String,
    pub read_calls: u64,
    pub write_calls: u64,
    pub rows_read: u64,
    pub rows_affected: u64,
    pub avg_rows_per_read: f64,
    pub shard_failures: u64,
    pub policy_rejections: u64,
}

/// Build a report from in-memory counters.
///
/// A `window_start_ms` later than the current window's start yields an empty
/// report.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if window_start_ms.is_some_and(|start| start > snap.since_ms) {
        return EventReport::default();
    }

    let mut entity_counters: Vec<EntitySummary> = snap
        .entities
        .iter()
        .map(|(path, ops)| EntitySummary {
            path: path.clone(),
            read_calls: ops.read_calls,
            write_calls: ops.write_calls,
            rows_read: ops.rows_read,
            rows_affected: ops.rows_affected,
            avg_rows_per_read: if ops.read_calls > 0 {
                ops.rows_read as f64 / ops.read_calls as f64
            } else {
                0.0
            },
            shard_failures: ops.shard_failures,
            policy_rejections: ops.policy_rejections,
        })
        .collect();

    entity_counters.sort_by(|a, b| {
        match b
            .avg_rows_per_read
            .partial_cmp(&a.avg_rows_per_read)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => match b.rows_read.cmp(&a.rows_read) {
                Ordering::Equal => a.path.cmp(&b.path),
                other => other,
            },
            other => other,
        }
    });

    EventReport {
        counters: Some(snap),
        entity_counters,
    }
}

///
/// TESTS
///
