use crate::{
    db::{
        command::{Connection, Statement},
        condition::ParamSet,
        response::Row,
    },
    error::BoxError,
};
use std::sync::{Arc, Mutex, MutexGuard};

///
/// MemoryShard
///
/// Scripted in-memory shard. Every handle shares one state, so tests keep a
/// clone to inspect what the command did after handing the connection off.
///

#[derive(Clone, Default)]
pub(crate) struct MemoryShard {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    rows: Vec<Row>,
    affected: u64,
    fail_prepare: Option<String>,
    fail_execute: Option<String>,
    prepared: Vec<String>,
    executed: Vec<(String, ParamSet)>,
    opened: usize,
    closed: usize,
}

impl MemoryShard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_rows(self, rows: Vec<Row>) -> Self {
        self.state().rows = rows;
        self
    }

    pub(crate) fn with_affected(self, affected: u64) -> Self {
        self.state().affected = affected;
        self
    }

    pub(crate) fn failing_prepare(self, message: &str) -> Self {
        self.state().fail_prepare = Some(message.to_string());
        self
    }

    pub(crate) fn failing_execute(self, message: &str) -> Self {
        self.state().fail_execute = Some(message.to_string());
        self
    }

    pub(crate) fn connection(&self) -> Arc<dyn Connection> {
        Arc::new(self.clone())
    }

    pub(crate) fn prepared(&self) -> Vec<String> {
        self.state().prepared.clone()
    }

    pub(crate) fn executed(&self) -> Vec<(String, ParamSet)> {
        self.state().executed.clone()
    }

    pub(crate) fn open_statements(&self) -> usize {
        let state = self.state();
        state.opened - state.closed
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Connection for MemoryShard {
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, BoxError> {
        let mut state = self.state();
        if let Some(message) = &state.fail_prepare {
            return Err(message.clone().into());
        }
        state.prepared.push(sql.to_string());
        state.opened += 1;

        Ok(Box::new(MemoryStatement {
            shard: self.clone(),
            sql: sql.to_string(),
        }))
    }
}

struct MemoryStatement {
    shard: MemoryShard,
    sql: String,
}

impl MemoryStatement {
    fn run(&self, params: &ParamSet) -> Result<MutexGuard<'_, MemoryState>, BoxError> {
        let mut state = self.shard.state();
        state.executed.push((self.sql.clone(), params.clone()));
        if let Some(message) = &state.fail_execute {
            return Err(message.clone().into());
        }

        Ok(state)
    }
}

impl Statement for MemoryStatement {
    fn query(&mut self, params: &ParamSet) -> Result<Vec<Row>, BoxError> {
        Ok(self.run(params)?.rows.clone())
    }

    fn execute(&mut self, params: &ParamSet) -> Result<u64, BoxError> {
        Ok(self.run(params)?.affected)
    }

    fn close(&mut self) {
        self.shard.state().closed += 1;
    }
}
