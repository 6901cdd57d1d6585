//! In-memory [`StatementRunner`] fake for executor and loader tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{GraphError, GraphResult};
use crate::executor::StatementRunner;
use crate::statement::GraphStatement;

/// Records every statement it receives and fails on demand.
#[derive(Default)]
pub struct RecordingRunner {
    statements: Mutex<Vec<GraphStatement>>,
    transient_failures: AtomicU32,
    fatal_failures: AtomicU32,
    delete_counts: Mutex<VecDeque<i64>>,
}

impl RecordingRunner {
    /// Fail the next `n` calls with a transient error.
    pub fn fail_transient(self, n: u32) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` calls with a non-retryable error.
    pub fn fail_fatal(self, n: u32) -> Self {
        self.fatal_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Queue the `deleted` counts returned by successive counted calls.
    /// Once drained, further calls return zero.
    pub fn delete_counts(self, counts: Vec<i64>) -> Self {
        *self.delete_counts.lock().unwrap() = counts.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.statements.lock().unwrap().len()
    }

    pub fn statements(&self) -> Vec<GraphStatement> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, stmt: &GraphStatement) -> GraphResult<()> {
        self.statements.lock().unwrap().push(stmt.clone());
        if take_one(&self.transient_failures) {
            return Err(GraphError::TransientDatabase(
                "connection reset by peer".into(),
            ));
        }
        if take_one(&self.fatal_failures) {
            return Err(GraphError::BadResult {
                context: "forced failure".into(),
            });
        }
        Ok(())
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl StatementRunner for RecordingRunner {
    async fn execute(&self, stmt: &GraphStatement) -> GraphResult<()> {
        self.record(stmt)
    }

    async fn execute_counted(&self, stmt: &GraphStatement) -> GraphResult<i64> {
        self.record(stmt)?;
        Ok(self
            .delete_counts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(0))
    }
}
