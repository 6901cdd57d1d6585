//! Statement execution with bounded retry.
//!
//! The [`StatementRunner`] trait is the seam between compiled statements and
//! the driver: production code runs against the Neo4j client, tests run
//! against an in-memory fake. The executor layers retry-with-backoff on top
//! and drives iterative delete statements until they report no progress.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{GraphError, GraphResult};
use crate::statement::GraphStatement;

/// Something that can run a compiled statement against the graph.
#[async_trait]
pub trait StatementRunner: Send + Sync {
    /// Run a statement, discarding any rows it produces.
    async fn execute(&self, stmt: &GraphStatement) -> GraphResult<()>;

    /// Run a statement and return its `deleted` count column.
    async fn execute_counted(&self, stmt: &GraphStatement) -> GraphResult<i64>;
}

/// Retry budget for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (1-based), doubling each time.
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Runs statements with the configured retry policy.
pub struct StatementExecutor {
    runner: Arc<dyn StatementRunner>,
    policy: RetryPolicy,
}

impl StatementExecutor {
    pub fn new(runner: Arc<dyn StatementRunner>, policy: RetryPolicy) -> Self {
        Self { runner, policy }
    }

    /// Run one statement to completion. Iterative statements re-run until a
    /// pass deletes nothing; every individual pass gets the full retry
    /// budget, since each pass is its own transaction.
    pub async fn run(&self, stmt: &GraphStatement) -> GraphResult<()> {
        if stmt.iterative {
            self.run_iterative(stmt).await
        } else {
            self.with_retry(|| self.runner.execute(stmt)).await
        }
    }

    async fn run_iterative(&self, stmt: &GraphStatement) -> GraphResult<()> {
        let mut passes = 0u64;
        let mut total = 0i64;
        loop {
            let deleted = self
                .with_retry(|| self.runner.execute_counted(stmt))
                .await?;
            passes += 1;
            total += deleted;
            if deleted == 0 {
                debug!(passes, total, "iterative statement drained");
                return Ok(());
            }
        }
    }

    async fn with_retry<T, F, Fut>(&self, mut attempt: F) -> GraphResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = GraphResult<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut tries = 0u32;
        loop {
            tries += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && tries < max_attempts => {
                    let delay = self.policy.backoff(tries);
                    warn!(
                        attempt = tries,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient database error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_transient() => {
                    return Err(GraphError::RetriesExhausted {
                        attempts: tries,
                        last: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}
