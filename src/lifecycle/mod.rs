//! Query lifecycle orchestration.
//!
//! Drives the natural-language → SQL → execute pipeline as a state machine:
//! `Idle → NlSubmitted → SqlReady → Executing → Completed`, with `Failed`
//! reachable from every in-flight state. Each backend round-trip is tagged
//! with an operation sequence number; a response that comes back after the
//! operation was cancelled or superseded is discarded instead of applied.

pub mod projection;

use crate::api::models::{ExecutionResponse, GeneratedQuery};
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Backend capability consumed by the orchestrator.
///
/// Implemented by the query API adapter; tests substitute scripted mocks.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn generate_sql(
        &self,
        db_id: &str,
        question: &str,
        use_rag: bool,
    ) -> Result<GeneratedQuery>;

    async fn execute_sql(&self, db_id: &str, sql: &str) -> Result<ExecutionResponse>;

    /// Advisory cancellation of the in-flight operation for `query_id`.
    async fn cancel_query(&self, query_id: &str) -> Result<()>;
}

/// Lifecycle states of the active query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    NlSubmitted,
    SqlReady,
    Executing,
    Completed,
    Failed,
}

impl LifecycleState {
    /// Terminal states accept a fresh `submit`
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Completed | LifecycleState::Failed)
    }

    pub fn accepts_submit(self) -> bool {
        self == LifecycleState::Idle || self.is_terminal()
    }

    pub fn accepts_execute(self) -> bool {
        matches!(self, LifecycleState::SqlReady | LifecycleState::Failed)
    }

    pub fn accepts_cancel(self) -> bool {
        matches!(self, LifecycleState::NlSubmitted | LifecycleState::Executing)
    }
}

/// The query currently owned by the orchestrator
#[derive(Debug, Clone)]
pub struct ActiveQuery {
    /// Server-assigned id, present once generation has resolved
    pub query_id: Option<String>,
    pub db_id: String,
    pub question: String,
    pub use_rag: bool,
    /// Generated SQL, user-editable until execution
    pub sql: Option<String>,
}

struct Inner {
    state: LifecycleState,
    query: Option<ActiveQuery>,
    result: Option<ExecutionResponse>,
    error: Option<String>,
    /// Bumped on every submit/execute/cancel/reset; responses carrying a
    /// stale tag are discarded
    op_seq: u64,
}

/// State machine coordinating submission, generation, edit, and execution.
///
/// All transitions are synchronous under one lock; the lock is never held
/// across a backend await, so a transition can never observe a half-applied
/// peer.
pub struct QueryLifecycle {
    backend: Arc<dyn QueryBackend>,
    inner: Mutex<Inner>,
}

impl QueryLifecycle {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner {
                state: LifecycleState::Idle,
                query: None,
                result: None,
                error: None,
                op_seq: 0,
            }),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub fn query(&self) -> Option<ActiveQuery> {
        self.lock().query.clone()
    }

    pub fn result(&self) -> Option<ExecutionResponse> {
        self.lock().result.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("lifecycle lock poisoned")
    }

    /// Submits a natural-language question for SQL generation.
    ///
    /// Valid from `Idle` and the terminal states; clears any prior query and
    /// result. Resolves once generation finishes. If the operation was
    /// cancelled while the request was in flight the response is discarded
    /// and `Ok(())` is returned, since the caller has already moved on.
    pub async fn submit(&self, db_id: &str, question: &str, use_rag: bool) -> Result<()> {
        let op = {
            let mut inner = self.lock();
            if !inner.state.accepts_submit() {
                return Err(ApiError::invalid_state(format!(
                    "submit not allowed while {:?}",
                    inner.state
                )));
            }
            inner.query = Some(ActiveQuery {
                query_id: None,
                db_id: db_id.to_string(),
                question: question.to_string(),
                use_rag,
                sql: None,
            });
            inner.result = None;
            inner.error = None;
            inner.state = LifecycleState::NlSubmitted;
            inner.op_seq += 1;
            inner.op_seq
        };

        info!("Submitting NL question for db '{}'", db_id);
        let outcome = self.backend.generate_sql(db_id, question, use_rag).await;

        let mut inner = self.lock();
        if inner.op_seq != op {
            debug!("Discarding stale generation response (op {} superseded)", op);
            return Ok(());
        }

        match outcome {
            Ok(generated) => {
                if let Some(query) = inner.query.as_mut() {
                    query.query_id = Some(generated.query_id);
                    query.sql = Some(generated.generated_sql);
                }
                inner.state = LifecycleState::SqlReady;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                inner.state = LifecycleState::Failed;
                inner.error = Some(message.clone());
                Err(ApiError::generation(message))
            }
        }
    }

    /// Replaces the generated SQL before execution. Local only; valid in
    /// `SqlReady` and does not change state.
    pub fn edit_sql(&self, new_sql: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != LifecycleState::SqlReady {
            return Err(ApiError::invalid_state(format!(
                "edit_sql not allowed while {:?}",
                inner.state
            )));
        }
        if let Some(query) = inner.query.as_mut() {
            query.sql = Some(new_sql.to_string());
        }
        Ok(())
    }

    /// Executes SQL against the selected database.
    ///
    /// Valid from `SqlReady` or `Failed` (re-running a manually corrected
    /// statement is allowed). On success the execution result is retained
    /// for the result projection; on failure any prior result is cleared.
    pub async fn execute(&self, db_id: &str, sql: &str) -> Result<ExecutionResponse> {
        let op = {
            let mut inner = self.lock();
            if !inner.state.accepts_execute() {
                return Err(ApiError::invalid_state(format!(
                    "execute not allowed while {:?}",
                    inner.state
                )));
            }
            if let Some(query) = inner.query.as_mut() {
                query.sql = Some(sql.to_string());
            }
            inner.error = None;
            inner.state = LifecycleState::Executing;
            inner.op_seq += 1;
            inner.op_seq
        };

        info!("Executing SQL against db '{}'", db_id);
        let outcome = self.backend.execute_sql(db_id, sql).await;

        let mut inner = self.lock();
        if inner.op_seq != op {
            debug!("Discarding stale execution response (op {} superseded)", op);
            return Err(ApiError::invalid_state("execution superseded".to_string()));
        }

        match outcome {
            Ok(result) => {
                inner.state = LifecycleState::Completed;
                inner.result = Some(result.clone());
                Ok(result)
            }
            Err(e) => {
                let message = e.to_string();
                inner.state = LifecycleState::Failed;
                inner.result = None;
                inner.error = Some(message.clone());
                Err(ApiError::execution(message))
            }
        }
    }

    /// Cancels the in-flight generation or execution.
    ///
    /// Local state returns to `Idle` immediately; the backend cancel request
    /// is fired without awaiting its acknowledgement. A late response for
    /// the cancelled operation is discarded by the sequence-tag check.
    pub fn cancel(&self) -> Result<()> {
        let query_id = {
            let mut inner = self.lock();
            if !inner.state.accepts_cancel() {
                return Err(ApiError::invalid_state(format!(
                    "cancel not allowed while {:?}",
                    inner.state
                )));
            }
            let query_id = inner.query.as_ref().and_then(|q| q.query_id.clone());
            inner.op_seq += 1;
            inner.state = LifecycleState::Idle;
            inner.query = None;
            inner.result = None;
            inner.error = None;
            query_id
        };

        if let Some(id) = query_id {
            info!("Requesting backend cancellation of query {}", id);
            let backend = Arc::clone(&self.backend);
            tokio::spawn(async move {
                if let Err(e) = backend.cancel_query(&id).await {
                    debug!("Backend cancel for {} not acknowledged: {}", id, e);
                }
            });
        }

        Ok(())
    }

    /// Clears the view back to `Idle`. Valid from `Idle` and terminal states.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.lock();
        if !inner.state.accepts_submit() {
            return Err(ApiError::invalid_state(format!(
                "reset not allowed while {:?}",
                inner.state
            )));
        }
        inner.op_seq += 1;
        inner.state = LifecycleState::Idle;
        inner.query = None;
        inner.result = None;
        inner.error = None;
        Ok(())
    }
}
