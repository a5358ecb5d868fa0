//! Report generation flow.
//!
//! Secondary async pipeline over a completed execution result: requests
//! visualization and insight generation and tracks progress independently of
//! the main query lifecycle. One generation cycle at a time; `clear()` bumps
//! the cycle id so a completion arriving afterwards is discarded.

use crate::api::models::Report;
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Backend capability for report generation
#[async_trait]
pub trait ReportBackend: Send + Sync {
    async fn generate_report(
        &self,
        result_id: &str,
        visualization_types: &[String],
        include_insights: bool,
    ) -> Result<Report>;

    async fn fetch_report(&self, report_id: &str) -> Result<Report>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    Idle,
    Generating,
    Ready,
    Failed,
}

/// Progress of the current generation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationStatus {
    pub is_generating: bool,
    /// 0–100, monotonically non-decreasing within a cycle
    pub progress: u8,
    pub message: String,
}

impl Default for GenerationStatus {
    fn default() -> Self {
        Self {
            is_generating: false,
            progress: 0,
            message: String::new(),
        }
    }
}

struct ReportInner {
    state: ReportState,
    status: GenerationStatus,
    report: Option<Report>,
    error: Option<String>,
    cycle: u64,
}

pub struct ReportFlow {
    backend: Arc<dyn ReportBackend>,
    inner: Mutex<ReportInner>,
}

impl ReportFlow {
    pub fn new(backend: Arc<dyn ReportBackend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(ReportInner {
                state: ReportState::Idle,
                status: GenerationStatus::default(),
                report: None,
                error: None,
                cycle: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReportInner> {
        self.inner.lock().expect("report lock poisoned")
    }

    pub fn state(&self) -> ReportState {
        self.lock().state
    }

    pub fn status(&self) -> GenerationStatus {
        self.lock().status.clone()
    }

    pub fn report(&self) -> Option<Report> {
        self.lock().report.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Starts a generation cycle for a stored execution result.
    ///
    /// Rejected while a cycle is already in flight; the flow never
    /// interrupts an in-flight generation on re-entry.
    pub async fn generate(
        &self,
        result_id: &str,
        visualization_types: &[String],
        include_insights: bool,
    ) -> Result<Report> {
        let cycle = {
            let mut inner = self.lock();
            if inner.state == ReportState::Generating {
                return Err(ApiError::invalid_state(
                    "report generation already in progress".to_string(),
                ));
            }
            inner.state = ReportState::Generating;
            inner.report = None;
            inner.error = None;
            inner.status = GenerationStatus {
                is_generating: true,
                progress: 0,
                message: "Starting report generation".to_string(),
            };
            inner.cycle += 1;
            inner.cycle
        };

        info!("Generating report for result {}", result_id);
        let outcome = self
            .backend
            .generate_report(result_id, visualization_types, include_insights)
            .await;

        let mut inner = self.lock();
        if inner.cycle != cycle {
            debug!("Discarding report completion for superseded cycle {}", cycle);
            return Err(ApiError::invalid_state(
                "report generation was cleared".to_string(),
            ));
        }

        match outcome {
            Ok(report) => {
                inner.state = ReportState::Ready;
                inner.status = GenerationStatus {
                    is_generating: false,
                    progress: 100,
                    message: "Report ready".to_string(),
                };
                inner.report = Some(report.clone());
                Ok(report)
            }
            Err(e) => {
                let message = e.to_string();
                inner.state = ReportState::Failed;
                inner.status.is_generating = false;
                inner.error = Some(message.clone());
                Err(ApiError::report(message))
            }
        }
    }

    /// Applies an incremental progress update. Progress never decreases
    /// within a cycle; updates outside a cycle are ignored.
    pub fn apply_progress(&self, progress: u8, message: impl Into<String>) {
        let mut inner = self.lock();
        if inner.state != ReportState::Generating {
            return;
        }
        inner.status.progress = inner.status.progress.max(progress.min(100));
        inner.status.message = message.into();
    }

    /// Resets to `Idle` with no report; a completion for the cycle that was
    /// in flight is discarded when it arrives.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.cycle += 1;
        inner.state = ReportState::Idle;
        inner.status = GenerationStatus::default();
        inner.report = None;
        inner.error = None;
    }
}
