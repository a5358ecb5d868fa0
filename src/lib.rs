//! Client-side orchestration for a natural-language-to-SQL backend.
//!
//! The crate owns the query lifecycle state machine (submit → generate →
//! edit → execute), a sequence-guarded paginated result projection, the
//! history/sharing synchronizer with optimistic mutations, and the report
//! generation flow. HTTP access goes through a single transport client that
//! attaches the bearer credential and reacts globally to 401s.

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod report;
pub mod transport;
pub mod util;

pub use error::{ApiError, Result};
pub use history::{HistoryFilter, HistorySync};
pub use lifecycle::projection::ResultProjection;
pub use lifecycle::{LifecycleState, QueryLifecycle};
pub use report::{ReportFlow, ReportState};
pub use transport::{AuthContext, TransportClient};
