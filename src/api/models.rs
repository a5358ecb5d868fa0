//! Wire types for the backend HTTP surface.
//!
//! Every response body is decoded into one of these at the transport
//! boundary; nothing downstream sees untyped JSON. Field names follow the
//! backend contract (snake_case for the query engine endpoints, camelCase
//! for history/result payloads).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Auth

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Generic acknowledgement for mutations that return no resource
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// Database catalog

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<TableColumn>,
}

// Query processing

/// Response of the NL→SQL generation step
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedQuery {
    pub query_id: String,
    pub generated_sql: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryStatusResponse {
    pub query_id: String,
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

// Result retrieval

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Execution outcome, also the shape of a single fetched result page.
///
/// Immutable once produced; a re-execution supersedes it wholesale.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResponse {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
    #[serde(rename = "executionTime")]
    pub execution_time: f64,
    #[serde(default)]
    pub truncated: bool,
    #[serde(rename = "resultId", default)]
    pub result_id: Option<String>,
    #[serde(rename = "totalRowCount", default)]
    pub total_row_count: Option<u64>,
}

// History

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub query_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub share_link: Option<ShareLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

// Sharing

/// Server-issued share link. Authoritative content (the URL) is
/// server-determined, so this is never constructed locally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShareLink {
    pub id: String,
    #[serde(rename = "share_link")]
    pub url: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

// Reporting

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visualization {
    pub id: String,
    pub chart_type: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Base64-encoded image payload
    pub image_data: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub result_id: String,
    pub visualizations: Vec<Visualization>,
    #[serde(default)]
    pub insights: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// Administration

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemStats {
    pub total_queries: u64,
    pub active_users: u64,
    #[serde(default)]
    pub avg_execution_time_ms: Option<f64>,
    #[serde(default)]
    pub uptime_seconds: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    #[serde(default)]
    pub title: Option<String>,
}
